use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use reelbox_api::{AppResponse as ApiResponse, StatusCode as ApiStatusCode};
use serde::Serialize;

/// Backend wrapper for reelbox-api's AppResponse that adds Axum integration.
///
/// This type wraps the WASM-compatible ApiResponse and provides:
/// - Axum's IntoResponse trait implementation
/// - HTTP header support (cookies, redirects)
/// - Status code conversion
///
/// # Examples
///
/// ```rust,ignore
/// use crate::response::AppResponse;
///
/// // Simple response
/// AppResponse::ok(user_data)
///
/// // Response setting the refresh cookie
/// AppResponse::ok(body).with_headers(set_cookie_headers(cookie))
///
/// // Browser redirect
/// AppResponse::redirect(&url)?
/// ```
pub struct AppResponse<T> {
    inner: ApiResponse<T>,
    headers: Option<HeaderMap>,
}

impl<T> AppResponse<T>
where
    T: Serialize,
{
    /// Creates a new response wrapping the API response
    pub fn new(inner: ApiResponse<T>) -> Self {
        Self {
            inner,
            headers: None,
        }
    }

    /// Adds HTTP headers to the response, merged with those already set
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        match self.headers.as_mut() {
            Some(existing) => {
                for (name, value) in &headers {
                    existing.append(name, value.clone());
                }
            }
            None => self.headers = Some(headers),
        }
        self
    }

    // === Convenience constructors ===

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(ApiResponse::ok(data))
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(ApiResponse::created(data))
    }
}

impl AppResponse<()> {
    /// 204 No Content
    pub fn no_content() -> Self {
        Self::new(ApiResponse::no_content())
    }

    /// 302 Found vers `location`
    pub fn redirect(location: &str) -> Result<Self, crate::error::AppError> {
        let value = HeaderValue::from_str(location)
            .map_err(|_| crate::error::AppError::internal("Invalid redirect location"))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, value);
        Ok(Self::new(ApiResponse::found()).with_headers(headers))
    }
}

/// Converts API StatusCode to Axum's StatusCode
fn convert_status(api_status: ApiStatusCode) -> StatusCode {
    match api_status {
        ApiStatusCode::Ok => StatusCode::OK,
        ApiStatusCode::Created => StatusCode::CREATED,
        ApiStatusCode::NoContent => StatusCode::NO_CONTENT,
        ApiStatusCode::Found => StatusCode::FOUND,
        ApiStatusCode::BadRequest => StatusCode::BAD_REQUEST,
        ApiStatusCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiStatusCode::Forbidden => StatusCode::FORBIDDEN,
        ApiStatusCode::NotFound => StatusCode::NOT_FOUND,
        ApiStatusCode::Conflict => StatusCode::CONFLICT,
        ApiStatusCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        ApiStatusCode::BadGateway => StatusCode::BAD_GATEWAY,
    }
}

/// Implements Axum's IntoResponse trait for our wrapper
impl<T> IntoResponse for AppResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = convert_status(self.inner.status);

        let mut response = match self.inner.data {
            Some(data) => (status, Json(data)).into_response(),
            None => status.into_response(),
        };

        if let Some(headers) = self.headers {
            for (name, value) in &headers {
                response.headers_mut().append(name, value.clone());
            }
        }

        response
    }
}
