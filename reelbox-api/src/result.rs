use serde::{Deserialize, Serialize};

/// HTTP status codes the API can answer with.
/// This is WASM-compatible and doesn't depend on `axum::http::StatusCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    Found = 302,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    Conflict = 409,
    InternalServerError = 500,
    BadGateway = 502,
}

impl StatusCode {
    /// Numeric HTTP code
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.code())
    }
}

/// Generic API response wrapper
///
/// The backend wraps this in a type that implements Axum's `IntoResponse`.
///
/// ```rust
/// use reelbox_api::{AppResponse, StatusCode};
///
/// let response = AppResponse::ok("data");
/// assert_eq!(response.status, StatusCode::Ok);
///
/// let empty: AppResponse<()> = AppResponse::no_content();
/// assert!(empty.data.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub status: StatusCode,
}

impl<T> AppResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            data: Some(data),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, data: None }
    }

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::Ok, data)
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(StatusCode::Created, data)
    }
}

impl AppResponse<()> {
    /// 204 No Content
    pub fn no_content() -> Self {
        Self::empty(StatusCode::NoContent)
    }

    /// 302 Found, the location travels as a header
    pub fn found() -> Self {
        Self::empty(StatusCode::Found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Payload {
        message: String,
    }

    #[test]
    fn ok_response_carries_data() {
        let data = Payload {
            message: "success".to_string(),
        };
        let response = AppResponse::ok(data.clone());
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.data, Some(data));
    }

    #[test]
    fn found_response_is_empty() {
        let response = AppResponse::found();
        assert_eq!(response.status.code(), 302);
        assert!(response.data.is_none());
    }

    #[test]
    fn success_range_is_2xx_only() {
        assert!(StatusCode::Created.is_success());
        assert!(StatusCode::NoContent.is_success());
        assert!(!StatusCode::Found.is_success());
        assert!(!StatusCode::BadGateway.is_success());
    }

    #[test]
    fn serialization_skips_missing_data() {
        let response: AppResponse<Payload> = AppResponse::empty(StatusCode::NotFound);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("data"));
        assert!(json.contains("NotFound"));
    }
}
