//! Origin/Referer gate for cookie-authenticated, state-changing requests.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use reqwest::Url;

use super::cookies::{REFRESH_COOKIE, read_cookie};
use crate::error::AppError;

const PROTECTED_PREFIXES: [&str; 2] = ["/api/auth", "/api/payments"];

#[derive(Debug, Clone)]
pub struct CsrfGate {
    allowed_origins: HashSet<String>,
}

impl CsrfGate {
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_origins: allowed_origins
                .into_iter()
                .map(|o| normalize_origin(o.as_ref()))
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.contains(&normalize_origin(origin))
    }

    /// Requêtes sans cookie de refresh ou hors des préfixes protégés: pas de contrôle
    pub fn check(&self, method: &Method, path: &str, headers: &HeaderMap) -> Result<(), AppError> {
        if !requires_check(method, path) || read_cookie(headers, REFRESH_COOKIE).is_none() {
            return Ok(());
        }

        if self.allowed_by_origin(headers) || self.allowed_by_referer(headers) {
            return Ok(());
        }

        tracing::warn!(%method, path, "Request blocked by CSRF protection");
        Err(AppError::CsrfRejected)
    }

    fn allowed_by_origin(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .is_some_and(|origin| self.is_allowed_origin(origin))
    }

    fn allowed_by_referer(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .and_then(url_origin)
            .is_some_and(|origin| self.is_allowed_origin(&origin))
    }
}

fn requires_check(method: &Method, path: &str) -> bool {
    let state_changing = matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    state_changing
        && PROTECTED_PREFIXES
            .iter()
            .any(|prefix| starts_with_segments(path, prefix))
}

fn starts_with_segments(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// `scheme://authority` d'une URL absolue (Referer, returnUrl)
pub(crate) fn url_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

pub async fn csrf_protection(
    State(gate): State<Arc<CsrfGate>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate.check(request.method(), request.uri().path(), request.headers())?;
    Ok(next.run(request).await)
}
