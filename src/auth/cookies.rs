//! Refresh-token cookie handling.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Utc};

use crate::error::AppError;

pub const REFRESH_COOKIE: &str = "refreshToken";
const COOKIE_PATH: &str = "/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    /// Requis quand le cookie est posé pendant une redirection cross-site (OAuth)
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// `Set-Cookie` dont l'expiration reprend celle du refresh token
    pub fn refresh_cookie(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        same_site: SameSite,
    ) -> Result<HeaderValue, AppError> {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        // SameSite=None n'est accepté par les navigateurs qu'avec Secure
        let secure = self.secure || same_site == SameSite::None;

        let mut cookie = format!(
            "{REFRESH_COOKIE}={token}; HttpOnly; SameSite={}; Path={COOKIE_PATH}; Max-Age={max_age}; Expires={}",
            same_site.as_str(),
            http_date(expires_at),
        );
        if secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie).map_err(|_| AppError::internal("Failed to set cookie"))
    }

    pub fn clear_refresh_cookie(&self) -> HeaderValue {
        let mut cookie = format!(
            "{REFRESH_COOKIE}=; HttpOnly; SameSite=Strict; Path={COOKIE_PATH}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

pub fn set_cookie_headers(value: HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    headers
}

/// Valeur d'un cookie de la requête, tous en-têtes `Cookie` confondus
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|kv| {
            let (key, value) = kv.trim().split_once('=')?;
            (key == name).then(|| value.trim().to_string())
        })
}

pub fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, REFRESH_COOKIE).filter(|v| !v.is_empty())
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
