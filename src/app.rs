// src/app.rs

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::account::AccountService;
use crate::auth::cookies::CookiePolicy;
use crate::auth::csrf::{CsrfGate, csrf_protection};
use crate::auth::external::{ExternalAuthProvider, ExternalLoginService};
use crate::auth::jwt::JwtManager;
use crate::auth::password::PasswordManager;
use crate::auth::services::AuthService;
use crate::auth::tokens::TokenService;
use crate::config::{Config, JwtConfig};
use crate::db::store::Store;
use crate::handlers::auth::{
    external_login, external_login_callback, login, logout, refresh, register,
};
use crate::handlers::health::health;
use crate::handlers::media::{delete_media, list_media, media_url};
use crate::handlers::payments::{checkout, webhook};
use crate::handlers::plans::list_plans;
use crate::handlers::upload::{upload_complete, upload_url};
use crate::handlers::user::{delete_current_user, get_current_user};
use crate::media::service::MediaService;
use crate::payments::{PaymentProvider, PaymentService};
use crate::plans::quota::QuotaEngine;
use crate::storage::ObjectStorage;

/// Réglages nécessaires à la construction de l'état, extraits de `Config`
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub jwt: JwtConfig,
    pub refresh_token_days: i64,
    pub bcrypt_cost: u32,
    pub frontend_origins: Vec<String>,
    pub cookie_secure: bool,
    pub presign_ttl: Duration,
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            jwt: config.jwt.clone(),
            refresh_token_days: config.refresh_token_days,
            bcrypt_cost: config.bcrypt_cost,
            frontend_origins: config.frontend_origins.clone(),
            cookie_secure: config.cookie_secure,
            presign_ttl: config.s3.presign_ttl,
        }
    }
}

/// Services tiers injectés au démarrage (ou remplacés par des doublures en test)
pub struct Collaborators {
    pub storage: Arc<dyn ObjectStorage>,
    pub payments: Arc<dyn PaymentProvider>,
    pub oauth_providers: Vec<Arc<dyn ExternalAuthProvider>>,
}

#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtManager,
    pub cookies: CookiePolicy,
    pub csrf: Arc<CsrfGate>,
    pub tokens: Arc<TokenService>,
    pub quota: Arc<QuotaEngine>,
    pub auth: Arc<AuthService>,
    pub external: Arc<ExternalLoginService>,
    pub media: Arc<MediaService>,
    pub payments: Arc<PaymentService>,
    pub accounts: Arc<AccountService>,
    allowed_origins: Arc<[String]>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        collaborators: Collaborators,
        settings: &AppSettings,
    ) -> Self {
        let jwt = JwtManager::new(&settings.jwt);
        let tokens = TokenService::new(store.clone(), jwt.clone(), settings.refresh_token_days);
        let quota = QuotaEngine::new(store.clone());
        let csrf = Arc::new(CsrfGate::new(&settings.frontend_origins));

        // Destination des erreurs OAuth quand aucun returnUrl n'est exploitable
        let fallback_url = settings
            .frontend_origins
            .first()
            .cloned()
            .unwrap_or_else(|| "/".to_string());
        let external = collaborators.oauth_providers.into_iter().fold(
            ExternalLoginService::new(
                store.clone(),
                tokens.clone(),
                quota.clone(),
                csrf.clone(),
                fallback_url,
            ),
            ExternalLoginService::with_provider,
        );

        Self {
            auth: Arc::new(AuthService::new(
                store.clone(),
                PasswordManager::new(settings.bcrypt_cost),
                tokens.clone(),
                quota.clone(),
            )),
            media: Arc::new(MediaService::new(
                store.clone(),
                collaborators.storage.clone(),
                quota.clone(),
                settings.presign_ttl,
            )),
            payments: Arc::new(PaymentService::new(collaborators.payments, quota.clone())),
            accounts: Arc::new(AccountService::new(store, collaborators.storage, quota.clone())),
            external: Arc::new(external),
            jwt,
            cookies: CookiePolicy::new(settings.cookie_secure),
            csrf,
            tokens: Arc::new(tokens),
            quota: Arc::new(quota),
            allowed_origins: settings.frontend_origins.clone().into(),
        }
    }
}

// Permet à l'extracteur AuthClaims de trouver le JwtManager
impl FromRef<AppState> for JwtManager {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Configure les routes d'authentification
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/external-login", get(external_login))
        .route("/external-login-callback", get(external_login_callback))
}

fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route("/{id}/url", get(media_url))
        .route("/{id}", delete(delete_media))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/upload/url", get(upload_url))
        .route("/upload/complete", post(upload_complete))
        .nest("/media", media_routes())
        .route("/plans", get(list_plans))
        .route("/payments/test", post(checkout))
        .route("/payments/webhook", post(webhook))
        .route("/users/me", get(get_current_user).delete(delete_current_user))
}

/// CORS restreint aux origines du front, cookies autorisés
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Construit l'application complète
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(middleware::from_fn_with_state(
            state.csrf.clone(),
            csrf_protection,
        ))
        .layer(cors_layer(&state.allowed_origins))
        // Middleware global de tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::external::ExternalIdentity;
    use crate::testing::{
        FakeOAuthProvider, FakePayments, FakeStorage, MemoryStore, test_jwt_config,
    };
    use reqwest::Url;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt; // for oneshot

    const ORIGIN: &str = "http://localhost:5173";

    fn test_app() -> Router {
        test_app_with_providers(Vec::new())
    }

    fn test_app_with_providers(oauth_providers: Vec<Arc<dyn ExternalAuthProvider>>) -> Router {
        let settings = AppSettings {
            jwt: test_jwt_config(),
            refresh_token_days: 1,
            bcrypt_cost: 4,
            frontend_origins: vec![ORIGIN.to_string()],
            cookie_secure: false,
            presign_ttl: Duration::from_secs(900),
        };
        let collaborators = Collaborators {
            storage: Arc::new(FakeStorage::default()),
            payments: Arc::new(FakePayments::default()),
            oauth_providers,
        };
        build_router(AppState::new(
            Arc::new(MemoryStore::default()),
            collaborators,
            &settings,
        ))
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn refresh_cookie(response: &Response<Body>) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("refresh cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn register(app: &Router, email: &str) -> Response<Body> {
        let body = json!({
            "email": email,
            "password": "TestPassword123!",
            "password_confirm": "TestPassword123!",
        });
        app.clone()
            .oneshot(json_request("POST", "/api/auth/register", &body))
            .await
            .unwrap()
    }

    fn refresh_request(cookie: &str, origin: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .header(header::COOKIE, cookie)
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn register_sets_cookie_and_login_works() {
        let app = test_app();

        let resp = register(&app, "Viewer@Example.com").await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("refreshToken="));
        assert!(set_cookie.contains("HttpOnly"));
        let body = body_json(resp).await;
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["user"]["email"], "viewer@example.com");

        let login = json!({ "email": "viewer@example.com", "password": "TestPassword123!" });
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", &login))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let wrong = json!({ "email": "viewer@example.com", "password": "Nope12345" });
        let resp = app
            .oneshot(json_request("POST", "/api/auth/login", &wrong))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app();
        assert_eq!(register(&app, "dup@example.com").await.status(), StatusCode::CREATED);

        let resp = register(&app, "DUP@example.com").await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["error"], "USER_EXISTS");
    }

    #[tokio::test]
    async fn refresh_rotates_and_rejects_reuse() {
        let app = test_app();
        let cookie = refresh_cookie(&register(&app, "rotate@example.com").await);

        let resp = app
            .clone()
            .oneshot(refresh_request(&cookie, ORIGIN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_ne!(refresh_cookie(&resp), cookie);

        let resp = app.oneshot(refresh_request(&cookie, ORIGIN)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn csrf_gate_blocks_foreign_origin() {
        let app = test_app();
        let cookie = refresh_cookie(&register(&app, "csrf@example.com").await);

        let resp = app
            .clone()
            .oneshot(refresh_request(&cookie, "https://evil.example"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(resp).await["error"], "CSRF_REJECTED");

        // Le jeton n'a pas été consommé par la requête bloquée
        let resp = app.oneshot(refresh_request(&cookie, ORIGIN)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .body(Body::empty())
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let app = test_app();
        let cookie = refresh_cookie(&register(&app, "bye@example.com").await);

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header(header::COOKIE, &cookie)
            .header(header::ORIGIN, ORIGIN)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(refresh_cookie(&resp).ends_with("refreshToken="));

        let resp = app.oneshot(refresh_request(&cookie, ORIGIN)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer() {
        let req = Request::builder()
            .uri("/api/users/me")
            .body(Body::empty())
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn upload_flow_shows_up_in_profile() {
        let app = test_app();
        let body = body_json(register(&app, "uploader@example.com").await).await;
        let bearer = format!("Bearer {}", body["access_token"].as_str().unwrap());

        let req = Request::builder()
            .uri("/api/upload/url?fileName=clip.mp4&contentType=video/mp4&fileSize=1024")
            .header(header::AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let ticket = body_json(resp).await;
        assert!(ticket["url"].as_str().unwrap().starts_with("https://storage.test/"));

        let complete = json!({
            "media_id": ticket["media_id"],
            "file_name": "clip.mp4",
            "content_type": "video/mp4",
            "file_size": 1024,
        });
        let mut req = json_request("POST", "/api/upload/complete", &complete);
        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_str(&bearer).unwrap());
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = Request::builder()
            .uri("/api/users/me")
            .header(header::AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap();
        let profile = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(profile["storage"]["plan"], "free");
        assert_eq!(profile["storage"]["used_memory_bytes"], 1024);
        assert_eq!(profile["media"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn plans_catalogue_is_public() {
        let req = Request::builder()
            .uri("/api/plans")
            .body(Body::empty())
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn webhook_requires_signature_header() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .body(Body::from("{}"))
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn external_login_callback_redirects_with_cross_site_cookie() {
        let google: Arc<dyn ExternalAuthProvider> =
            Arc::new(FakeOAuthProvider::new(ExternalIdentity {
                provider: "google".to_string(),
                provider_key: "google-sub-42".to_string(),
                email: Some("social@example.com".to_string()),
                display_name: Some("Social".to_string()),
            }));
        let app = test_app_with_providers(vec![google]);

        let req = Request::builder()
            .uri("/api/auth/external-login?provider=google&returnUrl=http%3A%2F%2Flocalhost%3A5173%2Fsocial")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        let authorize = Url::parse(location).unwrap();
        assert_eq!(authorize.host_str(), Some("oauth.test"));
        let state = authorize
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");

        let callback = Url::parse_with_params(
            "http://localhost/api/auth/external-login-callback",
            &[("code", "good"), ("state", state.as_str())],
        )
        .unwrap();
        let req = Request::builder()
            .uri(format!("{}?{}", callback.path(), callback.query().unwrap()))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("http://localhost:5173/social?accessToken="));
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("refreshToken="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=None"));
        assert!(set_cookie.contains("Secure"));
    }
}
