use crate::db::models::user::Role;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Détecte l'environnement depuis `APP_ENV`
    pub fn detect() -> Self {
        Self::from_app_env(env::var("APP_ENV").ok().as_deref())
    }

    pub fn from_app_env(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod") => {
                Self::Production
            }
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
    pub presign_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub database_pool_size: u32,
    pub jwt: JwtConfig,
    pub refresh_token_days: i64,
    pub frontend_origins: Vec<String>,
    /// Rôles accordés au démarrage, `email:Role`
    pub role_grants: Vec<(String, Role)>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub s3: S3Config,
    pub stripe: StripeConfig,
    pub email: EmailConfig,
    pub google: Option<GoogleConfig>,
    pub token_cleanup_interval: Duration,
    pub plan_sweep_interval: Duration,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self> {
        let environment = Environment::detect();

        tracing::info!(
            "Environment detected: {}",
            environment.as_str().to_uppercase()
        );

        Self::load_env_file(&environment);

        let database_url = Self::get_database_url(&environment)?;
        let jwt = JwtConfig {
            secret: Self::get_jwt_secret(&environment)?,
            issuer: env_or("JWT_ISSUER", "reelbox"),
            audience: env_or("JWT_AUDIENCE", "reelbox-web"),
            access_token_minutes: env_parse("ACCESS_TOKEN_MINUTES", 15)?,
        };
        let frontend_origins = parse_csv(&env_or("FRONTEND_ORIGINS", "http://localhost:5173"));
        let cookie_secure = if environment.is_production() {
            true
        } else {
            env_parse("COOKIE_SECURE", false)?
        };

        let s3 = S3Config {
            endpoint: env_or("S3_ENDPOINT", "https://s3.eu-central-1.amazonaws.com"),
            region: env_or("S3_REGION", "eu-central-1"),
            bucket: required(&environment, "S3_BUCKET", "reelbox-dev")?,
            access_key: required(&environment, "S3_ACCESS_KEY", "dev-access-key")?,
            secret_key: required(&environment, "S3_SECRET_KEY", "dev-secret-key")?,
            path_style: env_parse("S3_PATH_STYLE", true)?,
            presign_ttl: Duration::from_secs(env_parse::<u64>("PRESIGN_TTL_MINUTES", 15)? * 60),
        };

        let app_public_url = env_or("APP_PUBLIC_URL", "http://localhost:5173");
        let stripe = StripeConfig {
            secret_key: required(&environment, "STRIPE_SECRET_KEY", "sk_test_dev")?,
            webhook_secret: required(&environment, "STRIPE_WEBHOOK_SECRET", "whsec_dev")?,
            currency: env_or("STRIPE_CURRENCY", "eur"),
            success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{app_public_url}/buy/success")),
            cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| format!("{app_public_url}/buy")),
        };

        let email = EmailConfig {
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            from: env_or("EMAIL_FROM", "ReelBox <onboarding@resend.dev>"),
            public_url: app_public_url,
        };
        if email.resend_api_key.is_none() {
            tracing::warn!("RESEND_API_KEY not set, plan notifications will only be logged");
        }

        let google = match (
            env::var("GOOGLE_CLIENT_ID"),
            env::var("GOOGLE_CLIENT_SECRET"),
            env::var("GOOGLE_REDIRECT_URI"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(redirect_uri)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => {
                tracing::info!("Google credentials not set, external login disabled");
                None
            }
        };

        let config = Self {
            environment,
            database_url,
            database_pool_size: env_parse("DATABASE_POOL_SIZE", 10)?,
            jwt,
            refresh_token_days: env_parse("REFRESH_TOKEN_DAYS", 1)?,
            frontend_origins,
            role_grants: parse_role_grants(&env_or("ROLE_GRANTS", ""))?,
            cookie_secure,
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            s3,
            stripe,
            email,
            google,
            token_cleanup_interval: Duration::from_secs(
                env_parse::<u64>("TOKEN_CLEANUP_MINUTES", 30)? * 60,
            ),
            plan_sweep_interval: Duration::from_secs(
                env_parse::<u64>("PLAN_SWEEP_HOURS", 24)? * 3600,
            ),
            server_host: env_or("SERVER_HOST", "0.0.0.0"),
            server_port: env_parse("SERVER_PORT", 3000)?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("   Database: {}", mask_credentials(&config.database_url));
        tracing::debug!("   Origins: {:?}", config.frontend_origins);
        tracing::debug!("   Server: {}:{}", config.server_host, config.server_port);

        Ok(config)
    }

    /// Charge `.env` en développement, la production reçoit ses variables injectées
    fn load_env_file(environment: &Environment) {
        if environment.is_production() {
            tracing::info!("Production mode: using injected environment variables");
            return;
        }

        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("   Loaded: {}", path.display()),
            Err(_) => tracing::warn!("   .env file not found, using environment variables"),
        }
    }

    fn get_database_url(environment: &Environment) -> Result<String> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(url);
        }

        if environment.is_production() {
            anyhow::bail!("DATABASE_URL must be set in production");
        }

        let user = env_or("POSTGRES_USER", "postgres");
        let password = env_or("POSTGRES_PASSWORD", "postgres");
        let host = env_or("DB_HOST", "localhost");
        let port = env_or("DB_PORT", "5432");
        let database = env_or("POSTGRES_DB", "reelbox");

        Ok(format!("postgres://{user}:{password}@{host}:{port}/{database}"))
    }

    /// Récupère JWT_SECRET avec validation
    fn get_jwt_secret(environment: &Environment) -> Result<String> {
        let secret = match env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) if environment.is_production() => {
                tracing::error!("JWT_SECRET not set in production!");
                anyhow::bail!("JWT_SECRET is required in production");
            }
            Err(_) => {
                tracing::warn!("JWT_SECRET not set, using default (DEVELOPMENT ONLY!)");
                "dev_secret_key_change_in_production_0123456789".to_string()
            }
        };

        validate_jwt_secret(environment, &secret)?;
        Ok(secret)
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn validate_jwt_secret(environment: &Environment, secret: &str) -> Result<()> {
    if environment.is_production() && secret.len() < 32 {
        anyhow::bail!(
            "JWT_SECRET must be at least 32 characters in production (current: {})",
            secret.len()
        );
    }
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Obligatoire en production, valeur de développement sinon
fn required(environment: &Environment, key: &str, dev_default: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(_) if environment.is_production() => anyhow::bail!("{key} must be set in production"),
        Err(_) => Ok(dev_default.to_string()),
    }
}

/// Liste séparée par des virgules, entrées vides ignorées
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// `admin@example.com:Admin,mod@example.com:Moderator`
fn parse_role_grants(raw: &str) -> Result<Vec<(String, Role)>> {
    parse_csv(raw)
        .into_iter()
        .map(|entry| {
            let (email, role) = entry
                .rsplit_once(':')
                .with_context(|| format!("ROLE_GRANTS entry without role: {entry}"))?;
            let role = role.parse::<Role>().map_err(anyhow::Error::msg)?;
            Ok((email.trim().to_lowercase(), role))
        })
        .collect()
}

/// Masque les credentials dans les logs
fn mask_credentials(url: &str) -> String {
    if let Some(at_pos) = url.find('@')
        && let Some(scheme_end) = url.find("://")
    {
        let scheme = &url[..scheme_end + 3];
        let after_at = &url[at_pos..];
        return format!("{scheme}***:***{after_at}");
    }
    url.to_string()
}
