use std::env;

use crate::keys::DEFAULT_PREFIX;
use crate::payments::PaypalEnvironment;

#[derive(Clone, Default)]
pub struct PaypalConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: PaypalEnvironment,
    /// Overrides the environment's base URL (local stubs, egress proxies)
    pub base_url: Option<String>,
}

impl PaypalConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.environment.base_url().to_string())
    }
}

impl std::fmt::Debug for PaypalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
    /// Receives sale notifications and contact-form messages
    pub admin_email: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Sustained requests per second per client IP
    pub per_second: u64,
    pub burst: u32,
}

impl RateLimit {
    /// Time for one request slot to refill, which is what the limiter is
    /// configured with.
    pub fn replenish_interval_ms(&self) -> u64 {
        (1000 / self.per_second.max(1)).max(1)
    }
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub paypal: PaypalConfig,
    pub email: EmailConfig,
    pub license_key_prefix: String,
    /// Strict mode: `GET /verify` needs both `key` and `domain`
    pub verify_require_key: bool,
    /// Bearer key guarding `POST /license` (unguarded when unset)
    pub admin_api_key: Option<String>,
    /// Empty = any origin
    pub cors_allowed_origins: Vec<String>,
    /// None disables per-IP rate limiting. The client IP is taken from
    /// `X-Forwarded-For` / `X-Real-IP` when present, so deploy behind a
    /// reverse proxy that overwrites those headers.
    pub rate_limit: Option<RateLimit>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("paypal", &self.paypal)
            .field("email", &self.email)
            .field("license_key_prefix", &self.license_key_prefix)
            .field("verify_require_key", &self.verify_require_key)
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "***"))
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = get("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000);

        let environment = match get("PAYPAL_ENVIRONMENT") {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "Unknown PAYPAL_ENVIRONMENT, using sandbox");
                PaypalEnvironment::Sandbox
            }),
            None => PaypalEnvironment::Sandbox,
        };

        let rate_limit = flag(get("RATE_LIMIT_ENABLED"), true).then(|| RateLimit {
            per_second: get("RATE_LIMIT_PER_SECOND")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(2),
            burst: get("RATE_LIMIT_BURST")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(10),
        });

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "licenses.db".to_string()),
            paypal: PaypalConfig {
                client_id: get("PAYPAL_CLIENT_ID"),
                client_secret: get("PAYPAL_CLIENT_SECRET"),
                environment,
                base_url: get("PAYPAL_BASE_URL"),
            },
            email: EmailConfig {
                resend_api_key: get("RESEND_API_KEY"),
                from: get("EMAIL_FROM")
                    .unwrap_or_else(|| "WhatsApp Pro Chat <noreply@resend.dev>".to_string()),
                admin_email: get("ADMIN_EMAIL"),
            },
            license_key_prefix: get("LICENSE_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            verify_require_key: flag(get("VERIFY_REQUIRE_KEY"), true),
            admin_api_key: get("ADMIN_API_KEY"),
            cors_allowed_origins,
            rate_limit,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
