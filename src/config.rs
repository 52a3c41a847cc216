use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub address: SocketAddr,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

// Hand-written so the secret never ends up in a log line.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Key on `cf-connecting-ip` / `x-forwarded-for` instead of the peer address.
    /// Only turn this on behind a proxy that overwrites those headers.
    pub trust_proxy: bool,
    pub login_burst: u32,
    pub login_period: Duration,
    pub signup_burst: u32,
    pub signup_period: Duration,
}

/// Everything the server needs to boot, resolved once at startup.
///
/// Nothing below this struct reads the environment. The token service gets its
/// secret and TTL handed to it, the pool gets its URL handed to it, and so on.
#[derive(Debug, Clone)]
pub struct Config {
    pub env: Environment,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Silently ignores a missing .env, same as always.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    ///
    /// `from_env` is a thin wrapper around this. Tests feed it a HashMap so they
    /// don't have to fight over process-wide env vars.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV").as_deref() {
            None | Some("local") => Environment::Local,
            Some("dev") => Environment::Dev,
            Some("prod") => Environment::Prod,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    value: other.to_string(),
                });
            }
        };

        // 1. HTTP
        // HTTP_ADDRESS wins. PORT alone is honoured because most hosting platforms only set that.
        let address = match lookup("HTTP_ADDRESS") {
            Some(addr) => parse_value("HTTP_ADDRESS", &addr)?,
            None => {
                let port: u16 = match lookup("PORT") {
                    Some(p) => parse_value("PORT", &p)?,
                    None => 8080,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };
        let timeout_secs: u64 = parse_non_zero(&lookup, "HTTP_TIMEOUT_SECS", 4)?;

        // 2. Database
        let url = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => url,
            _ => compose_database_url(&lookup)?,
        };
        let max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        // 3. Auth
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let ttl_hours: u64 = parse_non_zero(&lookup, "TOKEN_TTL_HOURS", 12)?;
        let ttl_secs = ttl_hours
            .checked_mul(60 * 60)
            .ok_or_else(|| ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            })?;

        // 4. Rate limiting
        let rate_limit = RateLimitConfig {
            enabled: parse_or(&lookup, "RATE_LIMIT_ENABLED", true)?,
            trust_proxy: parse_or(&lookup, "RATE_LIMIT_TRUST_PROXY", false)?,
            login_burst: parse_non_zero(&lookup, "RATE_LIMIT_LOGIN_BURST", 5)?,
            login_period: Duration::from_secs(parse_non_zero(
                &lookup,
                "RATE_LIMIT_LOGIN_PERIOD_SECS",
                180,
            )?),
            signup_burst: parse_non_zero(&lookup, "RATE_LIMIT_SIGNUP_BURST", 10)?,
            signup_period: Duration::from_secs(parse_non_zero(
                &lookup,
                "RATE_LIMIT_SIGNUP_PERIOD_SECS",
                360,
            )?),
        };

        Ok(Self {
            env,
            http: HttpConfig {
                address,
                timeout: Duration::from_secs(timeout_secs),
            },
            database: DatabaseConfig {
                url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl: Duration::from_secs(ttl_secs),
            },
            rate_limit,
        })
    }
}

/// Assembles a Postgres DSN from the discrete DB_* variables.
fn compose_database_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let user = lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let name = lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let password = lookup("DB_PASSWORD").ok_or(ConfigError::Missing("DB_PASSWORD"))?;

    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_non_zero<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialEq + Default,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        });
    }
    Ok(value)
}
