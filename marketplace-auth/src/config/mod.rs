use reqwest::Url;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Public origin of the web application, e.g. `https://marketplace.example.ca`.
    pub origin: String,
    pub keycloak: KeycloakConfig,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl MarketplaceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = MarketplaceConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("marketplace-auth"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            origin: get_env("ORIGIN", Some("http://localhost:3000"), is_prod)?,
            keycloak: KeycloakConfig {
                url: get_env("KEYCLOAK_URL", None, is_prod)?,
                realm: get_env("KEYCLOAK_REALM", None, is_prod)?,
                client_id: get_env("KEYCLOAK_CLIENT_ID", None, is_prod)?,
                client_secret: get_env("KEYCLOAK_CLIENT_SECRET", None, is_prod)?,
                token_timeout_seconds: parse_env(
                    "KEYCLOAK_TOKEN_TIMEOUT_SECONDS",
                    Some("10"),
                    is_prod,
                )?,
            },
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            smtp: {
                let enabled: bool = parse_env("SMTP_ENABLED", Some("false"), false)?;
                // Mail settings are only mandatory once mail is switched on.
                let required = is_prod && enabled;
                SmtpConfig {
                    enabled,
                    host: get_env("SMTP_HOST", Some("localhost"), required)?,
                    port: parse_env("SMTP_PORT", Some("587"), required)?,
                    user: get_env("SMTP_USER", Some(""), required)?,
                    password: get_env("SMTP_PASSWORD", Some(""), required)?,
                    from_email: get_env(
                        "SMTP_FROM_EMAIL",
                        Some("noreply@marketplace.local"),
                        required,
                    )?,
                    from_name: get_env("SMTP_FROM_NAME", Some("Digital Marketplace"), required)?,
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let origin = parse_http_url("ORIGIN", &self.origin)?;
        parse_http_url("KEYCLOAK_URL", &self.keycloak.url)?;

        if self.keycloak.realm.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "KEYCLOAK_REALM must not be empty"
            )));
        }

        if self.keycloak.client_id.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "KEYCLOAK_CLIENT_ID must not be empty"
            )));
        }

        if self.keycloak.token_timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "KEYCLOAK_TOKEN_TIMEOUT_SECONDS must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod && origin.scheme() != "https" {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ORIGIN must use https in production"
            )));
        }

        Ok(())
    }

    /// Origin without a trailing slash, ready for path concatenation.
    pub fn origin(&self) -> &str {
        self.origin.trim_end_matches('/')
    }

    pub fn secure_cookies(&self) -> bool {
        self.origin.starts_with("https://")
    }
}

fn parse_http_url(key: &str, value: &str) -> Result<Url, AppError> {
    let url = Url::parse(value)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} is not a valid URL: {}", key, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be an http(s) URL, got scheme '{}'",
            key,
            other
        ))),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
