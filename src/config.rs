use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "BIORREACTOR";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Connection string of the persistent store. There is no default: the
    /// server refuses to start without it.
    pub database_url: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA zone timestamps are rendered in
    #[serde(default = "default_display_time_zone")]
    pub display_time_zone: String,

    /// Partition emptied by the reset endpoint
    #[serde(default = "default_partition")]
    pub default_partition: String,

    /// Prefix that marks a partition as a domain
    #[serde(default = "default_domain_prefix")]
    pub domain_prefix: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_display_time_zone() -> String {
    "America/Santiago".to_string()
}

fn default_partition() -> String {
    "datos".to_string()
}

fn default_domain_prefix() -> String {
    "dominio_".to_string()
}

/// Settings the request handlers need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub time_zone: Tz,
    pub default_partition: String,
    pub domain_prefix: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            time_zone: chrono_tz::America::Santiago,
            default_partition: default_partition(),
            domain_prefix: default_domain_prefix(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    pub fn app_settings(&self) -> Result<AppSettings, ConfigError> {
        let time_zone = self
            .display_time_zone
            .parse::<Tz>()
            .map_err(|err| ConfigError::Message(format!("invalid display_time_zone: {}", err)))?;

        Ok(AppSettings {
            time_zone,
            default_partition: self.default_partition.clone(),
            domain_prefix: self.domain_prefix.clone(),
        })
    }
}
