use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Which persistence backend the stores talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

/// Which notifier variant is active for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Email,
    Sms,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub notification_channel: NotificationChannel,
    pub notification_gateway_url: Option<String>,
    pub notification_timeout_secs: u64,
    pub report_output_dir: PathBuf,
    pub server_port: u16,
    pub request_timeout_secs: u64,
    pub store_retry_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_anon_key: var_or_empty("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: var_or_empty("SUPABASE_JWT_SECRET"),
            storage_backend: match env::var("STORAGE_BACKEND").as_deref() {
                Ok("supabase") => StorageBackend::Supabase,
                Ok("memory") => StorageBackend::Memory,
                Ok(other) => {
                    warn!("Unknown STORAGE_BACKEND '{}', using in-memory stores", other);
                    StorageBackend::Memory
                }
                Err(_) => {
                    warn!("STORAGE_BACKEND not set, using in-memory stores");
                    StorageBackend::Memory
                }
            },
            notification_channel: match env::var("NOTIFICATION_CHANNEL").as_deref() {
                Ok("sms") => NotificationChannel::Sms,
                Ok("email") | Err(_) => NotificationChannel::Email,
                Ok(other) => {
                    warn!("Unknown NOTIFICATION_CHANNEL '{}', using email", other);
                    NotificationChannel::Email
                }
            },
            notification_gateway_url: env::var("NOTIFICATION_GATEWAY_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            notification_timeout_secs: parse_or_default("NOTIFICATION_TIMEOUT_SECS", 10),
            report_output_dir: env::var("REPORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            server_port: parse_or_default("SERVER_PORT", 3000),
            request_timeout_secs: parse_or_default("REQUEST_TIMEOUT_SECS", 30),
            store_retry_attempts: parse_or_default("STORE_RETRY_ATTEMPTS", 3),
        };

        if !config.is_configured() {
            warn!("Configuration incomplete; protected routes will reject every token");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let jwt_ready = !self.supabase_jwt_secret.is_empty();
        match self.storage_backend {
            StorageBackend::Memory => jwt_ready,
            StorageBackend::Supabase => {
                jwt_ready && !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
        }
    }
}

fn var_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
