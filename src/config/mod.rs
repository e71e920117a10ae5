use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub event: EventConfig,
    pub tracking: TrackingConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub upload_dir: String,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Offset of the venue clock, used for "today", day and hour buckets
    pub utc_offset_seconds: i32,
    pub default_church: String,
    pub churches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub scan_debounce_secs: i64,
    pub count_debounce_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub return_url: String,
    pub completion_url: String,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
}

impl EventConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(v) = env::var("EKKLESIA_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.api.upload_dir = v;
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.api.cors_origins = split_list(&v);
        }

        // Event overrides
        if let Some(start) = env::var("EVENT_START").ok().and_then(|v| parse_instant(&v)) {
            self.event.window_start = start;
        }
        if let Some(end) = env::var("EVENT_END").ok().and_then(|v| parse_instant(&v)) {
            self.event.window_end = end;
        }
        if let Some(offset) = env::var("EVENT_UTC_OFFSET").ok().and_then(|v| parse_offset(&v)) {
            self.event.utc_offset_seconds = offset;
        }
        if let Ok(v) = env::var("EVENT_DEFAULT_CHURCH") {
            self.event.default_church = v;
        }
        if let Ok(v) = env::var("EVENT_CHURCHES") {
            self.event.churches = split_list(&v);
        }

        // Tracking overrides
        if let Ok(v) = env::var("TRACKING_SCAN_DEBOUNCE_SECS") {
            self.tracking.scan_debounce_secs = v.parse().unwrap_or(self.tracking.scan_debounce_secs);
        }
        if let Ok(v) = env::var("TRACKING_COUNT_DEBOUNCE_MS") {
            self.tracking.count_debounce_ms = v.parse().unwrap_or(self.tracking.count_debounce_ms);
        }

        // Payment gateway overrides
        if let Ok(v) = env::var("ABACATEPAY_BASE_URL") {
            self.payment.base_url = v;
        }
        if let Ok(v) = env::var("ABACATEPAY_API_KEY") {
            self.payment.api_key = Some(v).filter(|k| !k.trim().is_empty());
        }
        if let Ok(v) = env::var("ABACATEPAY_TIMEOUT_SECS") {
            self.payment.timeout_secs = v.parse().unwrap_or(self.payment.timeout_secs);
        }
        if let Ok(v) = env::var("ABACATEPAY_RETURN_URL") {
            self.payment.return_url = v;
        }
        if let Ok(v) = env::var("ABACATEPAY_COMPLETION_URL") {
            self.payment.completion_url = v;
        }
        if let Ok(v) = env::var("ABACATEPAY_WEBHOOK_SECRET") {
            self.payment.webhook_secret = Some(v).filter(|s| !s.trim().is_empty());
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3001,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                upload_dir: "uploads".to_string(),
                cors_origins: Vec::new(),
            },
            event: EventConfig::default_window(),
            tracking: TrackingConfig::default(),
            payment: PaymentConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3001,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                upload_dir: "uploads".to_string(),
                cors_origins: Vec::new(),
            },
            event: EventConfig::default_window(),
            tracking: TrackingConfig::default(),
            payment: PaymentConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3001,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                upload_dir: "uploads".to_string(),
                cors_origins: Vec::new(),
            },
            event: EventConfig::default_window(),
            tracking: TrackingConfig::default(),
            payment: PaymentConfig::default(),
        }
    }
}

impl EventConfig {
    fn default_window() -> Self {
        Self {
            window_start: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            window_end: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).single().unwrap_or_default(),
            utc_offset_seconds: -3 * 3600,
            default_church: "Ibmg Sede".to_string(),
            churches: [
                "Ibmg Alphaville",
                "Ibmg Orlando",
                "Ibmg Sede",
                "Ibmg Santa Maria",
                "Ibmg Caldas",
                "Outra",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            scan_debounce_secs: 60,
            count_debounce_ms: 500,
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.abacatepay.com/v1".to_string(),
            api_key: None,
            timeout_secs: 15,
            return_url: "https://ibmg-three.vercel.app/ekklesia".to_string(),
            completion_url: "https://ibmg-three.vercel.app/ekklesia".to_string(),
            webhook_secret: None,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accepts RFC 3339 instants or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parses `-03:00`, `+0530` or `-3` into seconds east of UTC
pub fn parse_offset(value: &str) -> Option<i32> {
    let value = value.trim();
    let (sign, rest) = match value.chars().next()? {
        '-' => (-1, &value[1..]),
        '+' => (1, &value[1..]),
        _ => (1, value),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None if rest.len() == 4 && rest.is_ascii() => (rest[..2].parse().ok()?, rest[2..].parse().ok()?),
        None => (rest.parse().ok()?, 0),
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.database.run_migrations);
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.tracking.scan_debounce_secs, 60);
        assert_eq!(config.tracking.count_debounce_ms, 500);
        assert_eq!(config.event.utc_offset_seconds, -10800);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.database.run_migrations);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.payment.timeout_secs, 15);
    }

    #[test]
    fn event_window_covers_2026() {
        let event = EventConfig::default_window();
        assert!(event.window_start < event.window_end);
        assert_eq!(event.window_start.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(event.churches.contains(&"Ibmg Sede".to_string()));
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("-03:00"), Some(-10800));
        assert_eq!(parse_offset("+0530"), Some(19800));
        assert_eq!(parse_offset("-3"), Some(-10800));
        assert_eq!(parse_offset("0"), Some(0));
        assert_eq!(parse_offset("+25:00"), None);
        assert_eq!(parse_offset("abc"), None);
    }

    #[test]
    fn parses_instants() {
        let dt = parse_instant("2026-02-13").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-13T00:00:00+00:00");
        let dt = parse_instant("2026-02-13T10:00:00-03:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-13T13:00:00+00:00");
        assert!(parse_instant("13/02/2026").is_none());
    }

    #[test]
    fn splits_comma_lists() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
    }
}
