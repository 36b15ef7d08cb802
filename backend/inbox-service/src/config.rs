use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    /// Trailing window inside which identical notifications collapse.
    pub notification_dedup_window_secs: u64,
    /// Story lifetime from creation to expiry.
    pub story_ttl_hours: u64,
    /// Cadence of the background expiry sweep.
    pub story_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let notification_dedup_window_secs = env::var("NOTIFICATION_DEDUP_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);
        let story_ttl_hours = env::var("STORY_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);
        let story_sweep_interval_secs = env::var("STORY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            database_url,
            database_max_connections,
            port,
            notification_dedup_window_secs,
            story_ttl_hours,
            story_sweep_interval_secs,
        })
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.notification_dedup_window_secs as i64)
    }

    pub fn story_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.story_ttl_hours as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.story_sweep_interval_secs)
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            database_max_connections: 5,
            port: 3000,
            notification_dedup_window_secs: 3600,
            story_ttl_hours: 24,
            story_sweep_interval_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_helpers_match_raw_values() {
        let cfg = Config::test_defaults();
        assert_eq!(cfg.dedup_window(), chrono::Duration::hours(1));
        assert_eq!(cfg.story_ttl(), chrono::Duration::hours(24));
        assert_eq!(cfg.sweep_interval().as_secs(), 300);
    }
}
