use std::path::PathBuf;

pub const DEFAULT_CHANNEL: &str = "WEB";
pub const DEFAULT_LOCALE: &str = "en_US";

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub channel_code: String,
    pub locale_code: String,
    /// RocksDB directory; in-memory storage when absent.
    pub db_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            channel_code: DEFAULT_CHANNEL.to_string(),
            locale_code: DEFAULT_LOCALE.to_string(),
            db_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            channel_code: std::env::var("PAYREQ_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_CHANNEL.to_string()),
            locale_code: std::env::var("PAYREQ_LOCALE")
                .unwrap_or_else(|_| DEFAULT_LOCALE.to_string()),
            db_path: std::env::var_os("PAYREQ_DB_PATH").map(PathBuf::from),
        }
    }

    /// Overlays explicitly given values (command line flags) on top of `self`.
    pub fn with_overrides(
        mut self,
        channel_code: Option<String>,
        locale_code: Option<String>,
        db_path: Option<PathBuf>,
    ) -> Self {
        if let Some(channel_code) = channel_code {
            self.channel_code = channel_code;
        }
        if let Some(locale_code) = locale_code {
            self.locale_code = locale_code;
        }
        if db_path.is_some() {
            self.db_path = db_path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let config = AppConfig::default().with_overrides(
            Some("MOBILE".into()),
            None,
            Some(PathBuf::from("/tmp/payreq")),
        );

        assert_eq!(config.channel_code, "MOBILE");
        assert_eq!(config.locale_code, DEFAULT_LOCALE);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/payreq")));
    }
}
