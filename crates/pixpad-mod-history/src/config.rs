/// Configuration for the history system.
use pixpad_config::AppConfig;

/// Default undo stream size, in bytes, before the oldest groups are dropped.
const DEFAULT_RETENTION_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Max total byte size of the undo stream.
    pub retention_limit: usize,
    /// Whether recording starts enabled.
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_limit: DEFAULT_RETENTION_LIMIT,
            enabled: true,
        }
    }
}

impl From<&AppConfig> for HistoryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            retention_limit: config.undo_size_limit_bytes(),
            enabled: config.undo_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.retention_limit, 8 * 1024 * 1024);
        assert!(config.enabled);
    }

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.undo_size_limit_mb = 2;
        app.undo_enabled = false;
        let config = HistoryConfig::from(&app);
        assert_eq!(config.retention_limit, 2 * 1024 * 1024);
        assert!(!config.enabled);
    }
}
