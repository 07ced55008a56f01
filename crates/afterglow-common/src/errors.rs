use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("config watch error: {0}")]
    WatchError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AfterglowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("renderer error: {0}")]
    Renderer(String),

    #[error("window error: {0}")]
    Window(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("temporal.budget = 0 is out of range".into());
        assert_eq!(
            err.to_string(),
            "config validation error: temporal.budget = 0 is out of range"
        );

        let err = ConfigError::WatchError("inotify limit reached".into());
        assert_eq!(err.to_string(), "config watch error: inotify limit reached");
    }

    #[test]
    fn afterglow_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: AfterglowError = config_err.into();
        assert!(matches!(err, AfterglowError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn afterglow_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: AfterglowError = io_err.into();
        assert!(matches!(err, AfterglowError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn afterglow_error_other_variants() {
        let err = AfterglowError::Renderer("no adapter".into());
        assert_eq!(err.to_string(), "renderer error: no adapter");

        let err = AfterglowError::Window("event loop gone".into());
        assert_eq!(err.to_string(), "window error: event loop gone");
    }
}
