use clap::Parser;

/// Afterglow: a progressive post-processing viewer for a demo scene.
#[derive(Parser, Debug)]
#[command(name = "afterglow", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Initial window width in physical pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in physical pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["afterglow"]);
        assert_eq!(args.width, 1280);
        assert_eq!(args.height, 800);
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());
    }

    #[test]
    fn overrides() {
        let args = Args::parse_from([
            "afterglow",
            "--config",
            "/tmp/a.toml",
            "--log-level",
            "debug",
            "--width",
            "640",
            "--height",
            "480",
        ]);
        assert_eq!(args.config.as_deref(), Some("/tmp/a.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!((args.width, args.height), (640, 480));
    }
}
