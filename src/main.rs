use anyhow::{Context, Result};
use clap::Parser;
use scholar_digest::config::{find_config_file, load_config, Config, LoggingConfig, OutputFormat};
use scholar_digest::digest::{list_labels, run};
use scholar_digest::sources::GmailSource;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LONG_ABOUT: &str = "\
Polls the Gmail API for unread Google Scholar alert messages under a given label,
aggregates them by paper title and prints a list of paper URLs in Markdown format.

The --labels flag will only list all available labels for the current account.
The --html flag will produce the report in HTML format.
The --mark flag will mark all the aggregated emails as read in Gmail.";

/// Scholar Digest - Aggregate unread Google Scholar alerts into one report
#[derive(Parser, Debug)]
#[command(name = "scholar-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate unread Google Scholar alert emails into a paper digest", long_about = LONG_ABOUT)]
struct Cli {
    /// Name of the Gmail label to poll
    #[arg(short = 'l', long, env = "SAD_LABEL")]
    label: Option<String>,

    /// List all Gmail labels and exit
    #[arg(long)]
    labels: bool,

    /// Output the report in HTML (instead of default Markdown)
    #[arg(long)]
    html: bool,

    /// Mark all aggregated emails as read
    #[arg(long)]
    mark: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(label) = &self.label {
            config.gmail.label = label.clone();
        }
        if self.html {
            config.report.format = OutputFormat::Html;
        }
        if self.mark {
            config.report.mark_read = true;
        }
        config
    }

    fn log_level<'a>(&self, logging: &'a LoggingConfig) -> &'a str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Logs go to stderr; stdout carries the report
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| format!("scholar_digest={}", cli.log_level(logging))),
    );
    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.format.as_deref() == Some("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Unable to load configuration from {}", path.display()),
        None => "Unable to load configuration".to_string(),
    })?;
    let config = cli.apply(config);

    init_logging(&cli, &config.logging);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let source = GmailSource::new(&config.gmail).context("Unable to create a Gmail client")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.labels {
        list_labels(&source, &mut out).await?;
        return Ok(());
    }

    let summary = run(&source, &config, &mut out).await?;
    if summary.error_count != 0 {
        tracing::warn!("Errors: {}", summary.error_count);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_digest::config::DEFAULT_LABEL;
    use std::sync::{Mutex, MutexGuard};

    // Serializes tests that depend on SAD_LABEL
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let _guard = env_lock();
        std::env::remove_var("SAD_LABEL");
        let cli = Cli::parse_from(["scholar-digest"]);
        assert!(!cli.labels);
        assert!(!cli.html);
        assert!(!cli.mark);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.label.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["scholar-digest", "--html", "--mark", "-l", "my-alerts"]);
        assert!(cli.html);
        assert!(cli.mark);
        assert_eq!(cli.label.as_deref(), Some("my-alerts"));

        let cli = Cli::parse_from(["scholar-digest", "--labels"]);
        assert!(cli.labels);
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["scholar-digest", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(&LoggingConfig::default()), "trace");

        let cli = Cli::parse_from(["scholar-digest", "-q", "-v"]);
        assert_eq!(cli.log_level(&LoggingConfig::default()), "error");
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["scholar-digest", "--html", "--mark", "--label", "other"]);
        let config = cli.apply(Config::default());

        assert_eq!(config.gmail.label, "other");
        assert_eq!(config.report.format, OutputFormat::Html);
        assert!(config.report.mark_read);
    }

    #[test]
    fn test_cli_keeps_config_without_flags() {
        let _guard = env_lock();
        std::env::remove_var("SAD_LABEL");
        let cli = Cli::parse_from(["scholar-digest"]);
        let mut file_config = Config::default();
        file_config.report.format = OutputFormat::Html;

        let config = cli.apply(file_config);
        assert_eq!(config.report.format, OutputFormat::Html);
        assert_eq!(config.gmail.label, DEFAULT_LABEL);
    }

    #[test]
    fn test_sad_label_env() {
        let _guard = env_lock();
        std::env::set_var("SAD_LABEL", "from-env");
        let from_env = Cli::try_parse_from(["scholar-digest"]);
        let with_flag = Cli::try_parse_from(["scholar-digest", "-l", "from-flag"]);
        std::env::remove_var("SAD_LABEL");

        let mut file_config = Config::default();
        file_config.gmail.label = "from-file".to_string();

        let config = from_env.unwrap().apply(file_config.clone());
        assert_eq!(config.gmail.label, "from-env");

        let config = with_flag.unwrap().apply(file_config);
        assert_eq!(config.gmail.label, "from-flag");
    }
}
