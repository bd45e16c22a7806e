//! Command-line interface definitions for the relay.
//!
//! Everything else is read from the configuration file; the flags here only
//! choose that file and override a few values for one-off runs.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the relay.
///
/// # Examples
///
/// ```sh
/// # Poll forever using ./config.json
/// newsmap_relay
///
/// # Print the payload for the current latest post without sending it
/// newsmap_relay --once --dry-run
///
/// # YAML config, webhook from the environment
/// WEBHOOK_URL=https://discord.com/api/webhooks/... newsmap_relay -c relay.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON or YAML configuration file
    #[arg(short, long, env = "NEWSMAP_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Override the webhook URL from the configuration file
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Override the list page URL
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Print the webhook payload instead of sending it; the cursor is left untouched
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["newsmap_relay"]);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(!cli.once);
        assert!(!cli.dry_run);
        assert_eq!(cli.feed_url, None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "newsmap_relay",
            "-c",
            "/etc/relay.yaml",
            "--once",
            "--dry-run",
            "--feed-url",
            "http://localhost:8080/",
            "--webhook-url",
            "https://example.com/hook",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/relay.yaml"));
        assert!(cli.once);
        assert!(cli.dry_run);
        assert_eq!(cli.feed_url.as_deref(), Some("http://localhost:8080/"));
        assert_eq!(cli.webhook_url.as_deref(), Some("https://example.com/hook"));
    }
}
