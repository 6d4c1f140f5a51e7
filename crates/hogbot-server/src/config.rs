use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Parser, Debug, Clone)]
#[command(name = "hogbot")]
#[command(version, about = "PostHog Discord Bot - substring triggered auto-replies")]
pub struct Cli {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Port for the health check server
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bind address for the health check server
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Trigger configuration file
    #[arg(long, env = "HOGBOT_TRIGGERS", default_value = hogbot_core::DEFAULT_TRIGGERS_PATH)]
    pub triggers: PathBuf,

    /// Validate the trigger configuration and exit
    #[arg(long)]
    pub check: bool,
}

/// Resolved settings for a bot run
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub token: String,
    pub host: String,
    pub port: u16,
    pub triggers_path: PathBuf,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let token = cli
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("DISCORD_TOKEN environment variable is not set!"))?;

        Ok(Self {
            token: token.to_string(),
            host: cli.host.clone(),
            port: cli.port,
            triggers_path: cli.triggers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(token: Option<&str>) -> Cli {
        Cli {
            token: token.map(str::to_string),
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            triggers: PathBuf::from(hogbot_core::DEFAULT_TRIGGERS_PATH),
            check: false,
        }
    }

    #[test]
    fn test_config_from_cli() {
        let config = ServerConfig::from_cli(&cli(Some("secret"))).unwrap();
        assert_eq!(config.token, "secret");
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.triggers_path, PathBuf::from("config/triggers.json"));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = ServerConfig::from_cli(&cli(None)).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_blank_token_is_an_error() {
        assert!(ServerConfig::from_cli(&cli(Some("   "))).is_err());
    }

    #[test]
    fn test_token_is_trimmed() {
        let config = ServerConfig::from_cli(&cli(Some(" abc \n"))).unwrap();
        assert_eq!(config.token, "abc");
    }

    #[test]
    fn test_explicit_arguments_parse() {
        let cli = Cli::try_parse_from([
            "hogbot",
            "--token",
            "abc",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--triggers",
            "/etc/hogbot/triggers.json",
            "--check",
        ])
        .unwrap();
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.triggers, PathBuf::from("/etc/hogbot/triggers.json"));
        assert!(cli.check);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["hogbot", "--port", "not-a-port"]).is_err());
    }
}
