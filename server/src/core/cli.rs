use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::InfraBackendType;
use super::constants::{ENV_CONFIG, ENV_HOST, ENV_INFRA_BACKEND, ENV_PORT, ENV_REDIS_URL};

#[derive(Parser)]
#[command(name = "sentinews")]
#[command(version, about = "Market news sentiment pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Backend for the stream bus and dedup window (memory or redis)
    #[arg(long, global = true, env = ENV_INFRA_BACKEND)]
    pub infra_backend: Option<InfraBackendType>,

    /// Redis URL (required with --infra-backend redis)
    #[arg(long, global = true, env = ENV_REDIS_URL)]
    pub redis_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server and the pipeline daemon (default)
    Start,
}

/// CLI values that override file and environment configuration
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub infra_backend: Option<InfraBackendType>,
    pub redis_url: Option<String>,
}

/// Parse command-line arguments into config overrides and the command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();

    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        infra_backend: cli.infra_backend,
        redis_url: cli.redis_url,
    };

    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["sentinews"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "sentinews",
            "start",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--infra-backend",
            "redis",
            "--redis-url",
            "redis://localhost:6379",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Start)));
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.infra_backend, Some(InfraBackendType::Redis));
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        let result = Cli::try_parse_from(["sentinews", "--infra-backend", "etcd"]);
        assert!(result.is_err());
    }
}
