//! Command line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// FusionStore: an S3-compatible gateway over heterogeneous object stores.
#[derive(Parser)]
#[command(name = "fusion")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a gateway backend.
    Gateway {
        /// The gateway backend to run.
        #[command(subcommand)]
        backend: GatewayBackend,
    },
    /// Print version information.
    Version,
}

/// Gateway backends.
#[derive(Subcommand)]
pub enum GatewayBackend {
    /// The FusionStore multi-vendor gateway.
    Fusion(FusionArgs),
}

/// Arguments for the fusion gateway.
#[derive(Args)]
pub struct FusionArgs {
    /// Address the S3 frontend listens on.
    #[arg(long)]
    pub address: SocketAddr,

    /// Address of the management service, host:port.
    #[arg(long)]
    pub mgs: String,

    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["fusion", "version"]);
        assert!(matches!(cli.command, Commands::Version));

        let cli = Cli::parse_from([
            "fusion",
            "gateway",
            "fusion",
            "--address",
            "0.0.0.0:9000",
            "--mgs",
            "10.0.0.5:8000",
        ]);
        let Commands::Gateway { backend: GatewayBackend::Fusion(args) } = cli.command else {
            panic!("expected the fusion gateway command");
        };
        assert_eq!(args.address.port(), 9000);
        assert_eq!(args.mgs, "10.0.0.5:8000");
        assert!(args.config.is_none());
    }

    #[test]
    fn test_mandatory_flags() {
        assert!(Cli::try_parse_from(["fusion", "gateway", "fusion"]).is_err());
        assert!(Cli::try_parse_from([
            "fusion",
            "gateway",
            "fusion",
            "--address",
            "0.0.0.0:9000"
        ])
        .is_err());
    }
}
