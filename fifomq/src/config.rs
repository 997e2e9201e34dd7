use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 9090;

#[derive(Debug, Parser)]
#[command(name = "fifomq", version, author, about = "In-memory FIFO message queue server over HTTP")]
pub struct CliConfig {
    /// Port the HTTP server listens on
    #[arg(value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

pub struct Config {
    pub http_listen: SocketAddr,
}

impl From<CliConfig> for Config {
    fn from(cli: CliConfig) -> Self {
        Config {
            http_listen: SocketAddr::from((Ipv4Addr::LOCALHOST, cli.port)),
        }
    }
}

/// Parse the command line. An invalid port prints the usage and exits the process.
pub fn cli() -> Config {
    CliConfig::parse().into()
}
