use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

mod log;

pub(crate) use log::{LogLevel, LogStyle};

use crate::config::Config;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "graphql-ws-server", version)]
/// A GraphQL server speaking graphql-transport-ws
pub struct Args {
    /// IP address on which the server will listen for incoming connections. Defaults to 127.0.0.1:4000.
    #[arg(short, long, env = "GRAPHQL_WS_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "GRAPHQL_WS_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// Set the logging level
    #[arg(long = "log", env = "GRAPHQL_WS_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "GRAPHQL_WS_LOG_STYLE", default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,
}

pub(crate) fn parse() -> Args {
    Args::parse()
}

impl Args {
    /// Loads the configuration file, or the defaults if none was given.
    pub fn config(&self) -> anyhow::Result<Config> {
        match self.config.as_deref() {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }

    /// The command line wins over the configuration file.
    pub fn listen_address(&self, config: &Config) -> SocketAddr {
        self.listen_address
            .or(config.network.listen_address)
            .unwrap_or(([127, 0, 0, 1], 4000).into())
    }

    pub fn log_format<S>(&self) -> BoxedLayer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        let layer = tracing_subscriber::fmt::layer();

        match self.log_style {
            // for interactive terminals we provide colored output
            LogStyle::Text if atty::is(atty::Stream::Stdout) => layer.with_ansi(true).boxed(),
            // for server logs, colors are off
            LogStyle::Text => layer.with_ansi(false).boxed(),
            LogStyle::Json => layer.json().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_wins() {
        let args = Args::parse_from(["graphql-ws-server", "--listen-address", "0.0.0.0:5000", "--log", "debug"]);
        let config: Config = toml::from_str("[network]\nlisten_address = \"127.0.0.1:6000\"").unwrap();

        assert_eq!(args.listen_address(&config), "0.0.0.0:5000".parse().unwrap());
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.log_style, LogStyle::Text);
    }

    #[test]
    fn listen_address_falls_back_to_the_default() {
        let args = Args::parse_from(["graphql-ws-server"]);

        assert_eq!(
            args.listen_address(&Config::default()),
            "127.0.0.1:4000".parse::<SocketAddr>().unwrap()
        );
    }
}
