use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Switchboard LLM gateway
#[derive(Debug, Parser)]
#[command(name = "switchboard", about = "Chat gateway for Forge, Ollama, OpenAI, Anthropic and N2")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchboard.toml", env = "SWITCHBOARD_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "SWITCHBOARD_LISTEN")]
    pub listen: Option<SocketAddr>,
}
