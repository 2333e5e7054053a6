use crate::config::toml_config::CHAT_ROUTE;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "jarvis")]
#[command(about = "Natural-language ordering assistant for the canteen")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Menu JSON file or http(s) URL; overrides `menu.source`
    #[arg(short, long)]
    pub menu: Option<String>,

    /// Single message to answer; starts an interactive session when omitted
    #[arg(long)]
    pub message: Option<String>,

    /// Client address used for rate limiting
    #[arg(long, default_value = "127.0.0.1")]
    pub client_ip: String,

    #[arg(long, default_value = CHAT_ROUTE)]
    pub route: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("client_ip", &self.client_ip)?;
        validation::validate_non_empty_string("route", &self.route)?;
        if let Some(message) = &self.message {
            validation::validate_non_empty_string("message", message)?;
        }
        Ok(())
    }
}
