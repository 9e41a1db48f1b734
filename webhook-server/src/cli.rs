use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use webhook_core::{
    Config, Fulfiller, IntentRequest, LocationParam, MatchPolicy, providers_from_config,
};

use crate::server::{self, AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-webhook", version, about = "Weather and website fulfillment webhook")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP webhook server.
    Serve {
        /// Port to listen on; overrides `PORT` and the config file.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Interactively edit the configuration file.
    Configure,

    /// Run a single fulfillment against the live services and print the answer.
    Ask {
        /// Intent name, e.g. "get_weather" or "get_website_info".
        intent: String,

        /// Location parameter passed with the intent.
        #[arg(long)]
        location: Option<String>,

        /// The user's utterance, used to match website paragraphs.
        #[arg(long)]
        text: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;

        match self.command {
            Command::Serve { port } => {
                let port = config.resolve_port(port, std::env::var("PORT").ok().as_deref());
                let state = AppState {
                    fulfiller: Arc::new(build_fulfiller(&config)?),
                };
                server::serve(state, port).await?;
            }
            Command::Configure => {
                let config = configure(config)?;
                let path = match &self.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("Configuration saved to {}", path.display());
            }
            Command::Ask {
                intent,
                location,
                text,
            } => {
                let fulfiller = build_fulfiller(&config)?;
                let request = IntentRequest::new(&intent, location.map(LocationParam::Name), text);
                let response = fulfiller.fulfill(&request).await;
                println!("{}", response.fulfillment_text);
            }
        }

        Ok(())
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

fn build_fulfiller(config: &Config) -> anyhow::Result<Fulfiller> {
    let providers = providers_from_config(config).context("Failed to set up HTTP clients")?;
    Ok(Fulfiller::new(config, providers))
}

/// Prompt for the settings an operator is likely to change.
fn configure(mut config: Config) -> anyhow::Result<Config> {
    let port = CustomType::<u16>::new("Port:")
        .with_default(config.resolve_port(None, None))
        .with_error_message("Please enter a port number between 0 and 65535")
        .prompt()?;
    config.port = Some(port);

    config.website.url = Text::new("Website URL:")
        .with_default(&config.website.url)
        .prompt()?;

    let policies: Vec<MatchPolicy> = MatchPolicy::all().to_vec();
    let start = policies
        .iter()
        .position(|p| *p == config.website.policy)
        .unwrap_or_default();
    config.website.policy = Select::new("Paragraph matching policy:", policies)
        .with_starting_cursor(start)
        .prompt()?;

    config.timeouts.request_secs = CustomType::<u64>::new("Outbound request timeout (seconds):")
        .with_default(config.timeouts.request_secs)
        .prompt()?;

    Ok(config)
}
