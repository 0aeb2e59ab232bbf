use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use confsite_core::{config::Config, document::UrlRewrite, pretalx};
use log::info;

#[derive(Debug, Parser)]
pub struct Arguments {
    /// the configuration file
    #[arg(long, default_value = "confsite.toml")]
    pub config: PathBuf,
    /// the file holding the Pretalx API token, overrides the configuration
    #[arg(long)]
    pub token_file: Option<PathBuf>,
    /// where to write the schedule, overrides the configuration
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Arguments::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(token_file) = args.token_file {
        config.fetch.token_file = token_file;
    }
    if let Some(output) = args.output {
        config.fetch.output = output;
    }
    let token = pretalx::read_token(&config.fetch.token_file)?;
    let document = pretalx::get(&config, &token).await?;
    info!("Writing schedule to {}", config.fetch.output.display());
    let rewrite = UrlRewrite::new(&config.fetch.insecure_prefix, &config.fetch.secure_prefix);
    document.write(&config.fetch.output, &rewrite)?;
    Ok(())
}
