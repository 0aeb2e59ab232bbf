//! This crate serves the conference website rendered from the schedule document.
//! It also exports every page as static files.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use confsite_core::config::Config;
use log::info;

mod filters;
mod freeze;
mod pdf;
mod route;
mod site;

use crate::site::Site;

#[derive(Debug, Parser)]
#[command()]
pub struct Arguments {
    /// the configuration file
    #[arg(long, default_value = "confsite.toml")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// serve the site over HTTP (default)
    Serve,
    /// write every page of the site to disk
    Freeze {
        /// the output directory, overrides the configuration
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Arguments::parse();
    let config = Config::load(&args.config)?;
    let site = Arc::new(Site::new(&config)?);
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = route::router(site);
            info!("listening on http://{}", config.site.bind);
            axum::Server::bind(&config.site.bind)
                .serve(app.into_make_service())
                .await?;
        }
        Command::Freeze { output } => {
            let output = output.unwrap_or(config.site.output_dir);
            let count = freeze::freeze(&site, &output).await?;
            info!("wrote {count} pages to {}", output.display());
        }
    }
    Ok(())
}
