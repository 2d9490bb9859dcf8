#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy(),
        )
        .compact()
        .init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Run(args) => (*args).run().await?,
        Command::Burrow(args) => (*args).run().await?,
    }

    info!("done!");
    Ok(())
}
