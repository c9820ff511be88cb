#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod config;
mod core;
mod export;
mod load;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, allocate, rates},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Allocate(args) => allocate(&args)?,
        Command::Rates(args) => rates(&args)?,
    }

    info!("done!");
    Ok(())
}
