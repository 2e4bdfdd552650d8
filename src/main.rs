// Copyright 2024 the doorsync authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod applier;
mod atomic_file;
mod calendar_client;
mod config;
mod controller_client;
mod dashboard_api;
mod errors;
mod model;
mod orchestrator;
mod schedule_builder;
mod scheduler;
mod stores;
mod time_window;
mod weekday;

use crate::{config::Config, orchestrator::Orchestrator, scheduler::Scheduler};
use clap::{Parser, Subcommand};
use eyre::Report;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// If no command is specified, runs the long-lived scheduler and serves
    /// the dashboard's core API.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Runs a single sync cycle and prints the resulting status snapshot.
    RunOnce,
    /// Prints the status snapshot from the most recently completed cycle.
    Status,
    /// Toggles whether a cycle's schedule is actually pushed to the
    /// controller.
    SetApplyMode {
        #[arg(value_parser = clap::value_parser!(bool))]
        apply_to_unifi: bool,
    },
    /// Prints the live upcoming-events preview without running a cycle.
    Preview,
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    stable_eyre::install()?;
    pretty_env_logger::init();
    color_backtrace::install();

    let args = Args::parse();
    match &args.command {
        None => serve().await,
        Some(Command::RunOnce) => run_once().await,
        Some(Command::Status) => status().await,
        Some(Command::SetApplyMode { apply_to_unifi }) => set_apply_mode(*apply_to_unifi).await,
        Some(Command::Preview) => preview().await,
    }
}

async fn run_once() -> Result<(), Report> {
    let orchestrator = Orchestrator::new(Config::from_env()?)?;
    orchestrator.run_once().await?;
    print_snapshot(&orchestrator.snapshot())
}

async fn status() -> Result<(), Report> {
    let orchestrator = Orchestrator::new(Config::from_env()?)?;
    print_snapshot(&orchestrator.snapshot())
}

async fn set_apply_mode(apply_to_unifi: bool) -> Result<(), Report> {
    let orchestrator = Orchestrator::new(Config::from_env()?)?;
    orchestrator.set_apply_mode(apply_to_unifi).await?;
    println!("apply_to_unifi set to {apply_to_unifi}");
    Ok(())
}

async fn preview() -> Result<(), Report> {
    let orchestrator = Orchestrator::new(Config::from_env()?)?;
    let items = orchestrator.get_upcoming_preview().await?;
    print!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn print_snapshot(snapshot: &crate::model::snapshot::StatusSnapshot) -> Result<(), Report> {
    print!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Runs the long-lived process (C12, §4.12): spawns the scheduler, then
/// serves the dashboard's core API until the process is killed.
async fn serve() -> Result<(), Report> {
    let config = Config::from_env()?;
    let dashboard_bind_address = config.dashboard_bind_address;
    let config = Arc::new(config);
    let orchestrator = Arc::new(Orchestrator::new((*config).clone())?);
    let scheduler = Arc::new(Scheduler::new(orchestrator.clone()));
    scheduler.spawn(&config)?;

    let app = dashboard_api::router(dashboard_api::ApiState {
        orchestrator,
        scheduler,
        config: config.clone(),
    });

    info!("Listening on {dashboard_bind_address}");
    let listener = TcpListener::bind(dashboard_bind_address).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
