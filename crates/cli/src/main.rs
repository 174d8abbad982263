// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overseer CLI (ov)
//!
//! Thin front-end over the orchestrator core: run ticks, publish status,
//! append caller-built events, and validate inbound actor messages.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ov_adapters::{DesktopNotifyAdapter, GatewayCliWorker};
use ov_core::{Event, SystemClock, UuidV7Gen};
use ov_engine::{Config, Orchestrator};

#[derive(Parser)]
#[command(name = "ov", version, about = "Durable event-sourced orchestrator for agent teams")]
struct Cli {
    /// Project base directory
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    /// Gateway CLI used to spawn worker sessions
    #[arg(long, global = true, default_value = "openclaw")]
    gateway: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one reconciliation tick and publish status.json
    Tick,
    /// Run ticks forever at a fixed interval
    Loop {
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
    /// Print the published status.json
    Status,
    /// Replay the event log and publish a fresh status.json
    Reduce,
    /// Append an event (JSON) from a file, or stdin with `-`
    Append {
        #[arg(default_value = "-")]
        file: String,
    },
    /// Validate an inbound actor message against the run lock
    Message {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        run: Option<String>,
        #[arg(long)]
        message_type: String,
    },
    /// Print skill suggestions for tasks awaiting a decision
    Skills,
}

fn orchestrator(
    cli: &Cli,
) -> Orchestrator<SystemClock, UuidV7Gen, GatewayCliWorker, DesktopNotifyAdapter> {
    Orchestrator::new(
        Config::load(&cli.base_dir),
        SystemClock,
        UuidV7Gen::new("e"),
        UuidV7Gen::new("r"),
        GatewayCliWorker::new(cli.gateway.clone()),
        DesktopNotifyAdapter::new(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Tick => {
            let orchestrator = orchestrator(&cli);
            let replay = orchestrator.tick().await.context("tick failed")?;
            println!("{}", serde_json::to_string_pretty(&replay.status)?);
        }
        Command::Loop { interval_secs } => {
            let orchestrator = orchestrator(&cli);
            orchestrator
                .run_loop(Duration::from_secs(*interval_secs))
                .await;
        }
        Command::Status => {
            let orchestrator = orchestrator(&cli);
            let path = orchestrator.layout().status_path();
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("no status at {}", path.display()))?;
            println!("{}", raw.trim_end());
        }
        Command::Reduce => {
            let orchestrator = orchestrator(&cli);
            let replay = ov_engine::reduce(orchestrator.layout(), &SystemClock, true)?;
            orchestrator.state().write_status(&replay.status)?;
            if !replay.corrupted.is_empty() {
                eprintln!("{} corrupted line(s) excluded", replay.corrupted.len());
            }
            println!("{}", serde_json::to_string_pretty(&replay.status)?);
        }
        Command::Append { file } => {
            let raw = if file == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(file).with_context(|| format!("reading {file}"))?
            };
            let event: Event = serde_json::from_str(&raw).context("parsing event JSON")?;
            let orchestrator = orchestrator(&cli);
            match orchestrator.state().append_event(event)?.event() {
                Some(appended) => {
                    println!("appended (seq {})", appended.sequence_number.unwrap_or(0))
                }
                None => println!("deduped"),
            }
        }
        Command::Message {
            actor,
            task,
            run,
            message_type,
        } => {
            let orchestrator = orchestrator(&cli);
            let accepted = orchestrator.validate_message(
                actor,
                task.as_deref(),
                run.as_deref(),
                message_type,
            )?;
            if !accepted {
                bail!("message rejected: run is not the locked run for this task");
            }
            println!("accepted");
        }
        Command::Skills => {
            let orchestrator = orchestrator(&cli);
            let replay = ov_engine::reduce(orchestrator.layout(), &SystemClock, false)?;
            for prompt in orchestrator.suggest_skills(&replay.status) {
                println!("{prompt}\n");
            }
        }
    }
    Ok(())
}
