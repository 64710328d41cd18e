use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, AdvanceOutcome, HttpProfileService, QueueController, QueueEvent, QueueOptions,
    QueuePhase, QueueSnapshot, ReleaseOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{parse_command, SwipeCommand, HELP};

#[derive(Parser, Debug)]
#[command(name = "profile-queue", about = "Swipe through the profile queue from a terminal")]
struct Args {
    /// Settings file; defaults to ./profile_queue.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    viewer_id: Option<String>,
    #[arg(long)]
    page_size: Option<usize>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive swipe loop (default).
    Swipe,
    /// List the viewer's matches.
    Matches {
        /// Print the ids as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(base_url) = args.base_url {
        settings.api_base_url = base_url;
    }
    if let Some(viewer_id) = args.viewer_id {
        settings.viewer_id = viewer_id;
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }
    let settings = settings.finalize().context("invalid settings")?;
    let viewer = settings.viewer()?;
    let service =
        HttpProfileService::from_settings(&settings).context("failed to build http client")?;
    info!(base_url = %settings.api_base_url, viewer = %viewer, "profile-queue: starting");

    match args.command.unwrap_or(Command::Swipe) {
        Command::Matches { json } => {
            let matches = service
                .fetch_matches(&viewer)
                .await
                .context("failed to fetch matches")?;
            if json {
                println!("{}", serde_json::to_string(&matches)?);
            } else if matches.is_empty() {
                println!("No matches yet.");
            } else {
                for id in matches {
                    println!("{id}");
                }
            }
            Ok(())
        }
        Command::Swipe => {
            let controller = QueueController::new(
                Arc::new(service),
                viewer,
                QueueOptions::from_settings(&settings),
            );
            run_swipe_loop(controller).await
        }
    }
}

async fn run_swipe_loop(controller: Arc<QueueController>) -> Result<()> {
    spawn_event_logger(&controller);

    println!("Loading profiles...");
    controller.reset().await;
    refill_if_starved(&controller).await;
    print_snapshot(&controller.snapshot().await);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match command {
            SwipeCommand::Quit => break,
            SwipeCommand::Help => {
                println!("{HELP}");
                continue;
            }
            SwipeCommand::Status => {}
            SwipeCommand::Reset => {
                println!("Loading profiles...");
                controller.reset().await;
            }
            SwipeCommand::Back => {
                if !controller.go_back().await {
                    println!("No previous profiles.");
                }
            }
            SwipeCommand::Decide(decision) => {
                let Some(current) = controller.snapshot().await.current else {
                    println!("No more profiles available.");
                    continue;
                };
                let outcome = controller.advance(decision, &current.id).await;
                settle_advance(&controller, outcome).await;
            }
            SwipeCommand::Drag { dx, dy } => {
                match controller.drag_moved(dx, dy).await {
                    Some(visuals) => println!(
                        "rotate {:.1}deg  YES {:.0}%  NO {:.0}%",
                        visuals.rotation_deg,
                        visuals.accept_opacity * 100.0,
                        visuals.reject_opacity * 100.0
                    ),
                    None => println!("(drag not claimed by the card)"),
                }
                match controller.drag_released(dx).await {
                    ReleaseOutcome::SpringBack => println!("(card springs back)"),
                    ReleaseOutcome::Decided(outcome) => settle_advance(&controller, outcome).await,
                    ReleaseOutcome::Ignored => {}
                }
            }
        }
        refill_if_starved(&controller).await;
        print_snapshot(&controller.snapshot().await);
    }
    Ok(())
}

/// Waits for the top-up an advance started when the card it revealed is empty.
async fn settle_advance(controller: &Arc<QueueController>, outcome: AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Advanced { cursor, top_up, .. } => {
            info!(cursor, "profile-queue: advanced");
            let Some(top_up) = top_up else {
                return;
            };
            if matches!(controller.phase().await, QueuePhase::Starved { .. }) {
                println!("Looking for more profiles...");
                if let Err(err) = top_up.await {
                    warn!("profile-queue: top-up task failed: {err}");
                }
            }
        }
        AdvanceOutcome::Ignored => println!("No more profiles available."),
    }
}

/// Retries the look-ahead when the queue ran dry after a failed top-up.
async fn refill_if_starved(controller: &Arc<QueueController>) {
    if controller.phase().await != (QueuePhase::Starved { topping_up: false }) {
        return;
    }
    if let Some(top_up) = controller.ensure_lookahead().await {
        println!("Looking for more profiles...");
        if let Err(err) = top_up.await {
            warn!("profile-queue: top-up task failed: {err}");
        }
    }
}

fn spawn_event_logger(controller: &Arc<QueueController>) {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                QueueEvent::PageAppended { added, offset, .. } => {
                    info!(added, offset, "profile-queue: more profiles loaded");
                }
                QueueEvent::FellBackToPlaceholders { .. } => {
                    warn!("profile-queue: backend unavailable, showing sample profiles");
                }
                QueueEvent::Exhausted { .. } => info!("profile-queue: no more candidates"),
                QueueEvent::TopUpFailed { error, .. } => {
                    warn!("profile-queue: could not load more profiles: {error}");
                }
                QueueEvent::DecisionRecorded { .. } => {}
                QueueEvent::DecisionFailed {
                    target,
                    decision,
                    error,
                } => warn!(profile_id = %target, %decision, "profile-queue: decision not saved: {error}"),
            }
        }
    });
}

fn print_snapshot(snapshot: &QueueSnapshot) {
    match snapshot.phase {
        QueuePhase::Idle | QueuePhase::Loading => println!("Loading profiles..."),
        QueuePhase::Exhausted => println!("No more profiles available."),
        QueuePhase::Starved { topping_up: true } => println!("Looking for more profiles..."),
        QueuePhase::Starved { topping_up: false } => {
            println!("Could not load more profiles; press s to retry.")
        }
        QueuePhase::Ready { .. } => {
            let Some(profile) = &snapshot.current else {
                return;
            };
            println!();
            println!("[{}/{}] {}", snapshot.cursor + 1, snapshot.len, profile.name);
            let mut details = Vec::new();
            if let Some(age) = profile.age {
                details.push(age.to_string());
            }
            if let Some(location) = &profile.location {
                details.push(location.to_string());
            }
            if let Some(role) = &profile.role {
                details.push(role.clone());
            }
            if !details.is_empty() {
                println!("  {}", details.join(" | "));
            }
            if let Some(bio) = &profile.bio {
                println!("  About: {bio}");
            }
            if let Some(goals) = &profile.goals {
                println!("  Goals: {goals}");
            }
            if let Some(image) = &profile.image_url {
                println!("  Photo: {image}");
            }
            if let Some(next) = &snapshot.next {
                println!("  Up next: {}", next.name);
            }
        }
    }
}
