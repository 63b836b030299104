//! herald - push-notification and email relay.
//!
//! # Commands
//!
//! - `sweep` - run one retention pass
//! - `serve` - run the daily sweeper and the notification trigger until Ctrl-C
//! - `notify <record.json>` - feed one notification create event
//! - `project-message <project_id> <message.json>` - feed one project chat message

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herald_core::app::{App, AppBuilder, SweepLoop, TriggerLoop};
use herald_core::config::{DEFAULT_CONFIG_PATH, Settings};
use herald_core::domain::{NotificationId, NotificationRecord, ProjectId, ProjectMessage};
use herald_core::impls::{InMemoryDocumentStore, InMemoryMailTransport, InMemoryPushGateway, StoreSeed};
use herald_core::observability::init_tracing;
use herald_core::ports::{
    ChangeFeed, Clock, DocumentStore, IdGenerator, StoreEvent, UlidGenerator,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Push-notification and email relay", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Collections to load into the document store (JSON).
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Use in-memory push and mail adapters instead of FCM and SMTP.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete notifications older than the retention window, once.
    Sweep,

    /// Run the periodic sweeper and deliver created notifications until Ctrl-C.
    Serve,

    /// Create one notification record and deliver it.
    Notify {
        /// Notification record (JSON)
        record: PathBuf,

        /// Document id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Fan out one project chat message to the project's members.
    #[command(name = "project-message")]
    ProjectMessage {
        project_id: String,

        /// Chat message (JSON)
        message: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    init_tracing(&settings.logging);

    let store = Arc::new(match &cli.seed {
        Some(path) => InMemoryDocumentStore::from_seed(read_json::<StoreSeed>(path)?),
        None => InMemoryDocumentStore::new(),
    });

    let mut builder = AppBuilder::new(settings).with_store(store.clone());
    let dry_run = cli.dry_run.then(|| Arc::new(InMemoryPushGateway::new()));
    if let Some(push) = &dry_run {
        builder = builder
            .with_push(push.clone())
            .with_mail(Arc::new(InMemoryMailTransport::new()));
    }
    let app = builder.build().context("failed to build app")?;

    match cli.command {
        Commands::Sweep => {
            let deleted = app
                .sweeper
                .sweep(app.clock.now())
                .await
                .context("retention sweep failed")?;
            println!("deleted {deleted} notifications");
        }
        Commands::Serve => serve(&app, store.as_ref()).await,
        Commands::Notify { record, id } => {
            let record: NotificationRecord = read_json(&record)?;
            let id = match id {
                Some(id) => NotificationId::new(id),
                None => UlidGenerator::new(app.clock.clone()).generate_notification_id(),
            };
            store
                .create_notification(&id, record)
                .await
                .with_context(|| format!("failed to create notification {id}"))?;
            let report = app.reconciler.on_notification_created(&id).await;
            println!("{id}: {report:?}");
        }
        Commands::ProjectMessage {
            project_id,
            message,
        } => {
            let message: ProjectMessage = read_json(&message)?;
            let project = ProjectId::new(project_id);

            // 展開されたレコードは作成イベント経由で同じ Reconciler に渡す
            let mut created = store.subscribe();
            let report = app.reconciler.on_project_message(&project, &message).await;
            println!("{project}: {report:?}");

            while let Ok(StoreEvent::NotificationCreated(id)) = created.try_recv() {
                let report = app.reconciler.on_notification_created(&id).await;
                println!("  {id}: {report:?}");
            }
        }
    }

    if let Some(push) = dry_run {
        info!(pushes = push.sent().await.len(), "dry run finished");
    }
    Ok(())
}

async fn serve(app: &App, feed: &dyn ChangeFeed) {
    let trigger = TriggerLoop::spawn(feed, app.reconciler.clone());
    let sweeper = SweepLoop::spawn(app.sweeper.clone(), app.clock.clone(), app.sweep_period);
    info!(period_secs = app.sweep_period.as_secs(), "herald serving");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; shutting down");
    }

    info!("shutting down");
    sweeper.shutdown_and_join().await;
    trigger.shutdown_and_join().await;
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
