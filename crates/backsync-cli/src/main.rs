//! backsync - 失敗したリクエストのキューを操作する CLI
//!
//! - `push`   : リクエストをキューに積む
//! - `list`   : キューの中身と状態を JSON で出力
//! - `replay` : 1 回だけ replay（`--id` で 1 件だけ）
//! - `watch`  : probe で接続を監視し、復帰のたびに attach 済みキューを replay

mod callbacks;
mod http;
mod probe;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use backsync_core::config::Settings;
use backsync_core::domain::{OutboundRequest, QueueConfig, RecordId, RequestRecord};
use backsync_core::impls::FileStorage;
use backsync_core::queue::QueueStatus;
use backsync_core::{SyncApp, SyncAppBuilder};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::callbacks::LoggingCallbacks;
use crate::http::ReqwestClient;
use crate::probe::Probe;

const DEFAULT_CONFIG_PATH: &str = "backsync.toml";

#[derive(Parser, Debug)]
#[command(name = "backsync", about = "Queue failed HTTP requests and replay them later")]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(long, env = "BACKSYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides `storage_dir` from the settings file.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Per-request timeout used when replaying.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a request for later replay.
    Push {
        #[arg(long)]
        queue: String,
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        url: String,
        /// `name:value`, repeatable.
        #[arg(long = "header")]
        headers: Vec<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print queued records and queue status as JSON.
    List {
        #[arg(long)]
        queue: String,
    },
    /// Replay a queue once.
    Replay {
        #[arg(long)]
        queue: String,
        /// Replay only this record.
        #[arg(long)]
        id: Option<String>,
    },
    /// Replay attached queues whenever the probe sees connectivity return.
    Watch {
        /// Queues to attach in addition to those in the settings file.
        #[arg(long = "queue")]
        queues: Vec<String>,
        #[arg(long)]
        probe_url: Option<String>,
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[derive(Serialize)]
struct ListOutput<'a> {
    status: &'a QueueStatus,
    records: &'a [RequestRecord],
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must be name:value, got {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn queue_config(settings: &Settings, queue: &str) -> QueueConfig {
    settings.queues.get(queue).cloned().unwrap_or_default()
}

fn build_app(settings: &Settings, timeout: Duration) -> anyhow::Result<SyncApp> {
    let storage = FileStorage::open(&settings.storage_dir)
        .with_context(|| format!("opening storage at {}", settings.storage_dir.display()))?;

    let mut builder = SyncAppBuilder::new()
        .storage(Arc::new(storage))
        .network_client(Arc::new(
            ReqwestClient::new(timeout).context("building http client")?,
        ))
        .callbacks(Arc::new(LoggingCallbacks));
    for (name, config) in &settings.queues {
        builder = builder.queue(name.clone(), config.clone());
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(&cli.config);
    if let Some(dir) = cli.storage_dir.clone() {
        settings.storage_dir = dir;
    }
    init_tracing(&settings.log_filter);

    let app = build_app(&settings, Duration::from_millis(cli.timeout_ms))?;

    match cli.command {
        Command::Push {
            queue,
            method,
            url,
            headers,
            body,
            tag,
        } => {
            let mut request = OutboundRequest::new(method, url);
            for raw in &headers {
                let (name, value) = parse_header(raw)?;
                request = request.with_header(name, value);
            }
            if let Some(body) = body {
                request = request.with_body(body.into_bytes());
            }
            let config = queue_config(&settings, &queue);
            let id = match tag {
                Some(tag) => app.push_tagged(&queue, request, tag, config).await?,
                None => app.push(&queue, request, config).await?,
            };
            println!("{id}");
        }
        Command::List { queue } => {
            app.attach(&queue, queue_config(&settings, &queue))?;
            let records = app.list(&queue).await?;
            let status = app.status(&queue).await?;
            let output = ListOutput {
                status: &status,
                records: &records,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Replay { queue, id } => {
            app.attach(&queue, queue_config(&settings, &queue))?;
            match id {
                Some(raw) => {
                    let id: RecordId = raw
                        .parse()
                        .map_err(|e| anyhow!("invalid record id {raw:?}: {e}"))?;
                    let outcome = app.replay_one(&queue, id).await?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    // 送れなかった場合は終了コードで知らせる
                    outcome.into_result()?;
                }
                None => {
                    let summary = app.replay_all(&queue).await?;
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }
        }
        Command::Watch {
            queues,
            probe_url,
            interval_ms,
        } => {
            for queue in &queues {
                app.attach(queue, queue_config(&settings, queue))?;
            }
            if app.coordinator().attached().is_empty() {
                bail!("no queues to watch; pass --queue or configure [queues.<name>]");
            }
            let url = probe_url
                .or_else(|| settings.probe.url.clone())
                .ok_or_else(|| anyhow!("no probe url; pass --probe-url or set [probe] url"))?;
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(settings.probe.interval_ms));

            let probe = Probe::new(url, interval).context("building probe client")?;

            let (signal, handle) = app.spawn_coordinator();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let probe = tokio::spawn(probe.run(signal, shutdown_rx));

            info!(queues = ?app.coordinator().attached(), "watching for connectivity");
            tokio::signal::ctrl_c().await?;
            info!("shutting down");

            let _ = shutdown_tx.send(true);
            let _ = probe.await;
            handle.shutdown_and_join().await;
        }
    }
    Ok(())
}
