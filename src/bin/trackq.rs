//! trackq CLI: run a worker, or submit and inspect jobs.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use trackq::config::Config;
use trackq::config::secrets::ExposeSecret;
use trackq::db::Db;
use trackq::engine::{Dispatcher, DispatcherConfig};
use trackq::handler::HandlerRegistry;
use trackq::model::{Job, JobId, JobRequest};
use trackq::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "trackq", about = "Durable job queue for track dataset workers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a worker: claim jobs and execute them until interrupted
    Worker {
        /// Override POLL_INTERVAL_MS for this worker
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Job operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Submit a new job
    Submit {
        #[command(subcommand)]
        kind: SubmitKind,
    },
    /// List jobs, newest first
    List {
        /// Maximum jobs to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a job
    Show {
        /// Job ID (full UUID or prefix)
        id: String,
    },
    /// Mark jobs stuck in running as failed
    Reap {
        /// Running jobs not updated for this long are failed as abandoned
        #[arg(long)]
        older_than_secs: u64,
    },
}

#[derive(Subcommand)]
enum SubmitKind {
    /// Sleep, then echo a message
    Delay {
        #[arg(long, default_value_t = 3)]
        seconds: u64,
        #[arg(long)]
        message: Option<String>,
    },
    /// Replace the track dataset from a CSV file
    Ingest {
        /// Defaults to the worker's DATASET_PATH
        #[arg(long)]
        csv_path: Option<String>,
    },
    /// Find the tracks most similar to the named one
    Comparables {
        track_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Worker { poll_interval_ms } => cmd_worker(config, poll_interval_ms).await,
        Command::Migrate => {
            let db = connect(&config).await?;
            db.close().await;
            println!("Migrations applied.");
            Ok(())
        }
        Command::Job { action } => {
            let db = connect(&config).await?;
            let result = match action {
                JobAction::Submit { kind } => cmd_job_submit(&db, kind).await,
                JobAction::List { limit } => cmd_job_list(&db, limit).await,
                JobAction::Show { id } => cmd_job_show(&db, id).await,
                JobAction::Reap { older_than_secs } => cmd_job_reap(&db, older_than_secs).await,
            };
            db.close().await;
            result
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<Db> {
    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    Ok(db)
}

async fn cmd_worker(config: Config, poll_interval_ms: Option<u64>) -> anyhow::Result<()> {
    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "trackq-worker".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Arc::new(connect(&config).await?);
    let registry = HandlerRegistry::standard(Arc::clone(&db), config.dataset_path.clone());

    let poll_interval = poll_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(config.poll_interval);
    let dispatcher = Dispatcher::new(
        Arc::clone(&db),
        Arc::new(registry),
        DispatcherConfig { poll_interval },
    );

    let ctrl = dispatcher.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("interrupt received, finishing in-flight job");
        ctrl.shutdown();
    });

    let outcome = dispatcher.run().await;
    db.close().await;
    // Export the final job spans before the providers shut down.
    tokio::task::spawn_blocking(move || guard.force_flush()).await?;
    Ok(outcome?)
}

async fn cmd_job_submit(db: &Db, kind: SubmitKind) -> anyhow::Result<()> {
    let request = match kind {
        SubmitKind::Delay { seconds, message } => JobRequest::delay(seconds, message),
        SubmitKind::Ingest { csv_path } => JobRequest::ingest(csv_path),
        SubmitKind::Comparables { track_name } => JobRequest::find_comparables(track_name),
    };

    let job = db.submit(request).await?;
    println!("Created: {} ({}, status: {})", job.id.0, job.job_type, job.status);
    Ok(())
}

async fn cmd_job_list(db: &Db, limit: i64) -> anyhow::Result<()> {
    let jobs = db.list_jobs(limit).await?;

    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<16}  {:<10}  {:<17}  UPDATED",
        "ID", "TYPE", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(76));

    for job in &jobs {
        println!(
            "{:<8}  {:<16}  {:<10}  {:<17}  {}",
            job.id,
            job.job_type,
            job.status,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\n{} job(s)", jobs.len());
    Ok(())
}

async fn cmd_job_show(db: &Db, id_str: String) -> anyhow::Result<()> {
    let id = if id_str.len() < 36 {
        let jobs = db.list_jobs(100).await?;
        let matches: Vec<&Job> = jobs
            .iter()
            .filter(|job| job.id.0.to_string().starts_with(&id_str))
            .collect();
        match matches.len() {
            0 => anyhow::bail!("no job matching prefix '{id_str}'"),
            1 => matches[0].id,
            n => anyhow::bail!("{n} jobs match prefix '{id_str}', be more specific"),
        }
    } else {
        JobId(uuid::Uuid::parse_str(&id_str)?)
    };

    let job = db.get_job(id).await?;

    println!("ID:       {}", job.id.0);
    println!("Type:     {}", job.job_type);
    println!("Status:   {}", job.status);
    println!("Payload:  {}", serde_json::to_string_pretty(&job.payload)?);
    println!("Created:  {}", job.created_at);
    println!("Updated:  {}", job.updated_at);
    if let Some(ref result) = job.result {
        println!("---");
        println!("Result:   {}", serde_json::to_string_pretty(result)?);
    }

    Ok(())
}

async fn cmd_job_reap(db: &Db, older_than_secs: u64) -> anyhow::Result<()> {
    let failed = db
        .fail_stale_running(Duration::from_secs(older_than_secs))
        .await?;
    println!("Marked {failed} abandoned job(s) as failed.");
    Ok(())
}
