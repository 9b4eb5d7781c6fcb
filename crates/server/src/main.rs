//! Examforge Server
//!
//! Axum server exposing the exam generation pipeline over HTTP, plus a CLI
//! that runs a single generation without the server.

mod api;

use anyhow::Context;
use clap::{Parser, Subcommand};
use examforge_core::config::PipelineConfig;
use examforge_core::pipeline::Coordinator;
use examforge_core::state::{Difficulty, EducationLevel, QuestionType, RunRequest};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

/// Application state
pub struct AppState {
    coordinator: Arc<Coordinator>,
    config: PipelineConfig,
}

pub type SharedState = Arc<AppState>;

#[derive(Parser, Clone)]
#[command(author, version, about = "Examforge - exam and study notes generator")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value = "8123")]
        port: u16,
    },
    /// Generate one exam from the command line
    Generate {
        /// Knowledge topic to examine
        #[arg(short, long)]
        topic: String,
        /// Subject code, e.g. math or biology
        #[arg(long, default_value = "math")]
        subject: String,
        #[arg(long, value_enum, default_value = "middle")]
        level: LevelArg,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: DifficultyArg,
        /// Number of questions
        #[arg(short = 'n', long, default_value = "10")]
        count: u32,
        /// Question types, comma separated wire names
        #[arg(long, value_delimiter = ',', default_value = "multiple_choice,short_answer")]
        types: Vec<String>,
        /// Print every progress event as a JSON line
        #[arg(long)]
        stream: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum LevelArg {
    Primary,
    Middle,
    High,
}

impl From<LevelArg> for EducationLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Primary => EducationLevel::Primary,
            LevelArg::Middle => EducationLevel::Middle,
            LevelArg::High => EducationLevel::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(difficulty: DifficultyArg) -> Self {
        match difficulty {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

fn parse_question_types(types: &[String]) -> anyhow::Result<Vec<QuestionType>> {
    types
        .iter()
        .map(|t| {
            serde_json::from_value(serde_json::Value::String(t.trim().to_string()))
                .with_context(|| format!("Unknown question type: {}", t))
        })
        .collect()
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries results in CLI mode
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_server(config: PipelineConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let coordinator = Arc::new(Coordinator::from_config(&config)?);
    let state = Arc::new(AppState {
        coordinator,
        config,
    });
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    tracing::info!(%addr, "Examforge server listening");
    tracing::info!("Exams:     POST /generate-exam, /generate-exam-stream");
    tracing::info!("Artifacts: GET /list-exams, /download/:filename, /preview/:filename");
    tracing::info!("Config:    GET /api/v1/config, /api/v1/providers, /api/v1/openapi.json");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_generate(config: PipelineConfig, request: RunRequest, stream: bool) -> anyhow::Result<()> {
    let coordinator = Arc::new(Coordinator::from_config(&config)?);

    if stream {
        let mut rx = coordinator.start_streaming(request);
        let mut failed = None;
        while let Some(event) = rx.recv().await {
            println!("{}", serde_json::to_string(&event)?);
            if event.error.is_some() {
                failed = event.error;
            }
        }
        return match failed {
            Some(error) => Err(anyhow::anyhow!(error)),
            None => Ok(()),
        };
    }

    let report = coordinator.run(request).await;
    let result = report.result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let config = PipelineConfig::load().await?;

    match args.command {
        Some(CliCommand::Generate {
            topic,
            subject,
            level,
            difficulty,
            count,
            types,
            stream,
        }) => {
            let request = RunRequest::new(topic)
                .with_subject(subject)
                .with_education_level(level.into())
                .with_difficulty(difficulty.into())
                .with_question_count(count)
                .with_question_types(parse_question_types(&types)?);
            run_generate(config, request, stream).await
        }
        Some(CliCommand::Serve { host, port }) => run_server(config, &host, port).await,
        None => run_server(config, "127.0.0.1", 8123).await,
    }
}
