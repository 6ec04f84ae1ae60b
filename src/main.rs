use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_recorder::{create_router, AppState, Config, HttpBackend, Validity, ValidityGate};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "interview-recorder", about = "Interview recording session controller")]
struct Cli {
    /// Config file, without extension
    #[arg(long, global = true, default_value = "config/interview-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control API
    Serve,
    /// Check whether an interview can still be recorded
    Check { interview_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Interview Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let backend = Arc::new(
        HttpBackend::new(&cfg.backend).context("Failed to create backend client")?,
    );

    match cli.command {
        Command::Serve => {
            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let state = AppState::new(backend, cfg.capture, cfg.session);
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("HTTP server listening on {}", addr);

            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
        Command::Check { interview_id } => {
            let gate = ValidityGate::new(backend);
            match gate.check(&interview_id).await {
                Validity::Valid => println!("Interview {} is valid", interview_id),
                _ => anyhow::bail!("Interview {} is expired or unavailable", interview_id),
            }
        }
    }

    Ok(())
}
