use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;

use plan_activity::{
    Dispatcher, PlanActivityResponse, PlannerConfig, PlannerError, RenderState, RenderTarget,
    ReqwestTransport, StructuredForm, TerminalRenderer, logging,
};

/// Plan outdoor activities around sunrise and sunset
#[derive(Debug, Parser)]
#[command(name = "plan-activity", version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Planner base URL, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Debug logging and progress output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send coordinates and a date
    Form {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        latitude: String,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        longitude: String,
        /// Date as YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Send a raw JSON document
    Json {
        /// JSON text; read from --file or stdin when omitted
        text: Option<String>,
        /// Read the JSON text from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[command(flatten)]
        display: DisplayArgs,
    },
}

#[derive(Debug, Args)]
struct DisplayArgs {
    /// Show a short summary when the reply is a plan
    #[arg(long)]
    summary: bool,
}

/// Terminal output, optionally condensing successful plans
struct CliTarget {
    terminal: TerminalRenderer<std::io::Stdout, std::io::Stderr>,
    summary: bool,
}

impl RenderTarget for CliTarget {
    fn render(&mut self, state: &RenderState) {
        if self.summary && !state.has_error() {
            if let Some(plan) = PlanActivityResponse::from_body(&state.output) {
                self.terminal.render(&RenderState::success(plan.summary()));
                return;
            }
        }
        self.terminal.render(state);
    }

    fn render_sending(&mut self, placeholder: &RenderState) {
        self.terminal.render_sending(placeholder);
    }

    fn render_input_error(&mut self, message: &str) {
        self.terminal.render_input_error(message);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the submission ended without an error
async fn run(cli: Cli) -> Result<bool> {
    let mut config = PlannerConfig::load_from_path(cli.config.clone())?;
    if let Some(base_url) = cli.base_url.clone() {
        config.api.base_url = base_url;
        config.validate()?;
    }
    logging::init(&config.logging, cli.verbose)?;

    tracing::info!("Using planner endpoint {}", config.endpoint_url());

    let transport = ReqwestTransport::new(&config.api)?;
    let dispatcher = Dispatcher::new(transport, &config.api.base_url, &config.api.endpoint);

    let terminal = TerminalRenderer::stdio(cli.verbose);

    let outcome = match cli.command {
        Command::Form {
            latitude,
            longitude,
            date,
            display,
        } => {
            let date = date.unwrap_or_else(|| {
                chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
            });
            let payload = StructuredForm::new(latitude, longitude, date).into_payload();
            let mut target = CliTarget {
                terminal,
                summary: display.summary,
            };
            dispatcher.dispatch(&payload, &mut target).await
        }
        Command::Json {
            text,
            file,
            display,
        } => {
            let raw = read_json_text(text, file).await?;
            let mut target = CliTarget {
                terminal,
                summary: display.summary,
            };
            dispatcher.submit_text(&raw, &mut target).await
        }
    };

    Ok(!outcome.is_error())
}

async fn read_json_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(path) = file {
        return tokio::fs::read_to_string(&path)
            .await
            .map_err(PlannerError::from)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .map_err(PlannerError::from)
        .context("Failed to read JSON from stdin")?;
    Ok(raw)
}
