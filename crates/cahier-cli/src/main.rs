//! Cahier - specification generator CLI
//!
//! The `cahier` command drafts a web application specification from a
//! short description, scores it and improves it until it is good enough.
//!
//! ## Commands
//!
//! - `generate`: Run the writer → evaluator → optimizer pipeline
//! - `render`: Print a saved session history

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Instrument, Level};

use cahier_core::{
    render_evaluation_md, render_history_md, render_specification_md, write_outcome_json,
    ContextManager, EvaluationResult, ModificationType, OptimizationResult, Pipeline,
    PipelineConfig, PipelineOutcome, SessionRegistry, SpecificationVersion, VersionId,
    WebSpecification,
};
use cahier_core::obs::session_span;
use cahier_llm::{AnthropicClient, LlmClient, LlmConfig};

#[derive(Parser)]
#[command(name = "cahier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-agent web specification generator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Also write a daily rolling DEBUG log into this directory
    #[arg(long, global = true, env = "CAHIER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a specification from a project description
    Generate {
        /// Project description (read from --input or stdin when omitted)
        description: Option<String>,

        /// File containing the project description
        #[arg(short, long, conflicts_with = "description")]
        input: Option<PathBuf>,

        /// Scores below this trigger an optimization round
        #[arg(long)]
        threshold: Option<f64>,

        /// Maximum number of optimize/re-evaluate rounds
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Save the full session history to this file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Also write the pipeline outcome as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a saved session history
    Render {
        /// History file written by `generate --history`
        history_file: PathBuf,

        /// Version to render (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let _log_guard = cahier_core::init_tracing(cli.json, level, cli.log_dir.as_deref())
        .context("Failed to set up logging")?;

    match cli.command {
        Commands::Generate {
            description,
            input,
            threshold,
            max_rounds,
            format,
            history,
            output,
        } => {
            let description = read_description(description, input.as_deref())?;
            let config = pipeline_config(threshold, max_rounds)?;
            let client = AnthropicClient::new(LlmConfig::from_env())
                .context("Failed to configure the language model client")?;
            cmd_generate(
                Arc::new(client),
                &description,
                config,
                format,
                history.as_deref(),
                output.as_deref(),
            )
            .await
        }
        Commands::Render {
            history_file,
            version,
            format,
        } => {
            let rendered = cmd_render(&history_file, version.as_deref(), format)?;
            print!("{}", rendered);
            Ok(())
        }
    }
}

/// Resolve the description from the positional argument, a file, or stdin.
fn read_description(description: Option<String>, input: Option<&Path>) -> Result<String> {
    let text = match (description, input) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .context(format!("Failed to read description file: {:?}", path))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read description from stdin")?;
            buf
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("project description is empty");
    }
    Ok(text)
}

/// Environment settings overridden by command-line flags.
fn pipeline_config(threshold: Option<f64>, max_rounds: Option<u32>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env();
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("--threshold must be within 0.0..=1.0, got {threshold}");
        }
        config = config.with_threshold(threshold);
    }
    if let Some(rounds) = max_rounds {
        config = config.with_max_rounds(rounds);
    }
    Ok(config)
}

async fn cmd_generate(
    llm: Arc<dyn LlmClient>,
    description: &str,
    config: PipelineConfig,
    format: OutputFormat,
    history: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let sessions = SessionRegistry::new();
    let (session_id, ctx) = sessions.create();
    let span = session_span(&session_id.to_string());
    span.in_scope(|| {
        info!(
            model = llm.model_name(),
            threshold = config.score_threshold,
            "starting generation"
        )
    });

    let pipeline = Pipeline::new(llm, config);
    let result = pipeline.run(&ctx, description).instrument(span).await;

    // Keep whatever was produced, even when a later stage failed
    if let Some(path) = history {
        ctx.save_json(path)
            .context(format!("Failed to save session history: {:?}", path))?;
        info!(path = ?path, versions = ctx.versions().len(), "history saved");
    }

    let outcome = result.context("Specification pipeline failed")?;

    if let Some(path) = output {
        write_outcome_json(path, &outcome)?;
    }

    print!("{}", format_outcome(&outcome, format)?);
    Ok(())
}

fn format_outcome(outcome: &PipelineOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(outcome),
        OutputFormat::Markdown => {
            let mut out = render_specification_md(&outcome.specification);
            out.push('\n');
            out.push_str(&render_evaluation_md(&outcome.evaluation));
            out.push('\n');
            out.push_str(&render_history_md(&outcome.ancestry));
            Ok(out)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    out.push('\n');
    Ok(out)
}

fn cmd_render(history_file: &Path, version: Option<&str>, format: OutputFormat) -> Result<String> {
    let ctx = ContextManager::load_json(history_file)
        .context(format!("Failed to load history: {:?}", history_file))?;

    let record = match version {
        Some(raw) => {
            let id: VersionId = raw.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            ctx.get_version(id)?
        }
        None => match ctx.latest_version() {
            Some(record) => record,
            None => bail!("history {:?} contains no versions", history_file),
        },
    };
    let ancestry = ctx.get_ancestry(record.version_id)?;

    match format {
        OutputFormat::Json => to_json(&ancestry),
        OutputFormat::Markdown => {
            let mut out = render_payload_md(&record)?;
            out.push('\n');
            out.push_str(&render_history_md(&ancestry));
            Ok(out)
        }
    }
}

fn render_payload_md(record: &SpecificationVersion) -> Result<String> {
    let context = || format!("Failed to decode payload of {}", record.version_id);
    Ok(match record.modification_type {
        ModificationType::Creation => {
            render_specification_md(&record.payload_as::<WebSpecification>().with_context(context)?)
        }
        ModificationType::Evaluation => {
            render_evaluation_md(&record.payload_as::<EvaluationResult>().with_context(context)?)
        }
        ModificationType::Optimization => {
            match record.payload_as::<OptimizationResult>() {
                Ok(result) => render_specification_md(&result.improved_specification),
                Err(_) => render_specification_md(
                    &record.payload_as::<WebSpecification>().with_context(context)?,
                ),
            }
        }
    })
}
