use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use suroo_assistant::schema::ToolSchemas;
use suroo_assistant::{AnswerRequest, Assistant};
use suroo_domain::auth::AuthContext;
use suroo_domain::config::Config;
use suroo_mcp_client::ToolHost;
use suroo_upstream::LlmClient;

/// Ask the banking assistant one question from the command line.
#[derive(Parser, Debug)]
#[command(name = "suroo", version, about)]
struct Cli {
    /// The user message to answer.
    message: String,

    /// Path to the TOML configuration file.
    #[arg(long, default_value = "suroo.toml")]
    config: PathBuf,

    /// Response language tag (`ky` or `ru`).
    #[arg(long)]
    lang: Option<String>,

    /// Act as this authenticated customer id. Without it the request
    /// runs anonymously and restricted tools are refused.
    #[arg(long)]
    customer_id: Option<i64>,

    /// First name shown to the model when --customer-id is set.
    #[arg(long, default_value = "Колдонуучу")]
    first_name: String,

    /// Print raw SSE event blocks instead of plain text.
    #[arg(long)]
    sse: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        tracing::info!(path = %cli.config.display(), "config file not found, using defaults");
        Config::default()
    };

    let schemas = ToolSchemas::load(&config.assistant.knowledge_dir).with_context(|| {
        format!(
            "loading tool schemas from {}",
            config.assistant.knowledge_dir.display()
        )
    })?;

    let upstream = LlmClient::from_config(&config.llm).context("building upstream client")?;
    let host = ToolHost::connect(&config.tool_host)
        .await
        .context("starting tool host")?;

    let assistant = Assistant::from_config(&config.assistant, upstream, host, schemas);

    let auth = match cli.customer_id {
        Some(id) => AuthContext::authenticated(id, cli.first_name.clone()),
        None => AuthContext::anonymous(),
    };

    let request = AnswerRequest {
        message: cli.message.clone(),
        language: cli.lang.clone(),
        auth,
        conversation_id: None,
    };

    let mut frames = assistant.answer_stream(request);
    let mut stdout = std::io::stdout();
    while let Some(frame) = frames.next().await {
        if cli.sse {
            stdout.write_all(frame.to_sse().as_bytes())?;
        } else if let suroo_domain::stream::StreamFrame::Content { text } = &frame {
            stdout.write_all(text.as_bytes())?;
        }
        stdout.flush()?;
    }
    if !cli.sse {
        stdout.write_all(b"\n")?;
    }
    drop(frames);

    assistant.tools().shutdown().await;

    Ok(())
}

/// Compact stderr-only tracing so diagnostics never mix into the
/// streamed answer on stdout.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
