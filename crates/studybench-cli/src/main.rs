//! Studybench CLI — command-line client for the Studybench tools.
//!
//! Set STUDYBENCH_API_KEY and STUDYBENCH_API_URL (or API_URL). Uses
//! X-API-Key auth.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use studybench_api_client::ApiClient;
use studybench_cli::{init_tracing, mime_for_path};
use studybench_core::models::{
    ExplainMode, QuestionType, RewriteStyle, SourceFile, SummaryMode, ToolParams,
};
use studybench_core::{
    BalanceService, EngineConfig, HistoryCommitter, MeteredInvoker, TextExtractor,
};
use studybench_engine::{AttachmentSet, CreditLedgerView, ToolInvocationController};

#[derive(Parser)]
#[command(name = "studybench", about = "Studybench tools CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Text to process; may be omitted when attachments carry the input
    text: Option<String>,

    /// Attach a file; repeatable, up to the attachment limit
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Save the result to history after it completes
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize text or attached files
    Summarize {
        #[command(flatten)]
        input: InputArgs,
        /// Summary mode: concise, detailed, or bullets
        #[arg(long, default_value = "concise", value_parser = SummaryMode::from_str)]
        mode: SummaryMode,
    },
    /// Generate practice questions
    Questions {
        #[command(flatten)]
        input: InputArgs,
        /// Question type: multiple_choice, open_ended, or true_false
        #[arg(long = "type", default_value = "multiple_choice", value_parser = QuestionType::from_str)]
        question_type: QuestionType,
        /// Number of questions to generate
        #[arg(long, default_value = "5")]
        count: u8,
    },
    /// Explain a concept
    Explain {
        #[command(flatten)]
        input: InputArgs,
        /// Explain mode: simple or technical
        #[arg(long, default_value = "simple", value_parser = ExplainMode::from_str)]
        mode: ExplainMode,
        /// Include worked examples
        #[arg(long)]
        examples: bool,
    },
    /// Rewrite text in a different style
    Rewrite {
        #[command(flatten)]
        input: InputArgs,
        /// Rewrite style: formal, casual, academic, or simplified
        #[arg(long, default_value = "formal", value_parser = RewriteStyle::from_str)]
        style: RewriteStyle,
    },
    /// Show the current credit balance
    Balance,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn run_tool(
    client: Arc<ApiClient>,
    config: &EngineConfig,
    params: ToolParams,
    input: InputArgs,
) -> anyhow::Result<()> {
    let invoker: Arc<dyn MeteredInvoker> = client.clone();
    let committer: Arc<dyn HistoryCommitter> = client.clone();
    let balance: Arc<dyn BalanceService> = client.clone();
    let extractor: Arc<dyn TextExtractor> = client.clone();

    let ledger = CreditLedgerView::new(balance);
    ledger
        .refresh()
        .await
        .context("Failed to fetch credit balance")?;

    let attachments = AttachmentSet::new(extractor, config.attachments);
    let controller = ToolInvocationController::new(
        config.profile(params.kind()),
        invoker,
        committer,
        ledger,
        attachments,
    );

    if let Some(text) = input.text {
        controller.set_input_text(text);
    }
    for path in &input.files {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        controller
            .attachments()
            .add(
                SourceFile {
                    name,
                    mime_type: mime_for_path(path).to_string(),
                    data: Bytes::from(data),
                },
                None,
            )
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    }

    while controller.attachments().any_pending() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    controller
        .submit(params)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let result = controller
        .result()
        .context("Invocation completed without a result")?;

    let saved = if input.save {
        controller
            .commit()
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
        true
    } else {
        false
    };

    // The post-submit refresh runs in the background; fetch once more so
    // the printed balance reflects this invocation.
    let _ = controller.credits().refresh().await;

    print_json(&serde_json::json!({
        "output": result.output,
        "credits_used": result.credits_used,
        "balance": controller.credits().current(),
        "saved": saved,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = Arc::new(ApiClient::from_env().context(
        "Failed to create API client. Set STUDYBENCH_API_KEY and STUDYBENCH_API_URL (or API_URL)",
    )?);
    let config = EngineConfig::from_env()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize { input, mode } => {
            run_tool(client, &config, ToolParams::Summarize { mode }, input).await?;
        }
        Commands::Questions {
            input,
            question_type,
            count,
        } => {
            run_tool(
                client,
                &config,
                ToolParams::Questions {
                    question_type,
                    count,
                },
                input,
            )
            .await?;
        }
        Commands::Explain {
            input,
            mode,
            examples,
        } => {
            run_tool(
                client,
                &config,
                ToolParams::Explain {
                    mode,
                    with_examples: examples,
                },
                input,
            )
            .await?;
        }
        Commands::Rewrite { input, style } => {
            run_tool(client, &config, ToolParams::Rewrite { style }, input).await?;
        }
        Commands::Balance => {
            let balance = client
                .get_balance()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            print_json(&balance)?;
        }
    }

    Ok(())
}
