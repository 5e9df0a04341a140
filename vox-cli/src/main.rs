use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use vox_rag::{KnowledgeBase, Orchestrator, PromptTemplate, QueryMode, QueryRequest, RagConfig, Reply};

mod config;
mod providers;

use config::{PromptFileConfig, ProviderKind, VoxConfigFile};
use providers::{ProviderSettings, ProviderSettingsOverride, Providers};

/// Vox - Retrieval-augmented answers for a voice assistant backend
#[derive(Parser)]
#[command(name = "vox", version, about)]
struct Cli {
    /// Configuration file (defaults to ./vox.toml when present)
    #[arg(short, long, global = true, env = "VOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ProviderArgs {
    /// Model backend
    #[arg(long, global = true, env = "VOX_PROVIDER", value_enum)]
    provider: Option<ProviderKind>,

    /// Generation model (e.g., "llama3.2:3b")
    #[arg(long, global = true, env = "VOX_MODEL")]
    model: Option<String>,

    /// Embedding model; defaults to the generation model on Ollama
    #[arg(long, global = true, env = "VOX_EMBED_MODEL")]
    embed_model: Option<String>,

    /// Server address override
    #[arg(long, global = true, env = "VOX_BASE_URL")]
    base_url: Option<String>,

    /// Embed with the offline hash embedder instead of the provider
    #[arg(long, global = true)]
    hash_embeddings: bool,
}

impl From<ProviderArgs> for ProviderSettingsOverride {
    fn from(args: ProviderArgs) -> Self {
        Self {
            kind: args.provider,
            model: args.model,
            embed_model: args.embed_model,
            base_url: args.base_url,
            hash_embeddings: args.hash_embeddings,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Chunk and embed a reference document, then save the index
    Index {
        /// Reference document (UTF-8 text)
        #[arg(short, long)]
        source: PathBuf,
        /// Where to write the index
        #[arg(short, long, default_value = "vox-index.json")]
        out: PathBuf,
    },
    /// Answer a single question
    Ask {
        /// The question, or the text to correct with `--mode correct`
        question: String,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Answer questions interactively
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// Reference document to index at startup
    #[arg(short, long, conflicts_with = "index")]
    source: Option<PathBuf>,

    /// Index written by `vox index`
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Background text used without retrieval and for fallback answers
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Prompt template: "qa" or "correct"
    #[arg(short, long, default_value = "qa")]
    mode: QueryMode,

    /// Print replies as JSON objects
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay machine-readable
    let filter = match cli.verbose {
        0 => "warn,vox=info,vox_rag=info",
        1 => "info,vox=debug,vox_rag=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let file = VoxConfigFile::load(cli.config.as_deref())?;
    let settings = ProviderSettings::resolve(file.provider, cli.provider.into());
    let providers = Providers::build(&settings)?;

    match cli.command {
        Command::Index { source, out } => {
            build_index(&providers, &file.rag, &source, &out).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { question, session } => {
            let orchestrator = build_orchestrator(&providers, &file.rag, &file.prompt, &session).await?;
            let reply = orchestrator.respond(&QueryRequest { question, mode: session.mode }).await;
            print_reply(&reply, session.json)?;
            Ok(match reply {
                Reply::Answer(_) => ExitCode::SUCCESS,
                Reply::Error(_) => ExitCode::FAILURE,
            })
        }
        Command::Chat { session } => {
            let orchestrator = build_orchestrator(&providers, &file.rag, &file.prompt, &session).await?;
            chat(&orchestrator, session.mode, session.json).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

async fn build_index(
    providers: &Providers,
    rag: &RagConfig,
    source: &Path,
    out: &Path,
) -> anyhow::Result<()> {
    let text = read_text(source)?;
    let knowledge = KnowledgeBase::build(&text, providers.embedder.as_ref(), rag)
        .await
        .context("failed to build index")?;
    knowledge.save(out).with_context(|| format!("failed to write index {}", out.display()))?;

    println!(
        "indexed {} chunks from {} into {}",
        knowledge.store().len(),
        source.display(),
        out.display()
    );
    Ok(())
}

async fn build_orchestrator(
    providers: &Providers,
    rag: &RagConfig,
    prompt: &PromptFileConfig,
    session: &SessionArgs,
) -> anyhow::Result<Orchestrator> {
    let knowledge = match (&session.source, &session.index) {
        (Some(source), _) => Some(
            KnowledgeBase::build(&read_text(source)?, providers.embedder.as_ref(), rag)
                .await
                .context("failed to build knowledge base")?,
        ),
        (None, Some(index)) => Some(
            KnowledgeBase::load(index)
                .with_context(|| format!("failed to load index {}", index.display()))?,
        ),
        (None, None) => None,
    };

    let retriever = knowledge.as_ref().and_then(|kb| kb.retriever(providers.embedder.clone(), rag));
    match (&knowledge, &retriever) {
        (None, _) => tracing::info!("no knowledge base given, answering from background only"),
        (Some(_), None) => tracing::warn!("knowledge base is empty, answering without retrieval"),
        (Some(kb), Some(_)) => tracing::info!(chunk_count = kb.store().len(), "retrieval enabled"),
    }

    let mut builder = Orchestrator::builder()
        .config(rag.clone())
        .generator(providers.generator.clone())
        .retriever(retriever);
    if let Some(text) = &prompt.qa_template {
        builder = builder.qa_template(PromptTemplate::new(text.clone()));
    }
    if let Some(text) = &prompt.correction_template {
        builder = builder.correction_template(PromptTemplate::new(text.clone()));
    }
    if let Some(path) = session.background.as_ref().or(prompt.background.as_ref()) {
        builder = builder.background(read_text(path)?);
    }

    builder.build().context("invalid prompt or pipeline configuration")
}

fn print_reply(reply: &Reply, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(reply)?);
        return Ok(());
    }
    match reply {
        Reply::Answer(answer) => println!("{}", answer.response),
        Reply::Error(err) => eprintln!("error: {}", err.error),
    }
    Ok(())
}

/// Turn a chat line into a request; `/correct` and `/ask` pick the mode.
fn parse_chat_line(line: &str, default_mode: QueryMode) -> QueryRequest {
    if let Some(text) = line.strip_prefix("/correct ") {
        QueryRequest::correct(text.trim())
    } else if let Some(text) = line.strip_prefix("/ask ") {
        QueryRequest::qa(text.trim())
    } else {
        QueryRequest { question: line.to_string(), mode: default_mode }
    }
}

fn record_history(editor: &mut DefaultEditor, line: &str) {
    if let Err(e) = editor.add_history_entry(line) {
        tracing::debug!(error = %e, "failed to record history entry");
    }
}

async fn chat(orchestrator: &Orchestrator, mode: QueryMode, json: bool) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    println!("Ask a question, '/correct <text>' to fix text, or 'exit' to quit.");

    loop {
        match editor.readline("vox> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit") {
                    break;
                }
                record_history(&mut editor, line);

                let reply = orchestrator.respond(&parse_chat_line(line, mode)).await;
                print_reply(&reply, json)?;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }
    Ok(())
}
