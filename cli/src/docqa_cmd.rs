use crate::config::DocqaConfig;
use crate::history_cmd::HistoryCli;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_answer::{
    AnswerPipeline, AnswerReport, AnswerRequest, ConversationLog, InMemoryConversationLog,
    JsonFileConversationLog, RecordedGeneration, RequestContext,
};
use docqa_passage_store::RecordedSource;
use docqa_retrieval::{Ranker, RetrievalResult};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Re-rank recorded similarity hits and score answers against them
#[derive(Debug, Parser)]
#[command(name = "docqa", version)]
pub struct DocqaCli {
    /// Log pipeline stages (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: DocqaCommand,
}

#[derive(Debug, Subcommand)]
pub enum DocqaCommand {
    /// Rank recorded hits for a query
    Rank(RankArgs),

    /// Answer a question from recorded hits and a recorded model response
    Ask(AskArgs),

    /// Inspect or edit stored conversations
    History(HistoryCli),
}

#[derive(Debug, Parser)]
pub struct RetrievalArgs {
    /// Question or search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// JSON file of recorded similarity hits
    #[arg(long, value_name = "FILE")]
    pub hits: PathBuf,

    /// Restrict results to these source documents (repeatable)
    #[arg(long = "target", value_name = "SOURCE")]
    pub targets: Vec<String>,

    /// TOML file with [retrieval] and [answer] tables
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct RankArgs {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Number of candidates to select
    #[arg(short = 'k', long = "top-k", default_value_t = 5)]
    pub k: usize,
}

#[derive(Debug, Parser)]
pub struct AskArgs {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Number of candidates requested (1-10)
    #[arg(short = 'k', long = "top-k", default_value_t = docqa_answer::DEFAULT_REQUEST_K)]
    pub k: usize,

    /// File holding the raw model response to replay
    #[arg(long, value_name = "FILE")]
    pub response: PathBuf,

    /// Client the conversation belongs to
    #[arg(long, default_value = "default")]
    pub client: String,

    /// Conversation to continue (a new one is started otherwise)
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Directory for persisted conversations (kept in memory otherwise)
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Do not hand prior turns to the model
    #[arg(long)]
    pub no_conversation_context: bool,
}

impl DocqaCli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            DocqaCommand::Rank(args) => run_rank(args).await,
            DocqaCommand::Ask(args) => run_ask(args).await,
            DocqaCommand::History(cli) => cli.run().await,
        }
    }
}

async fn load_ranker(args: &RetrievalArgs, config: &DocqaConfig) -> Result<Ranker> {
    let source = RecordedSource::from_json_file(&args.hits)
        .await
        .with_context(|| format!("Failed to load hits from {}", args.hits.display()))?;

    Ranker::new(config.retrieval.clone(), Arc::new(source))
        .context("Failed to initialize ranker")
}

fn targets(args: &RetrievalArgs) -> Option<&[String]> {
    (!args.targets.is_empty()).then_some(args.targets.as_slice())
}

async fn run_rank(args: RankArgs) -> Result<()> {
    let config = DocqaConfig::load(args.retrieval.config.as_deref()).await?;
    let ranker = load_ranker(&args.retrieval, &config).await?;

    let result = ranker
        .rank(&args.retrieval.query, args.k, targets(&args.retrieval))
        .await
        .context("Ranking failed")?;

    if args.retrieval.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_ranking(&result);
    }

    Ok(())
}

fn print_ranking(result: &RetrievalResult) {
    if result.is_empty() {
        println!("{} No relevant passages found", "✗".bright_red());
        return;
    }

    println!(
        "{} Ranked {} passages (confidence {:.2}{})\n",
        "✓".bright_green(),
        result.len().to_string().bright_cyan(),
        result.retrieval_confidence,
        if result.stats.comparative {
            ", comparative"
        } else {
            ""
        }
    );

    for (i, candidate) in result.candidates.iter().enumerate() {
        let chunk = candidate.chunk_id.as_deref().unwrap_or("?");
        println!(
            "{}. {} {}",
            (i + 1).to_string().bright_yellow(),
            candidate.source_id.bright_cyan(),
            format!("[chunk {chunk}]").bright_black()
        );
        println!(
            "   {} {:.3} {} {:.3}",
            "Score:".bright_black(),
            candidate.boosted_score,
            "Similarity:".bright_black(),
            candidate.similarity
        );
        let first_line = candidate.text.lines().next().unwrap_or_default();
        println!("   {}", first_line.dimmed());
    }

    let summary = result.summary();
    println!(
        "\n{} {} unique sources, scores {:.3}-{:.3} (std {:.3})",
        "▶".bright_blue(),
        summary.unique_sources,
        summary.min_score,
        summary.max_score,
        summary.score_std
    );
    if result.stats.backfilled > 0 {
        println!("  Backfilled: {}", result.stats.backfilled);
    }
}

fn open_log(dir: Option<&Path>) -> Arc<dyn ConversationLog> {
    match dir {
        Some(dir) => Arc::new(JsonFileConversationLog::new(dir)),
        None => Arc::new(InMemoryConversationLog::new()),
    }
}

async fn run_ask(args: AskArgs) -> Result<()> {
    let config = DocqaConfig::load(args.retrieval.config.as_deref()).await?;
    let ranker = load_ranker(&args.retrieval, &config).await?;

    let response = tokio::fs::read_to_string(&args.response)
        .await
        .with_context(|| format!("Failed to read response file {}", args.response.display()))?;

    let pipeline = AnswerPipeline::new(
        config.answer,
        Arc::new(ranker),
        Arc::new(RecordedGeneration::new(response)),
        open_log(args.history_dir.as_deref()),
    )
    .context("Failed to initialize answer pipeline")?;

    let mut ctx = RequestContext::new(args.client);
    ctx.conversation_id = args.conversation;

    let mut request = AnswerRequest::new(args.retrieval.query)
        .with_k(args.k)
        .with_targets(args.retrieval.targets);
    request.use_conversation_context = !args.no_conversation_context;

    let report = pipeline
        .ask(&ctx, &request)
        .await
        .context("Failed to answer question")?;

    if args.retrieval.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &AnswerReport) {
    println!("{}\n", report.answer);

    let confidence = format!("{:.2}", report.confidence_score);
    let confidence = if report.sufficient_confidence {
        confidence.bright_green().to_string()
    } else {
        confidence.bright_red().to_string()
    };
    println!(
        "{} {confidence} {} {:.2} {} {:.1}/10",
        "Confidence:".bright_black(),
        "Retrieval:".bright_black(),
        report.retrieval_confidence,
        "Self-reported:".bright_black(),
        report.self_reported_confidence
    );
    if let Some(warning) = &report.warning {
        println!("{} {warning}", "⚠".bright_yellow());
    }

    if !report.sources.is_empty() {
        println!("\n{}", "Sources:".bright_blue());
        for (i, source) in report.sources.iter().enumerate() {
            let page = source
                .page
                .map(|page| format!(", page {page}"))
                .unwrap_or_default();
            println!(
                "{}. {} {} ({:.2})",
                (i + 1).to_string().bright_yellow(),
                source.source_id.bright_cyan(),
                format!("[chunk {}{page}]", source.chunk_id).bright_black(),
                source.relevance_score
            );
            println!("   {}", source.content_preview.dimmed());
        }
    }

    println!(
        "\n{} precision@k {:.2}, grounding {:.2}",
        "▶".bright_blue(),
        report.evaluation_metrics.precision_at_k,
        report.evaluation_metrics.grounding_accuracy
    );
    println!("  Conversation: {}", report.conversation_id);
}
