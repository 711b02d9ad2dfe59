//! Batch entry point for the retail analytics copilot
//!
//! Reads question records from a JSONL file, runs each through the
//! workflow graph with the default deterministic strategies, and writes
//! answer records to an output JSONL file in the same order.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use copilot_agent::{
    build_graph, run_batch, AnswerRecord, Collaborators, DeterministicSynthesizer,
    KeywordClassifier, QuestionRecord, SqliteExecutor, TemplateSqlGenerator, TfIdfRetriever,
};

/// Retail analytics copilot batch runner
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(about = "Answer retail analytics questions in batch mode", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a JSONL file of question records
    #[arg(long)]
    batch: PathBuf,

    /// Output JSONL file path
    #[arg(long)]
    out: PathBuf,

    /// Directory of markdown documents to index for retrieval
    #[arg(long, env = "COPILOT_DOCS_DIR", default_value = "docs")]
    docs_dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "COPILOT_DB", default_value = "data/northwind.sqlite")]
    db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let questions = read_questions(&args.batch)
        .with_context(|| format!("reading questions from {}", args.batch.display()))?;
    info!(count = questions.len(), "loaded questions");

    let retriever = TfIdfRetriever::from_dir(&args.docs_dir)
        .with_context(|| format!("indexing documents in {}", args.docs_dir.display()))?;
    info!(chunks = retriever.chunk_count(), "document index built");

    let executor = SqliteExecutor::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    let collaborators = Arc::new(Collaborators {
        classifier: Arc::new(KeywordClassifier),
        ranker: Arc::new(retriever),
        generator: Arc::new(TemplateSqlGenerator),
        executor: Arc::new(executor),
        synthesizer: Arc::new(DeterministicSynthesizer),
    });

    let graph = build_graph(collaborators)?;
    let results = run_batch(&graph, &questions).await?;

    write_results(&args.out, &results)
        .with_context(|| format!("writing results to {}", args.out.display()))?;
    info!(count = results.len(), path = %args.out.display(), "done");

    Ok(())
}

fn read_questions(path: &Path) -> Result<Vec<QuestionRecord>> {
    let file = File::open(path)?;
    let mut questions = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: QuestionRecord = serde_json::from_str(&line)
            .with_context(|| format!("malformed question record on line {}", number + 1))?;
        questions.push(record);
    }
    Ok(questions)
}

fn write_results(path: &Path, results: &[AnswerRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in results {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
