use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use rag_core::chunking::{split_documents, ChunkingConfig};
use rag_core::loader::load_directory;
use rag_core::logging::Logging;
use rag_core::traits::Embedder;
use rag_core::Settings;
use rag_embed::{get_embeddings, EmbeddingConfig};
use rag_vector::{get_retriever, get_vectorstore, DEFAULT_COLLECTION};

const USAGE: &str = "Usage: agentic-rag [ingest [DIR] | query <TEXT> [--k N]]";
/// Chunks embedded and written per progress step.
const INGEST_BATCH: usize = 256;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Summary,
    Ingest(Option<PathBuf>),
    Query { text: String, k: Option<usize> },
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((cmd, rest)) = args.split_first() else { return Ok(Command::Summary) };
    match cmd.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "ingest" => match rest {
            [] => Ok(Command::Ingest(None)),
            [dir] => Ok(Command::Ingest(Some(PathBuf::from(dir)))),
            _ => Err("ingest takes at most one directory".to_string()),
        },
        "query" => {
            let mut text: Option<String> = None;
            let mut k = None;
            let mut it = rest.iter();
            while let Some(arg) = it.next() {
                if arg == "--k" || arg == "-k" {
                    let value = it.next().ok_or("--k needs a value")?;
                    k = Some(value.parse::<usize>().map_err(|_| format!("invalid --k value: {value}"))?);
                } else if text.is_none() {
                    text = Some(arg.clone());
                } else {
                    return Err(format!("unexpected argument: {arg}"));
                }
            }
            let text = text.filter(|t| !t.trim().is_empty()).ok_or("query needs a text")?;
            Ok(Command::Query { text, k })
        }
        other => Err(format!("unknown command: {other}")),
    }
}

fn embedder() -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(Arc::from(get_embeddings(&EmbeddingConfig::default())?))
}

async fn ingest(dir: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| settings.data_dir());
    tracing::info!("Ingesting from {}", dir.display());
    let docs = load_directory(&dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let chunks = split_documents(docs, &ChunkingConfig::default())?;
    if chunks.is_empty() {
        tracing::warn!("Nothing to ingest in {}", dir.display());
        return Ok(());
    }

    let store = get_vectorstore(embedder()?, DEFAULT_COLLECTION, None, settings).await?;
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?
            .progress_chars("#>-"),
    );
    for batch in chunks.chunks(INGEST_BATCH) {
        store.add_documents(batch).await?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    tracing::info!(
        "Ingest complete: {} chunks into {} ({} total)",
        chunks.len(),
        store.dir().display(),
        store.count().await?
    );
    Ok(())
}

async fn query(text: &str, k: Option<usize>, settings: &Settings) -> anyhow::Result<()> {
    let retriever = get_retriever(embedder()?, k, DEFAULT_COLLECTION, None, settings).await?;
    let docs = retriever.invoke(text).await?;
    if docs.is_empty() {
        println!("No results.");
    }
    for (i, doc) in docs.iter().enumerate() {
        let source = doc.metadata.get("source").and_then(|v| v.as_str()).unwrap_or("-");
        let snippet: String = doc.page_content.chars().take(200).collect();
        println!("{}. [{}] {}", i + 1, source, snippet.replace('\n', " "));
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            std::process::exit(1);
        }
    };

    let settings = Settings::resolve().map_err(|e| {
        eprintln!("Error loading settings: {e}");
        e
    })?;
    let _logging = Logging::load(None, &settings)?.install()?;
    settings.log_summary();

    match command {
        Command::Summary | Command::Help => Ok(()),
        Command::Ingest(dir) => ingest(dir, &settings).await,
        Command::Query { text, k } => query(&text, k, &settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> { list.iter().map(|s| (*s).to_string()).collect() }

    #[test]
    fn no_arguments_only_logs_summary() {
        assert_eq!(parse_args(&[]), Ok(Command::Summary));
    }

    #[test]
    fn ingest_directory_is_optional() {
        assert_eq!(parse_args(&args(&["ingest"])), Ok(Command::Ingest(None)));
        assert_eq!(parse_args(&args(&["ingest", "docs"])), Ok(Command::Ingest(Some(PathBuf::from("docs")))));
        assert!(parse_args(&args(&["ingest", "a", "b"])).is_err());
    }

    #[test]
    fn query_accepts_k_anywhere() {
        assert_eq!(
            parse_args(&args(&["query", "--k", "2", "water filter"])),
            Ok(Command::Query { text: "water filter".into(), k: Some(2) })
        );
        assert_eq!(parse_args(&args(&["query", "water"])), Ok(Command::Query { text: "water".into(), k: None }));
    }

    #[test]
    fn usage_errors() {
        assert!(parse_args(&args(&["query"])).is_err());
        assert!(parse_args(&args(&["query", "x", "--k"])).is_err());
        assert!(parse_args(&args(&["query", "x", "--k", "many"])).is_err());
        assert!(parse_args(&args(&["serve"])).is_err());
    }
}
