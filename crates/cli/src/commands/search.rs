//! Search command handler.

use clap::Args;
use docask_core::{config::AppConfig, AppError, AppResult};
use docask_knowledge::retrieval::truncate_snippet;
use docask_knowledge::SearchMode;

const MAX_SNIPPET_CHARS: usize = 150;

/// Search the index directly
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Search query
    pub query: String,

    /// Matching mode (keyword, vector)
    #[arg(long, default_value = "vector")]
    pub mode: String,

    /// Maximum number of results (default: ask.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum vector similarity (default: ask.minScore)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mode = SearchMode::parse(&self.mode).ok_or_else(|| {
            AppError::Config(format!(
                "Unknown search mode '{}'. Use 'keyword' or 'vector'.",
                self.mode
            ))
        })?;
        let top_k = self.top_k.unwrap_or(config.ask.top_k);
        let min_score = self.min_score.unwrap_or(config.ask.min_score);

        tracing::info!(mode = mode.as_str(), top_k, min_score, "Executing search command");

        let retrieval = docask_knowledge::open_retrieval(config)?;
        let stats = retrieval.stats().await?;
        tracing::debug!(
            documents = stats.sources_count,
            chunks = stats.chunks_count,
            "Index opened"
        );
        let results = retrieval.search(&self.query, mode, top_k, min_score).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        println!(
            "Searched {} chunks from {} documents.",
            stats.chunks_count, stats.sources_count
        );

        if results.is_empty() {
            println!("No results for \"{}\".", self.query);
            return Ok(());
        }

        for (i, result) in results.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} ({})",
                i + 1,
                result.relevance_score,
                result.source_ref,
                result.document_id
            );
            println!(
                "   {}",
                truncate_snippet(&result.excerpt.replace('\n', " "), MAX_SNIPPET_CHARS)
            );
        }

        Ok(())
    }
}
