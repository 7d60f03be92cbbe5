//! Context commands: save, semantic search, retrieval.
//!
//! `search` queries across every project the user can access; `retrieve`
//! is the project-scoped variant. Both return chunks ranked by similarity
//! with scores in [0, 1].

use anyhow::{Context as _, Result};
use std::io::Read;

use crate::config::Config;
use crate::guard;
use crate::models::ContextChunk;
use crate::session::Session;

pub async fn run_save(
    session: &Session,
    content: &str,
    project_id: Option<String>,
    tags: Vec<String>,
    source: &str,
) -> Result<()> {
    guard::require_user(session).await?;

    // `-` reads the content from stdin, for piping.
    let content = if content == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read content from stdin")?;
        buf
    } else {
        content.to_string()
    };

    if content.trim().is_empty() {
        anyhow::bail!("Content must not be empty.");
    }

    let receipt = session
        .client()
        .save_context(&content, project_id.as_deref(), &tags, source)
        .await?;
    println!("Saved context {} ({})", receipt.context_id, receipt.status);
    Ok(())
}

pub async fn run_search(
    session: &Session,
    config: &Config,
    query: &str,
    project_id: Option<String>,
    limit: Option<i64>,
    threshold: Option<f64>,
) -> Result<()> {
    guard::require_user(session).await?;

    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let limit = limit.unwrap_or(config.retrieval.limit);
    let threshold = threshold.unwrap_or(config.retrieval.similarity_threshold);

    let chunks = session
        .client()
        .search_context(query, project_id.as_deref(), limit, threshold)
        .await?;

    print_ranked(&chunks);
    Ok(())
}

pub async fn run_get(session: &Session, id: &str) -> Result<()> {
    guard::require_user(session).await?;
    let content = session.client().get_context(id).await?;
    println!("{}", content);
    Ok(())
}

pub async fn run_retrieve(
    session: &Session,
    config: &Config,
    query: &str,
    project_id: &str,
    limit: Option<i64>,
    threshold: Option<f64>,
) -> Result<()> {
    guard::require_user(session).await?;

    let limit = limit.unwrap_or(config.retrieval.limit);
    let threshold = threshold.unwrap_or(config.retrieval.similarity_threshold);

    let chunks = session
        .client()
        .retrieve_vectors(query, project_id, limit, threshold)
        .await?;

    print_ranked(&chunks);
    Ok(())
}

fn print_ranked(chunks: &[ContextChunk]) {
    if chunks.is_empty() {
        println!("No results.");
        return;
    }

    for (rank, chunk) in chunks.iter().enumerate() {
        let score = chunk
            .similarity_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "  -  ".to_string());
        println!("{:>2}. [{}] {}", rank + 1, score, chunk.id);
        let tags = chunk.tags();
        if !tags.is_empty() {
            println!("    tags: {}", tags.join(", "));
        }
        println!("    {}", snippet(&chunk.content, 160));
    }
}

/// First line of the content, truncated at a char boundary.
fn snippet(content: &str, max_chars: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars).collect();
    format!("{}…", cut)
}
