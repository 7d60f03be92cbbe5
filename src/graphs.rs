//! Analytics and knowledge-graph commands.
//!
//! `overview` fetches the backend's prepared analytics charts and prints
//! their metadata (`--json` dumps the raw figures for external plotting;
//! rendering is out of scope here). `tags` builds a local knowledge-graph
//! summary from chunk tags: chunks sharing a tag are adjacent, so the tag
//! list of each chunk doubles as an adjacency list.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::guard;
use crate::models::ContextChunk;
use crate::session::Session;

pub async fn run_overview(session: &Session, project_id: Option<String>, json: bool) -> Result<()> {
    guard::require_user(session).await?;
    let reports = session.client().graph_overview(project_id.as_deref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No charts.");
        return Ok(());
    }

    for report in &reports {
        println!("--- {} ---", report.chart_id);
        println!("title:       {}", report.title);
        println!("description: {}", report.description);
        if !report.meta.is_null() {
            println!("meta:        {}", report.meta);
        }
        println!();
    }
    Ok(())
}

/// Tag co-occurrence graph over a set of chunks.
///
/// Nodes are tags weighted by how many chunks carry them; an edge joins
/// two tags that appear on the same chunk, weighted by co-occurrence
/// count. Deterministic ordering via `BTreeMap` keeps output stable.
#[derive(Debug, Default)]
pub struct TagGraph {
    /// tag → number of chunks carrying it
    pub nodes: BTreeMap<String, usize>,
    /// (tag a, tag b) with a < b → co-occurrence count
    pub edges: BTreeMap<(String, String), usize>,
}

pub fn build_tag_graph(chunks: &[ContextChunk]) -> TagGraph {
    let mut graph = TagGraph::default();

    for chunk in chunks {
        let mut tags = chunk.tags();
        tags.sort();
        tags.dedup();

        for tag in &tags {
            *graph.nodes.entry(tag.clone()).or_insert(0) += 1;
        }
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                *graph
                    .edges
                    .entry((a.clone(), b.clone()))
                    .or_insert(0) += 1;
            }
        }
    }

    graph
}

pub async fn run_tags(
    session: &Session,
    config: &Config,
    query: Option<String>,
    project_id: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    guard::require_user(session).await?;

    // A zero threshold ranks every stored chunk, so an empty query still
    // pulls the full picture for the graph.
    let query = query.unwrap_or_default();
    let limit = limit.unwrap_or(config.retrieval.limit.max(100));

    let chunks = match project_id.as_deref() {
        Some(project) => {
            session
                .client()
                .retrieve_vectors(&query, project, limit, 0.0)
                .await?
        }
        None => {
            session
                .client()
                .search_context(&query, None, limit, 0.0)
                .await?
        }
    };

    let graph = build_tag_graph(&chunks);

    if graph.nodes.is_empty() {
        println!("No tags found in {} chunk(s).", chunks.len());
        return Ok(());
    }

    println!(
        "Tag graph over {} chunk(s): {} tag(s), {} edge(s)",
        chunks.len(),
        graph.nodes.len(),
        graph.edges.len()
    );
    println!();

    println!("--- Tags ---");
    for (tag, count) in &graph.nodes {
        println!("{:<24} {} chunk(s)", tag, count);
    }
    println!();

    println!("--- Edges ---");
    for ((a, b), weight) in &graph.edges {
        println!("{} <-> {}  (x{})", a, b, weight);
    }
    Ok(())
}
