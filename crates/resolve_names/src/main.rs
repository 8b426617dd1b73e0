//! One-shot CURIE resolution tool.
//!
//! Reads CURIEs from the command line (or stdin, one per line, when no
//! arguments are given), resolves them against a Node Normalizer
//! deployment, and prints `curie<TAB>name` lines to stdout.

use std::io::BufRead;

use anyhow::Result;
use nodenorm::{NodeNormClient, NormalizeOptions, POST_BATCH_LIMIT};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.to_lowercase() == "true")
}

/// CURIEs from argv, falling back to stdin lines.
fn read_curies() -> Result<Vec<String>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args);
    }
    let mut curies = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let curie = line.trim();
        if !curie.is_empty() {
            curies.push(curie.to_string());
        }
    }
    Ok(curies)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Configuration from environment
    let base_url =
        std::env::var("NODENORM_URL").unwrap_or_else(|_| "https://nodenorm.transltr.io".into());
    let batch_limit: usize = std::env::var("NODENORM_BATCH_LIMIT")
        .unwrap_or_else(|_| POST_BATCH_LIMIT.to_string())
        .parse()
        .unwrap_or(POST_BATCH_LIMIT);

    let options = NormalizeOptions {
        gene_protein_conflation: env_flag("NODENORM_CONFLATE"),
        drug_chemical_conflation: env_flag("NODENORM_DRUG_CHEMICAL_CONFLATE"),
        ..Default::default()
    };

    let curies = read_curies()?;
    if curies.is_empty() {
        warn!("No identifiers given; pass CURIEs as arguments or on stdin");
        return Ok(());
    }

    info!(
        "Resolving {} identifiers against {}...",
        curies.len(),
        base_url
    );

    let client = NodeNormClient::builder()
        .base_url(base_url)
        .batch_limit(batch_limit)
        .build();
    let resolved = client.resolve_preferred_names(&curies, &options).await?;

    for curie in &curies {
        if let Some(name) = resolved.names.get(curie) {
            println!("{}\t{}", curie, name);
        }
    }

    if !resolved.unresolved.is_empty() {
        info!(
            "{} of {} identifiers had no preferred name",
            resolved.unresolved.len(),
            curies.len()
        );
    }

    Ok(())
}
