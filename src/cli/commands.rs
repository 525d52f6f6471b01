//! CLI command implementations.

use std::path::Path;

use chrono::Utc;

use crate::config::RecallConfig;
use crate::embedding::HashingEmbedder;
use crate::engine::{load_seed_file, RetrievalService};
use crate::types::{CrisisType, RecallResult};

/// Build a service from an optional config file and load a seed file into it.
pub fn open_service(
    seed: &Path,
    config: Option<&Path>,
) -> RecallResult<(RetrievalService, HashingEmbedder)> {
    let config = match config {
        Some(path) => RecallConfig::from_file(path)?,
        None => RecallConfig::default(),
    };
    let embedder = HashingEmbedder::new(config.dimension);
    let service = RetrievalService::new(config)?;
    let seeds = load_seed_file(seed)?;
    service.load_seed(seeds, Some(&embedder))?;
    Ok((service, embedder))
}

/// Display a summary of the loaded index.
pub fn cmd_info(seed: &Path, config: Option<&Path>, json: bool) -> RecallResult<()> {
    let (service, _) = open_service(seed, config)?;
    let snapshot = service.snapshot(Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("Seed file: {}", seed.display());
        println!("Dimension: {}", service.dimension());
        println!("Backend: {} ({:?})", snapshot.backend, snapshot.accuracy);
        println!("Incidents: {}", snapshot.total);
        println!("  Seed: {}", snapshot.seed);
        println!("  Submitted: {}", snapshot.submitted);
        println!("  Last 24h: {}", snapshot.last_24h);
        println!("Most recent:");
        for record in &snapshot.recent {
            println!(
                "  {} [{}] {}",
                record.id,
                record.crisis_type,
                record.created_at.to_rfc3339()
            );
        }
    }
    Ok(())
}

/// Count incidents per crisis type.
pub fn cmd_catalog(seed: &Path, config: Option<&Path>, json: bool) -> RecallResult<()> {
    let (service, _) = open_service(seed, config)?;
    let catalog = service.catalog();

    if json {
        let by_name: serde_json::Map<String, serde_json::Value> = catalog
            .iter()
            .map(|(ct, n)| (ct.name().to_string(), serde_json::Value::from(*n)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&by_name)?);
    } else {
        for (crisis_type, count) in &catalog {
            println!("{:<12} {}", crisis_type.name().to_uppercase(), count);
        }
    }
    Ok(())
}

/// Arguments for [`cmd_search`].
pub struct SearchArgs<'a> {
    pub text: Option<&'a str>,
    pub image: Option<&'a Path>,
    pub k: Option<usize>,
    pub min_score: Option<f32>,
    pub crisis_types: Vec<CrisisType>,
    pub explain: bool,
}

/// Embed the query inputs and print ranked matches.
pub fn cmd_search(
    seed: &Path,
    config: Option<&Path>,
    args: SearchArgs<'_>,
    json: bool,
) -> RecallResult<()> {
    let (service, embedder) = open_service(seed, config)?;
    let image_bytes = match args.image {
        Some(path) => Some(std::fs::read(path)?),
        None => None,
    };

    let mut request = service.embed_request(&embedder, image_bytes.as_deref(), args.text)?;
    request.k = args.k;
    request.min_score = args.min_score;
    request.filter.crisis_types = args.crisis_types;

    let results = service.find_similar(&request)?;
    let explanation = service.explain(&results);

    if json {
        let out = serde_json::json!({
            "results": results,
            "explanation": if args.explain { Some(&explanation) } else { None },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if results.is_empty() {
            println!("No similar incidents found.");
        }
        for (rank, r) in results.iter().enumerate() {
            println!(
                "#{} {} [{}] raw={:.4} decayed={:.4} age={:.1}h x{:.2}",
                rank + 1,
                r.record.id,
                r.record.crisis_type,
                r.raw_score,
                r.decayed_score,
                r.age_hours,
                r.decay_multiplier
            );
        }
        if args.explain {
            println!();
            print!("{}", explanation);
        }
    }
    Ok(())
}
