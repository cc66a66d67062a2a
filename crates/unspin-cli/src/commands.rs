//! Implementations of the `unspin` subcommands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use unspin_core::{Engine, detect, score};
use unspin_core::neutralizer::local_rewrite;
use unspin_llm::{OllamaProvider, RetryConfig, RetryPolicy};
use unspin_types::{EngineConfig, Fragment, Technique};
use uuid::Uuid;

/// Arguments for `unspin run`.
#[derive(Args)]
pub struct RunArgs {
    /// Config file path (overrides the default location).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Model name (overrides the configured one).
    #[arg(long)]
    pub model: Option<String>,

    /// Skip the external service and use the local rewrite only.
    #[arg(long)]
    pub local: bool,
}

fn resolve_path(path: Option<&str>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => EngineConfig::default_path(),
    }
}

fn load_config(path: Option<&str>) -> EngineConfig {
    EngineConfig::load(&resolve_path(path))
}

/// Read fragments from stdin, one per line, and emit results as JSON
/// lines on stdout. Rejections are emitted inline as failure objects.
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref());
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.local {
        config.auto_neutralize = false;
    }

    let provider = Arc::new(RetryPolicy::new(
        OllamaProvider::new(config.request_timeout()),
        RetryConfig::default(),
    ));
    let engine = Engine::new(config, provider)?;

    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let handle = Uuid::new_v4().to_string();
        match engine.submit(Fragment::new(text, handle.as_str())) {
            Ok(Some(rx)) => pending.push((handle, rx)),
            // Handles are fresh UUIDs, so duplicates cannot occur.
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "fragment rejected");
                println!(
                    "{}",
                    serde_json::json!({
                        "handle": handle,
                        "outcome": "rejected",
                        "reason": err.to_string(),
                    })
                );
            }
        }
    }

    for (handle, rx) in pending {
        let outcome = rx.await?;
        let mut value = serde_json::to_value(&outcome)?;
        value["handle"] = serde_json::Value::String(handle);
        println!("{value}");
    }

    let stats = engine.cache().stats();
    info!(
        entries = stats.total_entries,
        hits = stats.cache_hits,
        misses = stats.cache_misses,
        "run complete"
    );

    Ok(())
}

/// Detect, score, and locally rewrite one fragment without touching
/// the external service.
pub fn check(text: &str) -> anyhow::Result<()> {
    let matches = detect(text);
    let techniques: Vec<Technique> = matches.iter().map(|m| m.technique).collect();
    let result = score(text, &techniques);
    let (rewritten, _) = local_rewrite(text);

    let report = serde_json::json!({
        "techniques": matches,
        "severity": result.severity,
        "intensity": result.intensity,
        "centrality": result.centrality,
        "local_rewrite": rewritten,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the resolved configuration.
pub fn config_show(path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(path);
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write a default configuration file.
pub fn config_init(path: Option<&str>) -> anyhow::Result<()> {
    let target = resolve_path(path);
    if target.exists() {
        anyhow::bail!("config file already exists: {}", target.display());
    }
    EngineConfig::default().save(&target)?;
    println!("wrote {}", target.display());
    Ok(())
}

/// Print the default configuration file location.
pub fn config_path() {
    println!("{}", EngineConfig::default_path().display());
}

/// Probe the neutralization service.
pub async fn health(base_url: Option<&str>) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(2);
    let provider = match base_url {
        Some(url) => OllamaProvider::with_base_url(url, timeout),
        None => OllamaProvider::new(timeout),
    };

    if provider.is_healthy().await {
        println!("service reachable");
        Ok(())
    } else {
        anyhow::bail!("service unreachable")
    }
}
