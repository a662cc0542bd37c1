//! metrics_report - summarize a pipeline metrics log, optionally against a second run

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use traffyx::metrics::{read_jsonl, MetricsSummary};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Metrics log, or a directory whose newest .jsonl log is used.
    #[arg(default_value = "logs")]
    log: PathBuf,
    /// Second log (or directory) to compare FPS against.
    #[arg(long, value_name = "PATH")]
    compare: Option<PathBuf>,
    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (path, summary) = load_summary(&args.log)?;
    let other = args
        .compare
        .as_deref()
        .map(load_summary)
        .transpose()?;

    if args.json {
        let mut out = serde_json::json!({
            "log": path.display().to_string(),
            "summary": summary,
        });
        if let Some((other_path, other_summary)) = &other {
            out["compare"] = serde_json::json!({
                "log": other_path.display().to_string(),
                "summary": other_summary,
                "speedup": summary.speedup(other_summary),
            });
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_summary(&path, &summary);
    if let Some((other_path, other_summary)) = &other {
        println!();
        print_summary(other_path, other_summary);
        match summary.speedup(other_summary) {
            Some(speedup) => println!("\nspeedup: {:.2}x", speedup),
            None => println!("\nspeedup: n/a (baseline has no processed frames)"),
        }
    }
    Ok(())
}

fn load_summary(path: &Path) -> Result<(PathBuf, MetricsSummary)> {
    let path = resolve_log(path)?;
    let records = read_jsonl(&path)?;
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok((path, MetricsSummary::from_records(&records)))
}

/// A file is used as is; a directory resolves to its most recently modified log.
fn resolve_log(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in
        fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?
    {
        let entry = entry?;
        let candidate = entry.path();
        if candidate.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, candidate));
        }
    }
    newest
        .map(|(_, p)| p)
        .ok_or_else(|| anyhow!("no .jsonl metrics logs in {}", path.display()))
}

fn print_summary(path: &Path, s: &MetricsSummary) {
    println!("log:            {}", path.display());
    println!("frames:         {} processed, {} dropped", s.processed, s.dropped);
    println!("avg fps:        {:.2}", s.avg_fps);
    println!("e2e p50 / p95:  {:.2} / {:.2} ms", s.p50_latency_ms, s.p95_latency_ms);
    println!(
        "mean stages:    decode {:.2} | inference {:.2} | tracking {:.2} | postprocess {:.2} ms",
        s.mean_latency_ms.decode,
        s.mean_latency_ms.inference,
        s.mean_latency_ms.tracking,
        s.mean_latency_ms.postprocess
    );
    match s.peak_memory_mb {
        Some(mb) => println!("peak memory:    {:.2} MiB", mb),
        None => println!("peak memory:    n/a"),
    }
}
