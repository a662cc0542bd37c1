//! run_pipeline - detect and track objects over one video, logging per-frame metrics

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use traffyx::pipeline::open_source;
use traffyx::ui::Ui;
use traffyx::{CancelToken, PipelineConfig, PipelineRunner};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video file, or a stub:// synthetic stream.
    #[arg(long)]
    video: String,
    /// Pipeline config (TOML or JSON). Defaults apply when the file is missing.
    #[arg(long, env = "TRAFFYX_CONFIG", default_value = "params.toml")]
    config: PathBuf,
    /// Write metrics here instead of a timestamped log in the metrics dir.
    #[arg(long, value_name = "PATH")]
    metrics_out: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut config = {
        let _stage = ui.stage("Load config");
        PipelineConfig::load(Some(&args.config))?
    };
    if let Some(path) = args.metrics_out {
        config.metrics.path = Some(path);
    }

    let cancel = CancelToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || handler_cancel.cancel()).expect("error setting Ctrl-C handler");

    // Open the source before the detector so a bad path leaves no metrics log.
    let source = {
        let _stage = ui.stage("Open video source");
        open_source(&args.video)?
    };
    let runner = {
        let _stage = ui.stage("Load detector");
        PipelineRunner::from_config(&config)?.with_cancel(cancel)
    };

    let report = runner.run(source)?;
    ui.report(&report);
    Ok(())
}
