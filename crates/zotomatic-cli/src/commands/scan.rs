use std::path::PathBuf;

use anyhow::Result;
use zotomatic_config::Config;
use zotomatic_daemon::{Engine, EngineConfig, RunMode};

use crate::cli::SummaryModeArg;

pub struct ScanArgs {
    pub once: bool,
    pub watch: bool,
    pub path: Vec<PathBuf>,
    pub force: bool,
    pub summary_mode: Option<SummaryModeArg>,
}

/// Resolves the parsed flags to a [`RunMode`], `--once` being the default
/// when none of `--once`/`--watch`/`--path` was given (`spec.md` §6).
fn resolve_mode(args: &ScanArgs) -> RunMode {
    if !args.path.is_empty() {
        RunMode::Paths(args.path.clone())
    } else if args.watch {
        RunMode::Watch
    } else {
        RunMode::Once
    }
}

pub async fn execute(config_path: Option<PathBuf>, args: ScanArgs) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    let mode = resolve_mode(&args);
    let engine_config = EngineConfig::from_config(&config, args.force)?;
    let engine = Engine::new(engine_config)?;
    engine.set_summary_mode_override(args.summary_mode.map(Into::into));

    engine.run(mode).await?;
    Ok(())
}
