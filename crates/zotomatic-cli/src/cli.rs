use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zotomatic")]
#[command(about = "PDF ingestion engine for a Zotero-backed note vault")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging (shortcut for `$ZOTOMATIC_LOG=debug`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to `<config_dir>/zotomatic/config.toml`).
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the PDF library and produce or update notes.
    Scan {
        /// Initial scan, drain the seed buffer and pending queue, then exit (default).
        #[arg(long, conflicts_with_all = ["watch", "path"])]
        once: bool,

        /// Same as `--once`, then stay resident handling new filesystem events.
        #[arg(long, conflicts_with_all = ["once", "path"])]
        watch: bool,

        /// Bypass the watcher; run the note workflow once per path, in order.
        #[arg(long, value_name = "PDF", num_args = 1.., conflicts_with_all = ["once", "watch"])]
        path: Vec<PathBuf>,

        /// Ignore the FileState dedup check during the initial scan.
        #[arg(long, conflicts_with = "path")]
        force: bool,

        /// Override the configured summary mode for this run.
        #[arg(long, value_enum)]
        summary_mode: Option<SummaryModeArg>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryModeArg {
    Quick,
    Standard,
    Deep,
}

impl From<SummaryModeArg> for zotomatic_core::SummaryMode {
    fn from(value: SummaryModeArg) -> Self {
        match value {
            SummaryModeArg::Quick => zotomatic_core::SummaryMode::Quick,
            SummaryModeArg::Standard => zotomatic_core::SummaryMode::Standard,
            SummaryModeArg::Deep => zotomatic_core::SummaryMode::Deep,
        }
    }
}
