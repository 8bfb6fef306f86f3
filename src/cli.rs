use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pbpload",
    version,
    about = "MLB play-by-play CSV loading and status tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Load(LoadArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Root directory holding one subdirectory per export date.
    #[arg(long, default_value = "MLB_DATA_2025")]
    pub data_root: PathBuf,

    /// Name of the per-date subdirectory that holds the CSV triple.
    #[arg(long, default_value = "sport_1")]
    pub sport_dir: String,

    /// Overrides the DATABASE_URL environment variable.
    #[arg(long)]
    pub database_url: Option<PathBuf>,

    #[arg(long, default_value = ".cache/pbpload/manifests")]
    pub manifest_dir: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Overrides the DATABASE_URL environment variable.
    #[arg(long)]
    pub database_url: Option<PathBuf>,

    #[arg(long, default_value = ".cache/pbpload/manifests")]
    pub manifest_dir: PathBuf,
}
