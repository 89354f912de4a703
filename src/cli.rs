use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "lawchunk",
    version,
    about = "Structure-aware chunking for Chinese legal codes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Chunk(ChunkArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "parsed_document")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "chunk_output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long, default_value = "parsed_document")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "chunk_output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = 1000)]
    pub max_chunk_chars: usize,

    #[arg(long, default_value = "中华人民共和国劳动法")]
    pub title_phrase: String,

    #[arg(long, default_value_t = 4)]
    pub workers: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "chunk_output")]
    pub output_dir: PathBuf,
}
