use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crawlbox")]
#[command(about = "crawlbox CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the seed pages and log their titles
    Crawl(CrawlArgs),
}

#[derive(clap::Args, Debug)]
pub struct CrawlArgs {
    /// URL to seed the queue with (repeatable)
    #[arg(long = "seed", required = true)]
    pub seeds: Vec<String>,

    /// Configuration file, overrides CRAWLBOX_CONFIG
    #[arg(long)]
    pub config: Option<PathBuf>,
}
