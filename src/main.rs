mod cli;

use clap::Parser;
use cli::{Cli, Commands, CrawlArgs};
use crawlbox::config::Config;
use crawlbox::{Engine, FetchContext, Request, Rule};
use scraper::Selector;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => crawl(args).await?,
    }

    Ok(())
}

async fn crawl(args: CrawlArgs) -> Result<(), AnyError> {
    let config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let engine = Arc::new(Engine::new(config)?);

    let title = Selector::parse("title").map_err(|e| e.to_string())?;
    engine.add_rule(
        "default",
        Rule::parse(move |ctx: &FetchContext<'_>| {
            let page_title = ctx
                .document()
                .select(&title)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string());

            let page = json!({
                "url": ctx.response().url,
                "status": ctx.status().as_u16(),
                "title": page_title,
            });
            if let Err(e) = ctx.record("pages", page) {
                warn!(error = %e, "Failed to record page");
            }
            true
        }),
    );

    for seed in args.seeds {
        engine.enqueue(Request::new(seed));
    }

    let mut runner = tokio::spawn(Arc::clone(&engine).run());

    tokio::select! {
        result = &mut runner => return Ok(result??),
        _ = tokio::signal::ctrl_c() => engine.shutdown(),
    }

    // Let the final flush finish
    runner.await??;
    Ok(())
}
