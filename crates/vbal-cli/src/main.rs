use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use vbal_core::{format_duration, Category};

#[derive(Debug, Parser)]
#[command(name = "vbal-cli")]
#[command(about = "Viewing balance command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sync watch history from the catalog API into the local store.
    Sync,
    /// Print the balance report for a trailing window.
    Report {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Print recommendations for a category (default: the weakest one).
    Recommend {
        #[arg(long)]
        category: Option<String>,
    },
    /// Serve the JSON API.
    Serve,
    /// Delete all locally stored videos and watch events.
    Wipe,
}

fn parse_category(name: &str) -> Result<Category> {
    match Category::ALL.into_iter().find(|c| c.as_str() == name) {
        Some(category) => Ok(category),
        None => {
            let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            bail!("unknown category {name:?}; expected one of {}", valid.join(", "))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Report { days: 7 }) {
        Commands::Sync => {
            let engine = vbal_engine::engine_from_env().await?;
            let summary = engine.sync_history().await?;
            println!(
                "sync complete: run_id={} pages={} unique_videos={} events={} upserted={}",
                summary.run_id,
                summary.pages,
                summary.unique_videos,
                summary.events_recorded,
                summary.videos_upserted
            );
        }
        Commands::Report { days } => {
            let engine = vbal_engine::engine_from_env().await?;
            let report = engine.balance_report(days.max(1)).await?;
            println!("balance over the last {} days:", report.window_days);
            for score in &report.scores {
                println!(
                    "  {:<18} {:>9}  {:>5.1}%",
                    score.category.display_name(),
                    format_duration(score.raw_seconds.min(i32::MAX as i64) as i32),
                    score.normalized_score
                );
            }
            println!(
                "most under-represented: {}",
                report.lowest_category.display_name()
            );
        }
        Commands::Recommend { category } => {
            let engine = vbal_engine::engine_from_env().await?;
            let category = match category {
                Some(name) => parse_category(&name)?,
                None => engine.balance_report(7).await?.lowest_category,
            };
            let recommendations = engine.recommendations(category).await?;
            if recommendations.is_empty() {
                println!("no recommendations found for {}", category.display_name());
            }
            for video in recommendations {
                println!(
                    "  [{}] {} ({}) {}",
                    format_duration(video.duration_seconds.unwrap_or(0)),
                    video.title,
                    video.channel_title,
                    video.video_id
                );
            }
        }
        Commands::Serve => {
            vbal_web::serve_from_env().await?;
        }
        Commands::Wipe => {
            let engine = vbal_engine::engine_from_env().await?;
            engine.delete_all_local_data().await?;
            println!("local data deleted");
        }
    }

    Ok(())
}
