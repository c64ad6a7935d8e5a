use chrono::Utc;
use clap::{Parser, Subcommand};
use photo_blog::snapshot::{Snapshot, SnapshotProvider};
use photo_blog::{blog, config, feed, output, provider::Providers};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-blog")]
#[command(about = "Inspect a photo blog: posts, series, categories and changes")]
#[command(long_about = "\
Inspect a photo blog: posts, series, categories and changes

Posts come from a JSON snapshot of the photo provider. Posts whose titles
share the text before the subtitle separator and sit next to each other in
time become a series:

  Brother Ride: Day 1     → brother-ride           (part 1 of 3)
  Brother Ride: Day 2     → brother-ride/day-2     (part 2 of 3)
  Brother Ride: Day 3     → brother-ride/day-3     (part 3 of 3)

Set RUST_LOG=info to see load events.

Run 'photo-blog gen-config' to generate a documented blog.toml.")]
#[command(version)]
struct Cli {
    /// Blog config file (stock defaults when absent)
    #[arg(long, default_value = "blog.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a snapshot and print posts, series and categories
    Check {
        /// Snapshot JSON file
        snapshot: PathBuf,
    },
    /// Load one snapshot, reload from another and print the changed keys
    Diff {
        /// Snapshot before the change
        before: PathBuf,
        /// Snapshot after the change
        after: PathBuf,
    },
    /// Print the Atom feed of a snapshot as JSON
    Feed {
        /// Snapshot JSON file
        snapshot: PathBuf,
    },
    /// Print a stock blog.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { snapshot } => {
            let (blog, _) = open_blog(&cli.config, &snapshot).await?;
            output::print_blog(&blog);
        }
        Command::Diff { before, after } => {
            let (mut blog, provider) = open_blog(&cli.config, &before).await?;
            provider.replace(Snapshot::from_file(&after)?);
            // load() is a no-op once loaded, so run the provider cycle directly
            let post_provider = blog.providers().post()?;
            post_provider.photo_blog(&mut blog).await?;
            output::print_changes(blog.changed_keys());
        }
        Command::Feed { snapshot } => {
            let (blog, _) = open_blog(&cli.config, &snapshot).await?;
            let feed = feed::blog_feed(&blog, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Create the blog over a snapshot provider and run the first load.
async fn open_blog(
    config_path: &Path,
    snapshot: &Path,
) -> Result<(MutexGuard<'static, blog::PhotoBlog>, Arc<SnapshotProvider>), Box<dyn std::error::Error>>
{
    let config = config::load_config(config_path)?;
    let provider = Arc::new(SnapshotProvider::open(snapshot)?);
    let blog = blog::init(config, Providers::from_provider(provider.clone()))?;
    let mut guard = blog.lock().await;
    guard.load(false).await?;
    Ok((guard, provider))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}
