//! CLI entry point for blog-catalog

use anyhow::Result;
use blog_catalog::{BlogQueryOptions, BlogSite, SortBy, SortOrder};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blog-catalog")]
#[command(version)]
#[command(about = "Load, validate and query a markdown blog collection", long_about = None)]
struct Cli {
    /// Set the site base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts, optionally filtered and sorted
    #[command(alias = "ls")]
    List {
        /// Only posts with this tag (repeat to require several)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Only posts by this author
        #[arg(short, long)]
        author: Option<String>,

        /// Maximum number of posts
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Sort field (pubDate, title)
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort order (asc, desc)
        #[arg(long)]
        sort_order: Option<String>,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single post as JSON
    Show {
        /// Post id
        id: String,

        /// Print only the rendered HTML
        #[arg(long)]
        html: bool,
    },

    /// List tags with post counts
    Tags,

    /// Validate every post and report failures
    Check,

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// Tags of the new post
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Reload the catalog whenever posts change
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "blog_catalog=debug,info"
    } else {
        "blog_catalog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let site = BlogSite::new(&base_dir)?;

    match cli.command {
        Commands::List {
            tags,
            author,
            limit,
            sort_by,
            sort_order,
            json,
        } => {
            // A single tag maps to the tag filter, several to the all-tags filter
            let mut options = BlogQueryOptions {
                author,
                limit,
                sort_by: sort_by.as_deref().map(str::parse::<SortBy>).transpose()?,
                sort_order: sort_order.as_deref().map(str::parse::<SortOrder>).transpose()?,
                ..Default::default()
            };
            match tags.len() {
                0 => {}
                1 => options.tag = tags.into_iter().next(),
                _ => options.tags = Some(tags),
            }
            blog_catalog::commands::list::run(&site, &options, json)?;
        }

        Commands::Show { id, html } => {
            blog_catalog::commands::show::run(&site, &id, html)?;
        }

        Commands::Tags => {
            blog_catalog::commands::tags::run(&site)?;
        }

        Commands::Check => {
            blog_catalog::commands::check::run(&site)?;
        }

        Commands::New { title, tags } => {
            tracing::info!("Creating new post with title: {}", title);
            let path = blog_catalog::commands::new::create_post(&site, &title, &tags)?;
            println!("Created {}", path.display());
        }

        Commands::Watch => {
            blog_catalog::commands::watch::run(&site).await?;
        }
    }

    Ok(())
}
