use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use persona_post::catalog::Catalog;
use persona_post::llm::ImageAttachment;
use persona_post::{logging, Config, GeneratedPost, ManualContext, PostImage, PostOutcome, Reactor};
use std::path::{Path, PathBuf};
use std::{env, fs, process};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit status when the URL could not be resolved and manual context is needed.
const EXIT_NEEDS_CONTEXT: i32 = 2;

#[derive(Parser)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_TIMESTAMP"), ")"),
    about = "Generate viewpoint-styled reaction posts for a URL",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a reaction post with an illustration
    Generate {
        /// URL of the article or social post
        #[arg(short, long)]
        url: String,

        /// Viewpoint id from the catalog (see `viewpoints`)
        #[arg(short, long)]
        viewpoint: String,

        /// Describe the post yourself instead of resolving it
        #[arg(long)]
        context_text: Option<String>,

        /// Screenshot of the post (png, jpeg, webp or gif)
        #[arg(long)]
        context_image: Option<PathBuf>,

        /// Write the generated image to this file
        #[arg(long)]
        image_out: Option<PathBuf>,

        /// Print the post as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the URL of the current top story of a feed
    TopStory {
        /// News source id from the catalog (see `sources`)
        #[arg(short, long, required_unless_present = "feed", conflicts_with = "feed")]
        source: Option<String>,

        /// Feed URL (RSS, Atom or JSON Feed)
        #[arg(short, long)]
        feed: Option<String>,
    },

    /// List the available viewpoints
    Viewpoints,

    /// List the available news sources
    Sources,
}

fn mime_type_for(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        other => Err(anyhow!("unsupported image type '{}' for {}", other, path.display())),
    }
}

fn manual_context(text: Option<String>, image: Option<PathBuf>) -> Result<Option<ManualContext>> {
    let image = match image {
        Some(path) => {
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read context image {}", path.display()))?;
            Some(ImageAttachment::from_bytes(mime_type_for(&path)?, &bytes))
        }
        None => None,
    };
    let context = ManualContext::new(text, image);
    Ok((!context.is_empty()).then_some(context))
}

fn write_image(post: &GeneratedPost, path: &Path) -> Result<()> {
    let written = match &post.image {
        PostImage::Generated(image) => fs::write(path, &image.bytes),
        PostImage::Placeholder => fs::write(path, persona_post::image::PLACEHOLDER_SVG),
    };
    written.with_context(|| format!("Failed to write image to {}", path.display()))
}

fn print_post(post: &GeneratedPost) {
    println!("\n{}", "═".repeat(80).bright_blue());
    println!("{}", "FULL POST".bright_blue());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", post.long_text);

    println!("\n{}", "SHORT POST".bright_blue());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", post.short_text);

    if !post.sources.is_empty() {
        println!("\n{}", "Sources".bright_blue());
        println!("{}", "─".repeat(80).dimmed());
        for (i, source) in post.sources.iter().enumerate() {
            println!("{}. {} {}", i + 1, source.title, source.uri.dimmed());
        }
    }

    let image_status = if post.image_is_placeholder {
        "placeholder (image generation failed)".bright_yellow()
    } else {
        "generated".bright_green()
    };
    println!("\n{}: {}", "Image".bright_blue(), image_status);
    println!("{}", "═".repeat(80).bright_blue());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    logging::configure_logging(&log_dir);

    let catalog = Catalog::load(env::var("CATALOG_PATH").ok().as_deref())?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
            return;
        }
        info!("Received ctrl-c, cancelling");
        ctrl_c_cancel.cancel();
    });

    match cli.command {
        Commands::Viewpoints => {
            for viewpoint in &catalog.viewpoints {
                println!("{:<24} {}", viewpoint.id.bright_green(), viewpoint.name);
            }
        }

        Commands::Sources => {
            for source in &catalog.sources {
                println!(
                    "{:<16} {:<24} {}",
                    source.id.bright_green(),
                    source.name,
                    source.rss_url.dimmed()
                );
            }
        }

        Commands::TopStory { source, feed } => {
            let config = Config::from_env()?;
            let reactor = Reactor::from_config(&config)?;
            let feed_url = match (source, feed) {
                (Some(id), _) => catalog.source(&id)?.rss_url.clone(),
                (None, Some(url)) => url,
                (None, None) => return Err(anyhow!("either --source or --feed is required")),
            };
            let url = reactor.resolve_top_story_url(&feed_url, &cancel).await?;
            println!("{}", url);
        }

        Commands::Generate {
            url,
            viewpoint,
            context_text,
            context_image,
            image_out,
            json,
        } => {
            let config = Config::from_env()?;
            let reactor = Reactor::from_config(&config)?;
            let viewpoint = catalog.viewpoint(&viewpoint)?;
            let manual = manual_context(context_text, context_image)?;

            match reactor.generate_post(&url, viewpoint, manual, &cancel).await? {
                PostOutcome::NeedsManualContext => {
                    eprintln!(
                        "{}",
                        "Could not read this post automatically.".bright_yellow()
                    );
                    eprintln!(
                        "Rerun with {} and/or {} describing what it says.",
                        "--context-text".bold(),
                        "--context-image".bold()
                    );
                    process::exit(EXIT_NEEDS_CONTEXT);
                }
                PostOutcome::Post(post) => {
                    if let Some(path) = &image_out {
                        write_image(&post, path)?;
                        info!("Wrote image to {}", path.display());
                    }
                    if json {
                        println!("{}", serde_json::to_string_pretty(&post)?);
                    } else {
                        print_post(&post);
                    }
                }
            }
        }
    }

    Ok(())
}
