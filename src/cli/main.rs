use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use photo_tooter::config::{APP_NAME, Config};
use photo_tooter::exif::ExifTool;
use photo_tooter::pipeline::{self, PostOptions};
use photo_tooter::social::{self, DryRunPublisher, MastodonClient, Publisher, Visibility};

/// One year.
const MAX_SCHEDULE_MINUTES: i64 = 525_600;

#[derive(Parser, Debug)]
#[command(
    name = "photo-tooter",
    version,
    about = "Post one toot per photo to Mastodon using embedded metadata. Accepts files and/or folders."
)]
struct Cli {
    /// Path to config file (default: ~/.config/photo-tooter/config.json)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set up Mastodon instance URL and access token
    Configure,

    /// Post each image as its own toot
    Post {
        /// Image files and/or folders containing images
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Toot text used for every image instead of Title/Description
        #[arg(short, long)]
        text: Option<String>,

        /// Visibility of each toot
        #[arg(short, long, value_enum, default_value_t = Visibility::Public)]
        visibility: Visibility,

        /// Append hashtags built from the Subject keywords
        #[arg(long)]
        hashtags: bool,

        /// Post the first image now and schedule each next one MINUTES later (10 to 525600)
        #[arg(
            long,
            value_name = "MINUTES",
            value_parser = clap::value_parser!(u32).range(10..=MAX_SCHEDULE_MINUTES)
        )]
        schedule_interval: Option<u32>,

        /// Also scan subfolders of the given folders
        #[arg(short, long)]
        recursive: bool,

        /// Show what would be posted without uploading anything
        #[arg(long)]
        dry_run: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Don't write photo-tooter-posted.txt / photo-tooter-failed.txt
        #[arg(long)]
        no_report: bool,
    },

    /// Delete every scheduled toot that has not gone out yet
    Unschedule,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Configure => {
            configure(cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Unschedule => {
            let config = Config::load(cli.config.as_deref())?;
            let client = MastodonClient::from_config(&config);
            let deleted = social::unschedule_all(&client).await?;
            println!("Deleted {deleted} scheduled toot(s).");
            Ok(ExitCode::SUCCESS)
        }
        Command::Post {
            paths,
            text,
            visibility,
            hashtags,
            schedule_interval,
            recursive,
            dry_run,
            json,
            no_report,
        } => {
            let options = PostOptions {
                text_override: text,
                visibility,
                hashtags,
                schedule_interval: schedule_interval
                    .map(|minutes| chrono::Duration::minutes(i64::from(minutes))),
            };
            post(&paths, recursive, &options, cli.config.as_deref(), dry_run, json, !no_report).await
        }
    }
}

async fn post(
    paths: &[PathBuf],
    recursive: bool,
    options: &PostOptions,
    config_path: Option<&Path>,
    dry_run: bool,
    json: bool,
    write_report: bool,
) -> Result<ExitCode> {
    // Resolve everything before touching the network
    let images = pipeline::collect_images(paths, recursive)?;
    if images.is_empty() {
        return Err(photo_tooter::Error::NoImages.into());
    }

    let publisher: Box<dyn Publisher> = if dry_run {
        log::info!("DRY RUN — nothing will be uploaded");
        Box::new(DryRunPublisher::new())
    } else {
        let config = Config::load(config_path)?;
        Box::new(MastodonClient::from_config(&config))
    };

    log::info!("Found {} image(s) to post", images.len());

    let report =
        pipeline::publish_batch(&images, &ExifTool::new(), publisher.as_ref(), options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        println!();
        for outcome in &report.outcomes {
            println!("{outcome}");
        }
    }

    if write_report && !dry_run {
        let cwd = std::env::current_dir().context("Failed to get working directory")?;
        let files = report.write_files(&cwd)?;
        if let Some(path) = files.posted {
            log::info!("Posted list written to {}", path.display());
        }
        if let Some(path) = files.failed {
            log::info!("Failed paths written to {}", path.display());
            log::info!(
                "Retry just the failures with: {APP_NAME} post $(cat {})",
                pipeline::FAILED_FILE
            );
        }
    }

    let total = report.outcomes.len();
    log::info!(
        "Done: {} succeeded, {} failed out of {total} images",
        report.succeeded(),
        report.failed()
    );

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn configure(path: Option<&Path>) -> Result<()> {
    println!("=== {APP_NAME} configuration ===");
    let base_url = prompt("Mastodon instance URL (e.g. https://mastodon.social): ")?;
    Config::validate_base_url(&base_url)?;

    println!(
        "\nCreate an application in Mastodon (Preferences → Development) and copy an access token.\n\
         Scopes needed: at least write:statuses and write:media.\n"
    );
    let access_token = prompt("Access token: ")?;
    if access_token.is_empty() {
        anyhow::bail!("Access token cannot be empty.");
    }

    let saved = Config::new(&base_url, &access_token).save(path)?;
    println!("\nSaved config to {}", saved.display());
    println!("You can now post with: {APP_NAME} post PATH");
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
