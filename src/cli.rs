///
/// This module implements the full CLI interface for flickr-cli: command parsing, argument
/// validation, the async entrypoint and the user-visible summaries.
///
/// All pipeline logic (paging, rendering, checksums, duplicate grouping, upload) lives in the
/// [`flickr-cli-core`] crate. This module is strictly CLI glue: it validates inputs before any
/// network activity, loads credentials, wires the Flickr client into the core workflows and
/// prints their reports.
///
/// ## How To Use
/// - For command-line users: run the `flickr-cli` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`flickr-cli-core`]: ../../flickr-cli-core/
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use console::style;

use flickr_cli_core::checksum::HashAlgorithm;
use flickr_cli_core::contract::{CollectionSource, UserFilter};
use flickr_cli_core::workflow::{
    download, find_duplicates, maintain_checksums, upload, ChecksumEntry, ChecksumOptions,
    ChecksumOutcome, DownloadReport, DownloadRequest, FileOutcome, UploadEntry,
};

use crate::auth::authorize;
use crate::flickr::{FlickrClient, HttpFetcher};
use crate::load_config::load_config;
use crate::progress::DownloadProgress;
use crate::prompt::TerminalPrompt;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CLI for flickr-cli: bulk download, checksum, de-duplicate and upload Flickr photos.
#[derive(Parser, Debug)]
#[clap(
    name = "flickr-cli",
    version,
    about = "Download, checksum, de-duplicate and upload photos on Flickr"
)]
pub struct Cli {
    /// Path to the YAML config file holding API credentials
    #[clap(short, long, global = true, default_value = "config.yml")]
    pub config: PathBuf,

    /// Log at debug level (RUST_LOG takes precedence)
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Where and how to render downloaded photos.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Bundled template name (archive, latex) or path to a template directory
    #[clap(short, long, default_value = "archive")]
    pub template: String,

    /// Destination directory
    #[clap(short, long, default_value = "photos")]
    pub dest: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize this application with Flickr and store the access token in the config file
    Auth {
        /// Re-authorize even if a working access token is stored
        #[clap(long)]
        force: bool,
    },

    /// Download a user's photos and render them through a template
    DownloadUser {
        #[clap(flatten)]
        output: OutputArgs,

        /// NSID of the user, or `me`
        #[clap(long, default_value = "me")]
        userid: String,

        /// Earliest upload date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[clap(long)]
        min_upload_date: Option<String>,

        /// Latest upload date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[clap(long)]
        max_upload_date: Option<String>,

        /// Earliest taken date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[clap(long)]
        min_date_taken: Option<String>,

        /// Latest taken date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[clap(long)]
        max_date_taken: Option<String>,

        /// Privacy filter: 1 public, 2 friends, 3 family, 4 friends and family, 5 private
        #[clap(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        privacy: Option<u8>,
    },

    /// Download the photos of one album and render them through a template
    DownloadAlbum {
        #[clap(flatten)]
        output: OutputArgs,

        /// Album (photoset) ID
        #[clap(short, long)]
        album: String,

        /// Privacy filter: 1 public, 2 friends, 3 family, 4 friends and family, 5 private
        #[clap(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        privacy: Option<u8>,
    },

    /// Add a checksum machine tag to every photo that lacks one
    Checksums {
        /// Hash algorithm: md5 or sha1
        #[clap(long, default_value = "md5")]
        hash: String,
    },

    /// Find photos sharing a checksum tag and show how they differ
    Duplicates,

    /// Upload a file or a directory tree, skipping files whose checksum is already on Flickr
    Upload {
        /// File or directory to upload
        source: PathBuf,

        /// Hash algorithm: md5 or sha1
        #[clap(long, default_value = "md5")]
        hash: String,
    },
}

/// Accepts `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(input: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(dt);
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("invalid date '{input}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)"))
}

/// Album IDs are positive integers.
pub fn parse_album_id(input: &str) -> Result<u64> {
    match input.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => bail!("invalid album ID '{input}'"),
    }
}

pub fn parse_hash(input: &str) -> Result<HashAlgorithm> {
    input.parse::<HashAlgorithm>().map_err(anyhow::Error::from)
}

fn upload_timestamp(input: Option<&str>) -> Result<Option<i64>> {
    input
        .map(|s| parse_date(s).map(|dt| dt.and_utc().timestamp()))
        .transpose()
}

fn taken_date(input: Option<&str>) -> Result<Option<String>> {
    input
        .map(|s| parse_date(s).map(|dt| dt.format(DATE_FORMAT).to_string()))
        .transpose()
}

/// Connect with the stored access token.
fn connect(config_path: &Path) -> Result<(FlickrClient, HttpFetcher)> {
    let config = load_config(config_path)?;
    let client = FlickrClient::new(config.consumer(), Some(config.access_token()?))?;
    let fetcher = HttpFetcher::new(client.http().clone());
    Ok((client, fetcher))
}

async fn run_download(config_path: &Path, source: CollectionSource, output: OutputArgs) -> Result<()> {
    let (client, fetcher) = connect(config_path)?;
    let request = DownloadRequest {
        source,
        template: output.template,
        dest: output.dest,
    };
    let mut progress = DownloadProgress::new();
    let report = download(&client, &fetcher, &request, &mut progress)
        .await
        .context("Download failed")?;
    progress.finish();

    match report {
        DownloadReport::NoItems { dest } => println!(
            "{} No photos found; nothing written to {}",
            style("[WARNING]").yellow().bold(),
            dest.display()
        ),
        DownloadReport::Rendered {
            template,
            dest,
            summary,
        } => println!(
            "{} Rendered {} photos with '{template}' to {} ({} downloaded, {} already present)",
            style("[OK]").green().bold(),
            summary.rendered,
            dest.display(),
            summary.transferred,
            summary.skipped
        ),
    }
    Ok(())
}

fn print_checksum_entry(entry: &ChecksumEntry) {
    match &entry.outcome {
        ChecksumOutcome::AlreadyTagged { .. } => {}
        ChecksumOutcome::Added { tag } => {
            println!("{} {} {tag}", style("[OK]").green(), entry.short_url)
        }
        ChecksumOutcome::DownloadFailed { message } => println!(
            "{} {} download failed: {message}",
            style("[ERROR]").red(),
            entry.short_url
        ),
        ChecksumOutcome::TagRejected { tag, message } => println!(
            "{} {} could not add {tag}: {message}",
            style("[ERROR]").red(),
            entry.short_url
        ),
    }
}

fn print_upload_entry(entry: &UploadEntry) {
    let path = entry.path.display();
    match &entry.outcome {
        FileOutcome::Skipped { existing } => println!(
            "{} {path} already on Flickr: {existing}",
            style("[SKIP]").yellow()
        ),
        FileOutcome::Uploaded { short_url } => {
            println!("{} {path} uploaded: {short_url}", style("[OK]").green())
        }
        FileOutcome::Failed { message } => {
            println!("{} {path} failed: {message}", style("[ERROR]").red())
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!(config = ?cli.config, "trace_initialised");

    match cli.command {
        Commands::Auth { force } => authorize(&cli.config, force).await,

        Commands::DownloadUser {
            output,
            userid,
            min_upload_date,
            max_upload_date,
            min_date_taken,
            max_date_taken,
            privacy,
        } => {
            let filter = UserFilter {
                user_id: userid,
                min_upload_date: upload_timestamp(min_upload_date.as_deref())?,
                max_upload_date: upload_timestamp(max_upload_date.as_deref())?,
                min_taken_date: taken_date(min_date_taken.as_deref())?,
                max_taken_date: taken_date(max_date_taken.as_deref())?,
                privacy,
            };
            tracing::info!(command = "download-user", user_id = %filter.user_id, "Starting download");
            run_download(&cli.config, CollectionSource::User(filter), output).await
        }

        Commands::DownloadAlbum {
            output,
            album,
            privacy,
        } => {
            let album_id = parse_album_id(&album)?;
            tracing::info!(command = "download-album", album_id, "Starting download");
            run_download(
                &cli.config,
                CollectionSource::Album { album_id, privacy },
                output,
            )
            .await
        }

        Commands::Checksums { hash } => {
            let algorithm = parse_hash(&hash)?;
            let (client, fetcher) = connect(&cli.config)?;
            let options = ChecksumOptions::new(algorithm);
            let report = maintain_checksums(&client, &fetcher, &options, print_checksum_entry)
                .await
                .context("Checksum run failed")?;
            if report.no_items {
                println!("{} No photos found", style("[WARNING]").yellow().bold());
                return Ok(());
            }
            let label = if report.failed() > 0 {
                style("[WARNING]").yellow().bold()
            } else {
                style("[OK]").green().bold()
            };
            println!(
                "{label} {} tagged, {} already tagged, {} failed",
                report.added(),
                report.already_tagged(),
                report.failed()
            );
            Ok(())
        }

        Commands::Duplicates => {
            let (client, _) = connect(&cli.config)?;
            let prompt = TerminalPrompt::new();
            let report = find_duplicates(&client, &prompt)
                .await
                .context("Duplicate search failed")?;
            if report.no_items {
                println!("{} No photos found", style("[WARNING]").yellow().bold());
                return Ok(());
            }
            if !report.no_checksum.is_empty() {
                println!(
                    "{} {} photos have no checksum tag (run `flickr-cli checksums`):",
                    style("[WARNING]").yellow().bold(),
                    report.no_checksum.len()
                );
                for url in &report.no_checksum {
                    println!("  {url}");
                }
            }
            for resolved in &report.groups {
                if let Some(keep) = resolved
                    .choice
                    .and_then(|i| resolved.group.short_urls().get(i).cloned())
                {
                    println!("{} keep {keep}", resolved.group.tag);
                }
            }
            println!(
                "{} Scanned {} photos, found {} duplicate groups",
                style("[OK]").green().bold(),
                report.scanned,
                report.groups.len()
            );
            Ok(())
        }

        Commands::Upload { source, hash } => {
            let algorithm = parse_hash(&hash)?;
            if !source.exists() {
                bail!("upload source {} does not exist", source.display());
            }
            let (client, _) = connect(&cli.config)?;
            let report = upload(&client, &source, algorithm, print_upload_entry)
                .await
                .context("Upload failed")?;
            let label = if report.failed() > 0 {
                style("[WARNING]").yellow().bold()
            } else {
                style("[OK]").green().bold()
            };
            println!(
                "{label} {} uploaded, {} skipped, {} failed",
                report.uploaded(),
                report.skipped(),
                report.failed()
            );
            Ok(())
        }
    }
}
