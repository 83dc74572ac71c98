//! Checksum workflow: make sure every photo carries a `checksum:<algorithm>=<hex>` tag.
//!
//! Photos whose listing tag blob already holds a tag for the chosen algorithm are skipped
//! without further calls. Every other photo is downloaded to a single scratch file, hashed,
//! and tagged. Download failures and rejected tag writes are recorded and the run goes on;
//! listing, detail and transport errors abort it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::checksum::{build_tag, find_existing_tag, hash_file, HashAlgorithm};
use crate::contract::{
    BinaryFetcher, CollectionSource, ItemSummary, ListQuery, PhotoService, TagWriteOutcome,
    UserFilter,
};
use crate::detail::fetch_detail;
use crate::error::WorkflowError;
use crate::pager::CollectionPager;
use crate::short_url::short_url;
use crate::transfer::{create_dir_owner_only, TransferGuard, TransferSource};
use crate::Result;

/// Directory under the system temp dir that holds the scratch file.
pub const SCRATCH_DIR_NAME: &str = "flickr-cli";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumOptions {
    pub algorithm: HashAlgorithm,
    pub scratch_dir: PathBuf,
}

impl ChecksumOptions {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            scratch_dir: std::env::temp_dir().join(SCRATCH_DIR_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    AlreadyTagged { tag: String },
    Added { tag: String },
    DownloadFailed { message: String },
    TagRejected { tag: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub id: String,
    pub short_url: String,
    pub outcome: ChecksumOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumReport {
    /// True when the listing reported no photos at all.
    pub no_items: bool,
    pub entries: Vec<ChecksumEntry>,
}

impl ChecksumReport {
    pub fn added(&self) -> usize {
        self.count(|o| matches!(o, ChecksumOutcome::Added { .. }))
    }

    pub fn already_tagged(&self) -> usize {
        self.count(|o| matches!(o, ChecksumOutcome::AlreadyTagged { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ChecksumOutcome::DownloadFailed { .. } | ChecksumOutcome::TagRejected { .. }
            )
        })
    }

    fn count(&self, f: impl Fn(&ChecksumOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| f(&e.outcome)).count()
    }
}

pub async fn maintain_checksums<S, F>(
    service: &S,
    fetcher: &F,
    options: &ChecksumOptions,
    mut on_entry: impl FnMut(&ChecksumEntry),
) -> Result<ChecksumReport>
where
    S: PhotoService + ?Sized,
    F: BinaryFetcher + ?Sized,
{
    prepare_scratch_dir(&options.scratch_dir)?;

    // The scratch directory goes away on every exit path, including aborted runs.
    let result = checksum_collection(service, fetcher, options, &mut on_entry).await;
    match fs::remove_dir_all(&options.scratch_dir) {
        Ok(()) => info!(dir = %options.scratch_dir.display(), "[CHECKSUMS] Deleted scratch directory"),
        Err(e) => warn!(
            dir = %options.scratch_dir.display(),
            error = %e,
            "[CHECKSUMS] Could not delete scratch directory"
        ),
    }
    let report = result?;

    info!(
        added = report.added(),
        already_tagged = report.already_tagged(),
        failed = report.failed(),
        "[CHECKSUMS] Finished"
    );
    Ok(report)
}

async fn checksum_collection<S, F>(
    service: &S,
    fetcher: &F,
    options: &ChecksumOptions,
    on_entry: &mut impl FnMut(&ChecksumEntry),
) -> Result<ChecksumReport>
where
    S: PhotoService + ?Sized,
    F: BinaryFetcher + ?Sized,
{
    let query =
        ListQuery::new(CollectionSource::User(UserFilter::me())).with_extras(&["url_o", "tags"]);
    let mut pager = CollectionPager::new(service, &query);
    let guard = TransferGuard::new(fetcher);
    let mut report = ChecksumReport::default();

    while let Some(summaries) = pager.next_page().await? {
        for summary in summaries {
            let entry = process_photo(service, &guard, options, &summary).await?;
            on_entry(&entry);
            report.entries.push(entry);
        }
    }
    report.no_items = pager.is_empty();
    if report.no_items {
        warn!("[CHECKSUMS] No photos found");
    }
    Ok(report)
}

fn prepare_scratch_dir(dir: &Path) -> std::result::Result<(), WorkflowError> {
    if dir.is_dir() {
        return Ok(());
    }
    create_dir_owner_only(dir).map_err(|source| WorkflowError::Scratch {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(dir = %dir.display(), "[CHECKSUMS] Created scratch directory");
    Ok(())
}

async fn process_photo<S, F>(
    service: &S,
    guard: &TransferGuard<'_, F>,
    options: &ChecksumOptions,
    summary: &ItemSummary,
) -> Result<ChecksumEntry>
where
    S: PhotoService + ?Sized,
    F: BinaryFetcher + ?Sized,
{
    let entry = |outcome| ChecksumEntry {
        id: summary.id.clone(),
        short_url: short_url(&summary.id),
        outcome,
    };

    let blob = summary.tags.as_deref().unwrap_or_default();
    if let Some(existing) = find_existing_tag(blob, options.algorithm) {
        debug!(id = %summary.id, tag = %existing, "[CHECKSUMS] Already has checksum");
        return Ok(entry(ChecksumOutcome::AlreadyTagged {
            tag: existing.to_string(),
        }));
    }

    let record = fetch_detail(service, &summary.id).await?;
    let Some(url) = record.original_url.clone() else {
        warn!(id = %record.id, "[CHECKSUMS] No original URL available");
        return Ok(entry(ChecksumOutcome::DownloadFailed {
            message: "no original download URL".to_string(),
        }));
    };

    let scratch = options
        .scratch_dir
        .join(format!("checksumming.{}", record.original_format));
    remove_scratch(&scratch)?;
    if let Err(e) = guard
        .ensure_transferred(&TransferSource::Url(url), &scratch)
        .await
    {
        error!(id = %record.id, error = %e, "[CHECKSUMS] Unable to download original");
        return Ok(entry(ChecksumOutcome::DownloadFailed {
            message: e.to_string(),
        }));
    }

    let digest = hash_file(&scratch, options.algorithm);
    remove_scratch(&scratch)?;
    let tag = build_tag(options.algorithm, digest?).to_string();

    match service.add_tags(&record.id, std::slice::from_ref(&tag)).await? {
        TagWriteOutcome::Added => {
            info!(id = %record.id, tag = %tag, "[CHECKSUMS] Added checksum");
            Ok(entry(ChecksumOutcome::Added { tag }))
        }
        TagWriteOutcome::Rejected { message } => {
            error!(id = %record.id, tag = %tag, message = %message, "[CHECKSUMS] Tag write rejected");
            Ok(entry(ChecksumOutcome::TagRejected { tag, message }))
        }
    }
}

fn remove_scratch(path: &Path) -> std::result::Result<(), WorkflowError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkflowError::Scratch {
            path: path.to_path_buf(),
            source,
        }),
    }
}
