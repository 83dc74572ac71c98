//! Upload workflow: hash each local file, skip it if a photo already carries its checksum tag,
//! otherwise upload it with that tag.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::checksum::{build_tag, hash_file, HashAlgorithm};
use crate::contract::{PhotoService, SearchQuery, UploadOutcome, UploadRequest};
use crate::error::WorkflowError;
use crate::short_url::short_url;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// A photo with the same checksum tag already exists.
    Skipped { existing: String },
    Uploaded { short_url: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub path: PathBuf,
    pub tag: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub entries: Vec<UploadEntry>,
}

impl UploadReport {
    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, f: impl Fn(&FileOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| f(&e.outcome)).count()
    }
}

/// Resolve the upload source to an absolute path, failing if it does not exist.
pub fn resolve_source(source: &Path) -> std::result::Result<PathBuf, WorkflowError> {
    source
        .canonicalize()
        .map_err(|_| WorkflowError::InvalidUploadSource {
            path: source.to_path_buf(),
        })
}

/// Files under `root` in depth-first order, siblings sorted by name. A file yields itself.
pub fn upload_files(
    root: &Path,
) -> impl Iterator<Item = std::result::Result<PathBuf, WorkflowError>> + '_ {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(WorkflowError::Walk {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                message: e.to_string(),
            })),
        })
}

pub async fn upload<S>(
    service: &S,
    source: &Path,
    algorithm: HashAlgorithm,
    mut on_entry: impl FnMut(&UploadEntry),
) -> Result<UploadReport>
where
    S: PhotoService + ?Sized,
{
    let root = resolve_source(source)?;
    info!(source = %root.display(), algorithm = %algorithm, "[UPLOAD] Starting upload");

    let mut report = UploadReport::default();
    for path in upload_files(&root) {
        let entry = upload_one(service, &path?, algorithm).await?;
        on_entry(&entry);
        report.entries.push(entry);
    }

    info!(
        uploaded = report.uploaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        "[UPLOAD] Finished"
    );
    Ok(report)
}

async fn upload_one<S>(service: &S, path: &Path, algorithm: HashAlgorithm) -> Result<UploadEntry>
where
    S: PhotoService + ?Sized,
{
    let tag = build_tag(algorithm, hash_file(path, algorithm)?).to_string();
    let entry = |outcome| UploadEntry {
        path: path.to_path_buf(),
        tag: tag.clone(),
        outcome,
    };

    let existing = service
        .search(&SearchQuery {
            user_id: Some("me".to_string()),
            machine_tags: tag.clone(),
        })
        .await?;
    if existing.total >= 1 {
        if let Some(photo) = existing.items.first() {
            let url = short_url(&photo.id);
            warn!(path = %path.display(), existing = %url, "[UPLOAD] Photo already exists");
            return Ok(entry(FileOutcome::Skipped { existing: url }));
        }
    }

    let request = UploadRequest {
        path: path.to_path_buf(),
        title: None,
        description: None,
        tags: vec![tag.clone()],
    };
    let outcome = match service.upload(&request).await {
        Ok(UploadOutcome::Uploaded { photo_id }) => {
            let url = short_url(&photo_id);
            info!(path = %path.display(), url = %url, "[UPLOAD] Upload succeeded");
            FileOutcome::Uploaded { short_url: url }
        }
        Ok(UploadOutcome::Failed { message }) => {
            error!(path = %path.display(), message = %message, "[UPLOAD] Upload failed");
            FileOutcome::Failed { message }
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "[UPLOAD] Upload failed");
            FileOutcome::Failed {
                message: e.to_string(),
            }
        }
    };
    Ok(entry(outcome))
}
