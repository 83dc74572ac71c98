//! Download workflow: list a collection, fetch every photo's metadata, render a template set.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::contract::{BinaryFetcher, CollectionSource, ListQuery, PhotoService};
use crate::detail::{fetch_collection, FetchProgress};
use crate::render::{PhotoContext, RenderSummary, TemplateRenderEngine};
use crate::transfer::TransferGuard;
use crate::Result;

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub source: CollectionSource,
    /// Bundled template name or template directory.
    pub template: String,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReport {
    /// The collection was empty; nothing was written besides the destination directory.
    NoItems { dest: PathBuf },
    Rendered {
        template: String,
        dest: PathBuf,
        summary: RenderSummary,
    },
}

/// Progress hooks for both phases of a download.
pub trait DownloadObserver: FetchProgress {
    fn on_render_start(&mut self, _total: usize) {}

    fn on_rendered(&mut self, _photo: &PhotoContext) {}
}

impl DownloadObserver for () {}

pub async fn download<S, F, O>(
    service: &S,
    fetcher: &F,
    request: &DownloadRequest,
    observer: &mut O,
) -> Result<DownloadReport>
where
    S: PhotoService + ?Sized,
    F: BinaryFetcher + ?Sized,
    O: DownloadObserver,
{
    // Resolve the template first so a bad name fails before any remote call.
    let engine = TemplateRenderEngine::new(&request.template, &request.dest)?;
    info!(
        template = %engine.template().name,
        dest = %request.dest.display(),
        "[DOWNLOAD] Retrieving photo metadata"
    );

    let query = ListQuery::new(request.source.clone());
    let Some(records) = fetch_collection(service, &query, &mut *observer).await? else {
        warn!("[DOWNLOAD] No photos found");
        return Ok(DownloadReport::NoItems {
            dest: request.dest.clone(),
        });
    };

    info!(photos = records.len(), "[DOWNLOAD] Compiling output files");
    observer.on_render_start(records.len());
    let guard = TransferGuard::new(fetcher);
    let summary = engine
        .render(&records, &guard, |photo| observer.on_rendered(photo))
        .await?;

    Ok(DownloadReport::Rendered {
        template: engine.template().name.clone(),
        dest: absolute(engine.dest()),
        summary,
    })
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
