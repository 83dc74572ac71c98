//! Per-photo detail fetching on top of the collection pager.

use tracing::{debug, info};

use crate::contract::{ItemRecord, ListQuery, PhotoService};
use crate::error::ServiceError;
use crate::pager::CollectionPager;

/// Receives progress while a collection is being enriched.
pub trait FetchProgress {
    /// Called once, after the first page, with the total reported by the service.
    fn on_total(&mut self, _total: u64) {}

    /// Called after each detail fetch, in listing order.
    fn on_record(&mut self, _record: &ItemRecord) {}
}

impl FetchProgress for () {}

/// Fetch full metadata for one photo.
pub async fn fetch_detail<S>(service: &S, id: &str) -> Result<ItemRecord, ServiceError>
where
    S: PhotoService + ?Sized,
{
    debug!(id, "Fetching photo info");
    service.get_info(id).await
}

/// Walk every page of `query` and fetch detail for each summary, one call at a time.
///
/// Returns `Ok(None)` if the collection is empty; no detail call is made in that case.
pub async fn fetch_collection<S, P>(
    service: &S,
    query: &ListQuery,
    progress: &mut P,
) -> Result<Option<Vec<ItemRecord>>, ServiceError>
where
    S: PhotoService + ?Sized,
    P: FetchProgress + ?Sized,
{
    let mut pager = CollectionPager::new(service, query);
    let mut records = Vec::new();
    let mut announced = false;

    while let Some(summaries) = pager.next_page().await? {
        if !announced {
            if let Some(cursor) = pager.cursor() {
                progress.on_total(cursor.total);
            }
            announced = true;
        }
        for summary in summaries {
            let record = fetch_detail(service, &summary.id).await?;
            progress.on_record(&record);
            records.push(record);
        }
    }

    if pager.is_empty() {
        return Ok(None);
    }

    info!(count = records.len(), "Fetched metadata for collection");
    Ok(Some(records))
}
