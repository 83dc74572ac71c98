//! Duplicates workflow: walk the photostream and group photos sharing a checksum tag.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::contract::{CollectionSource, DuplicatePrompt, ListQuery, PhotoService, UserFilter};
use crate::duplicates::{checksum_tags, DuplicateGroup, DuplicateResolver};
use crate::pager::CollectionPager;
use crate::short_url::short_url;
use crate::Result;

/// A duplicate group and the index the user picked, if any. Nothing is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub group: DuplicateGroup,
    pub choice: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateReport {
    pub no_items: bool,
    pub scanned: usize,
    pub groups: Vec<ResolvedGroup>,
    /// Short URLs of photos without any checksum tag.
    pub no_checksum: Vec<String>,
}

pub async fn find_duplicates<S, P>(service: &S, prompt: &P) -> Result<DuplicateReport>
where
    S: PhotoService + ?Sized,
    P: DuplicatePrompt + ?Sized,
{
    info!("[DUPLICATES] Searching for duplicates");
    let query = ListQuery::new(CollectionSource::User(UserFilter::me())).with_extras(&["tags"]);
    let mut pager = CollectionPager::new(service, &query);
    let resolver = DuplicateResolver::new(service, "me");
    let mut seen: HashSet<String> = HashSet::new();
    let mut report = DuplicateReport::default();

    while let Some(summaries) = pager.next_page().await? {
        for summary in summaries {
            report.scanned += 1;
            let tags = checksum_tags(summary.tags.as_deref().unwrap_or_default());
            if tags.is_empty() {
                let url = short_url(&summary.id);
                info!(id = %summary.id, url = %url, "[DUPLICATES] No checksum");
                report.no_checksum.push(url);
                continue;
            }

            for tag in tags {
                // Every member of a group carries the tag; report each group once.
                if !seen.insert(tag.clone()) {
                    debug!(tag = %tag, "[DUPLICATES] Tag already checked");
                    continue;
                }
                let Some(group) = resolver.resolve_tag(&tag).await? else {
                    continue;
                };
                let choice = prompt.choose(&group)?;
                info!(tag = %tag, choice = ?choice, "[DUPLICATES] Resolution recorded");
                report.groups.push(ResolvedGroup { group, choice });
            }
        }
    }

    report.no_items = pager.is_empty();
    if report.no_items {
        warn!("[DUPLICATES] No photos found");
    }
    Ok(report)
}
