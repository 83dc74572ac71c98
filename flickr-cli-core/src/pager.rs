//! Walks a paginated remote listing one page at a time.
//!
//! The pager requests page 1, derives a [`PageCursor`] from the response and keeps asking for
//! the next page until the page number reported by the service equals the reported page
//! count. A first page reporting zero items ends the walk immediately and marks the
//! collection as empty; a later page reporting zero is treated as the last page. Errors from
//! the listing call are returned unchanged.

use tracing::{debug, info};

use crate::contract::{ItemSummary, ListQuery, PhotoService, PAGE_SIZE};
use crate::error::ServiceError;

/// Position in a listing, re-derived from every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub total: u64,
}

pub struct CollectionPager<'a, S: PhotoService + ?Sized> {
    service: &'a S,
    query: &'a ListQuery,
    next_page: u32,
    cursor: Option<PageCursor>,
    finished: bool,
    empty: bool,
}

impl<'a, S: PhotoService + ?Sized> CollectionPager<'a, S> {
    pub fn new(service: &'a S, query: &'a ListQuery) -> Self {
        Self {
            service,
            query,
            next_page: 1,
            cursor: None,
            finished: false,
            empty: false,
        }
    }

    /// Cursor of the most recently fetched page.
    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursor
    }

    /// True once the first page reported zero items.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Fetch the next page. Returns `Ok(None)` when the walk is over.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ItemSummary>>, ServiceError> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .service
            .list_page(self.query, self.next_page, PAGE_SIZE)
            .await?;

        let cursor = PageCursor {
            page: page.page,
            per_page: PAGE_SIZE,
            pages: page.pages,
            total: page.total,
        };
        self.cursor = Some(cursor);

        if cursor.total == 0 && self.next_page == 1 {
            info!("Collection is empty");
            self.finished = true;
            self.empty = true;
            return Ok(None);
        }

        info!(
            page = cursor.page,
            pages = cursor.pages,
            total = cursor.total,
            items = page.items.len(),
            "Fetched listing page"
        );

        // Covers a zero page count with items present, and a collection that shrank mid-walk.
        if cursor.page >= cursor.pages || cursor.total == 0 {
            debug!(page = cursor.page, "Reached last listing page");
            self.finished = true;
        }
        self.next_page += 1;

        Ok(Some(page.items))
    }
}
