//! # contract: the remote photo service as seen by the pipelines
//!
//! This module defines the plain data types exchanged with the photo-hosting API and the
//! traits ([`PhotoService`], [`BinaryFetcher`], [`DuplicatePrompt`]) that the workflows
//! depend on. The HTTP client in the `flickr-cli` crate implements them for real; tests use
//! the `mockall` mocks exported under the `test-export-mocks` feature.
//!
//! All trait methods return typed errors from [`crate::error`]. No retries happen at this
//! layer: a failing call propagates to the workflow, which decides whether it is fatal.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::duplicates::DuplicateGroup;
use crate::error::{ServiceError, TransferError, WorkflowError};

/// Number of summaries requested per listing page.
pub const PAGE_SIZE: u32 = 500;

/// Filters for listing one user's photostream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    /// NSID of the owner, or `me` for the authenticated user.
    pub user_id: String,
    /// Unix timestamp.
    pub min_upload_date: Option<i64>,
    /// Unix timestamp.
    pub max_upload_date: Option<i64>,
    /// `YYYY-MM-DD HH:MM:SS`.
    pub min_taken_date: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`.
    pub max_taken_date: Option<String>,
    /// Flickr privacy filter, 1 (public) to 5 (private).
    pub privacy: Option<u8>,
}

impl UserFilter {
    pub fn me() -> Self {
        Self {
            user_id: "me".to_string(),
            min_upload_date: None,
            max_upload_date: None,
            min_taken_date: None,
            max_taken_date: None,
            privacy: None,
        }
    }
}

/// Which remote collection to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSource {
    User(UserFilter),
    Album { album_id: u64, privacy: Option<u8> },
}

/// A listing request: the collection plus the extra summary fields to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub source: CollectionSource,
    /// Extra fields, e.g. `tags` or `url_o`.
    pub extras: Vec<String>,
}

impl ListQuery {
    pub fn new(source: CollectionSource) -> Self {
        Self {
            source,
            extras: Vec::new(),
        }
    }

    pub fn with_extras(mut self, extras: &[&str]) -> Self {
        self.extras = extras.iter().map(|e| e.to_string()).collect();
        self
    }
}

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemSummary {
    pub id: String,
    /// Space-separated tag blob, when `tags` was requested.
    pub tags: Option<String>,
    /// Original-size URL hint, when `url_o` was requested.
    pub original_url: Option<String>,
}

/// One page of a listing response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<ItemSummary>,
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

/// Precision of a photo's taken date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Exact,
    Month,
    Year,
    Circa,
}

impl Granularity {
    /// Flickr's numeric code for this granularity.
    pub fn code(self) -> u8 {
        match self {
            Granularity::Exact => 0,
            Granularity::Month => 4,
            Granularity::Year => 6,
            Granularity::Circa => 8,
        }
    }

    /// Returns `None` for codes Flickr does not define. Code 2 is an older month code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Granularity::Exact),
            2 | 4 => Some(Granularity::Month),
            6 => Some(Granularity::Year),
            8 => Some(Granularity::Circa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TakenDate {
    /// `YYYY-MM-DD HH:MM:SS` as reported by the service.
    pub taken: String,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub public: bool,
    pub friend: bool,
    pub family: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<u8>,
}

/// Full metadata for one photo, as returned by the detail call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub taken: TakenDate,
    pub owner: String,
    pub visibility: Visibility,
    pub location: Option<Location>,
    /// Raw tags in the order the service returned them, without duplicates.
    pub tags: Vec<String>,
    pub original_format: String,
    /// Resolved URL of the original-size file, if the caller may download it.
    pub original_url: Option<String>,
}

/// A machine-tag search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub user_id: Option<String>,
    pub machine_tags: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    pub items: Vec<ItemSummary>,
    pub total: u64,
}

/// Result of a tag-write call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagWriteOutcome {
    Added,
    /// The service answered with an error payload.
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Result of an upload call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { photo_id: String },
    Failed { message: String },
}

/// The remote photo-hosting API: listing, detail, tagging, search and upload.
///
/// Implementations must not retry; callers issue one call at a time.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// Fetch one page of a collection listing.
    async fn list_page(
        &self,
        query: &ListQuery,
        page: u32,
        per_page: u32,
    ) -> Result<Page, ServiceError>;

    /// Fetch full metadata for one photo.
    async fn get_info(&self, id: &str) -> Result<ItemRecord, ServiceError>;

    /// Add tags to a photo.
    async fn add_tags(&self, id: &str, tags: &[String]) -> Result<TagWriteOutcome, ServiceError>;

    /// Search photos by machine tag.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, ServiceError>;

    /// Upload one local file.
    async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, ServiceError>;
}

/// Streams a remote binary into a local file.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    /// Write the full body of `url` to `dest`, returning the number of bytes written.
    ///
    /// A non-success status must be reported as [`TransferError::Status`].
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransferError>;
}

/// Asks the user how to resolve a group of duplicate photos.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DuplicatePrompt: Send + Sync {
    /// Returns the index into `group.items` the user chose to keep, or `None` to skip.
    fn choose(&self, group: &DuplicateGroup) -> Result<Option<usize>, WorkflowError>;
}
