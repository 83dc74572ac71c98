//! Finding photos that share a checksum tag, and showing how they differ.
//!
//! The resolver never deletes anything. A [`DuplicateGroup`] is handed to a
//! [`DuplicatePrompt`](crate::contract::DuplicatePrompt), whose choice is only recorded.

use std::fmt;

use tracing::{debug, info};

use crate::checksum::{parse_tags, CHECKSUM_NAMESPACE};
use crate::contract::{ItemRecord, PhotoService, SearchQuery};
use crate::detail::fetch_detail;
use crate::error::ServiceError;
use crate::short_url::short_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffField {
    Title,
    Description,
    DateTaken,
}

impl fmt::Display for DiffField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiffField::Title => "Title",
            DiffField::Description => "Description",
            DiffField::DateTaken => "Date taken",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: DiffField,
    pub left: String,
    pub right: String,
}

/// Fields that differ between the first photo of a group and one of the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDiff {
    pub left_id: String,
    pub right_id: String,
    pub fields: Vec<FieldDiff>,
}

impl RecordDiff {
    pub fn is_identical(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Taken date and granularity code as one comparable string, e.g. `2019-01-01 13:45:00 (0)`.
fn taken_key(record: &ItemRecord) -> String {
    format!("{} ({})", record.taken.taken, record.taken.granularity.code())
}

pub fn diff_records(left: &ItemRecord, right: &ItemRecord) -> RecordDiff {
    let mut fields = Vec::new();
    if left.title != right.title {
        fields.push(FieldDiff {
            field: DiffField::Title,
            left: left.title.clone(),
            right: right.title.clone(),
        });
    }
    if left.description != right.description {
        fields.push(FieldDiff {
            field: DiffField::Description,
            left: left.description.clone(),
            right: right.description.clone(),
        });
    }
    let (left_taken, right_taken) = (taken_key(left), taken_key(right));
    if left_taken != right_taken {
        fields.push(FieldDiff {
            field: DiffField::DateTaken,
            left: left_taken,
            right: right_taken,
        });
    }
    RecordDiff {
        left_id: left.id.clone(),
        right_id: right.id.clone(),
        fields,
    }
}

/// Two or more photos carrying the same checksum tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub tag: String,
    /// Detail records in search-result order.
    pub records: Vec<ItemRecord>,
    /// The first record diffed against each of the others.
    pub diffs: Vec<RecordDiff>,
}

impl DuplicateGroup {
    /// Flickr's tag page listing every photo in the group.
    pub fn tag_url(&self) -> String {
        format!("https://www.flickr.com/photos/tags/{}", self.tag)
    }

    pub fn short_urls(&self) -> Vec<String> {
        self.records.iter().map(|r| short_url(&r.id)).collect()
    }
}

/// Checksum tags in a tag blob, in blob order.
pub fn checksum_tags(blob: &str) -> Vec<String> {
    parse_tags(blob)
        .into_iter()
        .filter(|tag| tag.namespace() == Some(CHECKSUM_NAMESPACE))
        .map(|tag| tag.to_string())
        .collect()
}

pub struct DuplicateResolver<'a, S: PhotoService + ?Sized> {
    service: &'a S,
    user_id: String,
}

impl<'a, S: PhotoService + ?Sized> DuplicateResolver<'a, S> {
    pub fn new(service: &'a S, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: user_id.into(),
        }
    }

    /// Search for every photo carrying `tag`. Returns `None` unless at least two match.
    pub async fn resolve_tag(&self, tag: &str) -> Result<Option<DuplicateGroup>, ServiceError> {
        let result = self
            .service
            .search(&SearchQuery {
                user_id: Some(self.user_id.clone()),
                machine_tags: tag.to_string(),
            })
            .await?;
        debug!(tag, total = result.total, "Searched for checksum tag");
        if result.total < 2 {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(result.items.len());
        for item in &result.items {
            records.push(fetch_detail(self.service, &item.id).await?);
        }
        let diffs = match records.split_first() {
            Some((first, rest)) => rest.iter().map(|other| diff_records(first, other)).collect(),
            None => Vec::new(),
        };

        info!(tag, photos = records.len(), "Duplicate found");
        Ok(Some(DuplicateGroup {
            tag: tag.to_string(),
            records,
            diffs,
        }))
    }
}
