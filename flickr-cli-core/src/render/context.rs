//! The fixed set of fields a template may reference.

use serde::Serialize;

use crate::contract::{Granularity, ItemRecord};
use crate::short_url::short_url;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TakenContext {
    /// `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
    pub granularity: Granularity,
    /// Numeric code, for `flickr_date(taken.date, taken.granularity_code)`.
    pub granularity_code: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityContext {
    pub public: bool,
    pub friend: bool,
    pub family: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationContext {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<u8>,
}

/// One photo as seen by templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoContext {
    pub id: String,
    pub title: String,
    pub description: String,
    pub taken: TakenContext,
    pub owner: String,
    pub visibility: VisibilityContext,
    pub location: Option<LocationContext>,
    pub tags: Vec<String>,
    pub original_format: String,
    pub original_url: String,
    /// Extension of the file currently being rendered.
    pub ext: String,
    pub short_url: String,
    /// Path of the original binary, relative to the destination root.
    pub path: String,
}

impl PhotoContext {
    pub fn from_record(record: &ItemRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            taken: TakenContext {
                date: record.taken.taken.clone(),
                granularity: record.taken.granularity,
                granularity_code: record.taken.granularity.code(),
            },
            owner: record.owner.clone(),
            visibility: VisibilityContext {
                public: record.visibility.public,
                friend: record.visibility.friend,
                family: record.visibility.family,
            },
            location: record.location.map(|l| LocationContext {
                latitude: l.latitude,
                longitude: l.longitude,
                accuracy: l.accuracy,
            }),
            tags: record.tags.clone(),
            original_format: record.original_format.clone(),
            original_url: record.original_url.clone().unwrap_or_default(),
            ext: String::new(),
            short_url: short_url(&record.id),
            path: String::new(),
        }
    }
}
