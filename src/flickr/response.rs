//! Serde shapes of the Flickr REST JSON responses and their conversion into core types.
//!
//! Flickr is inconsistent about numbers: the same field may arrive as `1` or `"1"`, so the
//! numeric fields go through [`lenient_u64`] and friends.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

use flickr_cli_core::contract::{
    Granularity, ItemRecord, ItemSummary, Location, Page, SearchResult, TakenDate, Visibility,
};
use flickr_cli_core::error::ServiceError;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

fn parse_number<T: std::str::FromStr>(raw: NumberOrString) -> Option<T> {
    match raw {
        NumberOrString::Number(n) => n.to_string().parse().ok(),
        NumberOrString::String(s) if s.trim().is_empty() => None,
        NumberOrString::String(s) => s.trim().parse().ok(),
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number).unwrap_or(0))
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number).unwrap_or(0))
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number).unwrap_or(0))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number))
}

fn lenient_u8<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(d)?;
    Ok(raw.and_then(parse_number::<i64>).unwrap_or(0) != 0)
}

/// Any id Flickr may send as a number or a string.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match NumberOrString::deserialize(d)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    })
}

/// The `stat` envelope every REST response carries.
#[derive(Debug, Deserialize)]
pub struct Status {
    pub stat: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn into_result(self, method: &str) -> Result<(), ServiceError> {
        if self.stat == "ok" {
            return Ok(());
        }
        Err(ServiceError::Api {
            method: method.to_string(),
            code: self.code,
            message: self.message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SummaryJson {
    #[serde(deserialize_with = "id_string")]
    id: String,
    tags: Option<String>,
    url_o: Option<String>,
}

impl From<SummaryJson> for ItemSummary {
    fn from(s: SummaryJson) -> Self {
        ItemSummary {
            id: s.id,
            tags: s.tags,
            original_url: s.url_o.filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageJson {
    #[serde(default, deserialize_with = "lenient_u32")]
    page: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pages: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    total: u64,
    #[serde(default)]
    photo: Vec<SummaryJson>,
}

impl From<PageJson> for Page {
    fn from(p: PageJson) -> Self {
        Page {
            items: p.photo.into_iter().map(ItemSummary::from).collect(),
            page: p.page,
            pages: p.pages,
            total: p.total,
        }
    }
}

/// `flickr.people.getPhotos` and `flickr.photos.search`.
#[derive(Debug, Deserialize)]
pub struct PhotosResponse {
    photos: PageJson,
}

impl PhotosResponse {
    pub fn into_page(self) -> Page {
        self.photos.into()
    }

    pub fn into_search_result(self) -> SearchResult {
        let page: Page = self.photos.into();
        SearchResult {
            total: page.total,
            items: page.items,
        }
    }
}

/// `flickr.photosets.getPhotos`.
#[derive(Debug, Deserialize)]
pub struct PhotosetResponse {
    photoset: PageJson,
}

impl PhotosetResponse {
    pub fn into_page(self) -> Page {
        self.photoset.into()
    }
}

#[derive(Debug, Deserialize)]
struct DatesJson {
    #[serde(default)]
    taken: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    takengranularity: i64,
}

#[derive(Debug, Deserialize, Default)]
struct OwnerJson {
    #[serde(default)]
    nsid: String,
}

#[derive(Debug, Deserialize, Default)]
struct VisibilityJson {
    #[serde(default, deserialize_with = "lenient_bool")]
    ispublic: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    isfriend: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    isfamily: bool,
}

#[derive(Debug, Deserialize)]
struct LocationJson {
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u8")]
    accuracy: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct TagJson {
    #[serde(default)]
    raw: String,
}

#[derive(Debug, Deserialize, Default)]
struct TagsJson {
    #[serde(default)]
    tag: Vec<TagJson>,
}

#[derive(Debug, Deserialize)]
struct PhotoInfoJson {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    server: String,
    originalsecret: Option<String>,
    originalformat: Option<String>,
    title: Option<Content>,
    description: Option<Content>,
    dates: DatesJson,
    #[serde(default)]
    owner: OwnerJson,
    #[serde(default)]
    visibility: VisibilityJson,
    location: Option<LocationJson>,
    #[serde(default)]
    tags: TagsJson,
}

/// `flickr.photos.getInfo`.
#[derive(Debug, Deserialize)]
pub struct PhotoInfoResponse {
    photo: PhotoInfoJson,
}

/// Original-size URL on the static CDN.
pub fn original_url(server: &str, id: &str, original_secret: &str, format: &str) -> String {
    format!("https://live.staticflickr.com/{server}/{id}_{original_secret}_o.{format}")
}

impl PhotoInfoResponse {
    pub fn into_record(self, method: &str) -> Result<ItemRecord, ServiceError> {
        let p = self.photo;
        let granularity = Granularity::from_code(p.dates.takengranularity).ok_or_else(|| {
            ServiceError::Decode {
                method: method.to_string(),
                message: format!(
                    "photo {} has unknown taken-date granularity {}",
                    p.id, p.dates.takengranularity
                ),
            }
        })?;

        let original_format = p.originalformat.unwrap_or_else(|| "jpg".to_string());
        // Without originalsecret the caller may not download the original.
        let original_url = p
            .originalsecret
            .filter(|s| !s.is_empty())
            .map(|secret| original_url(&p.server, &p.id, &secret, &original_format));

        let location = p.location.and_then(|l| match (l.latitude, l.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                accuracy: l.accuracy,
            }),
            _ => None,
        });

        let mut seen = HashSet::new();
        let tags = p
            .tags
            .tag
            .into_iter()
            .map(|t| t.raw)
            .filter(|raw| seen.insert(raw.clone()))
            .collect();

        Ok(ItemRecord {
            id: p.id,
            title: p.title.map(|c| c.content).unwrap_or_default(),
            description: p.description.map(|c| c.content).unwrap_or_default(),
            taken: TakenDate {
                taken: p.dates.taken,
                granularity,
            },
            owner: p.owner.nsid,
            visibility: Visibility {
                public: p.visibility.ispublic,
                friend: p.visibility.isfriend,
                family: p.visibility.isfamily,
            },
            location,
            tags,
            original_format,
            original_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LoginUserJson {
    #[serde(deserialize_with = "id_string")]
    id: String,
    username: Content,
}

/// `flickr.test.login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    user: LoginUserJson,
}

impl LoginResponse {
    /// `(user id, username)`.
    pub fn into_identity(self) -> (String, String) {
        (self.user.id, self.user.username.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_accepts_numbers_as_strings() {
        let json = r#"{"photos":{"page":1,"pages":"3","perpage":500,"total":"1203",
            "photo":[{"id":"123","owner":"1@N00","tags":"cat checksum:md5=abc","url_o":""},
                     {"id":456,"tags":""}]},"stat":"ok"}"#;
        let page = serde_json::from_str::<PhotosResponse>(json)
            .unwrap()
            .into_page();
        assert_eq!((page.page, page.pages, page.total), (1, 3, 1203));
        assert_eq!(page.items[0].tags.as_deref(), Some("cat checksum:md5=abc"));
        assert_eq!(page.items[0].original_url, None);
        assert_eq!(page.items[1].id, "456");
    }

    #[test]
    fn photoset_listing_uses_photoset_key() {
        let json = r#"{"photoset":{"id":"7215","page":2,"pages":2,"total":3,
            "photo":[{"id":"9"}]},"stat":"ok"}"#;
        let page = serde_json::from_str::<PhotosetResponse>(json)
            .unwrap()
            .into_page();
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn failure_status_becomes_api_error() {
        let status: Status =
            serde_json::from_str(r#"{"stat":"fail","code":1,"message":"Photo not found"}"#)
                .unwrap();
        let err = status.into_result("flickr.photos.getInfo").unwrap_err();
        assert!(matches!(err, ServiceError::Api { code: 1, .. }));
    }

    fn info_json(granularity: &str, with_secret: bool) -> String {
        let secret = if with_secret {
            r#""originalsecret":"os1","#
        } else {
            ""
        };
        format!(
            r#"{{"photo":{{"id":"123","secret":"s","server":"65535",{secret}
                "originalformat":"png",
                "title":{{"_content":"Lorem ipsum"}},"description":{{"_content":"desc"}},
                "dates":{{"taken":"2019-01-01 13:45:00","takengranularity":{granularity}}},
                "owner":{{"nsid":"1@N00","username":"jane"}},
                "visibility":{{"ispublic":1,"isfriend":"0","isfamily":0}},
                "location":{{"latitude":"-31.95","longitude":115.86,"accuracy":"16"}},
                "tags":{{"tag":[{{"raw":"Beach","_content":"beach"}},{{"raw":"Beach"}},{{"raw":"checksum:md5=abc"}}]}}
            }},"stat":"ok"}}"#
        )
    }

    #[test]
    fn photo_info_maps_to_record() {
        let response: PhotoInfoResponse = serde_json::from_str(&info_json("\"4\"", true)).unwrap();
        let record = response.into_record("flickr.photos.getInfo").unwrap();
        assert_eq!(record.title, "Lorem ipsum");
        assert_eq!(record.taken.granularity, Granularity::Month);
        assert!(record.visibility.public);
        assert!(!record.visibility.friend);
        assert_eq!(record.tags, vec!["Beach", "checksum:md5=abc"]);
        assert_eq!(record.location.unwrap().accuracy, Some(16));
        assert_eq!(
            record.original_url.as_deref(),
            Some("https://live.staticflickr.com/65535/123_os1_o.png")
        );
    }

    #[test]
    fn photo_info_without_original_secret_has_no_url() {
        let response: PhotoInfoResponse = serde_json::from_str(&info_json("0", false)).unwrap();
        let record = response.into_record("flickr.photos.getInfo").unwrap();
        assert_eq!(record.original_url, None);
    }

    #[test]
    fn granularity_two_decodes_as_month() {
        let response: PhotoInfoResponse = serde_json::from_str(&info_json("2", true)).unwrap();
        let record = response.into_record("flickr.photos.getInfo").unwrap();
        assert_eq!(record.taken.granularity, Granularity::Month);
    }

    #[test]
    fn unknown_granularity_is_a_decode_error() {
        let response: PhotoInfoResponse = serde_json::from_str(&info_json("3", true)).unwrap();
        let err = response.into_record("flickr.photos.getInfo").unwrap_err();
        assert!(matches!(err, ServiceError::Decode { .. }));
    }

    #[test]
    fn login_identity() {
        let json = r#"{"user":{"id":"1@N00","username":{"_content":"jane"}},"stat":"ok"}"#;
        let identity = serde_json::from_str::<LoginResponse>(json)
            .unwrap()
            .into_identity();
        assert_eq!(identity, ("1@N00".to_string(), "jane".to_string()));
    }
}
