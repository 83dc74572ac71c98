#![doc = "Flickr REST client: implements the core `PhotoService` contract over signed OAuth 1.0a requests."]
//
//! # Flickr client (CLI <-> Core)
//!
//! [`FlickrClient`] bridges the workflows in `flickr-cli-core` to the Flickr API:
//!
//! - REST calls go to [`REST_URL`] with `format=json&nojsoncallback=1`; a `stat: fail`
//!   envelope becomes [`ServiceError::Api`].
//! - Uploads go to [`UPLOAD_URL`] as multipart forms; the XML reply is parsed for the new
//!   photo id or the error message.
//! - Every request is signed with the consumer and access credentials from the config file.
//!
//! The client never retries. Request construction lives in small pure functions so it can be
//! tested without a network.

use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;

use flickr_cli_core::contract::{
    CollectionSource, ItemRecord, ListQuery, Page, PhotoService, SearchQuery, SearchResult,
    TagWriteOutcome, UploadOutcome, UploadRequest, PAGE_SIZE,
};
use flickr_cli_core::error::ServiceError;

use super::oauth::{self, ConsumerCredentials, TokenCredentials};
use super::response::{
    LoginResponse, PhotoInfoResponse, PhotosResponse, PhotosetResponse, Status,
};

pub const REST_URL: &str = "https://api.flickr.com/services/rest/";
pub const UPLOAD_URL: &str = "https://up.flickr.com/services/upload/";

const USER_AGENT: &str = concat!("flickr-cli/", env!("CARGO_PKG_VERSION"));

type Params = Vec<(String, String)>;

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

pub struct FlickrClient {
    http: reqwest::Client,
    consumer: ConsumerCredentials,
    token: Option<TokenCredentials>,
}

impl FlickrClient {
    pub fn new(
        consumer: ConsumerCredentials,
        token: Option<TokenCredentials>,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Transport {
                method: "client".to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(
            authenticated = token.is_some(),
            "Initialized Flickr client"
        );
        Ok(Self {
            http,
            consumer,
            token,
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// `flickr.test.echo`: checks the consumer key without needing a user token.
    pub async fn test_echo(&self) -> Result<(), ServiceError> {
        self.call::<Status>("flickr.test.echo", Vec::new(), false)
            .await
            .map(|_| ())
    }

    /// `flickr.test.login`: returns `(user id, username)` of the authenticated account.
    pub async fn test_login(&self) -> Result<(String, String), ServiceError> {
        let response: LoginResponse = self.call("flickr.test.login", Vec::new(), false).await?;
        Ok(response.into_identity())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Params,
        post: bool,
    ) -> Result<T, ServiceError> {
        let body = self.call_raw(method, params, post).await?;
        let status: Status = decode(method, &body)?;
        status.into_result(method)?;
        decode(method, &body)
    }

    async fn call_raw(
        &self,
        method: &str,
        mut params: Params,
        post: bool,
    ) -> Result<String, ServiceError> {
        params.push(param("method", method));
        params.push(param("format", "json"));
        params.push(param("nojsoncallback", 1));
        let http_method = if post { "POST" } else { "GET" };
        let signed = oauth::signed_params(
            http_method,
            REST_URL,
            &self.consumer,
            self.token.as_ref(),
            params,
        );

        tracing::debug!(method, http_method, "Calling Flickr API");
        let request = if post {
            self.http.post(REST_URL).form(&signed)
        } else {
            self.http.get(REST_URL).query(&signed)
        };
        let transport = |e: reqwest::Error| ServiceError::Transport {
            method: method.to_string(),
            message: e.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            tracing::error!(method, status = %status, "Flickr API returned HTTP error");
            return Err(ServiceError::Transport {
                method: method.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(method: &str, body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// API method name and parameters for one listing page.
pub fn list_params(query: &ListQuery, page: u32, per_page: u32) -> (&'static str, Params) {
    let mut params = Vec::new();
    let method = match &query.source {
        CollectionSource::User(filter) => {
            params.push(param("user_id", &filter.user_id));
            if let Some(v) = filter.min_upload_date {
                params.push(param("min_upload_date", v));
            }
            if let Some(v) = filter.max_upload_date {
                params.push(param("max_upload_date", v));
            }
            if let Some(v) = &filter.min_taken_date {
                params.push(param("min_taken_date", v));
            }
            if let Some(v) = &filter.max_taken_date {
                params.push(param("max_taken_date", v));
            }
            if let Some(v) = filter.privacy {
                params.push(param("privacy_filter", v));
            }
            "flickr.people.getPhotos"
        }
        CollectionSource::Album { album_id, privacy } => {
            params.push(param("photoset_id", album_id));
            if let Some(v) = privacy {
                params.push(param("privacy_filter", v));
            }
            "flickr.photosets.getPhotos"
        }
    };
    if !query.extras.is_empty() {
        params.push(param("extras", query.extras.join(",")));
    }
    params.push(param("page", page));
    params.push(param("per_page", per_page));
    (method, params)
}

pub fn search_params(query: &SearchQuery) -> Params {
    let mut params = Vec::new();
    if let Some(user_id) = &query.user_id {
        params.push(param("user_id", user_id));
    }
    params.push(param("machine_tags", &query.machine_tags));
    params.push(param("per_page", PAGE_SIZE));
    params
}

/// Tags are space separated; a tag containing spaces must be quoted.
pub fn tag_list(tags: &[String]) -> String {
    tags.iter()
        .map(|t| {
            if t.contains(' ') {
                format!("\"{t}\"")
            } else {
                t.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn rsp_stat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<rsp[^>]*\bstat="(\w+)""#).expect("valid rsp regex"))
}

fn photo_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<photoid[^>]*>\s*(\d+)\s*</photoid>").expect("valid photoid regex")
    })
}

fn err_msg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<err[^>]*\bmsg="([^"]*)""#).expect("valid err regex"))
}

/// Parse the XML reply of the upload endpoint.
pub fn parse_upload_response(body: &str) -> Result<UploadOutcome, ServiceError> {
    let decode_err = |message: &str| ServiceError::Decode {
        method: "upload".to_string(),
        message: message.to_string(),
    };

    let stat = rsp_stat_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| decode_err("response has no <rsp stat=...> element"))?;

    if stat == "ok" {
        return photo_id_re()
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| UploadOutcome::Uploaded {
                photo_id: m.as_str().to_string(),
            })
            .ok_or_else(|| decode_err("successful response has no <photoid>"));
    }
    let message = err_msg_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| format!("upload failed with stat={stat}"));
    Ok(UploadOutcome::Failed { message })
}

#[async_trait]
impl PhotoService for FlickrClient {
    async fn list_page(
        &self,
        query: &ListQuery,
        page: u32,
        per_page: u32,
    ) -> Result<Page, ServiceError> {
        let (method, params) = list_params(query, page, per_page);
        let page = match query.source {
            CollectionSource::User(_) => self
                .call::<PhotosResponse>(method, params, false)
                .await?
                .into_page(),
            CollectionSource::Album { .. } => self
                .call::<PhotosetResponse>(method, params, false)
                .await?
                .into_page(),
        };
        tracing::debug!(
            method,
            page = page.page,
            pages = page.pages,
            total = page.total,
            "Fetched listing page"
        );
        Ok(page)
    }

    async fn get_info(&self, id: &str) -> Result<ItemRecord, ServiceError> {
        let method = "flickr.photos.getInfo";
        let response: PhotoInfoResponse = self
            .call(method, vec![param("photo_id", id)], false)
            .await?;
        response.into_record(method)
    }

    async fn add_tags(&self, id: &str, tags: &[String]) -> Result<TagWriteOutcome, ServiceError> {
        let method = "flickr.photos.addTags";
        let params = vec![param("photo_id", id), param("tags", tag_list(tags))];
        match self.call::<Status>(method, params, true).await {
            Ok(_) => Ok(TagWriteOutcome::Added),
            Err(ServiceError::Api { message, .. }) => {
                tracing::warn!(photo_id = id, message = %message, "Flickr rejected tags");
                Ok(TagWriteOutcome::Rejected { message })
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, ServiceError> {
        let response: PhotosResponse = self
            .call("flickr.photos.search", search_params(query), false)
            .await?;
        Ok(response.into_search_result())
    }

    async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, ServiceError> {
        let method = "upload";
        let transport = |message: String| ServiceError::Transport {
            method: method.to_string(),
            message,
        };

        let mut params = Vec::new();
        if let Some(title) = &request.title {
            params.push(param("title", title));
        }
        if let Some(description) = &request.description {
            params.push(param("description", description));
        }
        if !request.tags.is_empty() {
            params.push(param("tags", tag_list(&request.tags)));
        }
        // The file part is not part of the signature.
        let signed = oauth::signed_params(
            "POST",
            UPLOAD_URL,
            &self.consumer,
            self.token.as_ref(),
            params,
        );

        let bytes = tokio::fs::read(&request.path)
            .await
            .map_err(|e| transport(format!("{}: {e}", request.path.display())))?;
        let file_name = file_name(&request.path);
        let mut form = reqwest::multipart::Form::new();
        for (key, value) in signed {
            form = form.text(key, value);
        }
        form = form.part("photo", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        tracing::info!(path = %request.path.display(), "Uploading photo");
        let response = self
            .http
            .post(UPLOAD_URL)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport(e.to_string()))?;
        if !status.is_success() {
            return Err(transport(format!("HTTP {status}")));
        }
        parse_upload_response(&body)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string())
}
