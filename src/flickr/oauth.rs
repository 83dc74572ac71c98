//! OAuth 1.0a request signing (HMAC-SHA1) and the three-legged token exchange.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::{debug, info};

use flickr_cli_core::error::ServiceError;

pub const REQUEST_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/request_token";
pub const AUTHORIZE_URL: &str = "https://www.flickr.com/services/oauth/authorize";
pub const ACCESS_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/access_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerCredentials {
    pub key: String,
    pub secret: String,
}

/// A request token or an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    pub token: String,
    pub secret: String,
}

/// Percent-encode per RFC 3986: everything but unreserved characters.
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&joined)
    )
}

pub fn sign(base: &str, consumer_secret: &str, token_secret: Option<&str>) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    // HMAC accepts keys of any length.
    let mut mac = match Hmac::<Sha1>::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Add the `oauth_*` protocol parameters and the signature to `params`.
pub fn signed_params(
    method: &str,
    url: &str,
    consumer: &ConsumerCredentials,
    token: Option<&TokenCredentials>,
    mut params: Vec<(String, String)>,
) -> Vec<(String, String)> {
    params.push(("oauth_consumer_key".into(), consumer.key.clone()));
    params.push(("oauth_nonce".into(), uuid::Uuid::new_v4().simple().to_string()));
    params.push(("oauth_signature_method".into(), "HMAC-SHA1".into()));
    params.push((
        "oauth_timestamp".into(),
        chrono::Utc::now().timestamp().to_string(),
    ));
    params.push(("oauth_version".into(), "1.0".into()));
    if let Some(token) = token {
        params.push(("oauth_token".into(), token.token.clone()));
    }

    let base = signature_base_string(method, url, &params);
    let signature = sign(&base, &consumer.secret, token.map(|t| t.secret.as_str()));
    params.push(("oauth_signature".into(), signature));
    params
}

/// Permission level requested during authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Read, Permission::Write, Permission::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Permission::Read => "download photos",
            Permission::Write => "upload or edit photos or their metadata",
            Permission::Delete => "download and/or delete photos from Flickr",
        }
    }
}

/// Access token plus the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub token: TokenCredentials,
    pub user_nsid: Option<String>,
    pub username: Option<String>,
}

pub fn authorize_url(request_token: &TokenCredentials, permission: Permission) -> String {
    format!(
        "{AUTHORIZE_URL}?oauth_token={}&perms={}",
        percent_encode(&request_token.token),
        permission.as_str()
    )
}

/// Keep only the digits of a pasted verifier code such as `123-456-789`.
pub fn clean_verifier(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub async fn request_token(
    http: &reqwest::Client,
    consumer: &ConsumerCredentials,
) -> Result<TokenCredentials, ServiceError> {
    let params = signed_params(
        "GET",
        REQUEST_TOKEN_URL,
        consumer,
        None,
        vec![("oauth_callback".into(), "oob".into())],
    );
    let body = token_call(http, "oauth.request_token", REQUEST_TOKEN_URL, &params).await?;
    let fields = parse_form(&body);
    let token = token_from_fields(&fields, "oauth.request_token")?;
    info!("Obtained OAuth request token");
    Ok(token)
}

pub async fn access_token(
    http: &reqwest::Client,
    consumer: &ConsumerCredentials,
    request_token: &TokenCredentials,
    verifier: &str,
) -> Result<AccessGrant, ServiceError> {
    let params = signed_params(
        "GET",
        ACCESS_TOKEN_URL,
        consumer,
        Some(request_token),
        vec![("oauth_verifier".into(), verifier.to_string())],
    );
    let body = token_call(http, "oauth.access_token", ACCESS_TOKEN_URL, &params).await?;
    let fields = parse_form(&body);
    let token = token_from_fields(&fields, "oauth.access_token")?;
    let lookup = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    info!("Obtained OAuth access token");
    Ok(AccessGrant {
        token,
        user_nsid: lookup("user_nsid"),
        username: lookup("username"),
    })
}

async fn token_call(
    http: &reqwest::Client,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, ServiceError> {
    debug!(url, "OAuth token request");
    let transport = |e: reqwest::Error| ServiceError::Transport {
        method: method.to_string(),
        message: e.to_string(),
    };
    let response = http.get(url).query(params).send().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(ServiceError::Api {
            method: method.to_string(),
            code: i64::from(status.as_u16()),
            message: body,
        });
    }
    Ok(body)
}

fn parse_form(body: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

fn token_from_fields(
    fields: &[(String, String)],
    method: &str,
) -> Result<TokenCredentials, ServiceError> {
    let get = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
    match (get("oauth_token"), get("oauth_token_secret")) {
        (Some(token), Some(secret)) => Ok(TokenCredentials { token, secret }),
        _ => Err(ServiceError::Decode {
            method: method.to_string(),
            message: "response is missing oauth_token or oauth_token_secret".to_string(),
        }),
    }
}
