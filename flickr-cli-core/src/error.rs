//! # Error Module
//!
//! Error types for the flickr-cli pipelines.
//!
//! Every error names the photo, path or URL it concerns so the CLI can print it as-is.
//! Errors are grouped by the stage that raises them; [`Error`] wraps them all for the
//! workflow entrypoints.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by workflow entrypoints
#[derive(Error, Debug)]
pub enum Error {
    #[error("Remote service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Errors raised by a [`crate::contract::PhotoService`] implementation
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request to {method} failed: {message}")]
    Transport { method: String, message: String },

    #[error("{method} returned error {code}: {message}")]
    Api {
        method: String,
        code: i64,
        message: String,
    },

    #[error("could not decode {method} response: {message}")]
    Decode { method: String, message: String },
}

/// Errors raised while moving a binary payload to its destination
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while hashing files or parsing checksum tags
#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("unsupported hash algorithm '{0}' (expected md5 or sha1)")]
    UnsupportedAlgorithm(String),

    #[error("failed to read {path} for hashing: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the template render engine
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template '{name}' not found (bundled templates: {available})")]
    TemplateNotFound { name: String, available: String },

    #[error("template set at {dir} is missing {file}")]
    MissingTemplateFile { dir: PathBuf, file: String },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("photo {id} has no original download URL")]
    MissingOriginalUrl { id: String },

    #[error("rendered path '{path}' for photo {id} escapes the destination directory")]
    UnsafePath { id: String, path: String },

    #[error("unknown date granularity {0} (expected 0, 2, 4, 6 or 8)")]
    UnknownGranularity(i64),

    #[error("could not parse date '{0}'")]
    InvalidDate(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch original for photo {id}: {source}")]
    Transfer {
        id: String,
        #[source]
        source: TransferError,
    },
}

/// Errors raised by workflow orchestration itself
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("upload source {path} does not exist or cannot be read")]
    InvalidUploadSource { path: PathBuf },

    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("failed to prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("prompt failed: {0}")]
    Prompt(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_includes_method_and_message() {
        let error = ServiceError::Api {
            method: "flickr.photos.getInfo".to_string(),
            code: 1,
            message: "Photo not found".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("flickr.photos.getInfo"));
        assert!(message.contains("Photo not found"));
    }

    #[test]
    fn transfer_status_error_includes_url() {
        let error = TransferError::Status {
            url: "https://live.staticflickr.com/1/2_o.jpg".to_string(),
            status: 404,
        };
        let message = error.to_string();
        assert!(message.contains("2_o.jpg"));
        assert!(message.contains("404"));
    }

    #[test]
    fn unsupported_algorithm_lists_choices() {
        let message = ChecksumError::UnsupportedAlgorithm("crc32".into()).to_string();
        assert!(message.contains("crc32"));
        assert!(message.contains("md5 or sha1"));
    }
}
