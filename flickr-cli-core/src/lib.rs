#![doc = "flickr-cli-core: core pipelines for flickr-cli."]

//! This crate contains the transport-agnostic logic of flickr-cli: walking a paginated
//! remote collection, fetching per-photo detail, transferring binaries exactly once,
//! maintaining checksum machine tags, finding duplicates and rendering template sets.
//!
//! The remote API is consumed only through the traits in [`contract`], so every workflow
//! can be driven by the real HTTP client in the `flickr-cli` crate or by `mockall` mocks.
//!
//! # Usage
//! Construct a [`contract::PhotoService`] and a [`contract::BinaryFetcher`], then call one
//! of the entrypoints in [`workflow`].

pub mod checksum;
pub mod contract;
pub mod detail;
pub mod duplicates;
pub mod error;
pub mod pager;
pub mod render;
pub mod short_url;
pub mod transfer;
pub mod workflow;

pub use error::{Error, Result};
