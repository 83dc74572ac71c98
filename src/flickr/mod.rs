//! Flickr API transport: OAuth signing, the REST client and the file fetcher.

pub mod client;
pub mod fetch;
pub mod oauth;
pub mod response;

pub use client::FlickrClient;
pub use fetch::HttpFetcher;
