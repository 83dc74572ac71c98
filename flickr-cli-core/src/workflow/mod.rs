//! Entrypoints for the download, checksum, duplicates and upload workflows.
//!
//! Each workflow takes its collaborators by reference, issues one remote call at a time and
//! returns a typed report for the CLI to summarise.

pub mod checksums;
pub mod download;
pub mod duplicates;
pub mod upload;

pub use checksums::{
    maintain_checksums, ChecksumEntry, ChecksumOptions, ChecksumOutcome, ChecksumReport,
};
pub use download::{download, DownloadObserver, DownloadReport, DownloadRequest};
pub use duplicates::{find_duplicates, DuplicateReport, ResolvedGroup};
pub use upload::{upload, FileOutcome, UploadEntry, UploadReport};
