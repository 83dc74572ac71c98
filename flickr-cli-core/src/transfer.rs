//! Exactly-once binary transfer.
//!
//! [`TransferGuard::ensure_transferred`] is the idempotence mechanism of every workflow: a
//! destination that already exists is never transferred again. New payloads are written to a
//! temporary file next to the destination and renamed into place only once complete, so a
//! failed transfer never leaves a partial file at the final path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::contract::BinaryFetcher;
use crate::error::TransferError;

/// Where a binary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSource {
    Url(String),
    Local(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred { bytes: u64 },
    Skipped,
}

pub struct TransferGuard<'a, F: BinaryFetcher + ?Sized> {
    fetcher: &'a F,
}

impl<'a, F: BinaryFetcher + ?Sized> TransferGuard<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    pub async fn ensure_transferred(
        &self,
        source: &TransferSource,
        dest: &Path,
    ) -> Result<TransferOutcome, TransferError> {
        if dest.exists() {
            debug!(dest = %dest.display(), "Destination exists, skipping transfer");
            return Ok(TransferOutcome::Skipped);
        }

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        create_dir_owner_only(&parent).map_err(|source| TransferError::Io {
            path: parent.clone(),
            source,
        })?;

        let partial = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&parent)
            .map_err(|source| TransferError::Io {
                path: parent.clone(),
                source,
            })?
            .into_temp_path();

        let bytes = match source {
            TransferSource::Url(url) => self.fetcher.fetch(url, &partial).await,
            TransferSource::Local(path) => {
                fs::copy(path, &partial).map_err(|source| TransferError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        // Dropping `partial` on the error path deletes the incomplete file.
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, dest = %dest.display(), "Transfer failed");
                return Err(e);
            }
        };

        partial.persist(dest).map_err(|e| TransferError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;

        info!(dest = %dest.display(), bytes, "Transferred binary");
        Ok(TransferOutcome::Transferred { bytes })
    }
}

/// Create `dir` and any missing parents, readable only by the owner.
pub fn create_dir_owner_only(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockBinaryFetcher;
    use tempfile::tempdir;

    fn writing_fetcher(body: &'static [u8]) -> MockBinaryFetcher {
        let mut fetcher = MockBinaryFetcher::new();
        fetcher.expect_fetch().returning(move |_, dest| {
            fs::write(dest, body).unwrap();
            Ok(body.len() as u64)
        });
        fetcher
    }

    #[tokio::test]
    async fn transfers_then_skips_on_rerun() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("a/b/photo.jpg");
        let mut fetcher = MockBinaryFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, dest| {
            fs::write(dest, b"jpeg-bytes").unwrap();
            Ok(10)
        });
        let guard = TransferGuard::new(&fetcher);
        let source = TransferSource::Url("https://example.test/photo.jpg".into());

        let first = guard.ensure_transferred(&source, &dest).await.unwrap();
        assert_eq!(first, TransferOutcome::Transferred { bytes: 10 });
        assert_eq!(fs::read(&dest).unwrap(), b"jpeg-bytes");

        let second = guard.ensure_transferred(&source, &dest).await.unwrap();
        assert_eq!(second, TransferOutcome::Skipped);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_file_behind() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("photo.jpg");
        let mut fetcher = MockBinaryFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url, dest| {
            fs::write(dest, b"half").unwrap();
            Err(TransferError::Status {
                url: url.to_string(),
                status: 500,
            })
        });
        let guard = TransferGuard::new(&fetcher);

        let err = guard
            .ensure_transferred(&TransferSource::Url("https://example.test/x".into()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Status { status: 500, .. }));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn copies_local_sources() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("in.png");
        fs::write(&src, b"png").unwrap();
        let dest = tmp.path().join("out/in.png");
        let fetcher = writing_fetcher(b"unused");
        let guard = TransferGuard::new(&fetcher);

        let outcome = guard
            .ensure_transferred(&TransferSource::Local(src), &dest)
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Transferred { bytes: 3 });
        assert_eq!(fs::read(&dest).unwrap(), b"png");
    }

    #[cfg(unix)]
    #[test]
    fn created_directories_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("private/nested");
        create_dir_owner_only(&dir).unwrap();
        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
