//! Content hashes and the `checksum:<algorithm>=<hex>` machine tags that carry them.
//!
//! Tag blobs from the service are parsed into typed [`Tag`] values; "is this photo already
//! tagged" is a lookup over those values rather than a pattern match on the raw string.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::error::ChecksumError;

/// Machine-tag namespace used for content hashes.
pub const CHECKSUM_NAMESPACE: &str = "checksum";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            other => Err(ChecksumError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// A `checksum:<algorithm>=<hexdigest>` machine tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashTag {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl fmt::Display for HashTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CHECKSUM_NAMESPACE}:{}={}", self.algorithm, self.digest)
    }
}

/// One tag from a photo's tag blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Checksum(HashTag),
    Machine {
        namespace: String,
        predicate: String,
        value: String,
    },
    Plain(String),
}

impl Tag {
    pub fn parse(raw: &str) -> Tag {
        let Some((namespace, rest)) = raw.split_once(':') else {
            return Tag::Plain(raw.to_string());
        };
        let Some((predicate, value)) = rest.split_once('=') else {
            return Tag::Plain(raw.to_string());
        };
        if namespace.is_empty() || predicate.is_empty() {
            return Tag::Plain(raw.to_string());
        }

        if namespace == CHECKSUM_NAMESPACE {
            if let Ok(algorithm) = predicate.parse::<HashAlgorithm>() {
                // Any value counts; a foreign or hand-edited digest still marks the photo as tagged.
                if !value.is_empty() {
                    return Tag::Checksum(HashTag {
                        algorithm,
                        digest: value.to_string(),
                    });
                }
            }
        }

        Tag::Machine {
            namespace: namespace.to_string(),
            predicate: predicate.to_string(),
            value: value.to_string(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Tag::Checksum(_) => Some(CHECKSUM_NAMESPACE),
            Tag::Machine { namespace, .. } => Some(namespace),
            Tag::Plain(_) => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Checksum(tag) => tag.fmt(f),
            Tag::Machine {
                namespace,
                predicate,
                value,
            } => write!(f, "{namespace}:{predicate}={value}"),
            Tag::Plain(tag) => f.write_str(tag),
        }
    }
}

/// Split a space-separated tag blob into tags.
pub fn parse_tags(blob: &str) -> Vec<Tag> {
    blob.split_whitespace().map(Tag::parse).collect()
}

/// First checksum tag for `algorithm` in `blob`, if any.
pub fn find_existing_tag(blob: &str, algorithm: HashAlgorithm) -> Option<HashTag> {
    parse_tags(blob).into_iter().find_map(|tag| match tag {
        Tag::Checksum(hash) if hash.algorithm == algorithm => Some(hash),
        _ => None,
    })
}

pub fn build_tag(algorithm: HashAlgorithm, digest: impl Into<String>) -> HashTag {
    HashTag {
        algorithm,
        digest: digest.into(),
    }
}

/// Lowercase hex digest of the file at `path`.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String, ChecksumError> {
    let io_err = |source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    match algorithm {
        HashAlgorithm::Md5 => digest_reader::<Md5, _>(&mut reader).map_err(io_err),
        HashAlgorithm::Sha1 => digest_reader::<Sha1, _>(&mut reader).map_err(io_err),
    }
}

/// Lowercase hex digest of an in-memory string.
pub fn hash_str(input: &str, algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => to_hex(&Md5::digest(input.as_bytes())),
        HashAlgorithm::Sha1 => to_hex(&Sha1::digest(input.as_bytes())),
    }
}

fn digest_reader<D: Digest, R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hashes_file_contents() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        assert_eq!(
            hash_file(file.path(), HashAlgorithm::Md5).unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            hash_file(file.path(), HashAlgorithm::Sha1).unwrap(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        // Same bytes, same digest.
        assert_eq!(
            hash_file(file.path(), HashAlgorithm::Md5).unwrap(),
            hash_str("hello world", HashAlgorithm::Md5)
        );
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = "crc32".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, ChecksumError::UnsupportedAlgorithm(ref a) if a == "crc32"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = hash_file(Path::new("/definitely/not/here.jpg"), HashAlgorithm::Md5)
            .unwrap_err();
        assert!(matches!(err, ChecksumError::Io { .. }));
    }

    #[test]
    fn finds_tag_for_requested_algorithm_only() {
        let blob = "holiday checksum:sha1=5eb63bbbe01eeed093cb22bb8f5acdc3 beach";
        assert_eq!(find_existing_tag(blob, HashAlgorithm::Md5), None);
        assert_eq!(
            find_existing_tag(blob, HashAlgorithm::Sha1),
            Some(build_tag(
                HashAlgorithm::Sha1,
                "5eb63bbbe01eeed093cb22bb8f5acdc3"
            ))
        );
    }

    #[test]
    fn first_matching_tag_wins() {
        let blob = "checksum:md5=aaaa checksum:md5=bbbb";
        assert_eq!(
            find_existing_tag(blob, HashAlgorithm::Md5).map(|t| t.digest),
            Some("aaaa".to_string())
        );
    }

    #[test]
    fn parses_tag_kinds() {
        let tags = parse_tags("cat geo:lat=51.5 checksum:md5=abc123 checksum:crc=ff");
        assert_eq!(tags[0], Tag::Plain("cat".into()));
        assert_eq!(tags[1].namespace(), Some("geo"));
        assert!(matches!(tags[2], Tag::Checksum(_)));
        // Unknown algorithms stay in the checksum namespace as generic machine tags.
        assert!(matches!(tags[3], Tag::Machine { .. }));
        assert_eq!(tags[3].namespace(), Some(CHECKSUM_NAMESPACE));
        assert_eq!(tags[3].to_string(), "checksum:crc=ff");
    }

    #[test]
    fn non_hex_value_for_known_algorithm_counts_as_tagged() {
        let blob = "holiday checksum:md5=ABC-xyz";
        assert_eq!(
            find_existing_tag(blob, HashAlgorithm::Md5).map(|t| t.digest),
            Some("ABC-xyz".to_string())
        );
        assert!(matches!(
            Tag::parse("checksum:md5="),
            Tag::Machine { ref value, .. } if value.is_empty()
        ));
    }

    #[test]
    fn builds_canonical_tag_string() {
        let tag = build_tag(HashAlgorithm::Md5, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(tag.to_string(), "checksum:md5=5eb63bbbe01eeed093cb22bb8f5acdc3");
    }
}
