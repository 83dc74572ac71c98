//! Template set resolution.
//!
//! A template set is a directory holding:
//! - `path.jinja`: renders the relative output path of one photo (required)
//! - `photo.<ext>.jinja`: per-photo content file (optional)
//! - `photos.<ext>.jinja`: aggregate file written once as `photos.<ext>` (required)
//!
//! A name that is an existing directory is loaded from disk; otherwise it must name one of
//! the sets bundled under `templates/` in this crate.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::RenderError;

const PATH_FILE: &str = "path.jinja";
const TEMPLATE_SUFFIX: &str = ".jinja";

struct BundledTemplate {
    name: &'static str,
    path: &'static str,
    photo: Option<(&'static str, &'static str)>,
    photos: (&'static str, &'static str),
}

static BUNDLED: &[BundledTemplate] = &[
    BundledTemplate {
        name: "archive",
        path: include_str!("../../templates/archive/path.jinja"),
        photo: Some(("yml", include_str!("../../templates/archive/photo.yml.jinja"))),
        photos: ("csv", include_str!("../../templates/archive/photos.csv.jinja")),
    },
    BundledTemplate {
        name: "latex",
        path: include_str!("../../templates/latex/path.jinja"),
        photo: None,
        photos: ("tex", include_str!("../../templates/latex/photos.tex.jinja")),
    },
];

/// Names of the template sets compiled into the binary.
pub fn bundled_template_names() -> Vec<&'static str> {
    BUNDLED.iter().map(|t| t.name).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Directory(PathBuf),
    Bundled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Output extension declared by the file name.
    pub ext: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    pub name: String,
    pub origin: TemplateOrigin,
    pub path: String,
    pub photo: Option<TemplateFile>,
    pub photos: TemplateFile,
}

impl TemplateSet {
    pub fn resolve(name: &str) -> Result<Self, RenderError> {
        let dir = Path::new(name);
        if dir.is_dir() {
            return Self::from_dir(dir);
        }
        Self::bundled(name).ok_or_else(|| RenderError::TemplateNotFound {
            name: name.to_string(),
            available: bundled_template_names().join(", "),
        })
    }

    pub fn bundled(name: &str) -> Option<Self> {
        let bundled = BUNDLED.iter().find(|t| t.name == name)?;
        debug!(name, "Using bundled template set");
        Some(Self {
            name: bundled.name.to_string(),
            origin: TemplateOrigin::Bundled,
            path: bundled.path.to_string(),
            photo: bundled.photo.map(|(ext, source)| TemplateFile {
                ext: ext.to_string(),
                source: source.to_string(),
            }),
            photos: TemplateFile {
                ext: bundled.photos.0.to_string(),
                source: bundled.photos.1.to_string(),
            },
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self, RenderError> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| RenderError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let path_file = dir.join(PATH_FILE);
        if !path_file.is_file() {
            return Err(RenderError::MissingTemplateFile {
                dir: dir.to_path_buf(),
                file: PATH_FILE.to_string(),
            });
        }
        let path = read(&path_file)?;

        let mut names: Vec<String> = fs::read_dir(dir)
            .map_err(|source| RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let photo = match find_declared(&names, "photo") {
            Some((file, ext)) => Some(TemplateFile {
                ext,
                source: read(&dir.join(file))?,
            }),
            None => None,
        };
        let photos = match find_declared(&names, "photos") {
            Some((file, ext)) => TemplateFile {
                ext,
                source: read(&dir.join(file))?,
            },
            None => {
                return Err(RenderError::MissingTemplateFile {
                    dir: dir.to_path_buf(),
                    file: format!("photos.<ext>{TEMPLATE_SUFFIX}"),
                })
            }
        };

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        info!(name = %name, dir = %dir.display(), "Loaded template set from directory");

        Ok(Self {
            name,
            origin: TemplateOrigin::Directory(dir.to_path_buf()),
            path,
            photo,
            photos,
        })
    }
}

/// First `<stem>.<ext>.jinja` in `names`, with its extension.
fn find_declared<'a>(names: &'a [String], stem: &str) -> Option<(&'a str, String)> {
    names.iter().find_map(|name| {
        let ext = name
            .strip_prefix(stem)?
            .strip_prefix('.')?
            .strip_suffix(TEMPLATE_SUFFIX)?;
        (!ext.is_empty()).then(|| (name.as_str(), ext.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolves_bundled_archive() {
        let set = TemplateSet::resolve("archive").unwrap();
        assert_eq!(set.origin, TemplateOrigin::Bundled);
        assert_eq!(set.photo.as_ref().map(|p| p.ext.as_str()), Some("yml"));
        assert_eq!(set.photos.ext, "csv");
    }

    #[test]
    fn unknown_name_lists_bundled_sets() {
        let err = TemplateSet::resolve("no-such-template").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no-such-template"));
        assert!(message.contains("archive"));
        assert!(message.contains("latex"));
    }

    #[test]
    fn loads_directory_and_reads_extensions_from_file_names() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("gallery");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("path.jinja"), "{{ id }}.{{ ext }}").unwrap();
        fs::write(dir.join("photo.html.jinja"), "<h1>{{ title }}</h1>").unwrap();
        fs::write(dir.join("photos.json.jinja"), "[]").unwrap();

        let set = TemplateSet::resolve(dir.to_str().unwrap()).unwrap();
        assert_eq!(set.name, "gallery");
        assert_eq!(set.photo.unwrap().ext, "html");
        assert_eq!(set.photos.ext, "json");
    }

    #[test]
    fn directory_without_aggregate_is_rejected() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("path.jinja"), "{{ id }}").unwrap();
        let err = TemplateSet::from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, RenderError::MissingTemplateFile { .. }));
    }
}
