use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior};
use tracing::{debug, info};

use super::context::PhotoContext;
use super::filters;
use super::template::TemplateSet;
use crate::contract::{BinaryFetcher, ItemRecord};
use crate::error::RenderError;
use crate::transfer::{create_dir_owner_only, TransferGuard, TransferOutcome, TransferSource};

const PATH_TEMPLATE: &str = "path";

/// What one render pass wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub rendered: usize,
    pub transferred: usize,
    pub skipped: usize,
    pub aggregate: PathBuf,
}

/// Renders a template set over photo records into a destination directory.
///
/// Each photo gets an optional content file and its original binary, both at paths produced
/// by the set's path template. Once every photo is done, the aggregate template is rendered
/// over all photos sorted by the path of their original.
pub struct TemplateRenderEngine {
    env: Environment<'static>,
    set: TemplateSet,
    dest: PathBuf,
}

impl TemplateRenderEngine {
    /// Resolve `template` and prepare `dest`. Nothing is written if resolution fails.
    pub fn new(template: &str, dest: &Path) -> Result<Self, RenderError> {
        let set = TemplateSet::resolve(template)?;
        let env = build_environment(&set)?;

        create_dir_owner_only(dest).map_err(|source| RenderError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        info!(template = %set.name, dest = %dest.display(), "Template resolved");

        Ok(Self {
            env,
            set,
            dest: dest.to_path_buf(),
        })
    }

    pub fn template(&self) -> &TemplateSet {
        &self.set
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Render every record, in order, then write the aggregate file.
    ///
    /// `on_item` is called once per record after its files are in place.
    pub async fn render<F: BinaryFetcher + ?Sized>(
        &self,
        records: &[ItemRecord],
        guard: &TransferGuard<'_, F>,
        mut on_item: impl FnMut(&PhotoContext),
    ) -> Result<RenderSummary, RenderError> {
        let mut all: BTreeMap<String, PhotoContext> = BTreeMap::new();
        let mut transferred = 0;
        let mut skipped = 0;

        for record in records {
            let mut photo = PhotoContext::from_record(record);

            photo.ext = record.original_format.clone();
            let original_path = self.render_path(&photo)?;
            photo.path = original_path.clone();

            if let Some(content) = &self.set.photo {
                let mut item = photo.clone();
                item.ext = content.ext.clone();
                let content_path = self.render_path(&item)?;
                let output = self
                    .env
                    .get_template(&format!("photo.{}", content.ext))?
                    .render(&item)?;
                self.write_output(&content_path, &output)?;
                debug!(id = %photo.id, path = %content_path, "Wrote photo file");
            }

            let url = record
                .original_url
                .as_deref()
                .ok_or_else(|| RenderError::MissingOriginalUrl {
                    id: record.id.clone(),
                })?;
            let outcome = guard
                .ensure_transferred(
                    &TransferSource::Url(url.to_string()),
                    &self.dest.join(&original_path),
                )
                .await
                .map_err(|source| RenderError::Transfer {
                    id: record.id.clone(),
                    source,
                })?;
            match outcome {
                TransferOutcome::Transferred { .. } => transferred += 1,
                TransferOutcome::Skipped => skipped += 1,
            }

            on_item(&photo);
            all.insert(original_path, photo);
        }

        let photos: Vec<&PhotoContext> = all.values().collect();
        let output = self
            .env
            .get_template(&format!("photos.{}", self.set.photos.ext))?
            .render(context! { photos => photos })?;
        let aggregate = self.dest.join(format!("photos.{}", self.set.photos.ext));
        fs::write(&aggregate, output).map_err(|source| RenderError::Io {
            path: aggregate.clone(),
            source,
        })?;
        info!(
            aggregate = %aggregate.display(),
            photos = all.len(),
            transferred,
            skipped,
            "Render finished"
        );

        Ok(RenderSummary {
            rendered: records.len(),
            transferred,
            skipped,
            aggregate,
        })
    }

    /// Render the path template and check it stays under the destination.
    fn render_path(&self, photo: &PhotoContext) -> Result<String, RenderError> {
        let rendered = self.env.get_template(PATH_TEMPLATE)?.render(photo)?;
        let path = rendered
            .trim_matches(|c: char| c.is_whitespace() || c == '/')
            .to_string();

        let safe = !path.is_empty()
            && Path::new(&path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(RenderError::UnsafePath {
                id: photo.id.clone(),
                path,
            });
        }
        Ok(path)
    }

    fn write_output(&self, relative: &str, contents: &str) -> Result<(), RenderError> {
        let target = self.dest.join(relative);
        if let Some(parent) = target.parent() {
            create_dir_owner_only(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, contents).map_err(|source| RenderError::Io {
            path: target,
            source,
        })
    }
}

fn build_environment(set: &TemplateSet) -> Result<Environment<'static>, RenderError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    // Only markup output is escaped; data formats like yml or csv are written verbatim.
    env.set_auto_escape_callback(|name: &str| match name.rsplit('.').next() {
        Some("html" | "htm" | "xml") => AutoEscape::Html,
        _ => AutoEscape::None,
    });
    filters::register(&mut env);

    env.add_template_owned(PATH_TEMPLATE, set.path.clone())?;
    if let Some(photo) = &set.photo {
        env.add_template_owned(format!("photo.{}", photo.ext), photo.source.clone())?;
    }
    env.add_template_owned(format!("photos.{}", set.photos.ext), set.photos.source.clone())?;
    Ok(env)
}
