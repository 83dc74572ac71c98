//! Template set rendering: path, per-photo and aggregate templates over photo records.

mod context;
mod engine;
pub mod filters;
mod template;

pub use context::{LocationContext, PhotoContext, TakenContext, VisibilityContext};
pub use engine::{RenderSummary, TemplateRenderEngine};
pub use template::{bundled_template_names, TemplateFile, TemplateOrigin, TemplateSet};
