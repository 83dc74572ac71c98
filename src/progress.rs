//! Terminal progress bars for the download workflow.

use indicatif::{ProgressBar, ProgressStyle};

use flickr_cli_core::contract::ItemRecord;
use flickr_cli_core::detail::FetchProgress;
use flickr_cli_core::render::PhotoContext;
use flickr_cli_core::workflow::DownloadObserver;

const BAR_TEMPLATE: &str = "{spinner:.green} {prefix:<18} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

fn bar(len: u64, prefix: &'static str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    let pb = ProgressBar::new(len);
    pb.set_style(style);
    pb.set_prefix(prefix);
    pb
}

/// One bar for metadata retrieval, then one for rendering.
#[derive(Default)]
pub struct DownloadProgress {
    fetch: Option<ProgressBar>,
    render: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear whatever bar is still visible.
    pub fn finish(&mut self) {
        for pb in [self.fetch.take(), self.render.take()].into_iter().flatten() {
            pb.finish_and_clear();
        }
    }
}

impl FetchProgress for DownloadProgress {
    fn on_total(&mut self, total: u64) {
        self.fetch = Some(bar(total, "Retrieving metadata"));
    }

    fn on_record(&mut self, record: &ItemRecord) {
        if let Some(pb) = &self.fetch {
            pb.set_message(record.id.clone());
            pb.inc(1);
        }
    }
}

impl DownloadObserver for DownloadProgress {
    fn on_render_start(&mut self, total: usize) {
        if let Some(pb) = self.fetch.take() {
            pb.finish_and_clear();
        }
        self.render = Some(bar(total as u64, "Rendering"));
    }

    fn on_rendered(&mut self, photo: &PhotoContext) {
        if let Some(pb) = &self.render {
            pb.set_message(photo.path.clone());
            pb.inc(1);
        }
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
