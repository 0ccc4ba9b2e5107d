//! CLI-specific progress handling for mediagrab
//!
//! One bar per download batch, counting finished items.

use indicatif::{ProgressBar, ProgressStyle};

use mediagrab::ProgressCallback;

/// Creates a progress bar counting items of a batch
pub fn create_progress_bar(total_items: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_items);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} items ({percent}%) ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Progress bar plus the callback the downloader reports into
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_items: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_items);

        // Print initial message to stderr
        eprintln!("{message}");

        Self { pb }
    }

    /// Callback advancing the bar as `(completed, total)` reports arrive
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        std::sync::Arc::new(move |completed, total| {
            if pb.length().unwrap_or(0) != total {
                pb.set_length(total);
            }
            pb.set_position(completed);
            if completed >= total {
                pb.finish_with_message("✅ Downloads finished");
            }
        })
    }
}
