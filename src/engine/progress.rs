//! Progress bar utilities for displaying processing status

use kdam::{Animation, Bar, BarExt};

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> Bar {
    kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )
}

/// Advance the bar by `n` if one is shown.
pub fn update_progress_bar(pb: &mut Option<Bar>, n: usize) {
    if let Some(bar) = pb.as_mut() {
        let _ = bar.update(n);
    }
}

/// Finish the bar line so following log output starts on a fresh line.
pub fn finish_progress_bar(pb: Option<Bar>) {
    if let Some(mut bar) = pb {
        let _ = bar.refresh();
        eprintln!();
    }
}
