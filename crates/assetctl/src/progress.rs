//! Upload progress bar.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use assetctl_core::TransferObserver;

/// Renders transfer progress on stderr. Hidden in quiet mode or when stderr
/// is not a terminal.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(quiet: bool) -> Self {
        let bar = ProgressBar::hidden();
        if !quiet {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} {msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl TransferObserver for ProgressObserver {
    fn registered(&self, resource_id: &str, parts: usize, total_bytes: u64) {
        // No payload: the transfer ends at registration.
        if total_bytes == 0 {
            self.bar
                .finish_with_message(format!("{resource_id}: registered without a file"));
            return;
        }
        self.bar.set_length(total_bytes);
        self.bar
            .set_message(format!("{resource_id}: {parts} part(s)"));
        self.bar.enable_steady_tick(Duration::from_millis(120));
    }

    fn part_uploaded(&self, _part_number: u32, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finalized(&self, resource_id: &str) {
        self.bar.finish_with_message(format!("{resource_id}: uploaded"));
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
