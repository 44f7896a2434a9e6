use indicatif::{ProgressBar, ProgressStyle};

use canvasfit::core::processing::batch::{BatchReport, ProgressObserver};

/// Terminal progress bar fed by the batch runner.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl Default for BarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarObserver {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_item(&self, done: usize, _total: usize, name: &str, ok: bool) {
        self.bar.set_position(done as u64);
        if ok {
            self.bar.set_message(name.to_string());
        } else {
            self.bar.set_message(format!("failed: {name}"));
        }
    }

    fn on_finish(&self, report: &BatchReport) {
        self.bar.finish_with_message(format!(
            "done: {} ok, {} failed",
            report.processed, report.errors
        ));
    }
}
