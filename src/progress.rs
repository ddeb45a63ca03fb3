//! Progress bar for installs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{InstallOutcome, PackageName, ProgressCallback};
use std::sync::OnceLock;

/// Drives an indicatif bar from the installer's callbacks
pub struct InstallProgress {
    bar: OnceLock<ProgressBar>,
    hidden: bool,
}

impl InstallProgress {
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: OnceLock::new(),
            hidden,
        }
    }

    fn bar(&self) -> Option<&ProgressBar> {
        self.bar.get()
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╾─")
}

impl ProgressCallback for InstallProgress {
    fn on_batch_start(&self, count: usize) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(count as u64);
            bar.set_style(style());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            bar
        };
        let _ = self.bar.set(bar);
    }

    fn on_install_start(&self, package: &PackageName) {
        if let Some(bar) = self.bar() {
            bar.set_message(format!("installing {package}"));
        }
    }

    fn on_install_complete(&self, package: &PackageName, outcome: &InstallOutcome) {
        let Some(bar) = self.bar() else { return };
        match outcome {
            InstallOutcome::Success => {
                bar.println(format!("  {} {package}", "✓".green()));
            }
            InstallOutcome::Failed(reason) => {
                bar.println(format!(
                    "  {} {package} {}",
                    "✗".red(),
                    format!("({})", reason.detail()).dimmed()
                ));
            }
        }
        bar.inc(1);
    }

    fn on_batch_complete(&self) {
        if let Some(bar) = self.bar() {
            bar.finish_and_clear();
        }
    }
}
