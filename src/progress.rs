//! Terminal progress using indicatif.
//!
//! The finder reports two phases through [`ProgressCallback`]:
//!
//! - `walking`: a spinner counting discovered candidates
//! - `cascade`: a bar counting finished size buckets, with bytes read

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Receives progress events from the finder.
pub trait ProgressCallback: Send + Sync {
    /// A phase begins; `total` is 0 when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// `current` items of the phase are done; `label` names the latest one.
    fn on_progress(&self, current: usize, label: &str);

    /// Bytes read while finishing the latest item.
    fn on_item_completed(&self, _bytes: u64) {}

    fn on_phase_end(&self, phase: &str);

    fn on_message(&self, _message: &str) {}
}

/// indicatif-backed reporter; silent when `quiet`.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    cascade: Mutex<Option<ProgressBar>>,
    bytes: Mutex<u64>,
    quiet: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// # Examples
    ///
    /// ```
    /// use dupsift::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            cascade: Mutex::new(None),
            bytes: Mutex::new(0),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn cascade_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} buckets ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        lock(&self.cascade)
            .clone()
            .or_else(|| lock(&self.walking).clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking");
                pb.enable_steady_tick(Duration::from_millis(100));
                *lock(&self.walking) = Some(pb);
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::cascade_style());
                pb.set_message(phase.to_string());
                *lock(&self.bytes) = 0;
                *lock(&self.cascade) = Some(pb);
            }
        }
    }

    fn on_progress(&self, current: usize, label: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            pb.set_message(truncate_label(label, 40));
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if self.quiet {
            return;
        }
        let total = {
            let mut read = lock(&self.bytes);
            *read += bytes;
            *read
        };
        if let Some(pb) = lock(&self.cascade).as_ref() {
            pb.set_message(format!("{} read", bytesize::ByteSize::b(total)));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        let slot = if phase == "walking" {
            &self.walking
        } else {
            &self.cascade
        };
        if let Some(pb) = lock(slot).take() {
            pb.finish_with_message(format!("{phase} complete"));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}

/// Keep the tail of a long label, on a char boundary.
fn truncate_label(label: &str, max_chars: usize) -> String {
    let count = label.chars().count();
    if count <= max_chars {
        return label.to_string();
    }
    let tail: String = label.chars().skip(count - (max_chars - 3)).collect();
    format!("...{tail}")
}
