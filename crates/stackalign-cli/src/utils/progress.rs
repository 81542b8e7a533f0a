use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use stackalign::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

#[derive(Debug)]
struct BarState {
    bar: ProgressBar,
    phase: Option<&'static str>,
    aligned: usize,
    /// Lowest score seen in the current phase.
    weakest: Option<(String, f64)>,
}

impl BarState {
    fn start_phase(&mut self, name: &'static str) {
        self.phase = Some(name);
        self.aligned = 0;
        self.weakest = None;
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(spinner_style());
        self.bar.set_prefix(name);
        self.bar.set_message("");
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    }

    fn record_entry(&mut self, key: String, score: f64) {
        self.aligned += 1;
        self.bar.set_message(format!("{key} TM={score:.4}"));
        if self.weakest.as_ref().is_none_or(|(_, s)| score < *s) {
            self.weakest = Some((key, score));
        }
    }

    fn summary(&self) -> String {
        let phase = self.phase.unwrap_or("Done");
        match &self.weakest {
            Some((key, score)) => format!(
                "✓ {}: {} entries, lowest TM-score {} ({:.4})",
                phase, self.aligned, key, score
            ),
            None => format!("✓ {}", phase),
        }
    }
}

/// Renders [`Progress`] events from the alignment workflow as a single stderr bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(spinner_style());
        bar.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState {
                bar,
                phase: None,
                aligned: 0,
                weakest: None,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => state.start_phase(name),
                Progress::TaskStart { total_steps } => {
                    state.bar.disable_steady_tick();
                    state.bar.set_length(total_steps);
                    state.bar.set_position(0);
                    state.bar.set_style(bar_style());
                }
                Progress::EntryAligned { key, score } => {
                    debug!(%key, score, "Entry aligned.");
                    state.record_entry(key, score);
                }
                Progress::TaskIncrement => state.bar.inc(1),
                Progress::TaskFinish => {
                    let total = state.bar.length().unwrap_or(0);
                    state.bar.set_position(total);
                }
                Progress::PhaseFinish => {
                    state.bar.disable_steady_tick();
                    let summary = state.summary();
                    state.bar.finish_with_message(summary);
                }
                Progress::Message(msg) => state.bar.println(format!("  {}", msg)),
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix} {msg}")
        .expect("Failed to create spinner style template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<20} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")
        .expect("Failed to create bar style template")
        .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("=>-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_handler_has_no_phase() {
        let handler = CliProgressHandler::new();
        let state = handler.state.lock().unwrap();
        assert!(state.phase.is_none());
        assert!(state.bar.is_finished());
        assert_eq!(state.summary(), "✓ Done");
    }

    #[test]
    fn alignment_run_tracks_count_and_weakest_entry() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Aligning Structures",
        });
        callback(Progress::TaskStart { total_steps: 3 });
        for (key, score) in [("1ycr", 1.0), ("3eiy", 0.23483), ("2d7t", 0.27812)] {
            callback(Progress::EntryAligned {
                key: key.into(),
                score,
            });
            callback(Progress::TaskIncrement);
        }
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.position(), 3);
            assert_eq!(state.bar.message(), "2d7t TM=0.2781");
            assert_eq!(state.aligned, 3);
        }

        callback(Progress::TaskFinish);
        callback(Progress::PhaseFinish);
        let state = handler.state.lock().unwrap();
        assert!(state.bar.is_finished());
        assert_eq!(
            state.bar.message(),
            "✓ Aligning Structures: 3 entries, lowest TM-score 3eiy (0.2348)"
        );
    }

    #[test]
    fn a_new_phase_resets_the_tally() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "First" });
        callback(Progress::EntryAligned {
            key: "a".into(),
            score: 0.5,
        });
        callback(Progress::PhaseStart { name: "Second" });

        let state = handler.state.lock().unwrap();
        assert_eq!(state.aligned, 0);
        assert!(state.weakest.is_none());
        assert_eq!(state.bar.prefix(), "Second");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Thread Test",
            });
            callback(Progress::TaskIncrement);
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert!(handler.state.lock().unwrap().bar.is_finished());
    }
}
