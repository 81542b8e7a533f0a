//! Progress events emitted while a stack is being aligned.

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// One entry has been superposed onto the target.
    EntryAligned { key: String, score: f64 },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Reports the start of a phase along with the number of steps it will take.
    pub fn start_task(&self, name: &'static str, total_steps: u64) {
        self.report(Progress::PhaseStart { name });
        self.report(Progress::TaskStart { total_steps });
    }

    pub fn finish_task(&self) {
        self.report(Progress::TaskFinish);
        self.report(Progress::PhaseFinish);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn silent_reporter_ignores_events() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(event);
        }));

        reporter.start_task("Aligning", 2);
        reporter.report(Progress::TaskIncrement);
        reporter.finish_task();
        drop(reporter);

        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                Progress::PhaseStart { name: "Aligning" },
                Progress::TaskStart { total_steps: 2 },
                Progress::TaskIncrement,
                Progress::TaskFinish,
                Progress::PhaseFinish,
            ]
        );
    }
}
