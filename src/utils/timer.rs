//! Timing helpers for runner processes and pipeline stages

use std::time::{Duration, Instant};

/// Measures one runner process
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Records how long each pipeline stage took
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    laps: Vec<(&'static str, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Mark the end of a stage
    pub fn lap(&mut self, stage: &'static str) {
        self.laps.push((stage, self.start.elapsed()));
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// Per-stage durations (not cumulative)
    pub fn stage_times(&self) -> Vec<(&'static str, Duration)> {
        let mut prev = Duration::ZERO;
        self.laps
            .iter()
            .map(|(stage, cumulative)| {
                let spent = cumulative.saturating_sub(prev);
                prev = *cumulative;
                (*stage, spent)
            })
            .collect()
    }

    /// One line, e.g. `resolve=12ms emit=1ms run=3400ms`
    pub fn format(&self) -> String {
        self.stage_times()
            .iter()
            .map(|(stage, d)| format!("{stage}={}ms", d.as_millis()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer() {
        let timer = Timer::start("unit");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert_eq!(timer.label(), "unit");
    }

    #[test]
    fn test_stopwatch_stages() {
        let mut sw = Stopwatch::new();
        sleep(Duration::from_millis(10));
        sw.lap("resolve");
        sleep(Duration::from_millis(10));
        sw.lap("run");

        let stages = sw.stage_times();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].0, "resolve");
        assert!(stages[1].1 >= Duration::from_millis(10));
        assert!(sw.format().starts_with("resolve="));
    }
}
