use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

const MILLIS_PER_HOUR: u64 = 3_600_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// One recorded split. Both values are whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub time: u64,
    pub accumulated_time: u64,
}

/// The persisted part of the stopwatch. Elapsed time and the running flag
/// live only in [`Stopwatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopwatchState {
    #[serde(default)]
    pub laps: Vec<Lap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchStatus {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapRow {
    pub number: usize,
    pub lap: Lap,
}

#[derive(Debug, Clone)]
struct Sampler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Sampler {
    fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    fn arm(&mut self, now: Instant) -> bool {
        if self.is_active() {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    fn cancel(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stopwatch {
    state: StopwatchState,
    // Elapsed time banked by earlier runs; the current run adds on top.
    banked: Duration,
    run_started_at: Option<Instant>,
    elapsed: Duration,
    sampler: Sampler,
}

impl Stopwatch {
    pub fn new(state: StopwatchState, sample_interval: Duration) -> Self {
        Self {
            state,
            banked: Duration::ZERO,
            run_started_at: None,
            elapsed: Duration::ZERO,
            sampler: Sampler::new(sample_interval),
        }
    }

    pub fn state(&self) -> &StopwatchState {
        &self.state
    }

    pub fn laps(&self) -> &[Lap] {
        &self.state.laps
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_ms(&self) -> u64 {
        duration_to_millis(self.elapsed)
    }

    pub fn is_running(&self) -> bool {
        self.run_started_at.is_some()
    }

    pub fn status(&self) -> StopwatchStatus {
        if self.is_running() {
            StopwatchStatus::Running
        } else if self.elapsed.is_zero() {
            StopwatchStatus::Idle
        } else {
            StopwatchStatus::Paused
        }
    }

    pub fn sampler_active(&self) -> bool {
        self.sampler.is_active()
    }

    pub fn next_sample_due(&self) -> Option<Instant> {
        self.sampler.next_due
    }

    /// Returns `false` when the stopwatch was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.banked = self.elapsed;
        self.run_started_at = Some(now);
        if !self.sampler.arm(now) {
            debug!("sampler already active, not arming another");
        }
        true
    }

    /// Returns `false` when the stopwatch was not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sample(now);
        self.banked = self.elapsed;
        self.run_started_at = None;
        self.sampler.cancel();
        true
    }

    pub fn toggle(&mut self, now: Instant) -> StopwatchStatus {
        if self.is_running() {
            self.pause(now);
        } else {
            self.start(now);
        }
        self.status()
    }

    /// Recomputes elapsed time when the sampler is due. Returns whether the
    /// display needs a redraw.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_running() || !self.sampler.fire(now) {
            return false;
        }
        self.sample(now);
        true
    }

    /// Records a split while running. Returns `None` when not running or
    /// when elapsed time has not moved past the previous split.
    pub fn lap(&mut self, now: Instant) -> Option<Lap> {
        if !self.is_running() {
            return None;
        }
        self.sample(now);

        let elapsed = self.elapsed_ms();
        let previous = self
            .state
            .laps
            .last()
            .map(|lap| lap.accumulated_time)
            .unwrap_or(0);
        if elapsed <= previous {
            return None;
        }

        let lap = Lap {
            time: elapsed - previous,
            accumulated_time: elapsed,
        };
        self.state.laps.push(lap);
        Some(lap)
    }

    pub fn reset(&mut self) {
        self.sampler.cancel();
        self.run_started_at = None;
        self.banked = Duration::ZERO;
        self.elapsed = Duration::ZERO;
        self.state.laps.clear();
    }

    /// Laps newest first, numbered by recording order.
    pub fn lap_rows(&self) -> Vec<LapRow> {
        let total = self.state.laps.len();
        self.state
            .laps
            .iter()
            .rev()
            .enumerate()
            .map(|(position, lap)| LapRow {
                number: total - position,
                lap: *lap,
            })
            .collect()
    }

    fn sample(&mut self, now: Instant) {
        if let Some(started) = self.run_started_at {
            self.elapsed = self.banked + now.saturating_duration_since(started);
        }
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `MM:SS.CC` with centiseconds truncated. An hour or more gets a leading
/// hour field (`H:MM:SS.CC`) instead of wrapping.
pub fn format_duration(ms: u64) -> String {
    let hours = ms / MILLIS_PER_HOUR;
    let minutes = (ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let centis = (ms % MILLIS_PER_SECOND) / 10;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
    } else {
        format!("{minutes:02}:{seconds:02}.{centis:02}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{
        format_duration, Lap, Stopwatch, StopwatchState, StopwatchStatus, DEFAULT_SAMPLE_INTERVAL,
    };

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn stopwatch() -> Stopwatch {
        Stopwatch::new(StopwatchState::default(), DEFAULT_SAMPLE_INTERVAL)
    }

    #[test]
    fn laps_track_cumulative_and_split_times() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        watch.start(t0);

        let first = watch.lap(t0 + ms(1500)).expect("first lap should record");
        assert!((1500..1600).contains(&first.accumulated_time));
        assert_eq!(first.time, first.accumulated_time);

        let second = watch.lap(t0 + ms(3000)).expect("second lap should record");
        assert_eq!(second.accumulated_time, 3000);
        assert_eq!(second.time, second.accumulated_time - first.accumulated_time);

        let elapsed = [700u64, 1200, 4100, 4101];
        let mut watch = stopwatch();
        watch.start(t0);
        for value in elapsed {
            watch.lap(t0 + ms(value));
        }
        let mut previous = 0;
        for (lap, expected) in watch.laps().iter().zip(elapsed) {
            assert_eq!(lap.accumulated_time, expected);
            assert_eq!(lap.time, expected - previous);
            previous = expected;
        }
    }

    #[test]
    fn lap_without_progress_is_a_no_op() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        watch.start(t0);
        assert!(watch.lap(t0).is_none());

        watch.lap(t0 + ms(250)).expect("lap should record");
        assert!(watch.lap(t0 + ms(250)).is_none());
        assert_eq!(watch.laps().len(), 1);
    }

    #[test]
    fn lap_is_ignored_while_paused() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        watch.start(t0);
        watch.pause(t0 + ms(900));
        assert!(watch.lap(t0 + ms(5000)).is_none());
        assert!(watch.laps().is_empty());
    }

    #[test]
    fn pause_preserves_elapsed_across_runs() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        watch.start(t0);
        watch.pause(t0 + ms(1000));
        assert_eq!(watch.status(), StopwatchStatus::Paused);
        assert_eq!(watch.elapsed_ms(), 1000);

        // Time spent paused does not count.
        watch.start(t0 + ms(5000));
        let lap = watch.lap(t0 + ms(5500)).expect("lap should record");
        assert_eq!(lap.accumulated_time, 1500);
    }

    #[test]
    fn reset_clears_everything_from_any_state() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new(
            StopwatchState {
                laps: vec![Lap {
                    time: 10,
                    accumulated_time: 10,
                }],
            },
            DEFAULT_SAMPLE_INTERVAL,
        );
        watch.reset();
        assert!(watch.laps().is_empty());

        watch.start(t0);
        watch.lap(t0 + ms(40));
        watch.reset();
        assert!(watch.laps().is_empty());
        assert_eq!(watch.elapsed_ms(), 0);
        assert_eq!(watch.status(), StopwatchStatus::Idle);
        assert!(!watch.sampler_active());
    }

    #[test]
    fn sampler_is_armed_once_and_cancelled_on_pause() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        assert!(watch.start(t0));
        let due = watch.next_sample_due();
        assert!(!watch.start(t0 + ms(3)));
        assert_eq!(watch.next_sample_due(), due);

        assert!(!watch.tick(t0 + ms(5)));
        assert!(watch.tick(t0 + ms(10)));
        assert_eq!(watch.elapsed_ms(), 10);

        watch.pause(t0 + ms(12));
        assert!(!watch.sampler_active());
        assert!(!watch.tick(t0 + ms(100)));
        assert_eq!(watch.elapsed_ms(), 12);
    }

    #[test]
    fn lap_rows_are_newest_first_with_stable_numbers() {
        let t0 = Instant::now();
        let mut watch = stopwatch();
        watch.start(t0);
        watch.lap(t0 + ms(100));
        watch.lap(t0 + ms(300));
        watch.lap(t0 + ms(600));

        let rows = watch.lap_rows();
        let numbers = rows.iter().map(|row| row.number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert_eq!(rows[0].lap.accumulated_time, 600);
        assert_eq!(rows[2].lap.accumulated_time, 100);
    }

    #[test]
    fn formats_centiseconds_truncated() {
        assert_eq!(format_duration(0), "00:00.00");
        assert_eq!(format_duration(1_509), "00:01.50");
        assert_eq!(format_duration(61_999), "01:01.99");
        assert_eq!(format_duration(3_599_999), "59:59.99");
        assert_eq!(format_duration(3_600_000), "1:00:00.00");
        assert_eq!(format_duration(7_384_560), "2:03:04.56");
    }

    #[test]
    fn lap_serializes_with_accumulated_time_field() {
        let lap = Lap {
            time: 5,
            accumulated_time: 12,
        };
        let json = serde_json::to_string(&lap).expect("lap should encode");
        assert_eq!(json, r#"{"time":5,"accumulatedTime":12}"#);
    }
}
