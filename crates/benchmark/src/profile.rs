//! Load profiles: how many burn workers should run at a given moment.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Target load of the stress profile and the first rung of the ladder.
pub const FULL_LOAD: u8 = 100;

/// Load levels visited by the cyclic profile, in order, wrapping.
pub const LOAD_LADDER: [u8; 5] = [100, 75, 50, 25, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// 100% CPU on every core until the threshold or an interrupt.
    Stress,
    /// Rotate through 100/75/50/25/0% load.
    Cyclic,
}

impl Profile {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::Cyclic => "cyclic",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workers needed for `level` percent of `max_workers` cores, rounded down.
pub fn target_workers(max_workers: usize, level: u8) -> usize {
    max_workers * usize::from(level) / 100
}

/// Position on [`LOAD_LADDER`], advanced one rung per elapsed dwell period.
#[derive(Debug, Clone)]
pub struct CyclicSchedule {
    dwell: Duration,
    index: usize,
    level_started: Instant,
}

impl CyclicSchedule {
    pub fn new(dwell: Duration, now: Instant) -> Self {
        Self {
            dwell,
            index: 0,
            level_started: now,
        }
    }

    pub fn level(&self) -> u8 {
        LOAD_LADDER[self.index]
    }

    /// Move to the next rung if the current one has run for a full dwell.
    /// Returns the new level when a switch happened.
    ///
    /// At most one rung is advanced per call, however late the call is.
    pub fn advance(&mut self, now: Instant) -> Option<u8> {
        if now.saturating_duration_since(self.level_started) < self.dwell {
            return None;
        }
        self.index = (self.index + 1) % LOAD_LADDER.len();
        self.level_started = now;
        Some(self.level())
    }
}

/// The running profile.
#[derive(Debug, Clone)]
pub enum LoadProfile {
    Stress,
    Cyclic(CyclicSchedule),
}

impl LoadProfile {
    pub fn new(profile: Profile, cycle_duration: Duration, now: Instant) -> Self {
        match profile {
            Profile::Stress => Self::Stress,
            Profile::Cyclic => Self::Cyclic(CyclicSchedule::new(cycle_duration, now)),
        }
    }

    /// Current target load in percent, advancing the cyclic ladder first.
    pub fn level(&mut self, now: Instant) -> u8 {
        match self {
            Self::Stress => FULL_LOAD,
            Self::Cyclic(schedule) => {
                if let Some(level) = schedule.advance(now) {
                    tracing::info!(level, "Switching to {level}% load");
                }
                schedule.level()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_on_four_cores() {
        let workers: Vec<usize> = LOAD_LADDER.iter().map(|&l| target_workers(4, l)).collect();
        assert_eq!(workers, [4, 3, 2, 1, 0]);
    }

    #[test]
    fn partial_cores_round_down() {
        assert_eq!(target_workers(6, 75), 4);
        assert_eq!(target_workers(1, 50), 0);
        assert_eq!(target_workers(0, 100), 0);
    }

    #[test]
    fn schedule_holds_for_dwell_then_advances() {
        let start = Instant::now();
        let dwell = Duration::from_secs(60);
        let mut schedule = CyclicSchedule::new(dwell, start);

        assert_eq!(schedule.advance(start + Duration::from_secs(59)), None);
        assert_eq!(schedule.level(), 100);
        assert_eq!(schedule.advance(start + dwell), Some(75));
        assert_eq!(schedule.advance(start + dwell + Duration::from_secs(1)), None);
    }

    #[test]
    fn late_check_advances_one_rung_only() {
        let start = Instant::now();
        let mut schedule = CyclicSchedule::new(Duration::from_secs(10), start);
        assert_eq!(schedule.advance(start + Duration::from_secs(45)), Some(75));
        assert_eq!(schedule.level(), 75);
    }

    #[test]
    fn ladder_wraps_back_to_full_load() {
        let dwell = Duration::from_secs(1);
        let mut now = Instant::now();
        let mut schedule = CyclicSchedule::new(dwell, now);

        let mut seen = Vec::new();
        for _ in 0..6 {
            now += dwell;
            seen.push(schedule.advance(now).unwrap());
        }
        assert_eq!(seen, [75, 50, 25, 0, 100, 75]);
    }

    #[test]
    fn stress_is_always_full_load() {
        let start = Instant::now();
        let mut profile = LoadProfile::new(Profile::Stress, Duration::from_secs(1), start);
        assert_eq!(profile.level(start), 100);
        assert_eq!(profile.level(start + Duration::from_secs(3600)), 100);
    }
}
