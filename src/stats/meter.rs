// src/stats/meter.rs
use parking_lot::Mutex;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(5);

/// Point-in-time view of a [`Meter`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    /// Total number of events marked
    pub count: u64,
    /// One-minute exponentially weighted rate (events per second)
    pub rate1: f64,
    /// Mean rate since the meter was created (events per second)
    pub rate_mean: f64,
}

struct MeterState {
    count: u64,
    uncounted: u64,
    rate: f64,
    primed: bool,
    last_tick: Instant,
    started: Instant,
}

/// Counts events and derives a one-minute moving average rate
///
/// Ticks are applied lazily whenever the meter is marked or read, so no
/// background thread is needed.
pub struct Meter {
    state: Mutex<MeterState>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    /// Creates an empty meter
    pub fn new() -> Self {
        let now = Instant::now();
        Meter {
            state: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                rate: 0.0,
                primed: false,
                last_tick: now,
                started: now,
            }),
        }
    }

    /// Records `n` events
    pub fn mark(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    /// Total number of events recorded
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// One-minute moving average in events per second
    pub fn rate1(&self) -> f64 {
        self.snapshot_at(Instant::now()).rate1
    }

    /// Current count and rates
    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn mark_at(&self, n: u64, now: Instant) {
        let mut state = self.state.lock();
        tick(&mut state, now);
        state.count += n;
        state.uncounted += n;
    }

    fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.state.lock();
        tick(&mut state, now);
        let elapsed = now.saturating_duration_since(state.started).as_secs_f64();
        MeterSnapshot {
            count: state.count,
            rate1: state.rate,
            rate_mean: if elapsed > 0.0 {
                state.count as f64 / elapsed
            } else {
                0.0
            },
        }
    }
}

fn alpha() -> f64 {
    1.0 - (-TICK.as_secs_f64() / 60.0).exp()
}

fn tick(state: &mut MeterState, now: Instant) {
    let elapsed = now.saturating_duration_since(state.last_tick);
    let ticks = (elapsed.as_nanos() / TICK.as_nanos()) as u32;
    if ticks == 0 {
        return;
    }

    // the first tick carries everything marked since the last one
    let instant = state.uncounted as f64 / TICK.as_secs_f64();
    if state.primed {
        state.rate += alpha() * (instant - state.rate);
    } else {
        state.rate = instant;
        state.primed = true;
    }
    state.uncounted = 0;

    // remaining idle ticks only decay
    if ticks > 1 {
        state.rate *= (1.0 - alpha()).powi(ticks as i32 - 1);
    }
    state.last_tick += TICK * ticks;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate() {
        let meter = Meter::new();
        meter.mark(10);
        meter.mark(5);
        assert_eq!(meter.count(), 15);
    }

    #[test]
    fn first_tick_sets_instant_rate() {
        let meter = Meter::new();
        let start = meter.state.lock().last_tick;
        meter.mark_at(500, start);
        let snap = meter.snapshot_at(start + TICK);
        assert_eq!(snap.count, 500);
        assert!((snap.rate1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn idle_ticks_decay_the_rate() {
        let meter = Meter::new();
        let start = meter.state.lock().last_tick;
        meter.mark_at(500, start);
        let first = meter.snapshot_at(start + TICK).rate1;
        let later = meter.snapshot_at(start + TICK * 13).rate1;
        assert!(later < first);
        assert!(later > 0.0);
    }

    #[test]
    fn rate_is_zero_before_first_tick() {
        let meter = Meter::new();
        meter.mark(1000);
        let start = meter.state.lock().last_tick;
        assert_eq!(meter.snapshot_at(start).rate1, 0.0);
    }
}
