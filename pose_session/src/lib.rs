//! # pose_session
//!
//! The pose-hold state machine.  Each tick it consumes one frame of
//! per-finger readings, decides whether the current pose is matched,
//! advances a bounded progress step, counts the hold timer down, and on
//! completion moves the session forward through poses, rounds, and sets.
//!
//! The session is purely reactive: it owns no thread or clock.  An external
//! scheduler calls [`Session::tick`] at a fixed cadence and supplies the
//! elapsed `tick_delta` itself.  Ticks must be applied in increasing time
//! order to a single session; there is no internal locking.
//!
//! Two independent signals are produced while a pose is held:
//!
//! * the **hand-position step** — increments once per matched tick up to
//!   `pose.step_count`, hard-resets to 0 on any miss (progress feedback);
//! * the **hold countdown** — decrements by `tick_delta` per matched tick,
//!   resets to the full duration on any miss.
//!
//! Neither signal decays: a single missed tick restarts both.
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use pose_catalog::PoseCatalog;
//! use pose_session::{FingerReadings, Session, SessionConfig};
//!
//! let mut session = Session::new(PoseCatalog::builtin(), SessionConfig::default());
//! session.start().unwrap();
//!
//! // Straight hand: all fingers extended.
//! let open = FingerReadings::of([90.0, 175.0, 175.0, 175.0, 175.0]);
//! let tick = session.tick(open, Duration::from_secs(1));
//! assert_eq!(tick.snapshot.step, 1);
//! assert_eq!(tick.snapshot.hold_remaining, Duration::from_secs(4));
//! ```

use std::time::Duration;

use pose_catalog::{Finger, Pose, PoseCatalog};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// FingerReadings
// ════════════════════════════════════════════════════════════════════════════

/// One frame of finger extension angles, in degrees.
///
/// `None` models an unavailable reading (hand out of view, sensor fault);
/// it is ordinary data, not an error, and never matches any range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FingerReadings([Option<f32>; 5]);

impl FingerReadings {
    /// No readings at all — hand away or sensor dark.
    pub fn none() -> Self {
        FingerReadings([None; 5])
    }

    /// The same angle on every finger.
    pub fn all(angle: f32) -> Self {
        FingerReadings([Some(angle); 5])
    }

    /// One angle per finger, thumb first.
    pub fn of(angles: [f32; 5]) -> Self {
        FingerReadings(angles.map(Some))
    }

    /// The reading for one finger, if available.
    pub fn get(&self, finger: Finger) -> Option<f32> {
        self.0[finger.index()]
    }

    /// Copy with one finger's reading replaced.
    pub fn with(mut self, finger: Finger, angle: f32) -> Self {
        self.0[finger.index()] = Some(angle);
        self
    }

    /// Copy with one finger's reading marked unavailable.
    pub fn without(mut self, finger: Finger) -> Self {
        self.0[finger.index()] = None;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// matcher — per-tick pose matching + step counter
// ════════════════════════════════════════════════════════════════════════════

pub mod matcher {
    use super::{Finger, FingerReadings, Pose};

    /// Match one frame of readings against a pose and advance the progress
    /// step.
    ///
    /// `all_matched` is true iff every finger's reading sits inside its
    /// acceptance range.  The returned step increments by one per matched
    /// tick, capped at `pose.step_count`, and resets to 0 the moment any
    /// finger misses — no partial credit.
    pub fn evaluate(readings: FingerReadings, pose: &Pose, prev_step: u8) -> (bool, u8) {
        let all_matched = Finger::ALL
            .iter()
            .all(|&finger| pose.range(finger).contains(readings.get(finger)));
        let new_step = if all_matched {
            prev_step.saturating_add(1).min(pose.step_count)
        } else {
            0
        };
        (all_matched, new_step)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// timer — the hold countdown
// ════════════════════════════════════════════════════════════════════════════

pub mod timer {
    use std::time::Duration;

    /// Advance the hold countdown by one tick.
    ///
    /// While matched the remaining time shrinks by `tick_delta` (saturating
    /// at zero); any miss restores the full duration.  Completion is
    /// signalled by the result reaching exactly zero.
    pub fn advance(
        all_matched: bool,
        remaining: Duration,
        full: Duration,
        tick_delta: Duration,
    ) -> Duration {
        if all_matched {
            remaining.saturating_sub(tick_delta)
        } else {
            full
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SessionConfig
// ════════════════════════════════════════════════════════════════════════════

/// Progression policy supplied at configuration time.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Completed rounds per set.  Clamped to at least 1.
    pub rounds_per_set: u32,
    /// Stop after this many sets; `None` runs unbounded.
    pub sets_target:    Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            rounds_per_set: 10,
            sets_target:    None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Snapshot and events
// ════════════════════════════════════════════════════════════════════════════

/// Immutable view of the session for presentation.  Returned by value from
/// every [`Session::tick`]; the presentation layer never reaches into
/// session internals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub pose_id:        u8,
    pub round:          u32,
    pub set:            u32,
    pub hold_remaining: Duration,
    pub hold_full:      Duration,
    pub step:           u8,
    pub step_count:     u8,
    pub running:        bool,
    pub finished:       bool,
}

/// Emitted exactly once per completed hold, carrying the counters as they
/// stood when the hold finished (before the advance).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub pose_id: u8,
    pub round:   u32,
    pub set:     u32,
}

/// Result of one tick: the post-tick snapshot plus the completion event,
/// if this tick finished a hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub snapshot:  SessionSnapshot,
    pub completed: Option<Completion>,
}

/// Control calls invoked in a state where they are not defined.  Explicit
/// no-op signals — never silent corruption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is already running")]
    AlreadyRunning,
    #[error("session is not running")]
    NotRunning,
    #[error("session has finished; reset to go again")]
    Finished,
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

/// Owns all mutable session state.  Nothing else mutates it; callers see
/// only [`SessionSnapshot`] copies.
pub struct Session {
    catalog:        PoseCatalog,
    config:         SessionConfig,
    pose_idx:       usize,
    round:          u32,
    set:            u32,
    hold_remaining: Duration,
    step:           u8,
    running:        bool,
    finished:       bool,
}

impl Session {
    pub fn new(catalog: PoseCatalog, config: SessionConfig) -> Self {
        let config = SessionConfig {
            rounds_per_set: config.rounds_per_set.max(1),
            ..config
        };
        let first_hold = catalog.poses()[0].hold;
        Session {
            catalog,
            config,
            pose_idx:       0,
            round:          0,
            set:            0,
            hold_remaining: first_hold,
            step:           0,
            running:        false,
            finished:       false,
        }
    }

    pub fn catalog(&self) -> &PoseCatalog {
        &self.catalog
    }

    /// The pose the user is currently working on.
    pub fn current_pose(&self) -> &Pose {
        &self.catalog.poses()[self.pose_idx]
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let pose = self.current_pose();
        SessionSnapshot {
            pose_id:        pose.id,
            round:          self.round,
            set:            self.set,
            hold_remaining: self.hold_remaining,
            hold_full:      pose.hold,
            step:           self.step,
            step_count:     pose.step_count,
            running:        self.running,
            finished:       self.finished,
        }
    }

    // ── control ──────────────────────────────────────────────────────────

    /// Begin (or resume) ticking.  Counters keep whatever values they had;
    /// a freshly created session starts at the first pose with the full
    /// hold duration.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        if self.running {
            return Err(SessionError::AlreadyRunning);
        }
        self.running = true;
        tracing::info!(pose = self.current_pose().id, "session started");
        Ok(())
    }

    /// Stop ticking without touching any counter.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        self.running = false;
        tracing::info!("session paused");
        Ok(())
    }

    /// Return to the initial state: first pose, zero counters, not
    /// running.  Always valid.
    pub fn reset(&mut self) {
        self.pose_idx = 0;
        self.round = 0;
        self.set = 0;
        self.hold_remaining = self.catalog.poses()[0].hold;
        self.step = 0;
        self.running = false;
        self.finished = false;
        tracing::info!("session reset");
    }

    // ── the tick ─────────────────────────────────────────────────────────

    /// Apply one frame of readings.  On an idle session this is a no-op
    /// returning the unchanged snapshot.
    pub fn tick(&mut self, readings: FingerReadings, tick_delta: Duration) -> Tick {
        if !self.running {
            return Tick {
                snapshot:  self.snapshot(),
                completed: None,
            };
        }

        let pose = &self.catalog.poses()[self.pose_idx];
        let (matched, step) = matcher::evaluate(readings, pose, self.step);
        let remaining = timer::advance(matched, self.hold_remaining, pose.hold, tick_delta);
        self.step = step;
        self.hold_remaining = remaining;

        let mut completed = None;
        if remaining == Duration::ZERO {
            let done = Completion {
                pose_id: pose.id,
                round:   self.round,
                set:     self.set,
            };
            tracing::debug!(
                pose = done.pose_id,
                round = done.round,
                set = done.set,
                "pose hold completed"
            );
            completed = Some(done);
            self.advance_pose();
        }

        Tick {
            snapshot: self.snapshot(),
            completed,
        }
    }

    /// Move to the next pose in catalog order, wrapping to the first and
    /// bumping the round counter at the end; a set completes every
    /// `rounds_per_set` rounds.  Counters are cumulative — they only grow
    /// until an explicit reset.
    fn advance_pose(&mut self) {
        self.pose_idx += 1;
        if self.pose_idx >= self.catalog.len() {
            self.pose_idx = 0;
            self.round += 1;
            if self.round % self.config.rounds_per_set == 0 {
                self.set += 1;
                if let Some(target) = self.config.sets_target {
                    if self.set >= target {
                        self.finished = true;
                        self.running = false;
                        tracing::info!(sets = self.set, "session finished");
                    }
                }
            }
        }
        self.hold_remaining = self.catalog.poses()[self.pose_idx].hold;
        self.step = 0;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pose_catalog::FingerRange;

    const SEC: Duration = Duration::from_secs(1);

    /// A pose accepting 0–90° on every finger.
    fn test_pose(id: u8, hold_secs: u64) -> Pose {
        Pose {
            id,
            name:        format!("pose {id}"),
            description: String::new(),
            ranges:      [FingerRange::new(0.0, 90.0); 5],
            hold:        Duration::from_secs(hold_secs),
            step_count:  5,
        }
    }

    fn two_pose_session(rounds_per_set: u32) -> Session {
        let catalog = PoseCatalog::new(vec![test_pose(1, 3), test_pose(2, 2)]).unwrap();
        Session::new(
            catalog,
            SessionConfig {
                rounds_per_set,
                sets_target: None,
            },
        )
    }

    fn held() -> FingerReadings {
        FingerReadings::all(45.0)
    }

    fn missed() -> FingerReadings {
        FingerReadings::all(120.0)
    }

    // ── matcher ──────────────────────────────────────────────────────────
    #[test]
    fn matcher_requires_all_five_fingers() {
        let pose = test_pose(1, 3);
        let (matched, _) = matcher::evaluate(held(), &pose, 0);
        assert!(matched);

        let one_out = held().with(Finger::Pinky, 120.0);
        let (matched, _) = matcher::evaluate(one_out, &pose, 3);
        assert!(!matched);
    }

    #[test]
    fn matcher_unavailable_finger_blocks_match() {
        // Scenario C: one unavailable finger on an otherwise-matching hand.
        let pose = test_pose(1, 3);
        let (matched, step) = matcher::evaluate(held().without(Finger::Middle), &pose, 2);
        assert!(!matched);
        assert_eq!(step, 0);
    }

    #[test]
    fn matcher_step_increments_and_caps() {
        let pose = test_pose(1, 3);
        let mut step = 0;
        for expected in [1, 2, 3, 4, 5, 5, 5] {
            let (matched, next) = matcher::evaluate(held(), &pose, step);
            assert!(matched);
            assert_eq!(next, expected);
            step = next;
        }
    }

    #[test]
    fn matcher_step_hard_resets_on_miss() {
        let pose = test_pose(1, 3);
        let (_, step) = matcher::evaluate(missed(), &pose, 4);
        assert_eq!(step, 0);
    }

    // ── timer ────────────────────────────────────────────────────────────
    #[test]
    fn timer_counts_down_while_matched() {
        let full = Duration::from_secs(5);
        let r = timer::advance(true, full, full, SEC);
        assert_eq!(r, Duration::from_secs(4));
    }

    #[test]
    fn timer_saturates_at_zero() {
        let full = Duration::from_secs(5);
        let r = timer::advance(true, Duration::from_millis(300), full, SEC);
        assert_eq!(r, Duration::ZERO);
    }

    #[test]
    fn timer_resets_fully_on_miss() {
        let full = Duration::from_secs(5);
        let r = timer::advance(false, Duration::from_secs(1), full, SEC);
        assert_eq!(r, full);
    }

    // ── session control ──────────────────────────────────────────────────
    #[test]
    fn tick_is_noop_while_idle() {
        let mut s = two_pose_session(10);
        let before = s.snapshot();
        let t = s.tick(held(), SEC);
        assert_eq!(t.snapshot, before);
        assert!(t.completed.is_none());
    }

    #[test]
    fn reset_then_tick_changes_nothing() {
        let mut s = two_pose_session(10);
        s.start().unwrap();
        s.tick(held(), SEC);
        s.reset();
        let before = s.snapshot();
        let t = s.tick(held(), SEC);
        assert_eq!(t.snapshot, before);
        assert_eq!(before.round, 0);
        assert_eq!(before.set, 0);
        assert_eq!(before.hold_remaining, Duration::from_secs(3));
    }

    #[test]
    fn double_start_is_signalled() {
        let mut s = two_pose_session(10);
        s.start().unwrap();
        assert_eq!(s.start(), Err(SessionError::AlreadyRunning));
    }

    #[test]
    fn pause_while_idle_is_signalled() {
        let mut s = two_pose_session(10);
        assert_eq!(s.pause(), Err(SessionError::NotRunning));
    }

    #[test]
    fn pause_keeps_counters() {
        let mut s = two_pose_session(10);
        s.start().unwrap();
        s.tick(held(), SEC);
        let before = s.snapshot();
        s.pause().unwrap();
        let after = s.snapshot();
        assert_eq!(after.hold_remaining, before.hold_remaining);
        assert_eq!(after.step, before.step);
        assert!(!after.running);
    }

    // ── hold completion ──────────────────────────────────────────────────
    #[test]
    fn scenario_a_two_poses_one_round() {
        // Durations 3 and 2 ticks; 3 + 2 matching ticks yield exactly two
        // completions and one full traversal.
        let mut s = two_pose_session(10);
        s.start().unwrap();

        let mut completions = Vec::new();
        for _ in 0..5 {
            if let Some(c) = s.tick(held(), SEC).completed {
                completions.push(c);
            }
        }

        assert_eq!(completions.len(), 2);
        assert_eq!(completions[0], Completion { pose_id: 1, round: 0, set: 0 });
        assert_eq!(completions[1], Completion { pose_id: 2, round: 0, set: 0 });
        assert_eq!(s.snapshot().round, 1);
        assert_eq!(s.snapshot().pose_id, 1);
    }

    #[test]
    fn scenario_b_miss_restarts_the_hold() {
        // 1 tick held of 3, one miss, then the full 3 again: 4 matching
        // ticks total before completion — reset, not decay.
        let mut s = two_pose_session(10);
        s.start().unwrap();

        assert!(s.tick(held(), SEC).completed.is_none());
        let t = s.tick(missed(), SEC);
        assert!(t.completed.is_none());
        assert_eq!(t.snapshot.hold_remaining, Duration::from_secs(3));
        assert_eq!(t.snapshot.step, 0);

        assert!(s.tick(held(), SEC).completed.is_none());
        assert!(s.tick(held(), SEC).completed.is_none());
        assert!(s.tick(held(), SEC).completed.is_some());
    }

    #[test]
    fn exactly_one_completion_per_hold() {
        let mut s = two_pose_session(10);
        s.start().unwrap();
        let mut count = 0;
        for _ in 0..3 {
            if s.tick(held(), SEC).completed.is_some() {
                count += 1;
            }
        }
        assert_eq!(count, 1);
        // Next pose starts with its own full duration.
        assert_eq!(s.snapshot().pose_id, 2);
        assert_eq!(s.snapshot().hold_remaining, Duration::from_secs(2));
        assert_eq!(s.snapshot().step, 0);
    }

    #[test]
    fn completion_with_oversized_delta_still_single() {
        let mut s = two_pose_session(10);
        s.start().unwrap();
        let t = s.tick(held(), Duration::from_secs(10));
        assert!(t.completed.is_some());
        assert_eq!(t.snapshot.pose_id, 2);
    }

    // ── rounds and sets ──────────────────────────────────────────────────
    #[test]
    fn set_increments_every_configured_rounds() {
        let mut s = two_pose_session(2);
        s.start().unwrap();

        // Each round is 3 + 2 = 5 matching ticks.
        for _ in 0..5 {
            s.tick(held(), SEC);
        }
        assert_eq!(s.snapshot().round, 1);
        assert_eq!(s.snapshot().set, 0);

        for _ in 0..5 {
            s.tick(held(), SEC);
        }
        assert_eq!(s.snapshot().round, 2);
        assert_eq!(s.snapshot().set, 1);
    }

    #[test]
    fn counters_are_monotonic_across_sets() {
        let mut s = two_pose_session(1);
        s.start().unwrap();
        for _ in 0..10 {
            s.tick(held(), SEC);
        }
        // Two traversals at one round per set: rounds keep climbing.
        assert_eq!(s.snapshot().round, 2);
        assert_eq!(s.snapshot().set, 2);
    }

    #[test]
    fn sets_target_finishes_the_session() {
        let catalog = PoseCatalog::new(vec![test_pose(1, 1)]).unwrap();
        let mut s = Session::new(
            catalog,
            SessionConfig {
                rounds_per_set: 1,
                sets_target:    Some(2),
            },
        );
        s.start().unwrap();

        s.tick(held(), SEC);
        assert!(!s.snapshot().finished);
        s.tick(held(), SEC);
        let snap = s.snapshot();
        assert!(snap.finished);
        assert!(!snap.running);
        assert_eq!(s.start(), Err(SessionError::Finished));

        s.reset();
        assert!(!s.snapshot().finished);
        assert!(s.start().is_ok());
    }

    // ── built-in catalog end to end ──────────────────────────────────────
    #[test]
    fn builtin_straight_hand_completes_in_five_ticks() {
        let mut s = Session::new(PoseCatalog::builtin(), SessionConfig::default());
        s.start().unwrap();
        let open = FingerReadings::of([90.0, 175.0, 175.0, 175.0, 175.0]);
        let mut completed = None;
        for _ in 0..5 {
            completed = s.tick(open, SEC).completed;
        }
        assert_eq!(
            completed,
            Some(Completion { pose_id: 1, round: 0, set: 0 })
        );
        assert_eq!(s.snapshot().pose_id, 2);
    }
}
