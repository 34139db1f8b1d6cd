//! Trainer orchestration and the main run loop.
//!
//! [`Trainer`] wires the session state machine to its collaborators: each
//! tick's completion is appended to the history and announced with a cue.
//! A failed append is reported in the [`TickReport`] and logged, never
//! allowed to stall progression.
//!
//! [`run`] drives the whole application: warmup countdown, fixed-interval
//! tick loop, stdin control, and the terminal status line.

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::time::Duration;

use pose_catalog::PoseCatalog;
use pose_history::{FileHistory, History, HistoryError, LogEntry};
use pose_session::{
    Completion, FingerReadings, Session, SessionConfig, SessionError, SessionSnapshot,
};

use crate::cue::{AudioCue, CueEvent, CuePlayer};
use crate::signal::{self, Control, SignalSource};

// ════════════════════════════════════════════════════════════════════════════
// TrainerConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct TrainerConfig {
    pub catalog:      PoseCatalog,
    pub session:      SessionConfig,
    /// Interval between ticks; also the `tick_delta` fed to the session.
    pub tick:         Duration,
    /// Countdown before the session starts accepting holds.
    pub warmup:       Duration,
    pub history_path: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            catalog:      PoseCatalog::builtin(),
            session:      SessionConfig::default(),
            tick:         Duration::from_secs(1),
            warmup:       Duration::from_secs(2),
            history_path: PathBuf::from("hand-trainer-log.txt"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Trainer
// ════════════════════════════════════════════════════════════════════════════

/// Result of one trainer tick: the session snapshot, the completion if one
/// happened, and the persistence failure if the completion could not be
/// appended.
pub struct TickReport {
    pub snapshot:    SessionSnapshot,
    pub completed:   Option<Completion>,
    pub persistence: Option<HistoryError>,
}

/// Owns the session and its collaborators.  The only writer of session
/// state; everything downstream sees snapshots.
pub struct Trainer {
    session: Session,
    history: Box<dyn History>,
    cues:    Box<dyn AudioCue>,
}

impl Trainer {
    pub fn new(
        catalog: PoseCatalog,
        config: SessionConfig,
        history: Box<dyn History>,
        cues: Box<dyn AudioCue>,
    ) -> Self {
        Trainer {
            session: Session::new(catalog, config),
            history,
            cues,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &dyn History {
        self.history.as_ref()
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.session.start()?;
        self.cues.notify(CueEvent::SessionStarted);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.session.pause()?;
        self.cues.notify(CueEvent::SessionPaused);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.cues.notify(CueEvent::SessionReset);
    }

    /// Apply one frame of readings.  On completion the entry is stamped
    /// with the current time and appended; an append failure is reported
    /// alongside the snapshot, and the session advances regardless.
    pub fn tick(&mut self, readings: FingerReadings, delta: Duration) -> TickReport {
        let tick = self.session.tick(readings, delta);

        let mut persistence = None;
        if let Some(done) = tick.completed {
            let entry = LogEntry::now(done.pose_id, done.round, done.set);
            if let Err(e) = self.history.append(&entry) {
                tracing::warn!(error = %e, "history append failed; continuing");
                persistence = Some(e);
            }
            self.cues.notify(CueEvent::PoseCompleted { pose_id: done.pose_id });
        }

        TickReport {
            snapshot: tick.snapshot,
            completed: tick.completed,
            persistence,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Status rendering
// ════════════════════════════════════════════════════════════════════════════

/// One-line session status for the terminal.
pub fn status_line(catalog: &PoseCatalog, snap: &SessionSnapshot) -> String {
    let name = catalog
        .get(snap.pose_id)
        .map(|p| p.name.as_str())
        .unwrap_or("?");
    let bar: String = (0..snap.step_count)
        .map(|i| if i < snap.step { '█' } else { '·' })
        .collect();
    let state = if snap.finished {
        "done"
    } else if snap.running {
        "hold"
    } else {
        "paused"
    };
    format!(
        "pose {}  {:<16} {:>2}s [{}]  round {}  set {}  {}",
        snap.pose_id,
        name,
        snap.hold_remaining.as_secs_f32().ceil() as u64,
        bar,
        snap.round,
        snap.set,
        state,
    )
}

fn announce_pose(catalog: &PoseCatalog, pose_id: u8) {
    if let Some(pose) = catalog.get(pose_id) {
        println!("  Pose {} — {}: {}", pose.id, pose.name, pose.description);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It opens the history
/// file, spawns the stdin reader and the cue thread, creates the signal
/// source (simulation by default, hardware with `--features leap`), and
/// drives the tick loop at the configured interval.
pub fn run(cfg: TrainerConfig) -> Result<(), HistoryError> {
    let history = FileHistory::open(&cfg.history_path)?;
    let (shape_rx, control_rx) = signal::spawn_stdin_input();
    let mut source = make_source(shape_rx);

    let catalog = cfg.catalog.clone();
    let mut trainer = Trainer::new(
        cfg.catalog,
        cfg.session,
        Box::new(history),
        Box::new(CuePlayer::spawn()),
    );

    countdown(cfg.warmup);
    let _ = trainer.start();
    announce_pose(&catalog, trainer.session().snapshot().pose_id);

    loop {
        // ── control typed on stdin ────────────────────────────────────────
        loop {
            match control_rx.try_recv() {
                Ok(Control::Pause) => {
                    if trainer.session().snapshot().running {
                        let _ = trainer.pause();
                        println!("\n  Paused — type p to resume.");
                    } else {
                        match trainer.start() {
                            Ok(()) => println!("\n  Resumed."),
                            Err(SessionError::Finished) => {
                                println!("\n  Session finished — type r to reset.");
                            }
                            Err(_) => {}
                        }
                    }
                }
                Ok(Control::Reset) => {
                    trainer.reset();
                    println!("\n  Reset — type p to start again.");
                }
                Ok(Control::Quit) => {
                    println!("\n  Bye.");
                    return Ok(());
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        // ── one tick ──────────────────────────────────────────────────────
        let readings = source.poll();
        let report = trainer.tick(readings, cfg.tick);

        if let Some(done) = report.completed {
            let name = catalog
                .get(done.pose_id)
                .map(|p| p.name.as_str())
                .unwrap_or("?");
            println!("\n  ✓ {} held — round {}, set {}", name, done.round, done.set);
            if !report.snapshot.finished {
                announce_pose(&catalog, report.snapshot.pose_id);
            }
        }
        if report.persistence.is_some() {
            println!("\n  ⚠  could not write history — session continues");
        }

        print!("\r  {}", status_line(&catalog, &report.snapshot));
        let _ = std::io::stdout().flush();

        if report.snapshot.finished {
            println!("\n\n  All sets complete. Well done!");
            return Ok(());
        }

        thread::sleep(cfg.tick);
    }
}

#[cfg(feature = "leap")]
fn make_source(_shape_rx: std::sync::mpsc::Receiver<FingerReadings>) -> Box<dyn SignalSource> {
    Box::new(signal::LeapSource::open())
}

#[cfg(not(feature = "leap"))]
fn make_source(shape_rx: std::sync::mpsc::Receiver<FingerReadings>) -> Box<dyn SignalSource> {
    Box::new(signal::SimSource::new(shape_rx))
}

fn countdown(warmup: Duration) {
    let secs = warmup.as_secs();
    for s in (1..=secs).rev() {
        print!("\r  starting in {s}… ");
        let _ = std::io::stdout().flush();
        thread::sleep(Duration::from_secs(1));
    }
    println!();
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use pose_catalog::{FingerRange, Pose};
    use pose_history::MemoryHistory;
    use pose_session::FingerReadings;

    const SEC: Duration = Duration::from_secs(1);

    #[derive(Clone, Default)]
    struct RecordingCue(Arc<Mutex<Vec<CueEvent>>>);

    impl AudioCue for RecordingCue {
        fn notify(&mut self, event: CueEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct FailingHistory;

    impl History for FailingHistory {
        fn append(&mut self, _entry: &LogEntry) -> Result<(), HistoryError> {
            Err(HistoryError::Append {
                path:   PathBuf::from("/nowhere/log.txt"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
        fn tail(&self, _n: usize) -> Result<Vec<LogEntry>, HistoryError> {
            Ok(Vec::new())
        }
    }

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

    fn make_trainer(cue: RecordingCue) -> Trainer {
        let catalog = PoseCatalog::new(vec![test_pose(1, 2), test_pose(2, 1)]).unwrap();
        Trainer::new(
            catalog,
            SessionConfig::default(),
            Box::new(MemoryHistory::new()),
            Box::new(cue),
        )
    }

    fn held() -> FingerReadings {
        FingerReadings::all(45.0)
    }

    #[test]
    fn completion_appends_one_entry_and_one_cue() {
        let cue = RecordingCue::default();
        let mut trainer = make_trainer(cue.clone());
        trainer.start().unwrap();

        trainer.tick(held(), SEC);
        let report = trainer.tick(held(), SEC);
        assert!(report.completed.is_some());
        assert!(report.persistence.is_none());

        let tail = trainer.history().tail(10).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].pose_id, 1);

        let events = cue.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                CueEvent::SessionStarted,
                CueEvent::PoseCompleted { pose_id: 1 }
            ]
        );
    }

    #[test]
    fn persistence_failure_is_reported_not_fatal() {
        let catalog = PoseCatalog::new(vec![test_pose(1, 1), test_pose(2, 1)]).unwrap();
        let mut trainer = Trainer::new(
            catalog,
            SessionConfig::default(),
            Box::new(FailingHistory),
            Box::new(RecordingCue::default()),
        );
        trainer.start().unwrap();

        let report = trainer.tick(held(), SEC);
        assert!(report.completed.is_some());
        assert!(report.persistence.is_some());
        // The session advanced anyway.
        assert_eq!(report.snapshot.pose_id, 2);
    }

    #[test]
    fn idle_trainer_tick_is_a_noop() {
        let mut trainer = make_trainer(RecordingCue::default());
        let report = trainer.tick(held(), SEC);
        assert!(report.completed.is_none());
        assert_eq!(report.snapshot.hold_remaining, Duration::from_secs(2));
    }

    #[test]
    fn pause_and_reset_notify_cues() {
        let cue = RecordingCue::default();
        let mut trainer = make_trainer(cue.clone());
        trainer.start().unwrap();
        trainer.pause().unwrap();
        trainer.reset();

        let events = cue.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                CueEvent::SessionStarted,
                CueEvent::SessionPaused,
                CueEvent::SessionReset
            ]
        );
    }

    #[test]
    fn sets_target_ends_the_run() {
        let catalog = PoseCatalog::new(vec![test_pose(1, 1)]).unwrap();
        let mut trainer = Trainer::new(
            catalog,
            SessionConfig {
                rounds_per_set: 1,
                sets_target:    Some(1),
            },
            Box::new(MemoryHistory::new()),
            Box::new(RecordingCue::default()),
        );
        trainer.start().unwrap();

        let report = trainer.tick(held(), SEC);
        assert!(report.snapshot.finished);
        assert!(!report.snapshot.running);
        assert_eq!(trainer.history().tail(10).unwrap().len(), 1);
    }

    #[test]
    fn status_line_shows_progress_bar() {
        let catalog = PoseCatalog::builtin();
        let mut session = Session::new(catalog.clone(), SessionConfig::default());
        session.start().unwrap();
        let open = FingerReadings::of([90.0, 175.0, 175.0, 175.0, 175.0]);
        let tick = session.tick(open, SEC);

        let line = status_line(&catalog, &tick.snapshot);
        assert!(line.contains("Straight hand"));
        assert!(line.contains("[█····]"));
        assert!(line.contains("hold"));
    }
}
