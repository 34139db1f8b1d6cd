//! Audio cues over MIDI.
//!
//! Session events are announced with short note patterns sent to a MIDI
//! output port.  Cues are fire-and-forget: [`AudioCue::notify`] enqueues
//! the event and returns immediately; a playback thread renders it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

// ════════════════════════════════════════════════════════════════════════════
// CueEvent
// ════════════════════════════════════════════════════════════════════════════

/// An event worth announcing to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueEvent {
    SessionStarted,
    SessionPaused,
    SessionReset,
    PoseCompleted { pose_id: u8 },
}

// ════════════════════════════════════════════════════════════════════════════
// AudioCue — the outbound seam
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can receive cue events.  Never awaited by the caller.
pub trait AudioCue {
    fn notify(&mut self, event: CueEvent);
}

/// Discards every event.  Used in tests and report mode.
pub struct NullCue;

impl AudioCue for NullCue {
    fn notify(&mut self, _event: CueEvent) {}
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        let _ = self.conn.send(&[0xC0 | (channel & 0x0F), program]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | (channel & 0x0F), note, velocity]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&[0x80 | (channel & 0x0F), note, 0]);
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8) {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8) {}
    fn note_off(&mut self, _ch: u8, _n: u8) {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick first available
// ════════════════════════════════════════════════════════════════════════════

/// Try to open the first available MIDI output port.
/// Falls back to `NullOut` with a warning if none found.
fn open_midi_output() -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("hand_trainer_cues") {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "MIDI init failed — cues are silent");
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        tracing::warn!("no MIDI output ports found — cues are silent");
        return Box::new(NullOut);
    }

    // Prefer a softsynth if visible
    let port_idx = ports
        .iter()
        .enumerate()
        .find(|(_, p)| {
            midi_out
                .port_name(p)
                .map(|n| {
                    let n = n.to_lowercase();
                    n.contains("fluid")
                        || n.contains("timidity")
                        || n.contains("microsoft")
                        || n.contains("gm")
                        || n.contains("synth")
                })
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out
        .port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());
    tracing::info!(port = %name, "opening MIDI port for cues");

    match midi_out.connect(port, "hand-trainer-cue") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            tracing::warn!(error = %e, "MIDI connect failed — cues are silent");
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CuePlayer — the playback thread
// ════════════════════════════════════════════════════════════════════════════

const CHANNEL: u8 = 0;
const PROGRAM: u8 = 11; // vibraphone — a soft bell works well for cues
const VELOCITY: u8 = 100;

/// Handle to the cue playback thread.  Cheap to notify; the thread ends
/// when every handle is dropped.
pub struct CuePlayer {
    tx: Sender<CueEvent>,
}

impl CuePlayer {
    /// Spawn the playback thread.  Opens the first available MIDI output
    /// port, or stays silent if there is none.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<CueEvent>();
        thread::spawn(move || cue_thread(rx));
        CuePlayer { tx }
    }
}

impl AudioCue for CuePlayer {
    fn notify(&mut self, event: CueEvent) {
        let _ = self.tx.send(event);
    }
}

fn cue_thread(rx: Receiver<CueEvent>) {
    let mut midi = open_midi_output();
    midi.program_change(CHANNEL, PROGRAM);

    for event in rx {
        for (note, ms) in pattern(event) {
            midi.note_on(CHANNEL, note, VELOCITY);
            thread::sleep(Duration::from_millis(ms));
            midi.note_off(CHANNEL, note);
            thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Note pattern for one event: `(midi note, duration ms)` pairs.
///
/// Completion ends on a note pitched by the pose id, so each exercise in
/// the sequence gets a recognisable voice.
fn pattern(event: CueEvent) -> Vec<(u8, u64)> {
    match event {
        CueEvent::SessionStarted => vec![(72, 120), (76, 120), (79, 180)],
        CueEvent::SessionPaused => vec![(64, 120), (60, 180)],
        CueEvent::SessionReset => vec![(67, 100), (60, 200)],
        CueEvent::PoseCompleted { pose_id } => {
            let voice = 72u8.saturating_add(pose_id).min(127);
            vec![(79, 120), (voice, 220)]
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_has_a_pattern() {
        let events = [
            CueEvent::SessionStarted,
            CueEvent::SessionPaused,
            CueEvent::SessionReset,
            CueEvent::PoseCompleted { pose_id: 3 },
        ];
        for event in events {
            assert!(!pattern(event).is_empty());
        }
    }

    #[test]
    fn completion_voice_varies_with_pose() {
        let a = pattern(CueEvent::PoseCompleted { pose_id: 1 });
        let b = pattern(CueEvent::PoseCompleted { pose_id: 2 });
        assert_ne!(a.last(), b.last());
    }

    #[test]
    fn completion_voice_stays_in_midi_range() {
        let p = pattern(CueEvent::PoseCompleted { pose_id: 255 });
        for (note, _) in p {
            assert!(note <= 127);
        }
    }
}
