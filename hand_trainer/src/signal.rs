//! Finger signal sources — LeapMotion hardware and keyboard simulation.
//!
//! The seam is [`SignalSource`]: one [`FingerReadings`] frame per poll.
//! Consumers don't need to know whether readings came from real hardware,
//! typed shape words, or a scripted frame list.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use pose_session::FingerReadings;

// ════════════════════════════════════════════════════════════════════════════
// SignalSource
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can supply the five current finger readings once per
/// tick.  An unavailable reading is reported as `None` inside the frame,
/// never as an error.
pub trait SignalSource {
    fn poll(&mut self) -> FingerReadings;
}

// ════════════════════════════════════════════════════════════════════════════
// HandShape — canonical simulated shapes
// ════════════════════════════════════════════════════════════════════════════

/// Canonical hand shapes for simulation mode, one per built-in pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandShape {
    Open,
    Hook,
    Fist,
    Flat,
    Table,
}

impl HandShape {
    /// The extension angles this shape reads as, thumb first.
    ///
    /// The thumb sits at a neutral 90° — every built-in pose accepts it.
    pub fn readings(self) -> FingerReadings {
        let fingers = match self {
            HandShape::Open  => 175.0,
            HandShape::Hook  => 100.0,
            HandShape::Fist  => 30.0,
            HandShape::Flat  => 45.0,
            HandShape::Table => 140.0,
        };
        FingerReadings::of([90.0, fingers, fingers, fingers, fingers])
    }

    pub fn parse(word: &str) -> Option<HandShape> {
        match word {
            "open"  | "o" => Some(HandShape::Open),
            "hook"  | "h" => Some(HandShape::Hook),
            "fist"  | "f" => Some(HandShape::Fist),
            "flat"  | "s" => Some(HandShape::Flat),
            "table" | "t" => Some(HandShape::Table),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Control — session commands typed alongside shapes
// ════════════════════════════════════════════════════════════════════════════

/// Session control typed on stdin.  Delivered on a separate channel so the
/// run loop can act on them between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Pause,
    Reset,
    Quit,
}

impl Control {
    pub fn parse(word: &str) -> Option<Control> {
        match word {
            "pause" | "p" => Some(Control::Pause),
            "reset" | "r" => Some(Control::Reset),
            "quit"  | "q" => Some(Control::Quit),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Stdin reader — shapes on one channel, control on the other
// ════════════════════════════════════════════════════════════════════════════

/// Spawn the stdin reader thread.  Shape words become readings frames on
/// the first channel; control words arrive on the second.  `none` sends an
/// all-unavailable frame.  The thread exits when stdin closes or `quit`
/// is typed.
pub fn spawn_stdin_input() -> (Receiver<FingerReadings>, Receiver<Control>) {
    let (shape_tx, shape_rx) = mpsc::channel::<FingerReadings>();
    let (ctrl_tx, ctrl_rx) = mpsc::channel::<Control>();
    thread::spawn(move || stdin_reader(shape_tx, ctrl_tx));
    (shape_rx, ctrl_rx)
}

fn stdin_reader(shape_tx: Sender<FingerReadings>, ctrl_tx: Sender<Control>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { return };
        let word = line.trim().to_lowercase();
        if word.is_empty() {
            continue;
        }
        if let Some(shape) = HandShape::parse(&word) {
            let _ = shape_tx.send(shape.readings());
        } else if word == "none" || word == "n" || word == "away" {
            let _ = shape_tx.send(FingerReadings::none());
        } else if let Some(ctrl) = Control::parse(&word) {
            let quit = ctrl == Control::Quit;
            let _ = ctrl_tx.send(ctrl);
            if quit {
                return;
            }
        } else {
            println!("  ?  shapes: open hook fist flat table none — control: pause reset quit");
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimSource — latest typed shape, held until replaced
// ════════════════════════════════════════════════════════════════════════════

/// Signal source fed by the stdin reader.  Each poll drains pending shape
/// frames and returns the newest; with nothing pending the previous frame
/// persists, modelling a hand that stays where it was.
pub struct SimSource {
    rx:      Receiver<FingerReadings>,
    current: FingerReadings,
}

impl SimSource {
    pub fn new(rx: Receiver<FingerReadings>) -> Self {
        SimSource {
            rx,
            current: FingerReadings::none(),
        }
    }
}

impl SignalSource for SimSource {
    fn poll(&mut self) -> FingerReadings {
        while let Ok(frame) = self.rx.try_recv() {
            self.current = frame;
        }
        self.current
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — fixed frame sequence for tests and demos
// ════════════════════════════════════════════════════════════════════════════

/// Replays a fixed sequence of frames; the final frame repeats once the
/// script runs out.
pub struct ScriptedSource {
    frames: VecDeque<FingerReadings>,
    last:   FingerReadings,
}

impl ScriptedSource {
    pub fn new(frames: Vec<FingerReadings>) -> Self {
        ScriptedSource {
            frames: frames.into(),
            last:   FingerReadings::none(),
        }
    }
}

impl SignalSource for ScriptedSource {
    fn poll(&mut self) -> FingerReadings {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        self.last
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Signal source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library
/// installed.
///
/// Each tracking frame, every digit's extension is measured as the ratio
/// of tip-to-metacarpal distance to a typical finger length, then scaled
/// to degrees (0 ≈ fully curled, 180 ≈ fully extended).  With no hand in
/// view every reading is unavailable.
#[cfg(feature = "leap")]
pub struct LeapSource {
    connection: leaprs::Connection,
    current:    FingerReadings,
}

#[cfg(feature = "leap")]
impl LeapSource {
    /// Open the LeapC connection.  Panics if the device cannot be opened,
    /// as there is nothing useful to do without it in hardware mode.
    pub fn open() -> Self {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .expect("Failed to open LeapC connection");
        connection.open().expect("Failed to open LeapMotion device");
        LeapSource {
            connection,
            current: FingerReadings::none(),
        }
    }
}

#[cfg(feature = "leap")]
impl SignalSource for LeapSource {
    fn poll(&mut self) -> FingerReadings {
        use leaprs::Event;

        // Short poll; a timeout just means no new frame since last tick.
        if let Ok(msg) = self.connection.poll(10) {
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<_> = frame.hands().collect();
                self.current = match hands.first() {
                    Some(hand) => hand_readings(hand),
                    None => FingerReadings::none(),
                };
            }
        }
        self.current
    }
}

#[cfg(feature = "leap")]
fn hand_readings(hand: &leaprs::Hand) -> FingerReadings {
    use pose_catalog::Finger;

    let digits: Vec<_> = hand.digits().collect();
    let mut readings = FingerReadings::none();
    for (finger, digit) in Finger::ALL.iter().zip(digits.iter()) {
        readings = readings.with(*finger, finger_extension(digit) * 180.0);
    }
    readings
}

/// Ratio of (tip – metacarpal base) distance to full finger length.
/// 1.0 = fully extended, ~0.0 = fully curled.
#[cfg(feature = "leap")]
fn finger_extension(digit: &leaprs::Digit) -> f32 {
    let base = digit.metacarpal().prev_joint();
    let tip  = digit.distal().next_joint();
    let dx   = tip.x - base.x;
    let dy   = tip.y - base.y;
    let dz   = tip.z - base.z;
    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
    // Normalise to ~0–1 using typical finger length ≈ 80 mm
    (dist / 80.0).clamp(0.0, 1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pose_catalog::PoseCatalog;
    use pose_session::matcher;

    #[test]
    fn each_shape_matches_its_pose() {
        let catalog = PoseCatalog::builtin();
        let pairs = [
            (HandShape::Open, 1),
            (HandShape::Hook, 2),
            (HandShape::Fist, 3),
            (HandShape::Flat, 4),
            (HandShape::Table, 5),
        ];
        for (shape, pose_id) in pairs {
            let pose = catalog.get(pose_id).unwrap();
            let (matched, _) = matcher::evaluate(shape.readings(), pose, 0);
            assert!(matched, "{shape:?} should match pose {pose_id}");
        }
    }

    #[test]
    fn open_shape_does_not_match_the_fists() {
        let catalog = PoseCatalog::builtin();
        for pose_id in [2, 3, 4] {
            let pose = catalog.get(pose_id).unwrap();
            let (matched, _) = matcher::evaluate(HandShape::Open.readings(), pose, 0);
            assert!(!matched);
        }
    }

    #[test]
    fn shape_words_parse() {
        assert_eq!(HandShape::parse("open"), Some(HandShape::Open));
        assert_eq!(HandShape::parse("f"), Some(HandShape::Fist));
        assert_eq!(HandShape::parse("wave"), None);
        assert_eq!(Control::parse("q"), Some(Control::Quit));
        assert_eq!(Control::parse("open"), None);
    }

    #[test]
    fn sim_source_keeps_latest_shape() {
        let (tx, rx) = mpsc::channel();
        let mut source = SimSource::new(rx);
        assert_eq!(source.poll(), FingerReadings::none());

        tx.send(HandShape::Open.readings()).unwrap();
        tx.send(HandShape::Fist.readings()).unwrap();
        assert_eq!(source.poll(), HandShape::Fist.readings());
        // Nothing new pending: the hand stays where it was.
        assert_eq!(source.poll(), HandShape::Fist.readings());
    }

    #[test]
    fn scripted_source_replays_then_repeats() {
        let mut source = ScriptedSource::new(vec![
            HandShape::Open.readings(),
            FingerReadings::none(),
        ]);
        assert_eq!(source.poll(), HandShape::Open.readings());
        assert_eq!(source.poll(), FingerReadings::none());
        assert_eq!(source.poll(), FingerReadings::none());
    }
}
