//! # pose_catalog
//!
//! Immutable definitions of hand-pose exercises: per-finger acceptance
//! ranges, required hold durations, and step counts for progress feedback.
//!
//! A [`PoseCatalog`] is loaded once at startup — from the built-in set of
//! five tendon-gliding poses or from a JSON file — and validated before any
//! session can start.  Malformed definitions are rejected with a
//! [`CatalogError`]; the catalog never silently substitutes defaults.
//!
//! Readings are finger *extension angles* in degrees: 0 ≈ fully curled,
//! ~180 ≈ fully extended.  Range checks are inclusive at both ends, and an
//! unavailable reading never matches.
//!
//! ## Quick start
//!
//! ```rust
//! use pose_catalog::{Finger, PoseCatalog};
//!
//! let catalog = PoseCatalog::builtin();
//! let pose = catalog.get(1).unwrap();
//!
//! assert_eq!(pose.name, "Straight hand");
//! assert!(pose.range(Finger::Index).contains(Some(170.0)));
//! assert!(!pose.range(Finger::Index).contains(None));
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// The five digits of one hand, in catalog order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// All five fingers, thumb first.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Position of this finger in catalog order (thumb = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerRange
// ════════════════════════════════════════════════════════════════════════════

/// Inclusive acceptance range `[low, high]` for one finger's extension
/// angle, in degrees.
///
/// # Example
/// ```rust
/// use pose_catalog::FingerRange;
///
/// let r = FingerRange::new(150.0, 185.0);
/// assert!(r.contains(Some(150.0)));   // boundaries count
/// assert!(r.contains(Some(185.0)));
/// assert!(!r.contains(Some(149.9)));
/// assert!(!r.contains(None));         // unavailable reading never matches
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FingerRange {
    pub low:  f32,
    pub high: f32,
}

impl FingerRange {
    pub fn new(low: f32, high: f32) -> Self {
        FingerRange { low, high }
    }

    /// True iff the reading is present, finite, and within `[low, high]`.
    ///
    /// A missing or non-finite reading is a deterministic no-match, never
    /// an error: a sensor fault must not crash a tick.
    pub fn contains(self, reading: Option<f32>) -> bool {
        match reading {
            Some(r) if r.is_finite() => self.low <= r && r <= self.high,
            _ => false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pose
// ════════════════════════════════════════════════════════════════════════════

/// One hand-pose exercise: acceptance ranges for all five fingers, the
/// duration it must be held, and the number of discrete progress steps
/// shown while it is held.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    /// Small positive id, unique within the catalog.
    pub id:          u8,
    pub name:        String,
    pub description: String,
    /// Acceptance ranges indexed by [`Finger`] order.
    pub ranges:      [FingerRange; 5],
    /// How long all five fingers must stay in range.
    pub hold:        Duration,
    /// Number of incremental "hand position" steps for progress feedback.
    pub step_count:  u8,
}

impl Pose {
    /// Acceptance range for one finger.
    pub fn range(&self, finger: Finger) -> FingerRange {
        self.ranges[finger.index()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CatalogError
// ════════════════════════════════════════════════════════════════════════════

/// Validation and load failures.  All fatal: a catalog that fails any of
/// these checks refuses to load.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no poses")]
    Empty,

    #[error("pose id 0 is reserved; ids start at 1")]
    ZeroId,

    #[error("duplicate pose id {0}")]
    DuplicateId(u8),

    #[error("pose {pose}: {finger} range [{low}, {high}] is inverted")]
    InvertedRange {
        pose:   u8,
        finger: &'static str,
        low:    f32,
        high:   f32,
    },

    #[error("pose {pose}: {finger} range bound is not a finite number")]
    NonFiniteRange { pose: u8, finger: &'static str },

    #[error("pose {pose}: hold duration must be positive")]
    NonPositiveHold { pose: u8 },

    #[error("pose {pose}: step count must be at least 1")]
    ZeroSteps { pose: u8 },

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

// ════════════════════════════════════════════════════════════════════════════
// JSON file format
// ════════════════════════════════════════════════════════════════════════════

/// On-disk pose definition.  `hold_secs` is converted to a [`Duration`]
/// after validation so a negative or non-finite value can never panic the
/// conversion.
#[derive(Debug, Deserialize)]
struct PoseFile {
    id:          u8,
    name:        String,
    #[serde(default)]
    description: String,
    hold_secs:   f32,
    step_count:  u8,
    thumb:       FingerRange,
    index:       FingerRange,
    middle:      FingerRange,
    ring:        FingerRange,
    pinky:       FingerRange,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    poses: Vec<PoseFile>,
}

impl PoseFile {
    fn into_pose(self) -> Result<Pose, CatalogError> {
        if !self.hold_secs.is_finite() || self.hold_secs <= 0.0 {
            return Err(CatalogError::NonPositiveHold { pose: self.id });
        }
        Ok(Pose {
            id:          self.id,
            name:        self.name,
            description: self.description,
            ranges:      [self.thumb, self.index, self.middle, self.ring, self.pinky],
            hold:        Duration::from_secs_f32(self.hold_secs),
            step_count:  self.step_count,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseCatalog
// ════════════════════════════════════════════════════════════════════════════

/// An ordered, validated, immutable set of poses.  Loaded once; sessions
/// traverse it in order, wrapping at the end.
#[derive(Clone, Debug)]
pub struct PoseCatalog {
    poses: Vec<Pose>,
}

impl PoseCatalog {
    /// Build a catalog from explicit poses, validating every invariant.
    pub fn new(poses: Vec<Pose>) -> Result<Self, CatalogError> {
        if poses.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen: Vec<u8> = Vec::with_capacity(poses.len());
        for pose in &poses {
            if pose.id == 0 {
                return Err(CatalogError::ZeroId);
            }
            if seen.contains(&pose.id) {
                return Err(CatalogError::DuplicateId(pose.id));
            }
            seen.push(pose.id);

            for finger in Finger::ALL {
                let r = pose.range(finger);
                if !r.low.is_finite() || !r.high.is_finite() {
                    return Err(CatalogError::NonFiniteRange {
                        pose:   pose.id,
                        finger: finger.name(),
                    });
                }
                if r.low > r.high {
                    return Err(CatalogError::InvertedRange {
                        pose:   pose.id,
                        finger: finger.name(),
                        low:    r.low,
                        high:   r.high,
                    });
                }
            }
            if pose.hold.is_zero() {
                return Err(CatalogError::NonPositiveHold { pose: pose.id });
            }
            if pose.step_count == 0 {
                return Err(CatalogError::ZeroSteps { pose: pose.id });
            }
        }
        Ok(PoseCatalog { poses })
    }

    /// The built-in catalog: the five tendon-gliding exercises, each held
    /// for five seconds with five progress steps.
    ///
    /// Thumb ranges run to 200° — a pass-through band, since the thumb is
    /// not constrained by these exercises.
    pub fn builtin() -> Self {
        fn pose(
            id: u8,
            name: &str,
            description: &str,
            ranges: [(f32, f32); 5],
        ) -> Pose {
            Pose {
                id,
                name:        name.to_string(),
                description: description.to_string(),
                ranges:      ranges.map(|(low, high)| FingerRange::new(low, high)),
                hold:        Duration::from_secs(5),
                step_count:  5,
            }
        }

        PoseCatalog {
            poses: vec![
                pose(
                    1,
                    "Straight hand",
                    "Fingers extended straight and together, palm open.",
                    [(0.0, 200.0), (150.0, 185.0), (150.0, 185.0), (150.0, 185.0), (150.0, 185.0)],
                ),
                pose(
                    2,
                    "Hook fist",
                    "Bend the top two finger joints, keeping the knuckles straight.",
                    [(0.0, 200.0), (40.0, 170.0), (40.0, 170.0), (40.0, 170.0), (40.0, 170.0)],
                ),
                pose(
                    3,
                    "Full fist",
                    "Curl the fingers all the way into the palm.",
                    [(0.0, 200.0), (0.0, 60.0), (0.0, 60.0), (0.0, 60.0), (0.0, 60.0)],
                ),
                pose(
                    4,
                    "Straight fist",
                    "Make a fist while keeping the fingertips straight.",
                    [(0.0, 200.0), (0.0, 50.0), (0.0, 50.0), (0.0, 50.0), (0.0, 50.0)],
                ),
                pose(
                    5,
                    "Tabletop bend",
                    "Bend at the knuckles with straight fingers, like a tabletop.",
                    [(0.0, 200.0), (50.0, 185.0), (50.0, 185.0), (50.0, 160.0), (50.0, 160.0)],
                ),
            ],
        }
    }

    /// Parse and validate a catalog from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let poses = file
            .poses
            .into_iter()
            .map(PoseFile::into_pose)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(poses)
    }

    /// Read, parse, and validate a catalog from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Poses in traversal order.
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Look a pose up by id.
    pub fn get(&self, id: u8) -> Option<&Pose> {
        self.poses.iter().find(|p| p.id == id)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
