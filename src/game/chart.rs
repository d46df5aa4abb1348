use serde::Serialize;

pub const LANE_COUNT: usize = 4;

/// One of the four fixed input channels, in simfile column order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Lane {
    Left,
    Down,
    Up,
    Right,
}

pub const ALL_LANES: [Lane; LANE_COUNT] = [Lane::Left, Lane::Down, Lane::Up, Lane::Right];

impl Lane {
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Down => 1,
            Lane::Up => 2,
            Lane::Right => 3,
        }
    }

    #[inline(always)]
    pub fn from_index(index: usize) -> Option<Lane> {
        ALL_LANES.get(index).copied()
    }
}

/// Display classification of a note's beat position. Purely cosmetic;
/// judgement never looks at it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteDivision {
    Quarter,
    Eighth,
    Sixteenth,
    Other,
}

const DIVISION_SNAP_EPSILON: f64 = 1e-9;

impl NoteDivision {
    /// Classifies a beat by its fractional position: whole beats are
    /// quarters, half beats eighths, quarter beats sixteenths, anything
    /// else (triplets, 32nds, ...) is Other.
    pub fn from_beat(beat: f64) -> NoteDivision {
        let frac = beat.fract().abs();
        let snaps = |step: f64| {
            let r = (frac / step).round() * step;
            (frac - r).abs() <= DIVISION_SNAP_EPSILON
        };
        if snaps(1.0) {
            NoteDivision::Quarter
        } else if snaps(0.5) {
            NoteDivision::Eighth
        } else if snaps(0.25) {
            NoteDivision::Sixteenth
        } else {
            NoteDivision::Other
        }
    }
}

/// A single tap note, fully resolved into song time. Value object: once a
/// chart owns it, it is only ever consumed or left to miss.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Note {
    /// Seconds from the chart's conceptual start (pure tempo-map
    /// resolution of `beat`; the chart offset lives in the song clock).
    pub time_sec: f64,
    pub beat: f64,
    pub lane: Lane,
    pub division: NoteDivision,
}

/// A tempo segment: constant `bpm` from `beat` until the next change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BpmChange {
    pub beat: f64,
    pub bpm: f64,
}

/// Immutable chart: tempo map plus time-ordered notes. Owned exclusively
/// by the session that loaded it.
#[derive(Clone, Debug)]
pub struct Chart {
    pub music_file: String,
    /// First tempo segment's BPM rounded to the nearest integer, 1..=1000.
    pub base_bpm: u32,
    /// Authoring offset in seconds; applied once, by the song clock.
    pub offset_sec: f64,
    /// Sorted by `time_sec` non-decreasing.
    pub notes: Vec<Note>,
    /// Sorted by beat ascending; first entry is at beat 0.
    pub bpm_changes: Vec<BpmChange>,
}

impl Chart {
    #[inline(always)]
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}
