use serde::Serialize;

// Tap windows in seconds. Inner boundaries are exclusive (an offset of
// exactly 0.015 is a Perfect, not a Marvelous); the outer Bad edge is
// inclusive, so 0.200 still consumes the note and 0.201 does not.
pub const MARVELOUS_WINDOW_S: f64 = 0.015;
pub const PERFECT_WINDOW_S: f64 = 0.03;
pub const GREAT_WINDOW_S: f64 = 0.06;
pub const GOOD_WINDOW_S: f64 = 0.10;
pub const BAD_WINDOW_S: f64 = 0.20;

/// The miss sweep fires once song time passes a note by this much.
pub const MISS_SWEEP_S: f64 = BAD_WINDOW_S;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JudgeGrade {
    Marvelous,
    Perfect,
    Great,
    Good,
    Bad,
    Miss,
}

impl JudgeGrade {
    /// Receptor flash strength for this grade, from the fixed table the
    /// visual sink expects.
    #[inline(always)]
    pub fn visual_intensity(self) -> f32 {
        match self {
            JudgeGrade::Marvelous | JudgeGrade::Perfect => 1.0,
            JudgeGrade::Great => 0.75,
            JudgeGrade::Good => 0.55,
            JudgeGrade::Bad => 0.35,
            JudgeGrade::Miss => 0.0,
        }
    }

    /// Only a Miss breaks combo; Bad still counts as a hit.
    #[inline(always)]
    pub fn extends_combo(self) -> bool {
        self != JudgeGrade::Miss
    }
}

/// The outcome of evaluating one keystroke against the head note.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Judgment {
    pub grade: JudgeGrade,
    /// Signed seconds; negative = early.
    pub time_error_s: f64,
}

/// Classify a signed tap offset (seconds) into a tier, or `None` when the
/// press is too early or too late to touch the note at all.
#[inline(always)]
pub fn classify_offset_s(offset_s: f64) -> Option<Judgment> {
    let abs = offset_s.abs();
    let grade = if abs < MARVELOUS_WINDOW_S {
        JudgeGrade::Marvelous
    } else if abs < PERFECT_WINDOW_S {
        JudgeGrade::Perfect
    } else if abs < GREAT_WINDOW_S {
        JudgeGrade::Great
    } else if abs < GOOD_WINDOW_S {
        JudgeGrade::Good
    } else if abs <= BAD_WINDOW_S {
        JudgeGrade::Bad
    } else {
        return None;
    };
    Some(Judgment { grade, time_error_s: offset_s })
}
