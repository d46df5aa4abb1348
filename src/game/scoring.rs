use crate::game::judge::JudgeGrade;
use serde::Serialize;

pub const MAX_SCORE: i64 = 1_000_000;

// Per-tier score weights. The weighted sum must be accumulated
// left-to-right in f64: the flooring below makes a 10-note 5/3/1/1
// split land on 873_999, not 874_000.
const WEIGHT_MARVELOUS: f64 = 1.00;
const WEIGHT_PERFECT: f64 = 0.98;
const WEIGHT_GREAT: f64 = 0.60;
const WEIGHT_GOOD: f64 = 0.20;

/// Judgement totals, one named field per tier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub marvelous: u32,
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub bad: u32,
    pub miss: u32,
}

impl TierCounts {
    #[inline(always)]
    pub fn judged_total(&self) -> u32 {
        self.marvelous + self.perfect + self.great + self.good + self.bad + self.miss
    }
}

/// Normalized score: each note is worth `1_000_000 / totalNotes` points
/// (integer division), scaled by the tier weight and floored.
pub fn calculate_score(total_notes: u32, counts: &TierCounts) -> i64 {
    if total_notes == 0 {
        return 0;
    }
    let base_point = (MAX_SCORE / i64::from(total_notes)) as f64;
    let weighted = f64::from(counts.marvelous) * WEIGHT_MARVELOUS
        + f64::from(counts.perfect) * WEIGHT_PERFECT
        + f64::from(counts.great) * WEIGHT_GREAT
        + f64::from(counts.good) * WEIGHT_GOOD;
    ((weighted * base_point).floor() as i64).clamp(0, MAX_SCORE)
}

/// Letter grade for a score, highest threshold first. A failed session is
/// always "E" regardless of score.
pub fn dance_level(score: i64, failed: bool) -> &'static str {
    if failed {
        return "E";
    }
    match score {
        s if s >= 990_000 => "AAA",
        s if s >= 950_000 => "AA+",
        s if s >= 900_000 => "AA",
        s if s >= 890_000 => "AA-",
        s if s >= 850_000 => "A+",
        s if s >= 800_000 => "A",
        s if s >= 790_000 => "A-",
        s if s >= 750_000 => "B+",
        s if s >= 700_000 => "B",
        s if s >= 690_000 => "B-",
        s if s >= 650_000 => "C+",
        s if s >= 600_000 => "C",
        s if s >= 590_000 => "C-",
        s if s >= 550_000 => "D+",
        _ => "D",
    }
}

/// Mutable per-session aggregate. Lives on the single update thread;
/// finalized into a `ResultSummary` at song end.
#[derive(Clone, Debug, Default)]
pub struct JudgementTally {
    counts: TierCounts,
    current_combo: u32,
    max_combo: u32,
}

impl JudgementTally {
    pub fn new() -> JudgementTally {
        JudgementTally::default()
    }

    /// Records a consumed note. Bad extends combo; only a miss breaks it.
    pub fn record(&mut self, grade: JudgeGrade) {
        match grade {
            JudgeGrade::Marvelous => self.counts.marvelous += 1,
            JudgeGrade::Perfect => self.counts.perfect += 1,
            JudgeGrade::Great => self.counts.great += 1,
            JudgeGrade::Good => self.counts.good += 1,
            JudgeGrade::Bad => self.counts.bad += 1,
            JudgeGrade::Miss => self.counts.miss += 1,
        }
        if grade.extends_combo() {
            self.current_combo += 1;
            self.max_combo = self.max_combo.max(self.current_combo);
        } else {
            self.current_combo = 0;
        }
    }

    pub fn record_miss(&mut self) {
        self.record(JudgeGrade::Miss);
    }

    #[inline(always)]
    pub fn counts(&self) -> &TierCounts {
        &self.counts
    }

    #[inline(always)]
    pub fn current_combo(&self) -> u32 {
        self.current_combo
    }

    #[inline(always)]
    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn summarize(&self, total_notes: u32, failed: bool) -> ResultSummary {
        let score = calculate_score(total_notes, &self.counts);
        ResultSummary {
            tier_counts: self.counts,
            total_notes,
            max_combo: self.max_combo,
            score,
            grade: dance_level(score, failed),
            failed,
        }
    }
}

/// Immutable end-of-song summary, handed to the results view and discarded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub tier_counts: TierCounts,
    pub total_notes: u32,
    pub max_combo: u32,
    pub score: i64,
    pub grade: &'static str,
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_split_scores_873999() {
        let counts = TierCounts {
            marvelous: 5,
            perfect: 3,
            great: 1,
            good: 1,
            ..TierCounts::default()
        };
        assert_eq!(calculate_score(10, &counts), 873_999);
        assert_eq!(dance_level(873_999, false), "A");
    }

    #[test]
    fn zero_notes_scores_zero() {
        let counts = TierCounts { marvelous: 5, ..TierCounts::default() };
        assert_eq!(calculate_score(0, &counts), 0);
    }

    #[test]
    fn all_marvelous_is_full_score_when_divisible() {
        let counts = TierCounts { marvelous: 100, ..TierCounts::default() };
        assert_eq!(calculate_score(100, &counts), MAX_SCORE);
    }

    #[test]
    fn bad_and_miss_score_nothing() {
        let counts = TierCounts { bad: 7, miss: 3, ..TierCounts::default() };
        assert_eq!(calculate_score(10, &counts), 0);
    }

    #[test]
    fn grade_table() {
        assert_eq!(dance_level(990_000, false), "AAA");
        assert_eq!(dance_level(950_000, false), "AA+");
        assert_eq!(dance_level(900_000, false), "AA");
        assert_eq!(dance_level(890_000, false), "AA-");
        assert_eq!(dance_level(850_000, false), "A+");
        assert_eq!(dance_level(800_000, false), "A");
        assert_eq!(dance_level(790_000, false), "A-");
        assert_eq!(dance_level(750_000, false), "B+");
        assert_eq!(dance_level(700_000, false), "B");
        assert_eq!(dance_level(690_000, false), "B-");
        assert_eq!(dance_level(650_000, false), "C+");
        assert_eq!(dance_level(600_000, false), "C");
        assert_eq!(dance_level(590_000, false), "C-");
        assert_eq!(dance_level(550_000, false), "D+");
        assert_eq!(dance_level(500_000, false), "D");
        assert_eq!(dance_level(0, false), "D");
    }

    #[test]
    fn failed_overrides_any_score() {
        assert_eq!(dance_level(999_999, true), "E");
    }

    #[test]
    fn combo_extends_through_bad_and_breaks_on_miss() {
        let mut tally = JudgementTally::new();
        tally.record(JudgeGrade::Marvelous);
        tally.record(JudgeGrade::Bad);
        tally.record(JudgeGrade::Good);
        assert_eq!(tally.current_combo(), 3);
        tally.record_miss();
        assert_eq!(tally.current_combo(), 0);
        assert_eq!(tally.max_combo(), 3);
        tally.record(JudgeGrade::Perfect);
        assert_eq!(tally.current_combo(), 1);
        assert_eq!(tally.max_combo(), 3);
    }

    #[test]
    fn summary_carries_counts_and_grade() {
        let mut tally = JudgementTally::new();
        for _ in 0..9 {
            tally.record(JudgeGrade::Marvelous);
        }
        tally.record_miss();
        let summary = tally.summarize(10, false);
        assert_eq!(summary.tier_counts.marvelous, 9);
        assert_eq!(summary.tier_counts.miss, 1);
        assert_eq!(summary.score, 900_000);
        assert_eq!(summary.grade, "AA");
        assert_eq!(summary.max_combo, 9);
    }
}
