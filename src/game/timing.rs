use crate::game::chart::BpmChange;
use log::warn;

pub const FALLBACK_BPM: f64 = 120.0;

/// Bidirectional beat <-> seconds mapping over piecewise-constant BPM
/// segments. Pure: construction normalizes the segment list once, lookups
/// never mutate.
#[derive(Clone, Debug)]
pub struct TempoMap {
    /// Ascending by beat; first entry is always at beat 0.
    changes: Vec<BpmChange>,
    /// Cumulative seconds at each segment start, same indexing as `changes`.
    start_secs: Vec<f64>,
}

impl TempoMap {
    /// Builds a tempo map from an authored change list: sorts by beat,
    /// drops non-positive BPMs, and inserts an implicit change at beat 0
    /// when the list starts later. An empty list degenerates to a single
    /// 120 BPM segment.
    pub fn new(authored: &[BpmChange]) -> TempoMap {
        let mut changes: Vec<BpmChange> = authored
            .iter()
            .filter(|c| {
                let ok = c.bpm.is_finite() && c.bpm > 0.0 && c.beat.is_finite() && c.beat >= 0.0;
                if !ok {
                    warn!("Dropping invalid bpm change: {:?}", c);
                }
                ok
            })
            .copied()
            .collect();
        changes.sort_by(|a, b| a.beat.total_cmp(&b.beat));

        if changes.is_empty() {
            changes.push(BpmChange { beat: 0.0, bpm: FALLBACK_BPM });
        } else if changes[0].beat > 0.0 {
            let bpm = changes[0].bpm;
            changes.insert(0, BpmChange { beat: 0.0, bpm });
        }

        let mut start_secs = Vec::with_capacity(changes.len());
        let mut current_time = 0.0;
        let mut last_beat = 0.0;
        let mut last_bpm = changes[0].bpm;
        for change in &changes {
            if change.beat > last_beat {
                current_time += (change.beat - last_beat) * (60.0 / last_bpm);
            }
            start_secs.push(current_time);
            last_beat = change.beat;
            last_bpm = change.bpm;
        }

        TempoMap { changes, start_secs }
    }

    #[inline(always)]
    pub fn changes(&self) -> &[BpmChange] {
        &self.changes
    }

    /// BPM of the segment containing `beat`. A change exactly at `beat`
    /// belongs to the new segment.
    pub fn bpm_at_beat(&self, beat: f64) -> f64 {
        let idx = self.segment_index_for_beat(beat);
        self.changes[idx].bpm
    }

    /// Seconds from beat 0 to `beat`: full segments strictly before the
    /// target plus the partial remainder at that segment's tempo.
    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        let idx = self.segment_index_for_beat(beat);
        let seg = self.changes[idx];
        self.start_secs[idx] + (beat - seg.beat) * (60.0 / seg.bpm)
    }

    /// Inverse of `beat_to_seconds`: walk segment durations until the
    /// target seconds falls inside one, then solve the partial beat offset
    /// at that segment's tempo.
    pub fn seconds_to_beat(&self, seconds: f64) -> f64 {
        let idx = self
            .start_secs
            .partition_point(|start| *start <= seconds)
            .saturating_sub(1);
        let seg = self.changes[idx];
        seg.beat + (seconds - self.start_secs[idx]) * seg.bpm / 60.0
    }

    #[inline(always)]
    fn segment_index_for_beat(&self, beat: f64) -> usize {
        // partition_point: first index whose segment starts strictly after
        // `beat`; the containing segment is the one before it.
        self.changes
            .partition_point(|c| c.beat <= beat)
            .saturating_sub(1)
    }
}
