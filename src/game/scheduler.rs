use crate::game::chart::{Chart, Lane, NoteDivision, LANE_COUNT};
use crate::game::timing::TempoMap;
use std::collections::VecDeque;

/// Default travel window: how long a note is on screen between spawn and
/// the judge line.
pub const DEFAULT_TRAVEL_S: f64 = 1.5;

/// Spawn distance ahead of the judge line. Charts with tempo changes use
/// the beats variant so spawn density tracks the local BPM instead of
/// flooding the field during slow sections.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LookAhead {
    Seconds(f64),
    Beats(f64),
}

impl LookAhead {
    /// Picks the variant the chart calls for: fixed seconds at constant
    /// tempo, beats-ahead (the travel window at base BPM) otherwise.
    pub fn for_chart(chart: &Chart) -> LookAhead {
        if chart.bpm_changes.len() > 1 {
            LookAhead::Beats(DEFAULT_TRAVEL_S * f64::from(chart.base_bpm) / 60.0)
        } else {
            LookAhead::Seconds(DEFAULT_TRAVEL_S)
        }
    }
}

/// An admitted, not-yet-resolved note. Exactly one handle exists per
/// spawned note; it dies the moment it is consumed or swept.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActiveNote {
    pub time_sec: f64,
    pub beat: f64,
    pub lane: Lane,
    pub division: NoteDivision,
}

/// Display position of an active note: `progress` runs 1.0 at the spawn
/// anchor down to 0.0 at the judge line (and negative once late).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NotePosition {
    pub lane: Lane,
    pub division: NoteDivision,
    pub progress: f64,
}

/// Per-lane FIFO queues of active notes plus the admission cursor. The
/// chart's global time ordering guarantees each queue stays time-ordered
/// under the single forward scan.
#[derive(Debug)]
pub struct NoteScheduler {
    lanes: [VecDeque<ActiveNote>; LANE_COUNT],
    cursor: usize,
    look_ahead: LookAhead,
}

impl NoteScheduler {
    pub fn new(look_ahead: LookAhead) -> NoteScheduler {
        NoteScheduler {
            lanes: [const { VecDeque::new() }; LANE_COUNT],
            cursor: 0,
            look_ahead,
        }
    }

    #[inline(always)]
    pub fn look_ahead(&self) -> LookAhead {
        self.look_ahead
    }

    /// Admits every chart note whose spawn instant has arrived. The
    /// cursor only moves forward; a note is admitted exactly once.
    pub fn admit(&mut self, chart: &Chart, tempo: &TempoMap, song_time: f64) {
        while self.cursor < chart.notes.len() {
            let note = chart.notes[self.cursor];
            let within = match self.look_ahead {
                LookAhead::Seconds(window) => note.time_sec - window <= song_time,
                LookAhead::Beats(window) => {
                    let song_beat = tempo.seconds_to_beat(song_time);
                    note.beat - window <= song_beat
                }
            };
            if !within {
                break;
            }
            self.lanes[note.lane.index()].push_back(ActiveNote {
                time_sec: note.time_sec,
                beat: note.beat,
                lane: note.lane,
                division: note.division,
            });
            self.cursor += 1;
        }
    }

    /// Normalized positions for every active note. Read-only: queue
    /// membership is never touched here.
    pub fn positions(&self, tempo: &TempoMap, song_time: f64) -> Vec<NotePosition> {
        let mut out = Vec::with_capacity(self.active_count());
        match self.look_ahead {
            LookAhead::Seconds(window) => {
                for queue in &self.lanes {
                    for note in queue {
                        out.push(NotePosition {
                            lane: note.lane,
                            division: note.division,
                            progress: (note.time_sec - song_time) / window,
                        });
                    }
                }
            }
            LookAhead::Beats(window) => {
                let song_beat = tempo.seconds_to_beat(song_time);
                for queue in &self.lanes {
                    for note in queue {
                        out.push(NotePosition {
                            lane: note.lane,
                            division: note.division,
                            progress: (note.beat - song_beat) / window,
                        });
                    }
                }
            }
        }
        out
    }

    #[inline(always)]
    pub fn head(&self, lane: Lane) -> Option<&ActiveNote> {
        self.lanes[lane.index()].front()
    }

    #[inline(always)]
    pub fn pop_head(&mut self, lane: Lane) -> Option<ActiveNote> {
        self.lanes[lane.index()].pop_front()
    }

    #[inline(always)]
    pub fn active_count(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    /// True once the cursor has passed every chart note.
    #[inline(always)]
    pub fn fully_admitted(&self, chart: &Chart) -> bool {
        self.cursor >= chart.notes.len()
    }

    #[inline(always)]
    pub fn is_drained(&self, chart: &Chart) -> bool {
        self.fully_admitted(chart) && self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::{BpmChange, Note};

    fn chart_with_notes(beats_and_lanes: &[(f64, Lane)], bpm_changes: Vec<BpmChange>) -> Chart {
        let tempo = TempoMap::new(&bpm_changes);
        let mut notes: Vec<Note> = beats_and_lanes
            .iter()
            .map(|&(beat, lane)| Note {
                time_sec: tempo.beat_to_seconds(beat),
                beat,
                lane,
                division: NoteDivision::from_beat(beat),
            })
            .collect();
        notes.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));
        Chart {
            music_file: String::new(),
            base_bpm: 120,
            offset_sec: 0.0,
            notes,
            bpm_changes: tempo.changes().to_vec(),
        }
    }

    #[test]
    fn admits_only_inside_the_lookahead_window() {
        // 120 BPM: beats 0, 4, 8 land at 0s, 2s, 4s.
        let chart = chart_with_notes(
            &[(0.0, Lane::Left), (4.0, Lane::Down), (8.0, Lane::Up)],
            vec![],
        );
        let tempo = TempoMap::new(&chart.bpm_changes);
        let mut sched = NoteScheduler::new(LookAhead::Seconds(1.5));

        sched.admit(&chart, &tempo, 0.0);
        assert_eq!(sched.active_count(), 1);
        sched.admit(&chart, &tempo, 0.6);
        assert_eq!(sched.active_count(), 2);
        sched.admit(&chart, &tempo, 2.5);
        assert_eq!(sched.active_count(), 3);
        assert!(sched.fully_admitted(&chart));
    }

    #[test]
    fn cursor_never_rewinds_or_duplicates() {
        let chart = chart_with_notes(&[(0.0, Lane::Left)], vec![]);
        let tempo = TempoMap::new(&chart.bpm_changes);
        let mut sched = NoteScheduler::new(LookAhead::Seconds(1.5));

        sched.admit(&chart, &tempo, 1.0);
        assert_eq!(sched.active_count(), 1);
        // Later ticks, including one that jumps backwards, admit nothing new.
        sched.admit(&chart, &tempo, 2.0);
        sched.admit(&chart, &tempo, 0.0);
        assert_eq!(sched.active_count(), 1);
    }

    #[test]
    fn intra_lane_order_is_preserved() {
        let chart = chart_with_notes(
            &[(0.0, Lane::Left), (0.5, Lane::Left), (1.0, Lane::Left)],
            vec![],
        );
        let tempo = TempoMap::new(&chart.bpm_changes);
        let mut sched = NoteScheduler::new(LookAhead::Seconds(10.0));
        sched.admit(&chart, &tempo, 0.0);

        let first = sched.pop_head(Lane::Left).unwrap();
        let second = sched.pop_head(Lane::Left).unwrap();
        assert!(first.time_sec < second.time_sec);
    }

    #[test]
    fn positions_interpolate_between_spawn_and_judge_line() {
        let chart = chart_with_notes(&[(4.0, Lane::Down)], vec![]);
        let tempo = TempoMap::new(&chart.bpm_changes);
        let mut sched = NoteScheduler::new(LookAhead::Seconds(2.0));

        // Note at 2.0s; spawn instant is 0.0s.
        sched.admit(&chart, &tempo, 0.0);
        let at_spawn = sched.positions(&tempo, 0.0);
        assert!((at_spawn[0].progress - 1.0).abs() < 1e-12);
        let halfway = sched.positions(&tempo, 1.0);
        assert!((halfway[0].progress - 0.5).abs() < 1e-12);
        let at_line = sched.positions(&tempo, 2.0);
        assert!(at_line[0].progress.abs() < 1e-12);
        // Reads never change membership.
        assert_eq!(sched.active_count(), 1);
    }

    #[test]
    fn beats_lookahead_tracks_tempo() {
        // 60 BPM then 240 BPM from beat 4.
        let changes = vec![
            BpmChange { beat: 0.0, bpm: 60.0 },
            BpmChange { beat: 4.0, bpm: 240.0 },
        ];
        let chart = chart_with_notes(&[(6.0, Lane::Up)], changes);
        let tempo = TempoMap::new(&chart.bpm_changes);
        let mut sched = NoteScheduler::new(LookAhead::Beats(2.0));

        // Beat 6 = 4.5s. At song_time 3.0s (beat 3) it is 3 beats away.
        sched.admit(&chart, &tempo, 3.0);
        assert_eq!(sched.active_count(), 0);
        // At 4.25s (beat 5) it is 1 beat away.
        sched.admit(&chart, &tempo, 4.25);
        assert_eq!(sched.active_count(), 1);
        let pos = sched.positions(&tempo, 4.25);
        assert!((pos[0].progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn for_chart_picks_beats_variant_only_with_tempo_changes() {
        let flat = chart_with_notes(&[(0.0, Lane::Left)], vec![]);
        assert_eq!(LookAhead::for_chart(&flat), LookAhead::Seconds(DEFAULT_TRAVEL_S));

        let shifting = chart_with_notes(
            &[(0.0, Lane::Left)],
            vec![
                BpmChange { beat: 0.0, bpm: 120.0 },
                BpmChange { beat: 8.0, bpm: 90.0 },
            ],
        );
        assert_eq!(LookAhead::for_chart(&shifting), LookAhead::Beats(3.0));
    }
}
