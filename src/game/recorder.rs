use crate::game::chart::{Chart, Lane, LANE_COUNT};
use crate::game::parsing::write_simfile;
use log::{info, warn};
use rustc_hash::FxHashMap;

/// Grid resolution used when the requested one is unusable.
pub const DEFAULT_SUBDIVISION: u32 = 16;

/// Captures live keystrokes and renders them back out as simfile text,
/// quantized onto the base-BPM grid. Tempo changes are deliberately
/// ignored here; recordings assume the chart's base tempo throughout.
#[derive(Debug)]
pub struct ChartRecorder {
    subdivision: u32,
    recording: bool,
    hits: Vec<(Lane, f64)>,
}

impl ChartRecorder {
    /// `subdivision` is rows per 4/4 measure and must be a positive
    /// multiple of 4; anything else falls back to 16.
    pub fn new(subdivision: u32) -> ChartRecorder {
        let subdivision = if subdivision == 0 || subdivision % 4 != 0 {
            warn!(
                "Recorder subdivision {} is not a positive multiple of 4, using {}",
                subdivision, DEFAULT_SUBDIVISION
            );
            DEFAULT_SUBDIVISION
        } else {
            subdivision
        };
        ChartRecorder { subdivision, recording: false, hits: Vec::new() }
    }

    #[inline(always)]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn start(&mut self) {
        info!("Recorder started (subdivision {})", self.subdivision);
        self.recording = true;
    }

    pub fn stop(&mut self) {
        info!("Recorder stopped with {} captured hits", self.hits.len());
        self.recording = false;
    }

    /// Captures one press at the given song time. Ignored while stopped.
    pub fn on_press(&mut self, lane: Lane, song_time: f64) {
        if self.recording {
            self.hits.push((lane, song_time));
        }
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    #[inline(always)]
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Renders the captured hits as a complete simfile, reusing the
    /// source chart's music reference, offset, and tempo header.
    pub fn save(&self, chart: &Chart) -> String {
        let subdiv = self.subdivision as usize;
        let measure_dur = 4.0 * 60.0 / f64::from(chart.base_bpm);

        // measure index -> per-row lane masks
        let mut buckets: FxHashMap<u64, Vec<u8>> = FxHashMap::default();
        let mut last_measure = 0u64;
        for &(lane, time) in &self.hits {
            let (measure, row) = self.quantize(time, measure_dur);
            last_measure = last_measure.max(measure);
            let rows = buckets.entry(measure).or_insert_with(|| vec![0u8; subdiv]);
            rows[row] |= 1 << lane.index();
        }

        let mut measures = Vec::with_capacity(last_measure as usize + 1);
        for m in 0..=last_measure {
            let masks = buckets.remove(&m).unwrap_or_else(|| vec![0u8; subdiv]);
            let rows = masks
                .iter()
                .map(|mask| {
                    (0..LANE_COUNT)
                        .map(|i| if mask & (1 << i) != 0 { '1' } else { '0' })
                        .collect::<String>()
                })
                .collect();
            measures.push(rows);
        }

        write_simfile(&chart.music_file, chart.offset_sec, &chart.bpm_changes, &measures)
    }

    /// Snaps one timestamp to the nearest grid row. A hit rounding to the
    /// measure boundary belongs to row 0 of the next measure; anything
    /// before the song start lands on the first row.
    fn quantize(&self, time: f64, measure_dur: f64) -> (u64, usize) {
        if time <= 0.0 {
            return (0, 0);
        }
        let mut measure = (time / measure_dur).floor() as u64;
        let frac = (time - measure as f64 * measure_dur) / measure_dur;
        let mut row = (frac * f64::from(self.subdivision)).round() as usize;
        if row >= self.subdivision as usize {
            measure += 1;
            row = 0;
        }
        (measure, row)
    }
}
