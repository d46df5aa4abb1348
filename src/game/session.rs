use crate::game::chart::{Chart, Lane, ALL_LANES, LANE_COUNT};
use crate::game::clock::SongClock;
use crate::game::judge::{self, JudgeGrade, Judgment, MISS_SWEEP_S};
use crate::game::recorder::ChartRecorder;
use crate::game::scheduler::{LookAhead, NotePosition, NoteScheduler};
use crate::game::scoring::{JudgementTally, ResultSummary};
use crate::game::timing::TempoMap;
use bitflags::bitflags;
use log::{debug, info};
use smallvec::SmallVec;

/// How long after the last queue drains before the session reports done,
/// so trailing feedback is not cut off mid-flash.
pub const END_OF_CHART_GRACE_S: f64 = 0.8;

bitflags! {
    /// One tick's worth of fresh presses, sampled once by the host.
    /// Edge-triggered: a held key contributes a single bit on the tick it
    /// went down and nothing afterwards.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct LaneSet: u8 {
        const LEFT = 1 << 0;
        const DOWN = 1 << 1;
        const UP = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl LaneSet {
    #[inline(always)]
    pub fn from_lane(lane: Lane) -> LaneSet {
        LaneSet::from_bits_truncate(1 << lane.index())
    }

    /// Lanes present in this set, in column order.
    pub fn lanes(self) -> impl Iterator<Item = Lane> {
        ALL_LANES
            .into_iter()
            .filter(move |lane| self.contains(LaneSet::from_lane(*lane)))
    }
}

/// Host-side feedback surface: receptor flashes, haptics, sound cues.
/// Called synchronously from the update tick, so implementations must
/// stay cheap.
pub trait FeedbackSink {
    fn on_judgement(&mut self, lane: Lane, grade: JudgeGrade, intensity: f32);
    fn on_miss(&mut self, lane: Lane);
}

/// Sink that swallows everything; the default for headless runs.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn on_judgement(&mut self, _lane: Lane, _grade: JudgeGrade, _intensity: f32) {}
    fn on_miss(&mut self, _lane: Lane) {}
}

/// Something that changed the tally during one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Judged { lane: Lane, grade: JudgeGrade, time_error_s: f64 },
    Missed { lane: Lane },
}

/// One playthrough of one chart: the clock, scheduler, tally, and
/// optional recorder wired together behind a single `tick` entry point.
/// Runs entirely on the host's update thread.
pub struct Session<S: FeedbackSink = NullSink> {
    chart: Chart,
    tempo: TempoMap,
    clock: SongClock,
    scheduler: NoteScheduler,
    tally: JudgementTally,
    recorder: Option<ChartRecorder>,
    sink: S,
    last_note_time: f64,
    finished: bool,
    finalized: bool,
    failed: bool,
}

impl Session<NullSink> {
    pub fn new(chart: Chart) -> Session<NullSink> {
        Session::with_sink(chart, NullSink)
    }
}

impl<S: FeedbackSink> Session<S> {
    pub fn with_sink(chart: Chart, sink: S) -> Session<S> {
        let tempo = TempoMap::new(&chart.bpm_changes);
        let clock = SongClock::new(chart.offset_sec);
        let look_ahead = LookAhead::for_chart(&chart);
        let last_note_time = chart.notes.last().map_or(0.0, |note| note.time_sec);
        info!(
            "Session ready: {} notes, base {} BPM, look-ahead {:?}",
            chart.note_count(),
            chart.base_bpm,
            look_ahead
        );
        Session {
            scheduler: NoteScheduler::new(look_ahead),
            chart,
            tempo,
            clock,
            tally: JudgementTally::new(),
            recorder: None,
            sink,
            last_note_time,
            finished: false,
            finalized: false,
            failed: false,
        }
    }

    /// Commits the playback start the host scheduled on its audio device.
    pub fn arm(&mut self, scheduled_start: f64, output_latency_s: f64) {
        self.clock.arm(scheduled_start, output_latency_s);
    }

    #[inline(always)]
    pub fn song_time(&self, audio_clock_now: f64) -> Option<f64> {
        self.clock.song_time(audio_clock_now)
    }

    pub fn attach_recorder(&mut self, recorder: ChartRecorder) {
        self.recorder = Some(recorder);
    }

    #[inline(always)]
    pub fn recorder_mut(&mut self) -> Option<&mut ChartRecorder> {
        self.recorder.as_mut()
    }

    #[inline(always)]
    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    #[inline(always)]
    pub fn tally(&self) -> &JudgementTally {
        &self.tally
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Marks the run as failed; the final grade becomes "E" no matter the
    /// score. The host decides when (there is no built-in life gauge).
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// One update step. Before the armed clock reaches its scheduled
    /// start this does nothing at all.
    pub fn tick(&mut self, audio_clock_now: f64, pressed: LaneSet) -> SmallVec<[SessionEvent; 4]> {
        let mut events = SmallVec::new();
        let Some(song_time) = self.clock.song_time(audio_clock_now) else {
            return events;
        };
        self.scheduler.admit(&self.chart, &self.tempo, song_time);
        for lane in pressed.lanes() {
            if let Some(judgment) = self.on_lane_press(lane, song_time) {
                events.push(SessionEvent::Judged {
                    lane,
                    grade: judgment.grade,
                    time_error_s: judgment.time_error_s,
                });
            }
        }
        for lane in self.sweep(song_time) {
            events.push(SessionEvent::Missed { lane });
        }
        if !self.finished
            && self.scheduler.is_drained(&self.chart)
            && song_time > self.last_note_time + END_OF_CHART_GRACE_S
        {
            info!("Chart complete at song time {song_time:.3}");
            self.finished = true;
        }
        events
    }

    /// Granular variant of the spawn half of `tick`: admits due notes and
    /// returns display positions for everything on the field.
    pub fn admit_and_position(&mut self, song_time: f64) -> Vec<NotePosition> {
        self.scheduler.admit(&self.chart, &self.tempo, song_time);
        self.scheduler.positions(&self.tempo, song_time)
    }

    /// Evaluates one press against the lane's head note. Empty lanes and
    /// presses outside every window leave the tally untouched; the head
    /// note survives the latter to be hit or swept later.
    pub fn on_lane_press(&mut self, lane: Lane, song_time: f64) -> Option<Judgment> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.on_press(lane, song_time);
        }
        let head_time = match self.scheduler.head(lane) {
            Some(note) => note.time_sec,
            None => {
                debug!("Empty swing on {lane:?} at {song_time:.3}");
                return None;
            }
        };
        let judgment = judge::classify_offset_s(song_time - head_time)?;
        self.scheduler.pop_head(lane);
        self.tally.record(judgment.grade);
        self.sink
            .on_judgement(lane, judgment.grade, judgment.grade.visual_intensity());
        Some(judgment)
    }

    /// Converts every note the player can no longer hit into a miss.
    pub fn sweep(&mut self, song_time: f64) -> SmallVec<[Lane; LANE_COUNT]> {
        let mut swept = SmallVec::new();
        for lane in ALL_LANES {
            while let Some(head) = self.scheduler.head(lane) {
                if song_time <= head.time_sec + MISS_SWEEP_S {
                    break;
                }
                self.scheduler.pop_head(lane);
                self.tally.record_miss();
                self.sink.on_miss(lane);
                swept.push(lane);
            }
        }
        swept
    }

    /// Produces the end-of-song summary, once. Later calls get `None`.
    pub fn finalize(&mut self) -> Option<ResultSummary> {
        if self.finalized {
            return None;
        }
        self.finalized = true;
        Some(
            self.tally
                .summarize(self.chart.note_count() as u32, self.failed),
        )
    }
}
