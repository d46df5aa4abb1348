use log::info;

/// How far in the future hosts should schedule playback so the start
/// commit lands before the output device begins sampling.
pub const SCHEDULE_LEAD_S: f64 = 0.2;

/// Device output latency from the reported buffer geometry
/// (`frames * buffer_count / sample_rate`), measured once per session.
#[inline(always)]
pub fn output_latency_s(buffer_frames: u32, buffer_count: u32, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    f64::from(buffer_frames) * f64::from(buffer_count) / f64::from(sample_rate)
}

/// Derives song time from an external monotonic audio clock. The clock is
/// a guard as much as a converter: until the audio clock reaches the
/// scheduled start, `song_time` yields nothing and the whole per-tick
/// pipeline stays idle.
#[derive(Copy, Clone, Debug, Default)]
pub struct SongClock {
    armed: Option<ArmedClock>,
    chart_offset_s: f64,
}

#[derive(Copy, Clone, Debug)]
struct ArmedClock {
    scheduled_start: f64,
    output_latency_s: f64,
}

impl SongClock {
    pub fn new(chart_offset_s: f64) -> SongClock {
        SongClock { armed: None, chart_offset_s }
    }

    /// Arms the clock against a start instant the host has committed to
    /// the audio device (typically `audio_now + SCHEDULE_LEAD_S`).
    pub fn arm(&mut self, scheduled_start: f64, output_latency_s: f64) {
        info!(
            "Clock armed: start={:.4}, output_latency={:.4}, chart_offset={:.4}",
            scheduled_start, output_latency_s, self.chart_offset_s
        );
        self.armed = Some(ArmedClock { scheduled_start, output_latency_s });
    }

    #[inline(always)]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Song time for an audio clock sample, or `None` while unarmed or
    /// still inside the scheduling lead.
    #[inline(always)]
    pub fn song_time(&self, audio_clock_now: f64) -> Option<f64> {
        let armed = self.armed?;
        if audio_clock_now < armed.scheduled_start {
            return None;
        }
        Some(
            audio_clock_now - armed.scheduled_start - self.chart_offset_s
                - armed.output_latency_s,
        )
    }
}
