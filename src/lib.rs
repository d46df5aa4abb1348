//! Timing and judgement core for a four-panel rhythm game.
//!
//! The library takes simfile text in and produces a scored session
//! summary out; everything in between (tempo conversion, note
//! scheduling, tiered judgement, combo and score tracking, chart
//! recording) runs on the host's update thread against an external
//! audio clock. Audio, rendering, and input devices stay on the host
//! side of the [`game::session::Session`] boundary.

pub mod game;
