pub mod chart;
pub mod clock;
pub mod judge;
pub mod parsing;
pub mod recorder;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod timing;
