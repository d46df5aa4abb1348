pub mod simfile;

pub use simfile::{Difficulty, SimfileError, parse_simfile, write_simfile};
