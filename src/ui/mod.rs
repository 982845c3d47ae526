pub mod icons;
pub mod progress;

pub use progress::{GenerationUI, format_artifact_line, short_id};
