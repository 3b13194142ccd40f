pub mod executive;

pub use executive::{summarize, ExecutiveSummary, SummaryEntry, SummaryInputs};
