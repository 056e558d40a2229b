pub mod csv;
pub mod preview;

pub use self::csv::{CsvSummary, read_csv_summary, write_frame_csv};
pub use preview::render_preview;
