pub mod logging;

pub use logging::{log_export_problems, log_extraction_summary, log_startup, truncate_text};
