pub mod exporter;
pub mod extraction;
pub mod text_source;

pub use exporter::TemplateExporter;
pub use extraction::{validate_request, ExtractionService};
pub use text_source::read_text_file;
