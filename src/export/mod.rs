pub mod json_export;
pub mod text_export;

use anyhow::Result;

use crate::core::run::RunAggregate;

pub use json_export::JsonExporter;
pub use text_export::TextExporter;

/// Renders a finished run's accumulated state into an output form.
pub trait Exporter {
    fn export(&self, run: &RunAggregate) -> Result<()>;
}
