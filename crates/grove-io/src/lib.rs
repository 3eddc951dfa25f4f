//! Feature matrix input and prediction report output for grove.

mod error;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::FeatureMatrixReader;
pub use writer::{PredictionReport, PredictionWriter, read_tab_separated_predictions};
