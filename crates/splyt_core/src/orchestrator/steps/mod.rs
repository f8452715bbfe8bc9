//! Pipeline step implementations.
//!
//! Each step handles one phase of the download/convert/separate pipeline.

mod convert;
mod download;
mod separate;

pub use convert::ConvertStep;
pub use download::DownloadStep;
pub use separate::SeparateStep;
