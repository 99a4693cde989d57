//! Motor de revisión: escaneo, agregación, decisión y reporte.

pub mod aggregator;
pub mod filter;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod scanner;

pub use pipeline::{ChangedFile, Changeset, ReviewEngine};
pub use policy::Decision;
pub use report::Report;
