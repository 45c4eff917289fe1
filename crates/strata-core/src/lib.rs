pub mod analyzer;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod qualify;
pub mod resolve;
pub mod traverse;
pub mod types;
pub mod unit;

pub use analyzer::{LanguageAdapter, ParsedFile};
pub use config::Config;
pub use error::{Result, StrataError};
pub use graph::DependencyGraph;
pub use pipeline::{GraphResult, Pipeline, ScanOutput};
pub use qualify::QualifiedPathTrim;
pub use types::*;
pub use unit::UnitBuilder;
