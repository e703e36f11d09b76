//! Audit driver for HTML sanitizers.
//!
//! Shapes raw inputs into documents, cleans them with the configured
//! allow-list, classifies what survived and routes the outcome to a
//! [`FindingSink`]. Shared by the `citadel-audit` CLI and the fuzz targets.

pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod sink;

pub use config::{HarnessConfig, CONFIG_ENV};
pub use driver::{clean_lines, line_cleaning_policy, record, AuditOutcome, Driver, LineReport};
pub use error::{HarnessError, HarnessResult};
pub use input::{candidate_documents, looks_like_markup, shape_payload, PayloadShape};
pub use sink::{short_hash, DirectorySink, FindingSink, LogSink, MemorySink};
