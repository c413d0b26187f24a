//! Data models for CDS extraction.

pub mod config;
pub mod field;
pub mod record;

pub use config::{CdsConfig, EraSetting, ExtractionSettings, InstitutionConfig, Override};
pub use field::{FieldKind, FieldSpec, FIELDS};
pub use record::*;
