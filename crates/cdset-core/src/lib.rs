//! Core library for Common Data Set extraction.
//!
//! This crate provides:
//! - Document loading (PDF and pre-extracted text, with table reconstruction)
//! - A registry of ranked, era-aware field rules
//! - Section extractors for admissions, test scores, demographics, costs and aid
//! - Residency reconciliation, record assembly with overrides, and validation
//! - Multi-year aggregation into the dashboard's per-institution JSON

pub mod aggregate;
pub mod assemble;
pub mod document;
pub mod error;
pub mod extract;
pub mod models;
pub mod reconcile;

pub use aggregate::{Aggregator, DocumentJob, DocumentOutcome, Plan, RunReport, YearReport, year_label};
pub use assemble::{Assembled, Assembler, FieldEntry, FieldStatus};
pub use document::{DocumentSource, PdfExtractor, SourceDocument, TextExtractor, load_document};
pub use error::{CdsError, DocumentError, ExtractionIssue, Result};
pub use extract::{Era, Extraction, ScanContext, describe_rules, extract_sections};
pub use models::{CdsConfig, ExtractionSettings, SchoolDataset, YearRecord};
