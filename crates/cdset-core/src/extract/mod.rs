//! Per-section field extraction for CDS reports.
//!
//! Every section extractor is a pure function of a [`ScanContext`] and
//! returns its partial record together with the rule that produced each
//! field. Nothing here substitutes a default for a field no rule matched.

pub mod admissions;
pub mod costs;
pub mod demographics;
pub mod financial_aid;
pub mod numbers;
pub mod patterns;
pub mod registry;
pub mod test_scores;

pub use registry::{DescribeRules, Resolved, Rule, RuleEra, RuleInfo, RuleSet};

use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::document::{RawTable, SourceDocument};
use crate::error::ExtractionIssue;
use crate::models::{EraSetting, ExtractionSettings, YearRecord};
use numbers::counts_in;
use patterns::{MEN_APPLIED, MODERN_MARKER, SPACE_BEFORE_COMMA, SPLIT_THOUSANDS};

/// Wording generation of a CDS report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    /// Gendered C1 rows (`men who applied`), SAT Critical Reading,
    /// room and board.
    Legacy,
    /// Combined C1 rows (`students who applied in Fall`), another-gender
    /// columns, SAT EBRW, food and housing.
    Modern,
}

/// Detect the era from document wording.
pub fn detect_era(text: &str) -> Option<Era> {
    if MODERN_MARKER.is_match(text) {
        Some(Era::Modern)
    } else if MEN_APPLIED.is_match(text) {
        Some(Era::Legacy)
    } else {
        None
    }
}

/// Normalize extracted text.
///
/// Always removes whitespace that text extraction inserts before a
/// thousands separator (`11 ,200`). With `repair_split_numbers`, also
/// re-joins a number split after its leading digits (`1 2,345`).
pub fn normalize(text: &str, repair_split_numbers: bool) -> String {
    let text = text.replace("\r\n", "\n").replace(['\r', '\u{00a0}'], " ");
    let text = SPACE_BEFORE_COMMA.replace_all(&text, "${1},");
    if repair_split_numbers {
        text.lines()
            .map(|line| SPLIT_THOUSANDS.replace_all(line, "${1}${2}${3}").into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.into_owned()
    }
}

/// Everything the rules look at for one document.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Normalized text.
    pub text: String,
    /// Normalized text with lines joined by single spaces.
    pub joined: String,
    /// Trimmed, non-empty lines of the normalized text.
    pub lines: Vec<String>,
    pub tables: Vec<RawTable>,
    /// Era used to filter rules; `None` runs every rule.
    pub era: Option<Era>,
}

impl ScanContext {
    /// Build a context from a loaded document, keeping the tables found on
    /// each page.
    pub fn new(document: &SourceDocument, settings: &ExtractionSettings) -> Self {
        let repair = settings.repair_split_numbers;
        let mut tables = Vec::new();
        for page in &document.pages {
            debug!("Page {}: {} tables", page.number, page.tables.len());
            tables.extend(page.tables.iter().map(|table| RawTable {
                rows: table
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|cell| normalize(cell, repair)).collect())
                    .collect(),
            }));
        }
        Self::build(normalize(&document.text(), repair), tables, settings)
    }

    /// Build a context directly from text. Tables are reconstructed from it.
    pub fn from_text(text: &str, settings: &ExtractionSettings) -> Self {
        let text = normalize(text, settings.repair_split_numbers);
        let tables = crate::document::reconstruct_tables(&text);
        Self::build(text, tables, settings)
    }

    fn build(text: String, tables: Vec<RawTable>, settings: &ExtractionSettings) -> Self {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let joined = lines.join(" ");
        let era = match settings.era {
            EraSetting::Auto => detect_era(&text),
            EraSetting::Legacy => Some(Era::Legacy),
            EraSetting::Modern => Some(Era::Modern),
        };
        debug!("Scan context: {} lines, {} tables, era {:?}", lines.len(), tables.len(), era);

        Self {
            text,
            joined,
            lines,
            tables,
            era,
        }
    }

    /// Lines containing `label` but not `exclude`, with the text after the
    /// label.
    pub fn labeled<'a>(
        &'a self,
        label: &'a Regex,
        exclude: Option<&'a Regex>,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.lines.iter().filter_map(move |line| {
            if exclude.is_some_and(|re| re.is_match(line)) {
                return None;
            }
            label.find(line).map(|m| (line.as_str(), &line[m.end()..]))
        })
    }

    /// First count following `label` on a matching line.
    pub fn count_after(&self, label: &Regex, exclude: Option<&Regex>) -> Option<u64> {
        self.labeled(label, exclude)
            .find_map(|(_, rest)| counts_in(rest).first().copied())
    }

    /// Counts following `label` on the first matching line carrying at
    /// least `min` of them.
    pub fn counts_after(&self, label: &Regex, exclude: Option<&Regex>, min: usize) -> Option<Vec<u64>> {
        self.labeled(label, exclude)
            .map(|(_, rest)| counts_in(rest))
            .find(|counts| counts.len() >= min)
    }

    /// Table rows whose text contains `label` and not `exclude`.
    pub fn table_rows<'a>(
        &'a self,
        label: &'a Regex,
        exclude: Option<&'a Regex>,
    ) -> impl Iterator<Item = &'a [String]> + 'a {
        self.tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .filter(move |row| {
                let text = row.join(" ");
                label.is_match(&text) && !exclude.is_some_and(|re| re.is_match(&text))
            })
            .map(|row| row.as_slice())
    }
}

/// Counts in the cells of a table row, skipping its label cell.
pub(crate) fn row_counts(row: &[String]) -> Vec<u64> {
    row.iter().skip(1).flat_map(|cell| counts_in(cell)).collect()
}

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rule", rename_all = "lowercase")]
pub enum Source {
    /// Matched by the named rule.
    Rule(&'static str),
    /// Computed from other extracted fields.
    Derived,
}

/// Output of one section extractor.
#[derive(Debug, Clone, Default)]
pub struct SectionOutput<T> {
    pub partial: T,
    pub sources: BTreeMap<String, Source>,
    pub issues: Vec<ExtractionIssue>,
}

impl<T: Default> SectionOutput<T> {
    pub fn new() -> Self {
        Self {
            partial: T::default(),
            sources: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    /// Take a resolved value, recording its rule against `fields`.
    pub fn take<V>(&mut self, resolved: Option<Resolved<V>>, fields: &[&str]) -> Option<V> {
        let resolved = resolved?;
        for field in fields {
            self.sources.insert(field.to_string(), Source::Rule(resolved.rule));
        }
        self.issues.extend(resolved.ambiguity);
        Some(resolved.value)
    }

    pub fn derived(&mut self, field: &str) {
        self.sources.insert(field.to_string(), Source::Derived);
    }
}

/// Merged output of every section extractor.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub record: YearRecord,
    /// Undergraduate out-of-state share, consumed by the reconciler.
    pub out_of_state_share: Option<Decimal>,
    pub sources: BTreeMap<String, Source>,
    pub issues: Vec<ExtractionIssue>,
}

impl Extraction {
    fn absorb<T>(&mut self, output: SectionOutput<T>) -> T {
        self.sources.extend(output.sources);
        self.issues.extend(output.issues);
        output.partial
    }

    /// True when no rule matched anything.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.out_of_state_share.is_none()
    }
}

/// Run all section extractors against a document.
pub fn extract_sections(scan: &ScanContext) -> Extraction {
    let mut extraction = Extraction::default();

    extraction.record.admissions = extraction.absorb(admissions::extract(scan));
    extraction.record.test_scores = extraction.absorb(test_scores::extract(scan));
    let demographics = extraction.absorb(demographics::extract(scan));
    extraction.record.demographics = demographics.demographics;
    extraction.out_of_state_share = demographics.out_of_state_share;
    extraction.record.costs = extraction.absorb(costs::extract(scan));
    extraction.record.financial_aid = extraction.absorb(financial_aid::extract(scan));

    debug!(
        "Extracted {} fields with {} issues",
        extraction.sources.len(),
        extraction.issues.len()
    );
    extraction
}

/// Every rule set, in report order.
pub fn registry() -> Vec<&'static dyn DescribeRules> {
    let mut sets = admissions::rule_sets();
    sets.extend(test_scores::rule_sets());
    sets.extend(demographics::rule_sets());
    sets.extend(costs::rule_sets());
    sets.extend(financial_aid::rule_sets());
    sets
}

/// Flattened registry listing, optionally restricted to fields starting
/// with `prefix`.
pub fn describe_rules(prefix: Option<&str>) -> Vec<RuleInfo> {
    registry()
        .into_iter()
        .flat_map(|set| set.describe())
        .filter(|info| prefix.is_none_or(|p| info.field.starts_with(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_era() {
        assert_eq!(
            detect_era("Total first-time, first-year students who applied in Fall 2023 20,000 22,000"),
            Some(Era::Modern)
        );
        assert_eq!(
            detect_era("Total first-time, first-year (degree-seeking) men who applied 11,200"),
            Some(Era::Legacy)
        );
        assert_eq!(detect_era("Common Data Set"), None);
    }

    #[test]
    fn test_normalize_space_before_comma() {
        assert_eq!(normalize("applied 11 ,200", false), "applied 11,200");
    }

    #[test]
    fn test_split_number_repair_is_opt_in() {
        let text = "men who applied 1 2,345";
        assert_eq!(normalize(text, false), text);
        assert_eq!(normalize(text, true), "men who applied 12,345");
    }

    #[test]
    fn test_count_after_label() {
        let scan = ScanContext::from_text(
            "Total all undergraduates 7,000\nTotal part-time men who enrolled 12\nTotal full-time men who enrolled 900",
            &ExtractionSettings::default(),
        );
        let enrolled = Regex::new(r"men who enrolled").unwrap();
        let part_time = Regex::new(r"part-time").unwrap();
        assert_eq!(scan.count_after(&enrolled, Some(&part_time)), Some(900));
        assert_eq!(scan.count_after(&enrolled, None), Some(12));
    }

    #[test]
    fn test_describe_rules_filters_by_prefix() {
        let rules = describe_rules(Some("costs."));
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r.field.starts_with("costs.")));
        assert!(describe_rules(None).len() > rules.len());
    }

    #[test]
    fn test_document_tables_follow_repair_setting() {
        let document = SourceDocument::from_page_texts(["Nonresidents  1 2,345  1 2,500"]);
        let repaired = ExtractionSettings {
            repair_split_numbers: true,
            ..ExtractionSettings::default()
        };

        let scan = ScanContext::new(&document, &repaired);
        assert_eq!(scan.tables[0].rows[0], vec!["Nonresidents", "12,345", "12,500"]);
        assert!(scan.text.contains("12,345"));

        let scan = ScanContext::new(&document, &ExtractionSettings::default());
        assert_eq!(scan.tables[0].rows[0], vec!["Nonresidents", "1 2,345", "1 2,500"]);
    }

    #[test]
    fn test_blank_text_extracts_nothing() {
        let scan = ScanContext::from_text("Common Data Set 2020-2021", &ExtractionSettings::default());
        assert!(extract_sections(&scan).is_empty());
    }
}
