//! Multi-year aggregation: one document per academic year, folded into a
//! [`SchoolDataset`].

use std::collections::{BTreeMap, BTreeSet};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assemble::{self, Assembled, Assembler, FieldEntry};
use crate::document::load_document;
use crate::error::ExtractionIssue;
use crate::extract::patterns::{YEAR_FULL_RANGE, YEAR_SHORT_END, YEAR_SHORT_RANGE, YEAR_SINGLE};
use crate::extract::{ScanContext, extract_sections};
use crate::models::{CdsConfig, ExtractionSettings, Override, SchoolDataset};

/// Academic-year label for a document file name.
///
/// The explicit `documents` map wins; otherwise the label is inferred from
/// `2016-2017`, `2016_17`, `16-17` or a single starting year `2016`.
pub fn year_label(file_name: &str, documents: &BTreeMap<String, String>) -> Option<String> {
    if let Some(label) = documents.get(file_name) {
        return Some(label.clone());
    }

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    if let Some(caps) = YEAR_FULL_RANGE.captures(stem) {
        return Some(format!("{}-{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = YEAR_SHORT_END.captures(stem) {
        let start: u32 = caps[1].parse().ok()?;
        let end = (start / 100) * 100 + caps[2].parse::<u32>().ok()?;
        return Some(format!("{}-{}", start, end));
    }
    if let Some(caps) = YEAR_SHORT_RANGE.captures(stem) {
        return Some(format!("20{}-20{}", &caps[1], &caps[2]));
    }
    let start: u32 = YEAR_SINGLE.captures(stem)?[1].parse().ok()?;
    Some(format!("{}-{}", start, start + 1))
}

/// One document scheduled for extraction.
///
/// Jobs own everything they need so they can run on any thread.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    pub path: PathBuf,
    pub year: String,
    pub settings: ExtractionSettings,
    pub overrides: Vec<Override>,
}

impl DocumentJob {
    /// Load, extract and assemble the document.
    ///
    /// A panic while handling the document is caught and reported as
    /// [`ExtractionIssue::DocumentUnreadable`] for this document only.
    pub fn run(&self) -> DocumentOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.assemble())).unwrap_or_else(|cause| {
            Err(self.unreadable(format!("extraction panicked: {}", panic_message(&*cause))))
        });
        if let Err(issue) = &result {
            warn!("{}", issue);
        }
        DocumentOutcome {
            path: self.path.clone(),
            year: self.year.clone(),
            result,
        }
    }

    fn unreadable(&self, reason: impl Into<String>) -> ExtractionIssue {
        ExtractionIssue::DocumentUnreadable {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn assemble(&self) -> Result<Assembled, ExtractionIssue> {
        info!("Processing {} ({})", self.path.display(), self.year);

        let document = load_document(&self.path).map_err(|e| self.unreadable(e.to_string()))?;
        if document.is_blank() {
            return Err(self.unreadable("document has no text"));
        }

        let scan = ScanContext::new(&document, &self.settings);
        let extraction = extract_sections(&scan);
        if extraction.is_empty() {
            return Err(self.unreadable("no field matched"));
        }

        Ok(Assembler::new(self.settings.clone())
            .with_overrides(&self.overrides)
            .assemble(extraction))
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    cause
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| cause.downcast_ref::<&str>().copied())
        .unwrap_or("unknown cause")
}

/// Result of running one [`DocumentJob`].
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub year: String,
    pub result: Result<Assembled, ExtractionIssue>,
}

/// Documents to process plus the issues found while planning.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub jobs: Vec<DocumentJob>,
    pub skipped: Vec<ExtractionIssue>,
}

/// Per-year section of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct YearReport {
    pub year: String,
    pub path: PathBuf,
    pub fields: Vec<FieldEntry>,
    pub issues: Vec<ExtractionIssue>,
}

impl YearReport {
    pub fn status_counts(&self) -> [usize; 4] {
        assemble::status_counts(&self.fields)
    }
}

/// Everything one institution run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dataset: SchoolDataset,
    /// Ordered by year label.
    pub years: Vec<YearReport>,
    /// Document-level problems: exclusions aside, every skipped document.
    pub issues: Vec<ExtractionIssue>,
}

impl RunReport {
    /// All issues, document-level first.
    pub fn all_issues(&self) -> impl Iterator<Item = &ExtractionIssue> {
        self.issues
            .iter()
            .chain(self.years.iter().flat_map(|y| y.issues.iter()))
    }
}

/// Builds the dataset of one institution.
pub struct Aggregator<'a> {
    config: &'a CdsConfig,
    slug: String,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a CdsConfig, slug: impl Into<String>) -> Self {
        Self {
            config,
            slug: slug.into(),
        }
    }

    /// Assign year labels to `paths`. Paths are taken in sorted order so the
    /// first document of a duplicated year is deterministic.
    pub fn plan(&self, paths: &[PathBuf]) -> Plan {
        let institution = self.config.institutions.get(&self.slug);
        let empty = BTreeMap::new();
        let documents = institution.map(|i| &i.documents).unwrap_or(&empty);
        let excluded: BTreeSet<&str> = institution
            .map(|i| i.exclude.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let settings = self.config.settings_for(&self.slug);

        let mut sorted = paths.to_vec();
        sorted.sort();

        let mut plan = Plan::default();
        let mut seen = BTreeSet::new();
        for path in sorted {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if excluded.contains(file_name.as_str()) {
                debug!("Excluded {}", path.display());
                continue;
            }

            let Some(year) = year_label(&file_name, documents) else {
                plan.skipped.push(ExtractionIssue::DocumentUnreadable {
                    path,
                    reason: "cannot determine academic year from file name".to_string(),
                });
                continue;
            };
            if !seen.insert(year.clone()) {
                plan.skipped.push(ExtractionIssue::DuplicateYear { path, year });
                continue;
            }

            let overrides = self
                .config
                .overrides_for(&self.slug, &year)
                .cloned()
                .collect();
            plan.jobs.push(DocumentJob {
                path,
                year,
                settings: settings.clone(),
                overrides,
            });
        }

        for issue in &plan.skipped {
            warn!("{}", issue);
        }
        plan
    }

    /// Fold outcomes, in any order, into the dataset and report.
    pub fn collect(&self, skipped: Vec<ExtractionIssue>, mut outcomes: Vec<DocumentOutcome>) -> RunReport {
        outcomes.sort_by(|a, b| a.year.cmp(&b.year));

        let mut dataset = SchoolDataset::new(self.config.display_name(&self.slug), self.slug.clone());
        let mut issues = skipped;
        let mut years = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(assembled) => {
                    if dataset.insert(outcome.year.clone(), assembled.record).is_err() {
                        issues.push(ExtractionIssue::DuplicateYear {
                            path: outcome.path,
                            year: outcome.year,
                        });
                        continue;
                    }
                    years.push(YearReport {
                        year: outcome.year,
                        path: outcome.path,
                        fields: assembled.fields,
                        issues: assembled.issues,
                    });
                }
                Err(issue) => issues.push(issue),
            }
        }

        info!(
            "{}: {} years, {} skipped documents",
            self.slug,
            dataset.years.len(),
            issues.len()
        );
        RunReport {
            dataset,
            years,
            issues,
        }
    }

    /// Plan and run every document on the current thread.
    pub fn run(&self, paths: &[PathBuf]) -> RunReport {
        let plan = self.plan(paths);
        let outcomes = plan.jobs.iter().map(DocumentJob::run).collect();
        self.collect(plan.skipped, outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstitutionConfig;
    use pretty_assertions::assert_eq;

    fn label(name: &str) -> Option<String> {
        year_label(name, &BTreeMap::new())
    }

    #[test]
    fn test_year_label_patterns() {
        assert_eq!(label("CDS_2016-2017.pdf").as_deref(), Some("2016-2017"));
        assert_eq!(label("cds2019_20.pdf").as_deref(), Some("2019-2020"));
        assert_eq!(label("cds-16-17.txt").as_deref(), Some("2016-2017"));
        assert_eq!(label("CDS 2021.pdf").as_deref(), Some("2021-2022"));
        assert_eq!(label("common-data-set.pdf"), None);
    }

    #[test]
    fn test_explicit_documents_map_wins() {
        let mut documents = BTreeMap::new();
        documents.insert("cds-final.pdf".to_string(), "2022-2023".to_string());
        assert_eq!(year_label("cds-final.pdf", &documents).as_deref(), Some("2022-2023"));
    }

    #[test]
    fn test_plan_skips_excluded_and_duplicates() {
        let mut config = CdsConfig::default();
        config.institutions.insert(
            "brown".into(),
            InstitutionConfig {
                exclude: vec!["cds_2018-2019_draft.pdf".into()],
                ..InstitutionConfig::default()
            },
        );
        let paths: Vec<PathBuf> = [
            "src/cds_2019_20.pdf",
            "src/cds_2018-2019_draft.pdf",
            "src/cds_2019-2020.pdf",
            "src/readme.txt",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let plan = Aggregator::new(&config, "brown").plan(&paths);
        let jobs: Vec<_> = plan.jobs.iter().map(|j| (j.path.clone(), j.year.as_str())).collect();
        assert_eq!(jobs, vec![(PathBuf::from("src/cds_2019-2020.pdf"), "2019-2020")]);
        assert_eq!(plan.skipped.len(), 2);
        assert!(matches!(plan.skipped[0], ExtractionIssue::DuplicateYear { .. }));
        assert!(matches!(plan.skipped[1], ExtractionIssue::DocumentUnreadable { .. }));
    }

    #[test]
    fn test_blank_document_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cds_2020-2021.txt");
        std::fs::write(&path, "Common Data Set 2020-2021\n\x0c\n").unwrap();

        let config = CdsConfig::default();
        let report = Aggregator::new(&config, "brown").run(&[path]);
        assert!(report.dataset.years.is_empty());
        assert!(matches!(report.issues[0], ExtractionIssue::DocumentUnreadable { .. }));
    }
}
