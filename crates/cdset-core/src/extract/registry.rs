//! Field pattern registry.
//!
//! Each field owns an ordered list of candidate rules. Resolution walks the
//! rules by ascending rank; within a rank every applicable rule is tried and
//! the first rank producing any value wins. Lower-priority ranks are never
//! evaluated once a value is found, whatever their position in the list.

use std::fmt::Debug;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::{Era, ScanContext};
use crate::error::ExtractionIssue;

/// Document eras a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEra {
    Any,
    Legacy,
    Modern,
}

impl RuleEra {
    /// Whether the rule runs for a document of `era`. Documents of unknown
    /// era run every rule.
    pub fn applies(&self, era: Option<Era>) -> bool {
        match (self, era) {
            (RuleEra::Any, _) | (_, None) => true,
            (RuleEra::Legacy, Some(Era::Legacy)) | (RuleEra::Modern, Some(Era::Modern)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleEra::Any => "any",
            RuleEra::Legacy => "legacy",
            RuleEra::Modern => "modern",
        }
    }
}

/// One candidate extraction rule.
pub struct Rule<T> {
    pub name: &'static str,
    pub era: RuleEra,
    /// Lower ranks are tried first.
    pub rank: u8,
    pub matcher: fn(&ScanContext) -> Option<T>,
}

/// The candidate rules for one field.
pub struct RuleSet<T: 'static> {
    pub field: &'static str,
    pub rules: &'static [Rule<T>],
}

/// A value chosen by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub rule: &'static str,
    /// Set when same-rank rules disagreed.
    pub ambiguity: Option<ExtractionIssue>,
}

impl<T: PartialEq + Debug> RuleSet<T> {
    /// Resolve the field against a document.
    pub fn resolve(&self, scan: &ScanContext) -> Option<Resolved<T>> {
        let mut ranks: Vec<u8> = self.rules.iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        ranks.dedup();

        for rank in ranks {
            let mut hits = self
                .rules
                .iter()
                .filter(|r| r.rank == rank && r.era.applies(scan.era))
                .filter_map(|r| {
                    let value = (r.matcher)(scan);
                    trace!("{} rule {} -> {:?}", self.field, r.name, value);
                    value.map(|v| (r.name, v))
                })
                .collect::<Vec<_>>()
                .into_iter();

            let Some((rule, value)) = hits.next() else {
                continue;
            };
            let others: Vec<_> = hits.collect();

            let ambiguity = if others.iter().any(|(_, v)| *v != value) {
                let candidates = std::iter::once((rule, &value))
                    .chain(others.iter().map(|(name, v)| (*name, v)))
                    .map(|(name, v)| format!("{}={:?}", name, v))
                    .collect();
                warn!("{}: same-rank rules disagree, keeping {}", self.field, rule);
                Some(ExtractionIssue::AmbiguousMatch {
                    field: self.field.to_string(),
                    candidates,
                    kept: rule.to_string(),
                })
            } else {
                None
            };

            debug!("{} resolved by {} (rank {})", self.field, rule, rank);
            return Some(Resolved {
                value,
                rule,
                ambiguity,
            });
        }

        debug!("{} unresolved", self.field);
        None
    }
}

/// Registry listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub field: &'static str,
    pub rank: u8,
    pub era: RuleEra,
    pub rule: &'static str,
}

/// Rule sets that can list their candidates.
pub trait DescribeRules: Sync {
    fn describe(&self) -> Vec<RuleInfo>;
}

impl<T: 'static> DescribeRules for RuleSet<T> {
    fn describe(&self) -> Vec<RuleInfo> {
        let mut infos: Vec<RuleInfo> = self
            .rules
            .iter()
            .map(|r| RuleInfo {
                field: self.field,
                rank: r.rank,
                era: r.era,
                rule: r.name,
            })
            .collect();
        infos.sort_by_key(|info| info.rank);
        infos
    }
}
