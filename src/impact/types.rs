//! Type definitions for impact analysis

use crate::model::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lists in the plain-text report stop after this many entries.
const REPORT_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    Modify,
    Add,
    Delete,
}

impl EditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditType::Modify => "modify",
            EditType::Add => "add",
            EditType::Delete => "delete",
        }
    }
}

/// A change to a line range of one file. `line_start..=line_end` addresses the current
/// content; `before` is the text being replaced and `after` its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub before: String,
    pub after: String,
    pub edit_type: EditType,
}

impl Edit {
    pub fn modify(
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            before: before.into(),
            after: after.into(),
            edit_type: EditType::Modify,
        }
    }

    /// Replaces the whole of `before` with `after`.
    pub fn whole_file(file_path: impl Into<String>, before: &str, after: &str) -> Self {
        let lines = before.lines().count().max(1);
        Self::modify(file_path, 1, lines, before, after)
    }

    pub fn overlaps(&self, symbol: &Symbol) -> bool {
        symbol.overlaps(self.line_start, self.line_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Signature,
    ParameterCount,
    ParameterType,
    ReturnType,
    Kind,
    Removed,
    Added,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Signature => "signature",
            ChangeType::ParameterCount => "parameter_count",
            ChangeType::ParameterType => "parameter_type",
            ChangeType::ReturnType => "return_type",
            ChangeType::Kind => "kind",
            ChangeType::Removed => "removed",
            ChangeType::Added => "added",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceChange {
    pub symbol_name: String,
    pub change: ChangeType,
    pub file_path: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub affected_files: BTreeSet<String>,
    pub affected_symbols: BTreeSet<Symbol>,
    pub affected_tests: BTreeSet<String>,
    pub interface_changes: Vec<InterfaceChange>,
    /// Why the interface layer could not run. `interface_changes` is then unknown, not
    /// empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_skipped: Option<String>,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub references: Vec<Symbol>,
    pub dependency_chain: Vec<String>,
}

impl ImpactReport {
    /// Folds `other` into `self`. Risk and recommendations are left for the caller to
    /// recompute over the merged sets.
    pub fn merge(&mut self, other: ImpactReport) {
        self.affected_files.extend(other.affected_files);
        self.affected_symbols.extend(other.affected_symbols);
        self.affected_tests.extend(other.affected_tests);
        for change in other.interface_changes {
            if !self.interface_changes.contains(&change) {
                self.interface_changes.push(change);
            }
        }
        if self.interface_skipped.is_none() {
            self.interface_skipped = other.interface_skipped;
        }
        for reference in other.references {
            if !self.references.contains(&reference) {
                self.references.push(reference);
            }
        }
        for file in other.dependency_chain {
            if !self.dependency_chain.contains(&file) {
                self.dependency_chain.push(file);
            }
        }
    }
}

impl fmt::Display for ImpactReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "Edit impact report")?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        writeln!(f, "Risk level: {}", self.risk_level.as_str().to_uppercase())?;

        write_section(f, "Affected files", self.affected_files.iter(), "files", |f, path| {
            writeln!(f, "  - {path}")
        })?;
        write_section(f, "Affected symbols", self.affected_symbols.iter(), "symbols", |f, s| {
            writeln!(
                f,
                "  - {} {} ({}:{})",
                s.kind,
                s.name,
                crate::util::file_name(&s.file_path),
                s.line_start
            )
        })?;
        write_section(f, "Affected tests", self.affected_tests.iter(), "test files", |f, path| {
            writeln!(f, "  - {path}")
        })?;
        write_section(
            f,
            "Interface changes",
            self.interface_changes.iter(),
            "interface changes",
            |f, change| {
                writeln!(f, "  - {}: {}", change.symbol_name, change.change)?;
                if !change.description.is_empty() {
                    writeln!(f, "    {}", change.description)?;
                }
                Ok(())
            },
        )?;
        if let Some(reason) = &self.interface_skipped {
            writeln!(f)?;
            writeln!(f, "Interface check skipped: {reason}")?;
        }

        if !self.recommendations.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recommendations:")?;
            for (idx, recommendation) in self.recommendations.iter().enumerate() {
                writeln!(f, "  {}. {recommendation}", idx + 1)?;
            }
        }
        writeln!(f)?;
        write!(f, "{rule}")
    }
}

fn write_section<'a, T: 'a, I, W>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    items: I,
    noun: &str,
    mut write_item: W,
) -> fmt::Result
where
    I: ExactSizeIterator<Item = &'a T>,
    W: FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
{
    let total = items.len();
    if total == 0 {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{title} ({total}):")?;
    for item in items.take(REPORT_LIST_LIMIT) {
        write_item(f, item)?;
    }
    if total > REPORT_LIST_LIMIT {
        writeln!(f, "  ... and {} more {noun}", total - REPORT_LIST_LIMIT)?;
    }
    Ok(())
}
