//! Edit impact analysis
//!
//! Answers "what breaks if I make this edit?" for one symbol or for a set of edits to
//! one file. The answer is assembled from independent layers:
//! - References: usages of the edited symbol in its file and its dependents
//! - Tests: test files tied to the edited and affected files
//! - Interface: signature, kind and presence changes of the edited definitions
//!
//! plus the chain of transitive dependents of the edited file.

pub mod diff;
pub mod layers;
pub mod signature;
pub mod types;

pub use diff::parse_unified_diff;
pub use layers::{InterfaceLayer, ReferenceLayer, TestImpactLayer};
pub use types::{ChangeType, Edit, EditType, ImpactReport, InterfaceChange, RiskLevel};

use crate::config::EngineConfig;
use crate::context::ContextManager;
use crate::error::{EngineError, EngineResult};
use crate::model::{Symbol, SymbolKind};
use std::collections::BTreeSet;
use std::time::Instant;

pub struct ImpactAnalyzer<'a> {
    manager: &'a ContextManager,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(manager: &'a ContextManager) -> Self {
        Self { manager }
    }

    fn config(&self) -> &EngineConfig {
        self.manager.config()
    }

    /// Impact of applying `edit` to the file defining `target`.
    pub fn compute_impact(&self, target: &Symbol, edit: &Edit) -> ImpactReport {
        self.analyze(
            &target.file_path,
            std::slice::from_ref(edit),
            std::slice::from_ref(target),
        )
    }

    /// Impact of `edits` to `path`, over every indexed symbol the edits touch.
    pub fn analyze_edit_impact(&self, path: &str, edits: &[Edit]) -> ImpactReport {
        let touched: Vec<Symbol> = self
            .manager
            .symbols_in_file(path)
            .into_iter()
            .filter(|symbol| symbol.kind != SymbolKind::Import)
            .filter(|symbol| edits.iter().any(|edit| edit.overlaps(symbol)))
            .collect();
        self.analyze(path, edits, &touched)
    }

    /// Impact of `edits` on the definition called `name` in `path`.
    pub fn impact_for_name(&self, path: &str, name: &str, edits: &[Edit]) -> EngineResult<ImpactReport> {
        let target = self
            .manager
            .symbols_in_file(path)
            .into_iter()
            .filter(|symbol| symbol.name == name && symbol.kind != SymbolKind::Import)
            .min_by_key(|symbol| symbol.line_start)
            .ok_or_else(|| EngineError::UnknownSymbol {
                name: name.to_string(),
                path: path.to_string(),
            })?;
        Ok(self.analyze(&target.file_path, edits, std::slice::from_ref(&target)))
    }

    /// Interface changes `edits` cause in `path`, read through the manager's provider.
    pub fn interface_changes(
        &self,
        path: &str,
        edits: &[Edit],
        focus: &[Symbol],
    ) -> EngineResult<Vec<InterfaceChange>> {
        let content = self
            .manager
            .provider()
            .read(path)
            .map_err(|source| EngineError::Io {
                path: path.to_string(),
                source,
            })?;
        let old = self.manager.symbols_in_file(path);
        InterfaceLayer::new(self.manager.registry()).analyze(path, &content, edits, &old, focus)
    }

    fn analyze(&self, path: &str, edits: &[Edit], targets: &[Symbol]) -> ImpactReport {
        let started = Instant::now();
        let mut report = ImpactReport::default();

        self.manager.with_state(|state| {
            let layer = ReferenceLayer::new(state);
            for target in targets {
                let impact = layer.analyze(target);
                report.affected_files.extend(impact.affected_files);
                report.affected_symbols.extend(impact.affected_symbols);
                for reference in impact.references {
                    if !report.references.contains(&reference) {
                        report.references.push(reference);
                    }
                }
            }

            let mut covered: BTreeSet<&str> = BTreeSet::from([path]);
            covered.extend(report.affected_files.iter().map(String::as_str));
            report.affected_tests = TestImpactLayer::new(state).analyze(covered);

            report.dependency_chain = state
                .graph()
                .transitive_dependents(path, self.config().impact_chain_depth);
        });

        match self.interface_changes(path, edits, targets) {
            Ok(changes) => report.interface_changes = changes,
            // Nothing to compare in a file no language claims.
            Err(EngineError::UnsupportedLanguage { .. }) => {}
            Err(err) => {
                tracing::warn!(file = %path, error = %err, "interface layer skipped");
                report.interface_skipped = Some(err.to_string());
            }
        }

        report.risk_level = self.assess_risk(&report);
        report.recommendations = self.recommendations(&report);
        tracing::info!(
            file = %path,
            targets = targets.len(),
            affected_files = report.affected_files.len(),
            interface_changes = report.interface_changes.len(),
            risk = %report.risk_level,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "impact analysis finished"
        );
        report
    }

    fn assess_risk(&self, report: &ImpactReport) -> RiskLevel {
        if !report.interface_changes.is_empty()
            || report.affected_files.len() > self.config().impact_file_threshold
        {
            RiskLevel::High
        } else if !report.affected_files.is_empty() || report.interface_skipped.is_some() {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn recommendations(&self, report: &ImpactReport) -> Vec<String> {
        let mut recommendations = Vec::new();
        if !report.interface_changes.is_empty() {
            recommendations.push(format!(
                "{} interface change(s) detected: check all call sites and update dependent code",
                report.interface_changes.len()
            ));
        }
        if let Some(reason) = &report.interface_skipped {
            recommendations.push(format!(
                "Interface check skipped ({reason}): compare the edited signatures by hand"
            ));
        }
        if !report.affected_tests.is_empty() {
            recommendations.push(format!(
                "{} related test file(s) found: run them to confirm behaviour is unchanged",
                report.affected_tests.len()
            ));
        }
        if report.affected_files.len() > self.config().impact_file_threshold {
            recommendations.push(format!(
                "The edit affects {} files: test incrementally",
                report.affected_files.len()
            ));
        }
        if report.references.len() > self.config().review_reference_threshold {
            recommendations.push(format!(
                "{} references to the edited symbols: ask for a code review",
                report.references.len()
            ));
        }
        if recommendations.is_empty() {
            recommendations.push("The impact of this edit is small: basic testing is enough".to_string());
        }
        recommendations
    }
}
