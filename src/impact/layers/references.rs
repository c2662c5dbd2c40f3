//! Reference layer
//!
//! Finds usages of a symbol in its own file and in every file depending on it, and
//! lifts each usage to the definition that contains it.

use crate::context::State;
use crate::model::Symbol;
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub struct ReferenceImpact {
    pub references: Vec<Symbol>,
    pub affected_files: BTreeSet<String>,
    pub affected_symbols: BTreeSet<Symbol>,
}

pub struct ReferenceLayer<'a> {
    state: &'a State,
}

impl<'a> ReferenceLayer<'a> {
    pub fn new(state: &'a State) -> Self {
        Self { state }
    }

    pub fn analyze(&self, target: &Symbol) -> ReferenceImpact {
        let mut impact = ReferenceImpact::default();
        for reference in self
            .state
            .find_references(&target.name, &target.file_path)
        {
            if reference.file_path != target.file_path {
                impact.affected_files.insert(reference.file_path.clone());
            }
            match self.state.enclosing_scope(
                &reference.file_path,
                reference.line_start,
                reference.line_start,
            ) {
                // A recursive call is not an outside user of the symbol.
                Some(scope) if is_same_definition(scope, target) => {}
                Some(scope) => {
                    impact.affected_symbols.insert(scope.clone());
                }
                None => {
                    impact.affected_symbols.insert(reference.clone());
                }
            }
            impact.references.push(reference);
        }
        tracing::debug!(
            symbol = %target.name,
            references = impact.references.len(),
            files = impact.affected_files.len(),
            "reference layer"
        );
        impact
    }
}

fn is_same_definition(a: &Symbol, b: &Symbol) -> bool {
    a.file_path == b.file_path && a.name == b.name && a.line_start == b.line_start
}
