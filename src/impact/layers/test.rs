//! Test impact layer
//!
//! A test file is linked to a source file when its name follows the language's test
//! naming convention for that file (`test_util.py`, `util_test.go`, `util.spec.ts`), or
//! when it imports the source file.

use crate::context::State;
use crate::indexer::test_detection::is_named_test_for;
use std::collections::BTreeSet;

pub struct TestImpactLayer<'a> {
    state: &'a State,
}

impl<'a> TestImpactLayer<'a> {
    pub fn new(state: &'a State) -> Self {
        Self { state }
    }

    /// Test files linked to any of `files`. Files in `files` that are tests
    /// themselves are included.
    pub fn analyze<'f, I>(&self, files: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'f str>,
    {
        let files: Vec<&str> = files.into_iter().collect();
        let tests: Vec<&str> = self
            .state
            .files()
            .filter(|(_, file)| file.is_test)
            .map(|(path, _)| path)
            .collect();

        let mut found = BTreeSet::new();
        for source in &files {
            if tests.contains(source) {
                found.insert(source.to_string());
                continue;
            }
            for test in &tests {
                if is_named_test_for(test, source)
                    || self.state.graph().dependencies(test).contains(source)
                {
                    found.insert(test.to_string());
                }
            }
        }
        found
    }
}
