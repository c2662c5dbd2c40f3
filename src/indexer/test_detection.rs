//! Test file detection
//!
//! Decides whether a file is a test by path conventions, and whether a test file
//! is named after a given source file.

use crate::util;

/// File name shapes that mark a test for the file whose stem is `{}`.
///
/// # Conventions by Language
///
/// ## Python
/// - `test_{}.py`, `{}_test.py`, `{}_tests.py`
///
/// ## JavaScript/TypeScript
/// - `{}.test.*`, `{}.spec.*`
///
/// ## Rust
/// - `{}_test.rs`, `{}_tests.rs`, `test_{}.rs`
///
/// ## Go
/// - `{}_test.go`
///
/// ## Java
/// - `{}Test.java`, `{}Tests.java`, `{}IT.java`, `Test{}.java`
///
/// ## C/C++
/// - `test_{}.c`, `{}_test.cc`, `{}_unittest.cpp`
struct TestNaming {
    extensions: &'static [&'static str],
    prefixes: &'static [&'static str],
    suffixes: &'static [&'static str],
}

static TEST_NAMING: &[TestNaming] = &[
    TestNaming {
        extensions: &["py"],
        prefixes: &["test_"],
        suffixes: &["_test", "_tests"],
    },
    TestNaming {
        extensions: &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"],
        prefixes: &[],
        suffixes: &[".test", ".spec", "_test"],
    },
    TestNaming {
        extensions: &["rs"],
        prefixes: &["test_"],
        suffixes: &["_test", "_tests"],
    },
    TestNaming {
        extensions: &["go"],
        prefixes: &[],
        suffixes: &["_test"],
    },
    TestNaming {
        extensions: &["java"],
        prefixes: &["Test"],
        suffixes: &["Test", "Tests", "IT"],
    },
    TestNaming {
        extensions: &["c", "h", "cc", "cpp", "cxx", "hpp", "hh", "hxx"],
        prefixes: &["test_"],
        suffixes: &["_test", "_tests", "_unittest"],
    },
];

/// Detects if a file path appears to be a test file
pub fn is_test_file(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    let name = util::file_name(&path_lower);
    path_lower.starts_with("tests/")
        || path_lower.starts_with("test/")
        || path_lower.starts_with("__tests__/")
        || path_lower.contains("/test/")
        || path_lower.contains("/tests/")
        || path_lower.contains("/__tests__/")
        || path_lower.contains("/spec/")
        || name.starts_with("test_")
        || name.contains("_test.")
        || name.contains("_tests.")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name == "conftest.py"
        || is_java_test_name(util::file_name(path))
}

/// JUnit class names are case-sensitive: `UserTest.java` but not `Latest.java`.
fn is_java_test_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".java") else {
        return false;
    };
    ["Test", "Tests", "IT"]
        .iter()
        .any(|suffix| stem.len() > suffix.len() && stem.ends_with(suffix))
        || stem
            .strip_prefix("Test")
            .is_some_and(|rest| rest.starts_with(|ch: char| ch.is_ascii_uppercase()))
}

/// True when the name of `test_path` follows its language's convention for tests of
/// `target_path`, e.g. `test_util.py` for `util.py` or `util.spec.ts` for `util.ts`.
pub fn is_named_test_for(test_path: &str, target_path: &str) -> bool {
    if test_path == target_path {
        return false;
    }
    let Some((target_stem, target_ext)) = split_extension(util::file_name(target_path)) else {
        return false;
    };
    let test_name = util::file_name(test_path);
    let Some((test_stem, test_ext)) = split_extension(test_name) else {
        return false;
    };
    let Some(naming) = TEST_NAMING
        .iter()
        .find(|naming| naming.extensions.contains(&test_ext))
    else {
        return false;
    };
    if !naming.extensions.contains(&target_ext) {
        return false;
    }
    naming
        .prefixes
        .iter()
        .any(|prefix| test_stem.strip_prefix(prefix) == Some(target_stem))
        || naming
            .suffixes
            .iter()
            .any(|suffix| test_stem.strip_suffix(suffix) == Some(target_stem))
}

/// Splits `a.test.ts` into (`a.test`, `ts`) and `x.d.ts` into (`x`, `ts`).
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let stem = stem.strip_suffix(".d").unwrap_or(stem);
    Some((stem, ext))
}
