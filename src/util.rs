use std::path::{Component, Path};

/// Project-relative, `/`-separated form used as the key for every per-file index.
pub fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => {
                if matches!(parts.last(), Some(last) if last != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Strips `repo_root` when `path` is absolute and inside it; relative paths are
/// normalized as given.
pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> String {
    match path.strip_prefix(repo_root) {
        Ok(rel) => normalize_path(rel),
        Err(_) => normalize_path(path),
    }
}

/// Joins `rel` onto the directory part of a normalized path.
pub fn join_rel(dir: &str, rel: &str) -> String {
    if dir.is_empty() || dir == "." {
        normalize_path(Path::new(rel))
    } else {
        normalize_path(&Path::new(dir).join(rel))
    }
}

/// Directory of a normalized path, `""` at the root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// File name without its last extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

pub fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    if content.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    let start = start_line.max(1) - 1;
    if start >= lines.len() {
        return String::new();
    }
    let end = end_line.max(start_line).min(lines.len());
    lines[start..end].join("\n")
}

pub fn line_count(source: &str) -> usize {
    if source.is_empty() {
        return 0;
    }
    source.lines().count()
}

pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Collapses runs of whitespace so signatures spanning several lines compare equal.
pub fn squash_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize_path(Path::new("./pkg/../a.py")), "a.py");
        assert_eq!(normalize_path(Path::new("../x/y.rs")), "../x/y.rs");
        assert_eq!(normalize_path(Path::new("")), ".");
    }

    #[test]
    fn rel_path_strips_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(
            normalize_rel_path(&root, Path::new("/repo/src/lib.rs")),
            "src/lib.rs"
        );
        assert_eq!(normalize_rel_path(&root, Path::new("src/lib.rs")), "src/lib.rs");
    }

    #[test]
    fn path_pieces() {
        assert_eq!(join_rel("pkg", "../util.py"), "util.py");
        assert_eq!(join_rel("", "a/b.py"), "a/b.py");
        assert_eq!(parent_dir("a/b/c.py"), "a/b");
        assert_eq!(parent_dir("c.py"), "");
        assert_eq!(file_stem("a/b/c.test.ts"), "c.test");
        assert_eq!(file_stem(".env"), ".env");
    }

    #[test]
    fn slices_are_clamped() {
        let src = "one\ntwo\nthree";
        assert_eq!(slice_lines(src, 2, 9), "two\nthree");
        assert_eq!(slice_lines(src, 5, 6), "");
        assert_eq!(line_count(src), 3);
        assert_eq!(squash_whitespace("(a,\n    b)"), "(a, b)");
    }
}
