//! Unified diff parsing
//!
//! Turns the hunks of a unified diff into [`Edit`]s. Line numbers address the new side
//! of each hunk; `before`/`after` carry the hunk body including context lines.

use crate::impact::types::{Edit, EditType};

#[derive(Debug, Default)]
struct Hunk {
    new_start: usize,
    old_left: usize,
    new_left: usize,
    before: Vec<String>,
    after: Vec<String>,
    changed: bool,
}

impl Hunk {
    fn is_open(&self) -> bool {
        self.old_left > 0 || self.new_left > 0
    }

    fn into_edit(self, path: &str) -> Option<Edit> {
        if !self.changed {
            return None;
        }
        let edit_type = match (self.before.is_empty(), self.after.is_empty()) {
            (false, false) => EditType::Modify,
            (false, true) => EditType::Delete,
            _ => EditType::Add,
        };
        let line_start = self.new_start.max(1);
        let line_end = if self.after.is_empty() {
            line_start
        } else {
            line_start + self.after.len() - 1
        };
        Some(Edit {
            file_path: path.to_string(),
            line_start,
            line_end,
            before: self.before.join("\n"),
            after: self.after.join("\n"),
            edit_type,
        })
    }
}

/// Edits for `path` found in `diff_text`. When the diff carries file headers only the
/// sections for `path` are used; a bare list of hunks is taken as is.
pub fn parse_unified_diff(path: &str, diff_text: &str) -> Vec<Edit> {
    let has_headers = diff_text.lines().any(|line| line.starts_with("+++ "));
    let mut edits = Vec::new();
    let mut in_target = !has_headers;
    let mut hunk: Option<Hunk> = None;

    for line in diff_text.lines() {
        if let Some(current) = hunk.as_mut().filter(|h| h.is_open()) {
            if let Some(removed) = line.strip_prefix('-') {
                current.before.push(removed.to_string());
                current.old_left = current.old_left.saturating_sub(1);
                current.changed = true;
            } else if let Some(added) = line.strip_prefix('+') {
                current.after.push(added.to_string());
                current.new_left = current.new_left.saturating_sub(1);
                current.changed = true;
            } else if line.starts_with('\\') {
                // "\ No newline at end of file"
            } else {
                // Some tools strip the single space of empty context lines.
                let context = line.strip_prefix(' ').unwrap_or(line);
                current.before.push(context.to_string());
                current.after.push(context.to_string());
                current.old_left = current.old_left.saturating_sub(1);
                current.new_left = current.new_left.saturating_sub(1);
            }
            continue;
        }
        if let Some(done) = hunk.take() {
            edits.extend(done.into_edit(path));
        }
        if let Some(header) = line.strip_prefix("+++ ") {
            in_target = header_matches(header, path);
        } else if line.starts_with("@@")
            && in_target
            && let Some((old_count, new_start, new_count)) = parse_hunk_header(line)
        {
            hunk = Some(Hunk {
                new_start,
                old_left: old_count,
                new_left: new_count,
                ..Default::default()
            });
        }
    }
    if let Some(done) = hunk.take() {
        edits.extend(done.into_edit(path));
    }
    edits
}

/// `(old_count, new_start, new_count)` of `@@ -a,b +c,d @@`; omitted counts are 1.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize)> {
    let body = line.strip_prefix("@@")?;
    let end = body.find("@@")?;
    let mut parts = body[..end].split_whitespace();
    let (_, old_count) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(parts.next()?.strip_prefix('+')?)?;
    Some((old_count, new_start, new_count))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

fn header_matches(header: &str, path: &str) -> bool {
    let name = header.split('\t').next().unwrap_or(header).trim();
    if name == "/dev/null" {
        return false;
    }
    let name = name
        .strip_prefix("b/")
        .or_else(|| name.strip_prefix("a/"))
        .unwrap_or(name);
    let path = path.trim_start_matches("./");
    name == path || name.ends_with(&format!("/{path}")) || path.ends_with(&format!("/{name}"))
}
