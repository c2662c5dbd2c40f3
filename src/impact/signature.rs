//! Signature comparison
//!
//! Signatures are stored as `(params)` or `(params) -> ret`, whatever the language. This
//! module splits them into parameters and a return type and reports how two of them
//! differ. It is text-level: `x: int` and `x:int` compare equal, aliases do not.

use crate::impact::types::ChangeType;
use crate::util;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSignature {
    pub params: Vec<Param>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDelta {
    pub change: ChangeType,
    pub description: String,
}

pub fn parse_signature(signature: &str) -> ParsedSignature {
    let signature = util::squash_whitespace(signature);
    let Some(close) = matching_paren(&signature) else {
        return ParsedSignature::default();
    };
    let inner = &signature[1..close];
    let params = split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_param)
        .collect();
    let rest = signature[close + 1..].trim();
    let return_type = rest
        .strip_prefix("->")
        .or_else(|| rest.strip_prefix(':'))
        .map(|ret| normalize_type(ret.trim()))
        .filter(|ret| !ret.is_empty());
    ParsedSignature {
        params,
        return_type,
    }
}

/// First difference between two signatures, most specific kind first: parameter
/// count, then parameter types by position, then return type, then any other text.
pub fn compare_signatures(before: &str, after: &str) -> Option<SignatureDelta> {
    if normalize_type(before) == normalize_type(after) {
        return None;
    }
    let old = parse_signature(before);
    let new = parse_signature(after);

    if old.params.len() != new.params.len() {
        return Some(SignatureDelta {
            change: ChangeType::ParameterCount,
            description: format!(
                "parameter count changed from {} to {}",
                old.params.len(),
                new.params.len()
            ),
        });
    }
    for (idx, (a, b)) in old.params.iter().zip(&new.params).enumerate() {
        if a.ty != b.ty {
            return Some(SignatureDelta {
                change: ChangeType::ParameterType,
                description: format!(
                    "parameter {} ({}) type changed from {} to {}",
                    idx + 1,
                    b.name,
                    a.ty.as_deref().unwrap_or("untyped"),
                    b.ty.as_deref().unwrap_or("untyped")
                ),
            });
        }
    }
    if old.return_type != new.return_type {
        return Some(SignatureDelta {
            change: ChangeType::ReturnType,
            description: format!(
                "return type changed from {} to {}",
                old.return_type.as_deref().unwrap_or("none"),
                new.return_type.as_deref().unwrap_or("none")
            ),
        });
    }
    Some(SignatureDelta {
        change: ChangeType::Signature,
        description: format!("signature changed from {before} to {after}"),
    })
}

fn parse_param(raw: &str) -> Param {
    // Defaults do not change the interface shape: drop them.
    let without_default = split_top_level(raw, '=')
        .first()
        .map(|part| part.trim())
        .unwrap_or(raw);
    if let Some((name, ty)) = split_once_top_level(without_default, ':') {
        return Param {
            name: name.trim().trim_start_matches(['*', '&']).to_string(),
            ty: Some(normalize_type(ty.trim())).filter(|ty| !ty.is_empty()),
        };
    }
    // Go style `name type`; a lone word is just a name.
    match without_default.split_once(' ') {
        Some((name, ty)) if !name.ends_with(',') && !is_modifier(name) => Param {
            name: name.to_string(),
            ty: Some(normalize_type(ty.trim())),
        },
        _ => Param {
            name: without_default.trim_start_matches(['*', '&']).to_string(),
            ty: None,
        },
    }
}

fn is_modifier(word: &str) -> bool {
    matches!(
        word,
        "mut" | "&mut" | "public" | "private" | "protected" | "readonly" | "..."
    )
}

fn normalize_type(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}

fn matching_paren(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => {
                if ch == '>' && (text[..idx].ends_with('-') || text[..idx].ends_with('=')) {
                    continue;
                }
                depth = depth.saturating_sub(1);
                if depth == 0 && ch == ')' {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut quote: Option<char> = None;
    for (idx, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' | '<' => depth += 1,
            '>' if text[..idx].ends_with('-') || text[..idx].ends_with('=') => {}
            ')' | ']' | '}' | '>' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                // `==`, `=>`, `::` are not separators.
                let next = text[idx + ch.len_utf8()..].chars().next();
                let prev = text[..idx].chars().next_back();
                let doubled = next == Some(sep) || prev == Some(sep) || (sep == '=' && next == Some('>'));
                if !doubled {
                    parts.push(&text[start..idx]);
                    start = idx + ch.len_utf8();
                }
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_once_top_level(text: &str, sep: char) -> Option<(&str, &str)> {
    let parts = split_top_level(text, sep);
    if parts.len() < 2 {
        return None;
    }
    let head = parts[0];
    Some((head, &text[head.len() + sep.len_utf8()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_across_languages() {
        let py = parse_signature("(self, x: int, y: Dict[str, int] = {}) -> bool");
        assert_eq!(py.params.len(), 3);
        assert_eq!(py.params[2].ty.as_deref(), Some("Dict[str,int]"));
        assert_eq!(py.return_type.as_deref(), Some("bool"));

        let rs = parse_signature("(&mut self, map: HashMap<String, usize>) -> Option<&str>");
        assert_eq!(rs.params.len(), 2);
        assert_eq!(rs.params[1].name, "map");
        assert_eq!(rs.return_type.as_deref(), Some("Option<&str>"));

        let go = parse_signature("(ctx context.Context, id int) -> (string, error)");
        assert_eq!(go.params[0].ty.as_deref(), Some("context.Context"));
        assert_eq!(go.return_type.as_deref(), Some("(string,error)"));

        let js = parse_signature("(a, b = () => 1)");
        assert_eq!(js.params.len(), 2);
        assert_eq!(js.params[1].name, "b");
        assert!(js.return_type.is_none());

        assert!(parse_signature("").params.is_empty());
        assert!(parse_signature("()").params.is_empty());
    }

    #[test]
    fn compare_reports_most_specific_change() {
        assert_eq!(compare_signatures("(x)", "( x )"), None);
        let count = compare_signatures("(x)", "(x, y)").unwrap();
        assert_eq!(count.change, ChangeType::ParameterCount);
        assert_eq!(count.description, "parameter count changed from 1 to 2");
        let ty = compare_signatures("(x: int)", "(x: str)").unwrap();
        assert_eq!(ty.change, ChangeType::ParameterType);
        let ret = compare_signatures("(x) -> int", "(x) -> str").unwrap();
        assert_eq!(ret.change, ChangeType::ReturnType);
        let renamed = compare_signatures("(x)", "(y)").unwrap();
        assert_eq!(renamed.change, ChangeType::Signature);
    }
}
