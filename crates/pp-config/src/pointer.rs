//! JSON-pointer helpers (RFC 6901) over merged config trees.

use serde_json::Value;

/// Every scalar leaf of `root` with its pointer. Empty objects and arrays
/// contribute nothing; a scalar root is reported as `/`.
pub(crate) fn leaves(root: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    walk(root, String::new(), &mut out);
    out
}

fn walk<'v>(node: &'v Value, at: String, out: &mut Vec<(String, &'v Value)>) {
    match node {
        Value::Object(map) => {
            for (name, child) in map {
                walk(child, format!("{at}/{}", escape(name)), out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                walk(child, format!("{at}/{idx}"), out);
            }
        }
        scalar => {
            let at = if at.is_empty() { "/".to_string() } else { at };
            out.push((at, scalar));
        }
    }
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Leading slash enforced, trailing slashes dropped. Blank input is the root.
pub(crate) fn normalize(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `/a/b` covers `/a/b` and `/a/b/c` but not `/a/bc`. `/` covers everything.
pub(crate) fn covers(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match leaf.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn covers_respects_segment_boundary() {
        assert!(covers("/stores/document", "/stores/document/kind"));
        assert!(covers("/stores/document", "/stores/document"));
        assert!(!covers("/stores/document", "/stores/documents/kind"));
        assert!(covers("/", "/anything"));
    }

    #[test]
    fn normalize_adds_slash_and_trims() {
        assert_eq!(normalize("sync/dry_run/"), "/sync/dry_run");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn leaves_escape_tokens_and_index_arrays() {
        let v = json!({"a/b": {"c~d": 1}, "list": ["x", "y"], "empty": {}});
        let got: Vec<String> = leaves(&v).into_iter().map(|(p, _)| p).collect();
        assert_eq!(got, vec!["/a~1b/c~0d", "/list/0", "/list/1"]);
    }
}
