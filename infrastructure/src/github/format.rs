//! Rendering of GitHub API payloads into tool output text.

use serde_json::Value;

/// Maximum number of tree entries rendered by `get_repo_structure`.
pub const MAX_TREE_ENTRIES: usize = 2000;

/// Render a `GET /contents/{dir}` listing, directories first.
pub fn directory_listing(entries: &Value) -> Option<String> {
    let entries = entries.as_array()?;
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
        match entry.get("type").and_then(Value::as_str) {
            Some("dir") => dirs.push(format!("{name}/")),
            _ => {
                let size = entry.get("size").and_then(Value::as_u64).unwrap_or(0);
                files.push(format!("{name} ({size} bytes)"));
            }
        }
    }
    dirs.sort();
    files.sort();
    Some(dirs.into_iter().chain(files).collect::<Vec<_>>().join("\n"))
}

/// Render a recursive `GET /git/trees/{ref}` payload as one path per line.
pub fn repo_tree(tree: &Value, max_entries: usize) -> String {
    let entries = tree
        .get("tree")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut lines: Vec<String> = entries
        .iter()
        .filter_map(|e| {
            let path = e.get("path").and_then(Value::as_str)?;
            Some(match e.get("type").and_then(Value::as_str) {
                Some("tree") => format!("{path}/"),
                _ => path.to_string(),
            })
        })
        .collect();
    lines.sort();

    let total = lines.len();
    let mut output = if total > max_entries {
        lines.truncate(max_entries);
        format!(
            "{}\n[... {} more entries not shown]",
            lines.join("\n"),
            total - max_entries
        )
    } else {
        lines.join("\n")
    };
    if tree.get("truncated").and_then(Value::as_bool) == Some(true) {
        output.push_str("\n[tree truncated by GitHub]");
    }
    output
}

/// Truncate file contents at a char boundary.
pub fn truncate_file(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let end = text.floor_char_boundary(max_bytes);
    format!(
        "{}\n\n[... truncated at {} bytes, total: {} bytes]",
        &text[..end],
        max_bytes,
        text.len()
    )
}
