//! Pure crontab text transforms.
//!
//! Cron has no named-job concept, so every entry offtimer owns is
//! preceded by a `# <taskName>` marker line; the entry itself is the line
//! immediately following its marker. All functions here take the whole
//! table and return the rewritten whole table.

/// Append a marker + entry block to the table.
pub fn append_block(table: &str, marker: &str, entry: &str) -> String {
    let mut out = table.trim_end().to_string();
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(marker);
    out.push('\n');
    out.push_str(entry);
    out.push('\n');
    out
}

/// Remove the marker line for `task_name` and the entry after it.
pub fn remove_block(table: &str, task_name: &str) -> String {
    let marker = format!("# {task_name}");
    let lines: Vec<&str> = table.lines().collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim() == marker {
            // Skip the marker and its entry line
            i += 2;
            continue;
        }
        out.push(lines[i]);
        i += 1;
    }

    rejoin(&out)
}

/// Comment out (disable) or uncomment (enable) the entry following the
/// `task_name` marker, leaving every other line untouched. Returns `None`
/// when the marker is not present in the table.
pub fn set_entry_enabled(table: &str, task_name: &str, enabled: bool) -> Option<String> {
    let marker = format!("# {task_name}");
    let mut lines: Vec<String> = table.lines().map(String::from).collect();
    let mut found = false;

    for i in 0..lines.len() {
        if lines[i].trim() != marker {
            continue;
        }
        found = true;
        if i + 1 >= lines.len() {
            continue;
        }
        let entry = lines[i + 1].clone();
        if enabled {
            if let Some(stripped) = entry.strip_prefix('#') {
                lines[i + 1] = stripped.trim_start().to_string();
            }
        } else if !entry.starts_with('#') {
            lines[i + 1] = format!("# {entry}");
        }
    }

    if !found {
        return None;
    }
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    Some(rejoin(&refs))
}

/// Drop every marker + entry pair whose marker name starts with `prefix`.
/// Used by the bulk clear so one rewrite removes all owned entries.
pub fn purge_prefix(table: &str, prefix: &str) -> String {
    let marker_prefix = format!("# {prefix}");
    let lines: Vec<&str> = table.lines().collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().starts_with(&marker_prefix) {
            i += 2;
            continue;
        }
        out.push(lines[i]);
        i += 1;
    }

    rejoin(&out)
}

fn rejoin(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
