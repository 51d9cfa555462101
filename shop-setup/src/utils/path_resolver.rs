use anyhow::Result;
use std::path::PathBuf;

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> Result<PathBuf> {
    // Prefer the folder where the executable lives (works in dev and deployed)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return Ok(dir.to_path_buf());
        }
    }

    // Fallback: current working directory
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    Ok(cwd)
}

/// Join path fragments into one canonical path.
///
/// Pure string work, no filesystem access:
/// - `\` is treated as a separator and output uses `/`
/// - empty fragments, duplicate separators and `.` segments are dropped
/// - `..` removes the previous segment where there is one
/// - trailing separators on any fragment make no difference
pub fn join_paths<I, S>(parts: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = String::new();
    let mut segments: Vec<String> = Vec::new();
    let mut first = true;

    for part in parts {
        let normalized = part.as_ref().replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }

        if first {
            root = root_prefix(&normalized);
            first = false;
        }

        let rest = normalized.strip_prefix(root.as_str()).unwrap_or(&normalized);
        for seg in rest.split('/') {
            match seg {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(last) if last != ".." => {
                        segments.pop();
                    }
                    // Cannot climb above a root
                    _ if !root.is_empty() => {}
                    _ => segments.push("..".to_string()),
                },
                other => segments.push(other.to_string()),
            }
        }
    }

    let joined = segments.join("/");
    if root.is_empty() {
        PathBuf::from(joined)
    } else {
        PathBuf::from(format!("{}{}", root, joined))
    }
}

// "/" for absolute unix paths, "C:/" for drive-rooted paths, "" otherwise.
fn root_prefix(path: &str) -> String {
    if path.starts_with('/') {
        return "/".to_string();
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() >= 3 && bytes[2] == b'/' {
            return path[..3].to_string();
        }
        return format!("{}/", &path[..2]);
    }
    String::new()
}
