// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-context expansion: resolve a client-supplied `bridge_files` list
//! and/or trailing `[BRIDGE_FILES]` block into a `[FILE_CONTEXT]` section
//! appended to the rendered prompt.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BridgeError, ErrorCode};

/// A single requested file, from the structured `bridge_files` array or a
/// parsed `[BRIDGE_FILES]` block line.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeFileRequest {
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Counters surfaced verbatim in the audit log for every file-context
/// expansion attempt, successful or not.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FileContextDiagnostics {
    pub requested: usize,
    pub deduplicated: usize,
    pub included: usize,
    pub rejected: usize,
    pub non_terminal_blocks_ignored: usize,
}

/// Result of expanding file context: the `[FILE_CONTEXT]` section to
/// append (empty when nothing was requested) and the diagnostics.
pub struct FileContextExpansion {
    pub section: String,
    pub diagnostics: FileContextDiagnostics,
}

const BLOCK_OPEN: &str = "[BRIDGE_FILES]";
const BLOCK_CLOSE: &str = "[/BRIDGE_FILES]";

/// Parse a trailing `[BRIDGE_FILES]...[/BRIDGE_FILES]` block out of
/// `body`, honoring it only when nothing but whitespace follows the
/// closing tag. Returns the body with the terminal block removed (if
/// any), the requests parsed from it, and how many non-terminal
/// occurrences were left in place.
pub fn extract_bridge_files_block(body: &str) -> (String, Vec<BridgeFileRequest>, usize) {
    let mut non_terminal = 0usize;
    let mut search_from = 0usize;
    let mut last_terminal: Option<(usize, usize)> = None;

    while let Some(rel_open) = body[search_from..].find(BLOCK_OPEN) {
        let open = search_from + rel_open;
        let Some(rel_close) = body[open..].find(BLOCK_CLOSE) else {
            break;
        };
        let close = open + rel_close + BLOCK_CLOSE.len();
        if body[close..].trim().is_empty() {
            last_terminal = Some((open, close));
        } else {
            non_terminal += 1;
        }
        search_from = close;
    }

    let Some((open, close)) = last_terminal else {
        return (body.to_owned(), Vec::new(), non_terminal);
    };

    let inner = &body[open + BLOCK_OPEN.len()..close - BLOCK_CLOSE.len()];
    let requests = inner
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match line.split_once('|') {
            Some((path, label)) => BridgeFileRequest { path: path.trim().to_owned(), label: Some(label.trim().to_owned()) },
            None => BridgeFileRequest { path: line.to_owned(), label: None },
        })
        .collect();

    let stripped = format!("{}{}", &body[..open], &body[close..]);
    (stripped.trim_end().to_owned(), requests, non_terminal)
}

fn validate_path(raw: &str, allowed_roots: &[String]) -> Result<PathBuf, BridgeError> {
    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(BridgeError::new(ErrorCode::FileContextInvalid, format!("path is not absolute: {raw}")));
    }

    let canonical = std::fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BridgeError::new(ErrorCode::FileContextNotFound, format!("no such file: {raw}")),
        std::io::ErrorKind::PermissionDenied => {
            BridgeError::new(ErrorCode::FileContextAccessDenied, format!("permission denied: {raw}"))
        }
        _ => BridgeError::new(ErrorCode::FileContextInvalid, format!("cannot resolve {raw}: {e}")),
    })?;

    if !allowed_roots.is_empty() {
        let within = allowed_roots.iter().any(|root| {
            std::fs::canonicalize(root).map(|r| canonical.starts_with(&r)).unwrap_or(false)
        });
        if !within {
            return Err(BridgeError::new(
                ErrorCode::FileContextAccessDenied,
                format!("{raw} is outside the configured allowed roots"),
            ));
        }
    }

    let meta = std::fs::metadata(&canonical)
        .map_err(|e| BridgeError::new(ErrorCode::FileContextInvalid, format!("cannot stat {raw}: {e}")))?;
    if !meta.is_file() {
        return Err(BridgeError::new(ErrorCode::FileContextInvalid, format!("not a regular file: {raw}")));
    }

    Ok(canonical)
}

fn read_validated(canonical: &Path, raw: &str, max_file_chars: usize) -> Result<String, BridgeError> {
    let bytes = std::fs::read(canonical)
        .map_err(|e| BridgeError::new(ErrorCode::FileContextInvalid, format!("cannot read {raw}: {e}")))?;
    if bytes.contains(&0) {
        return Err(BridgeError::new(ErrorCode::FileContextUnsupported, format!("{raw} contains a NUL byte")));
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| BridgeError::new(ErrorCode::FileContextUnsupported, format!("{raw} is not valid UTF-8")))?;
    if text.chars().count() > max_file_chars {
        return Err(BridgeError::new(ErrorCode::FileContextInvalid, format!("{raw} exceeds the per-file character cap")));
    }
    Ok(text)
}

/// Resolve `requests` into a `[FILE_CONTEXT]` section, applying
/// allowed-roots, regular-file, UTF-8, and size-cap validation. Duplicate
/// canonical paths are silently deduplicated, keeping the first label
/// seen. A single invalid/missing/oversized file fails the whole request
/// (the bridge does not partially expand).
pub fn expand(
    requests: &[BridgeFileRequest],
    allowed_roots: &[String],
    max_file_chars: usize,
    max_total_chars: usize,
) -> Result<FileContextExpansion, BridgeError> {
    let mut diagnostics = FileContextDiagnostics { requested: requests.len(), ..Default::default() };
    if requests.is_empty() {
        return Ok(FileContextExpansion { section: String::new(), diagnostics });
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut sections = Vec::new();
    let mut total_chars = 0usize;

    for req in requests {
        let canonical = validate_path(&req.path, allowed_roots).inspect_err(|_| diagnostics.rejected += 1)?;
        if !seen.insert(canonical.clone()) {
            diagnostics.deduplicated += 1;
            continue;
        }

        let content = read_validated(&canonical, &req.path, max_file_chars).inspect_err(|_| diagnostics.rejected += 1)?;
        total_chars += content.chars().count();
        if total_chars > max_total_chars {
            return Err(BridgeError::new(ErrorCode::FileContextInvalid, "file context exceeds the total character cap"));
        }

        let label = req.label.clone().unwrap_or_else(|| req.path.clone());
        sections.push(format!(
            "--- BEGIN FILE: {label} ---\npath: {}\n{content}\n--- END FILE: {label} ---",
            canonical.display()
        ));
        diagnostics.included += 1;
    }

    let section = if sections.is_empty() {
        String::new()
    } else {
        format!("[FILE_CONTEXT]\n{}\n[/FILE_CONTEXT]", sections.join("\n\n"))
    };
    Ok(FileContextExpansion { section, diagnostics })
}

#[cfg(test)]
#[path = "file_context_tests.rs"]
mod tests;
