// SPDX-License-Identifier: MIT
//! Read/write access to the host's persistent key/value settings file.
//!
//! The file is host-owned, INI-style (`[Section]` headers, `Key=Value`
//! lines), shared by every plugin. Prefix your section with your plugin's
//! identity (e.g. `Plugin_Counter`) so plugins never collide. Failures
//! here are ordinary I/O errors: log them and carry on with defaults —
//! never abort a lifecycle call over them.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Settings file access failure.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one value. A missing file, section, or key reads as `Ok(None)`.
/// Section and key matching is case-insensitive.
pub fn read_value(
    path: &Path,
    section: &str,
    key: &str,
) -> Result<Option<String>, ProfileError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let mut in_section = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(header) = section_header(trimmed) {
            in_section = header.eq_ignore_ascii_case(section);
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = trimmed.split_once('=') {
            if k.trim().eq_ignore_ascii_case(key) {
                return Ok(Some(v.trim().to_owned()));
            }
        }
    }
    Ok(None)
}

/// Write one value, creating the file, section, or key as needed.
/// Unrelated sections and keys are preserved verbatim.
pub fn write_value(
    path: &Path,
    section: &str,
    key: &str,
    value: &str,
) -> Result<(), ProfileError> {
    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };
    let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();

    let section_start = lines
        .iter()
        .position(|l| section_header(l.trim()).is_some_and(|h| h.eq_ignore_ascii_case(section)));

    match section_start {
        None => {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{section}]"));
            lines.push(format!("{key}={value}"));
        }
        Some(start) => {
            let end = lines[start + 1..]
                .iter()
                .position(|l| section_header(l.trim()).is_some())
                .map(|off| start + 1 + off)
                .unwrap_or(lines.len());

            let existing = lines[start + 1..end].iter().position(|l| {
                l.split_once('=')
                    .is_some_and(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            });
            match existing {
                Some(off) => lines[start + 1 + off] = format!("{key}={value}"),
                None => lines.insert(end, format!("{key}={value}")),
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    fs::write(path, out)?;
    Ok(())
}

fn section_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim())
}
