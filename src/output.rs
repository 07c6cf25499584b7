//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Effects
//!
//! ```text
//! Effects
//! 01 remove-bg → POST /remove-bg
//!     Cut the backdrop out, optionally shrinking first
//!     width = none: shrink into this box first (with height, both > 0)
//!     ...
//! 07 sketch → POST /sketch
//!     Pencil sketch via colour dodge
//! ```
//!
//! ## Apply
//!
//! ```text
//! sepia.png
//!     Effect: filter
//!     Source: photo.jpg (1024x768)
//!     Output: 1024x768, 512.3 KiB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::effects::EffectKind;
use crate::imaging::Processed;
use std::path::Path;

/// Two-digit positional index.
fn format_index(pos: usize) -> String {
    format!("{:02}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// effects
// ============================================================================

/// Format the effect table: one header per route, its summary and parameters.
pub fn format_effect_list(kinds: &[EffectKind]) -> Vec<String> {
    let mut lines = vec!["Effects".to_string()];
    for (i, kind) in kinds.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} POST {}",
            format_index(i + 1),
            kind.name(),
            kind.path()
        ));
        lines.push(format!("{}{}", indent(1), kind.summary()));
        for param in kind.params() {
            lines.push(format!(
                "{}{} = {}: {}",
                indent(1),
                param.name,
                param.default,
                param.description
            ));
        }
    }
    lines
}

/// Print the effect table to stdout.
pub fn print_effect_list(kinds: &[EffectKind]) {
    for line in format_effect_list(kinds) {
        println!("{}", line);
    }
}

// ============================================================================
// apply
// ============================================================================

/// Format the result of one offline `apply` run.
pub fn format_apply_summary(
    kind: EffectKind,
    source: &Path,
    output: &Path,
    processed: &Processed,
) -> Vec<String> {
    vec![
        file_name(output),
        format!("{}Effect: {}", indent(1), kind.name()),
        format!(
            "{}Source: {} ({})",
            indent(1),
            source.display(),
            processed.input
        ),
        format!(
            "{}Output: {}, {}",
            indent(1),
            processed.output,
            format_bytes(processed.png.len())
        ),
    ]
}

/// Print the `apply` summary to stdout.
pub fn print_apply_summary(kind: EffectKind, source: &Path, output: &Path, processed: &Processed) {
    for line in format_apply_summary(kind, source, output, processed) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
