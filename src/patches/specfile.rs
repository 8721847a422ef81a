//! patches::specfile
//!
//! Spec file editing: inserting the generated `PatchNNNN:` block.
//!
//! The patch block is inserted immediately after the last existing
//! `Patch*` declaration (from a previous run), or after the last
//! `Source*` declaration otherwise. Each `Patch` line is preceded by a
//! `# `-prefixed rendering of its commit message, one source line per
//! comment line. Patches already declared are skipped, which makes
//! regeneration over an unchanged history byte-idempotent.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::{GeneratedPatch, PatchError};

/// Insert `PatchNNNN: <file>` declarations for the generated patches.
///
/// `digits` controls the zero-padding of `NNNN`, matching the patch file
/// numbering.
///
/// # Errors
///
/// - [`PatchError::NoDeclarationAnchor`] if the specfile has neither a
///   `Source*` nor a `Patch*` declaration
pub fn add_patches(
    specfile: &Path,
    patches: &[GeneratedPatch],
    digits: usize,
) -> Result<(), PatchError> {
    let text = fs::read_to_string(specfile).map_err(|e| PatchError::Io {
        path: specfile.to_path_buf(),
        source: e,
    })?;

    let lines: Vec<&str> = text.lines().collect();

    let declared: HashSet<String> = lines
        .iter()
        .filter_map(|line| declaration_value(line, "Patch"))
        .map(str::to_string)
        .collect();

    let anchor = lines
        .iter()
        .rposition(|line| is_declaration(line, "Patch"))
        .or_else(|| lines.iter().rposition(|line| is_declaration(line, "Source")))
        .ok_or_else(|| PatchError::NoDeclarationAnchor {
            path: specfile.to_path_buf(),
        })?;

    let mut block: Vec<String> = Vec::new();
    for patch in patches {
        if declared.contains(&patch.metadata.name) {
            continue;
        }
        for line in patch.message.lines() {
            block.push(format!("# {line}").trim_end().to_string());
        }
        let number = patch
            .metadata
            .patch_id
            .map(|id| format!("{id:0digits$}"))
            .unwrap_or_default();
        block.push(format!("Patch{number}: {}", patch.metadata.name));
    }

    if block.is_empty() {
        return Ok(());
    }

    let mut out: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    out.splice(anchor + 1..anchor + 1, block);

    let mut rendered = out.join("\n");
    if text.ends_with('\n') {
        rendered.push('\n');
    }
    fs::write(specfile, rendered).map_err(|e| PatchError::Io {
        path: specfile.to_path_buf(),
        source: e,
    })
}

/// List the patch files the spec declares, in declaration order.
///
/// Declaration order is what `%autopatch` applies, so it is also the
/// order the bootstrapper replays patches in.
pub fn declared_patches(spec_text: &str) -> Vec<String> {
    spec_text
        .lines()
        .filter_map(|line| declaration_value(line, "Patch"))
        .map(str::to_string)
        .collect()
}

/// Whether the spec prepares sources with `%autosetup`/`%autopatch`.
///
/// A bare `%setup` spec ignores `PatchN:` declarations unless each patch
/// is applied by hand, so generated series require one of the automatic
/// macros.
pub fn uses_autosetup(spec_text: &str) -> bool {
    spec_text.lines().any(|line| {
        let line = line.trim_start();
        !line.starts_with('#') && (line.contains("%autosetup") || line.contains("%autopatch"))
    })
}

/// Check whether a line is a `<keyword><number>:` declaration.
fn is_declaration(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .and_then(|rest| rest.split_once(':'))
        .is_some_and(|(num, _)| num.chars().all(|c| c.is_ascii_digit()))
}

/// Extract the value of a `<keyword><number>: value` declaration.
fn declaration_value<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    let (num, value) = rest.split_once(':')?;
    if !num.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(value.trim())
}
