//! Deterministic DSL identifiers for target-format names.

use std::collections::HashSet;

use infra_forge_dsl::is_keyword;

use crate::semantic::namespaces::is_builtin_name;

/// Rewrites `raw` into a valid identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`. A leading digit, a keyword,
/// or a builtin function or namespace name gets a `_` prefix.
pub fn sanitize(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || is_keyword(&name)
        || is_builtin_name(&name)
    {
        name.insert(0, '_');
    }
    name
}

/// Hands out unique identifiers within one document.
#[derive(Debug, Default)]
pub struct NameTable {
    taken: HashSet<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitizes `raw` and makes it unique by appending `_2`, `_3`, ...
    pub fn claim(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}
