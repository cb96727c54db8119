//! Template Renderers - Per-Platform File Emission
//!
//! Each builder renders the full required file set for its platform by
//! merging spec values into structural templates. Template bodies are
//! const strings with `__TOKEN__` substitution; every emitted path is
//! relative to the theme root so the archive stays portable.

pub mod ghost;
pub mod wordpress;

pub use ghost::GhostBuilder;
pub use wordpress::WordpressBuilder;

use std::fs;
use std::path::Path;

use crate::platform::GenerationError;
use crate::spec::ThemeSpec;

/// Substitute `__NAME__` tokens in a template body.
pub(crate) fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("__{name}__"), value);
    }
    out
}

/// Write one theme file under the staging root, creating parents.
pub(crate) fn write_file(root: &Path, rel: &str, contents: &str) -> Result<(), GenerationError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenerationError::io(parent, e))?;
    }
    fs::write(&path, contents).map_err(|e| GenerationError::io(&path, e))
}

/// Color/font tokens as CSS custom property declarations, one per line,
/// in deterministic (sorted) order.
pub(crate) fn css_custom_properties(spec: &ThemeSpec) -> String {
    let mut lines = String::new();
    for (name, value) in &spec.colors {
        lines.push_str(&format!("    --color-{name}: {value};\n"));
    }
    for (name, value) in &spec.fonts {
        lines.push_str(&format!("    --font-{name}: {value};\n"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let out = fill("__A__ and __A__ and __B__", &[("A", "x"), ("B", "y")]);
        assert_eq!(out, "x and x and y");
    }

    #[test]
    fn test_fill_leaves_handlebars_alone() {
        let out = fill("{{title}} __NAME__", &[("NAME", "demo")]);
        assert_eq!(out, "{{title}} demo");
    }
}
