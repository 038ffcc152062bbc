//! Variable blocks.

use std::collections::BTreeMap;

use crate::core::literal::chunk;

/// Longest value segment written on one line.
pub const MAX_VALUE_LENGTH: usize = 220;

/// Joins value segments so the macro processor sees one value.
pub const VALUE_CONTINUATION: &str = "%trim(\n)";

/// Render `name=value` assignments under a `* <title> Variables` block.
///
/// `title` is a category title (`Service`) or `Build`. Returns an empty
/// string when there are no variables. Long values are
/// split into [`MAX_VALUE_LENGTH`] segments joined by [`VALUE_CONTINUATION`].
pub fn render_vars(title: &str, vars: &BTreeMap<String, String>) -> String {
    if vars.is_empty() {
        return String::new();
    }

    let mut out = format!("* {} Variables start;\n", title);
    for (name, value) in vars {
        let value = chunk(value, MAX_VALUE_LENGTH).join(VALUE_CONTINUATION);
        out.push_str(&format!("%let {}={};\n", name, value));
    }
    out.push_str(&format!("* {} Variables end;\n", title));
    out
}
