//! Text rendering utilities for human-friendly error messages.
//!
//! Formats dependency chains, provider graphs, type names and
//! "did you mean" suggestions.

use std::fmt::Write as _;

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use lazywire_support::rendering::render_chain;
///
/// let chain = vec!["Service", "Repository", "Database", "Service"];
/// assert_eq!(render_chain(&chain), "Service → Repository → Database → Service");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// One provider node, as shown by [`render_graph`].
#[derive(Debug, Clone)]
pub struct GraphLine {
    /// Output type of the node.
    pub output: String,
    /// Topological depth, `-1` if never computed.
    pub depth: i64,
    /// Input types in parameter order.
    pub inputs: Vec<String>,
    /// Whether the node already ran.
    pub executed: bool,
}

/// Renders provider nodes one per line, indented by depth.
///
/// ```text
/// [0] Config
/// [1]   Database <- Config  (executed)
/// [2]     Service <- Database, Config
/// ```
pub fn render_graph(lines: &[GraphLine]) -> String {
    let mut result = String::new();

    for line in lines {
        let indent = "  ".repeat(line.depth.max(0) as usize);
        let _ = write!(result, "[{}] {}{}", line.depth, indent, line.output);

        if !line.inputs.is_empty() {
            let _ = write!(result, " <- {}", line.inputs.join(", "));
        }
        if line.executed {
            result.push_str("  (executed)");
        }
        result.push('\n');
    }

    result
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use lazywire_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::services::UserService"), "UserService");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Suggests registered type names close to `requested`.
///
/// Substring matches on the full name rank first, then matches on the
/// shortened name, then names sharing a common prefix of three or more
/// characters.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
