//! Lexical building blocks for the pattern language.
//!
//! Every constant here is a `fancy_regex` source fragment, meant to be spliced
//! into a larger pattern rather than compiled on its own. Keeping them as
//! plain `&str` (rather than precompiled) lets the compiler build the final
//! pattern source once per condition and let the cache intern the result.

/// Member-access dot. Tolerates whitespace and optional chaining (`?.`) but
/// must not consume a nullish-coalescing `??.`.
pub const DOT: &str = r"\s*\??\.\s*";

/// Boundary before an expression: punctuation that cannot be part of an
/// identifier, or start of input.
pub const BEFORE: &str = r"(?:[!%&()*+,\-./:;<=>?\[^{|}~\n]|^)\s*";

/// Boundary after an expression, symmetric to `BEFORE`.
pub const AFTER: &str = r"\s*(?:[%&()*+,\-./:;<=>?\[\]^{|}\n]|$)";

/// Stricter trailing boundary for right-hand-side occurrences (alias
/// assignment sites). The final alternative needs a lookahead, which is why
/// this engine runs on `fancy_regex` rather than `regex`.
pub const RHS_AFTER: &str = r"\s*(?:[),;\]{}:]|\|\||\?\?|$|\n(?=\s*[A-Za-z_$]))";

/// A JS-style identifier of any length.
pub const IDENT: &str = r"[A-Za-z_$][A-Za-z_$0-9]*";

/// Escapes a literal API path segment so it can be embedded in the patterns
/// above without its characters being read as regex metacharacters.
pub fn escape_literal(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '$' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `alias.` — any identifier followed by a property-access dot.
pub fn alias_dot() -> String {
    format!("{IDENT}{DOT}")
}

/// `(chrome|browser).` — the known extension-platform root.
pub fn host_dot() -> String {
    format!("(?:chrome|browser){DOT}")
}

/// `BEFORE (?:body) AFTER`
pub fn any(body: &str) -> String {
    format!("{BEFORE}(?:{body}){AFTER}")
}

/// `alias. (?:body) AFTER` — body occurs as a property of some alias.
pub fn dot(body: &str) -> String {
    format!("{}(?:{body}){AFTER}", alias_dot())
}

/// `BEFORE (?:body) RHS_AFTER` — body occurs at an assignment/expression
/// right-hand side.
pub fn rhs(body: &str) -> String {
    format!("{BEFORE}(?:{body}){RHS_AFTER}")
}

/// Joins `parts[lo..hi]` (0-indexed, exclusive upper bound) with `DOT`, each
/// part escaped as a literal segment.
pub fn body(parts: &[String], lo: usize, hi: usize) -> String {
    parts[lo..hi]
        .iter()
        .map(|p| escape_literal(p))
        .collect::<Vec<_>>()
        .join(DOT)
}
