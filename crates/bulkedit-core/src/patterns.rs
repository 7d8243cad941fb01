//! Refactor pattern compilation
//!
//! Every [`RefactorKind`] compiles down to a regex and a replacement string in
//! the regex crate's expansion syntax, so the planner handles all of them the
//! same way.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{BulkEditError, Result};
use crate::types::{BulkRefactorPattern, RefactorKind};

/// A refactor pattern ready to run against file content
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    kind: RefactorKind,
    regex: Regex,
    replacement: String,
}

impl CompiledPattern {
    /// Compiles a pattern, rejecting anything that cannot run
    pub fn compile(pattern: &BulkRefactorPattern) -> Result<Self> {
        let target = pattern.target_pattern.as_str();
        if target.is_empty() {
            return Err(invalid("refactor target pattern is empty".to_string()));
        }

        let (source, replacement) = match pattern.kind {
            RefactorKind::Rename => {
                if !is_identifier(target) {
                    return Err(invalid(format!(
                        "rename target '{}' is not an identifier",
                        target
                    )));
                }
                (
                    format!(r"\b{}\b", regex::escape(target)),
                    escape_replacement(&pattern.replacement_pattern),
                )
            }
            RefactorKind::Literal => (
                regex::escape(target),
                escape_replacement(&pattern.replacement_pattern),
            ),
            RefactorKind::Regex => (target.to_string(), pattern.replacement_pattern.clone()),
            RefactorKind::Template => compile_template(target, &pattern.replacement_pattern)?,
        };

        let regex = Regex::new(&source).map_err(|e| {
            invalid(format!("refactor pattern '{}' does not compile: {}", target, e))
        })?;

        Ok(Self {
            kind: pattern.kind,
            regex,
            replacement,
        })
    }

    /// Kind the pattern was compiled from
    pub fn kind(&self) -> RefactorKind {
        self.kind
    }

    /// The compiled matcher
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Replacement in `$name` expansion syntax
    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

fn invalid(message: String) -> BulkEditError {
    BulkEditError::InvalidRequest(message)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Makes `$` literal in a replacement
fn escape_replacement(s: &str) -> String {
    s.replace('$', "$$")
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Splits `{{name}}` placeholders out of a template
fn parse_template(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| invalid(format!("unclosed placeholder in template '{}'", template)))?;
        let name = after[..close].trim();
        if !is_identifier(name) {
            return Err(invalid(format!(
                "placeholder '{{{{{}}}}}' is not an identifier",
                name
            )));
        }
        pieces.push(Piece::Placeholder(name));
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

/// Template target to regex; whitespace runs match any whitespace
fn compile_template(target: &str, replacement: &str) -> Result<(String, String)> {
    let mut names = BTreeSet::new();
    let mut source = String::new();
    for piece in parse_template(target)? {
        match piece {
            Piece::Text(text) => {
                let mut in_space = false;
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !in_space {
                            source.push_str(r"\s+");
                        }
                        in_space = true;
                    } else {
                        source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                        in_space = false;
                    }
                }
            }
            Piece::Placeholder(name) => {
                if !names.insert(name) {
                    return Err(invalid(format!(
                        "placeholder '{}' appears more than once in the target",
                        name
                    )));
                }
                source.push_str(&format!(r"(?P<{}>\w+)", name));
            }
        }
    }

    let mut expansion = String::new();
    for piece in parse_template(replacement)? {
        match piece {
            Piece::Text(text) => expansion.push_str(&escape_replacement(text)),
            Piece::Placeholder(name) => {
                if !names.contains(name) {
                    return Err(invalid(format!(
                        "replacement uses '{}' which the target does not bind",
                        name
                    )));
                }
                expansion.push_str(&format!("${{{}}}", name));
            }
        }
    }

    Ok((source, expansion))
}
