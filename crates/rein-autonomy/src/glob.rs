use regex::Regex;
use std::path::Path;

/// A compiled path-rule pattern.
///
/// `*` matches within one path segment, `**` matches across segments and `?`
/// matches one character. Relative patterns match any trailing run of whole
/// segments, so `src/core/*` matches both `src/core/auth.py` and
/// `/work/app/src/core/auth.py`. Patterns starting with `/` are anchored.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = Regex::new(&glob_to_regex(&pattern))?;
        Ok(Self { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.matches_str(&path.to_string_lossy())
    }

    pub fn matches_str(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);
        self.regex.is_match(normalized)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 8);
    let body = match pattern.strip_prefix('/') {
        Some(rest) => {
            regex.push_str("^/");
            rest
        }
        None => {
            regex.push_str("^(?:.*/)?");
            pattern.strip_prefix("./").unwrap_or(pattern)
        }
    };

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_pattern_is_suffix_anchored() {
        assert_eq!(glob_to_regex("src/*.rs"), r"^(?:.*/)?src/[^/]*\.rs$");
    }

    #[test]
    fn test_absolute_pattern_is_anchored() {
        assert_eq!(glob_to_regex("/etc/**"), "^/etc/.*$");
    }
}
