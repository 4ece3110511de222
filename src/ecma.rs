// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! ECMA-262 regular expressions on top of the `regex` crate.
//!
//! JSON Schema patterns use ECMA-262 syntax. The two dialects mostly agree; the differences
//! that matter in practice are the class escapes, which are ASCII-only in ECMA-262 but
//! Unicode-aware in `regex`, and a few escapes (`\cX`, `\/`) that `regex` rejects.
//! Look-around and backreferences have no finite-automaton form; patterns using them are
//! handed to the backtracking engine of `fancy_regex` instead.

/// A compiled pattern.
#[derive(Debug, Clone)]
pub enum EcmaRegex {
    /// Linear-time automaton; used whenever `regex` accepts the pattern.
    Linear(regex::Regex),
    Backtracking(fancy_regex::Regex),
}

impl EcmaRegex {
    /// Whether the pattern matches anywhere in `text`. A backtracking run that exceeds its
    /// step limit counts as no match.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Linear(regex) => regex.is_match(text),
            Self::Backtracking(regex) => regex.is_match(text).unwrap_or_else(|e| {
                log::warn!(
                    "pattern '{}' gave up on a {} byte input: {e}",
                    regex.as_str(),
                    text.len()
                );
                false
            }),
        }
    }
}

/// Compile an ECMA-262 pattern.
pub fn compile(pattern: &str) -> Result<EcmaRegex, String> {
    let translated = translate(pattern)?;
    match regex::Regex::new(&translated) {
        Ok(regex) => Ok(EcmaRegex::Linear(regex)),
        Err(linear) => match fancy_regex::Regex::new(&translated) {
            Ok(regex) => {
                log::debug!("pattern '{pattern}' needs backtracking");
                Ok(EcmaRegex::Backtracking(regex))
            }
            Err(_) => Err(linear.to_string()),
        },
    }
}

fn translate(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err("trailing backslash".to_string());
                };
                match escaped {
                    'd' if in_class => out.push_str("0-9"),
                    'd' => out.push_str("[0-9]"),
                    'D' if !in_class => out.push_str("[^0-9]"),
                    'w' if in_class => out.push_str("a-zA-Z0-9_"),
                    'w' => out.push_str("[a-zA-Z0-9_]"),
                    'W' if !in_class => out.push_str("[^a-zA-Z0-9_]"),
                    // ECMA-262 white space and line terminators.
                    's' if in_class => out.push_str(ECMA_SPACE),
                    's' => {
                        out.push('[');
                        out.push_str(ECMA_SPACE);
                        out.push(']');
                    }
                    'S' if !in_class => {
                        out.push_str("[^");
                        out.push_str(ECMA_SPACE);
                        out.push(']');
                    }
                    'c' => {
                        let Some(letter) = chars.next().filter(char::is_ascii_alphabetic) else {
                            return Err("invalid control escape".to_string());
                        };
                        let code = (letter.to_ascii_uppercase() as u8) - b'A' + 1;
                        out.push_str(&format!("\\x{code:02X}"));
                    }
                    '/' => out.push('/'),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                // `[]` never matches and `[^]` matches anything in ECMA-262.
                if chars.peek() == Some(&']') {
                    chars.next();
                    in_class = false;
                    if out.ends_with("[^") {
                        out.truncate(out.len() - 2);
                        out.push_str(r"[\s\S]");
                    } else {
                        out.truncate(out.len() - 1);
                        out.push_str(r"[^\s\S]");
                    }
                }
            }
            '[' => out.push_str(r"\["),
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

const ECMA_SPACE: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_digits() {
        let re = compile(r"^\d+$").unwrap();
        assert!(re.is_match("0123"));
        // U+0660 ARABIC-INDIC DIGIT ZERO is a digit for `regex` but not for ECMA-262.
        assert!(!re.is_match("\u{0660}"));
    }

    #[test]
    fn test_word_class_inside_brackets() {
        let re = compile(r"^[\w-]+$").unwrap();
        assert!(re.is_match("a-b_c9"));
        assert!(!re.is_match("é"));
    }

    #[test]
    fn test_whitespace() {
        let re = compile(r"^\s$").unwrap();
        assert!(re.is_match("\u{FEFF}"));
        assert!(re.is_match("\u{2029}"));
        assert!(!compile(r"^\S$").unwrap().is_match("\t"));
    }

    #[test]
    fn test_control_escape() {
        let re = compile(r"^\cC$").unwrap();
        assert!(re.is_match("\u{3}"));
        assert!(compile(r"\c1").is_err());
    }

    #[test]
    fn test_malformed_patterns_are_errors() {
        assert!(compile("[").is_err());
        assert!(compile("(a").is_err());
        assert!(compile(r"a\").is_err());
    }

    #[test]
    fn test_negative_lookahead() {
        let re = compile(r"^(?!foo)").unwrap();
        assert!(matches!(re, EcmaRegex::Backtracking(_)));
        assert!(!re.is_match("foobar"));
        assert!(re.is_match("bar"));
        assert!(re.is_match(""));
    }

    #[test]
    fn test_backreference() {
        let re = compile(r"(a)\1").unwrap();
        assert!(re.is_match("aa"));
        assert!(re.is_match("baab"));
        assert!(!re.is_match("ab"));
    }

    #[test]
    fn test_translated_escapes_reach_the_backtracking_engine() {
        let re = compile(r"^(?=\d)\w+$").unwrap();
        assert!(re.is_match("1abc"));
        assert!(!re.is_match("abc"));
        assert!(!re.is_match("\u{0660}x"));
    }

    #[test]
    fn test_plain_patterns_stay_linear() {
        assert!(matches!(compile(r"^[a-z]+$").unwrap(), EcmaRegex::Linear(_)));
    }

    #[test]
    fn test_empty_classes() {
        assert!(!compile("^[]$").unwrap().is_match(""));
        assert!(compile("^[^]$").unwrap().is_match("x"));
    }
}
