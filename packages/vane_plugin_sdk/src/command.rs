// SPDX-License-Identifier: MIT
//! Structured view of the command-received argument string.
//!
//! The raw argument is an informal "keyword, then the rest" micro-format.
//! It is parsed exactly once at the boundary; plugins match the keyword
//! case-insensitively and map it to their own command enum before acting.

/// A parsed command: a keyword and the remainder payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    raw: &'a str,
    keyword: &'a str,
    payload: &'a str,
}

impl<'a> Command<'a> {
    /// Split a raw command string into keyword + payload. Surrounding
    /// whitespace is ignored; an empty string parses to an empty keyword.
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let (keyword, payload) = match trimmed.split_once(char::is_whitespace) {
            Some((k, rest)) => (k, rest.trim_start()),
            None => (trimmed, ""),
        };
        Command {
            raw,
            keyword,
            payload,
        }
    }

    /// The command keyword (first whitespace-delimited token).
    pub fn keyword(&self) -> &'a str {
        self.keyword
    }

    /// Everything after the keyword, leading whitespace stripped.
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// The untouched input string.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Case-insensitive keyword test.
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    /// Whitespace-split payload arguments.
    pub fn args(&self) -> impl Iterator<Item = &'a str> {
        self.payload.split_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_only() {
        let cmd = Command::parse("Reset");
        assert_eq!(cmd.keyword(), "Reset");
        assert_eq!(cmd.payload(), "");
        assert!(cmd.is("reset"));
        assert!(cmd.is("RESET"));
        assert!(!cmd.is("set"));
    }

    #[test]
    fn keyword_and_payload() {
        let cmd = Command::parse("  Set   42 extra  ");
        assert_eq!(cmd.keyword(), "Set");
        assert_eq!(cmd.payload(), "42 extra");
        let args: Vec<_> = cmd.args().collect();
        assert_eq!(args, vec!["42", "extra"]);
    }

    #[test]
    fn empty_string() {
        let cmd = Command::parse("   ");
        assert_eq!(cmd.keyword(), "");
        assert_eq!(cmd.payload(), "");
        assert!(cmd.args().next().is_none());
    }
}
