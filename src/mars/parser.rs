//! The MARS request tokenizer/parser (component C8): turns request text
//! into a sequence of unexpanded [`Request`]s with raw string values and
//! the `Any` placeholder Type.
//!
//! Grounded on spec.md §4.8/§6's grammar, in the teacher's "read fixed
//! tokens, fail with a typed error" style (`src/reader.rs`'s section
//! scanner).

use crate::error::MarsError;
use crate::mars::request::Request;

/// Parses one or more `;`- or blank-line-separated requests out of
/// `text`. A run of two or more newlines is treated as an unambiguous
/// request boundary; a single newline is ordinary whitespace, so a
/// request's `key=value` pairs may continue onto the next line.
pub fn parse(text: &str) -> Result<Vec<Request>, MarsError> {
    let mut p = Parser::new(text);
    let mut out = Vec::new();
    p.skip_trivia();
    while !p.at_end() {
        out.push(p.parse_request()?);
        p.skip_trivia();
    }
    Ok(out)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn error(&self, message: impl Into<String>) -> MarsError {
        MarsError::Parse {
            message: message.into(),
            line: self.line,
            column: self.column,
        }
    }

    /// Skips whitespace and `#`-to-end-of-line comments. Returns `true`
    /// if a hard request separator (`;`, or a blank line) was consumed.
    fn skip_trivia(&mut self) -> bool {
        let mut newline_run = 0u32;
        let mut separator = false;
        loop {
            match self.peek() {
                Some(';') => {
                    self.advance();
                    separator = true;
                    newline_run = 0;
                }
                Some('\n') => {
                    self.advance();
                    newline_run += 1;
                    if newline_run >= 2 {
                        separator = true;
                    }
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    newline_run = 0;
                }
                _ => break,
            }
        }
        separator
    }

    fn expect(&mut self, ch: char) -> Result<(), MarsError> {
        if self.peek() == Some(ch) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{ch}'")))
        }
    }

    fn parse_identifier(&mut self, what: &str) -> Result<String, MarsError> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if s.is_empty() {
            return Err(self.error(format!("expected {what}")));
        }
        Ok(s.to_ascii_lowercase())
    }

    fn parse_value(&mut self) -> Result<String, MarsError> {
        if self.peek() == Some('"') {
            self.advance();
            let mut s = String::new();
            loop {
                match self.advance() {
                    Some('"') => break,
                    Some('\\') => match self.advance() {
                        Some(c) => s.push(c),
                        None => return Err(self.error("unterminated escape in quoted value")),
                    },
                    Some(c) => s.push(c),
                    None => return Err(self.error("unterminated quoted value")),
                }
            }
            Ok(s)
        } else {
            let mut s = String::new();
            while let Some(c) = self.peek() {
                if matches!(c, '/' | ',' | '=' | ';' | '"') || c.is_whitespace() {
                    break;
                }
                s.push(c);
                self.advance();
            }
            if s.is_empty() {
                return Err(self.error("expected a value"));
            }
            Ok(s)
        }
    }

    fn parse_values(&mut self) -> Result<Vec<String>, MarsError> {
        let mut values = vec![self.parse_value()?];
        while self.peek() == Some('/') {
            self.advance();
            values.push(self.parse_value()?);
        }
        Ok(values)
    }

    fn parse_request(&mut self) -> Result<Request, MarsError> {
        let verb = self.parse_identifier("a verb")?;
        let mut req = Request::new(verb);
        loop {
            let hard_sep = self.skip_trivia();
            if hard_sep || self.peek() != Some(',') {
                break;
            }
            self.advance();
            self.skip_trivia();
            let key = self.parse_identifier("a key")?;
            self.skip_trivia();
            self.expect('=')?;
            self.skip_trivia();
            let values = self.parse_values()?;
            req.set(&key, values);
        }
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_request() {
        let out = parse("retrieve,class=od,date=20240101/20240102,step=0/6").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].verb(), "retrieve");
        assert_eq!(out[0].get("class"), ["od"]);
        assert_eq!(out[0].get("date"), ["20240101", "20240102"]);
        assert_eq!(out[0].get("step"), ["0", "6"]);
    }

    #[test]
    fn verb_and_key_are_case_insensitive_on_input() {
        let out = parse("RETRIEVE,CLASS=od").unwrap();
        assert_eq!(out[0].verb(), "retrieve");
        assert_eq!(out[0].get("class"), ["od"]);
    }

    #[test]
    fn semicolon_separates_requests() {
        let out = parse("retrieve,class=od;retrieve,class=rd").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("class"), ["od"]);
        assert_eq!(out[1].get("class"), ["rd"]);
    }

    #[test]
    fn blank_line_separates_requests() {
        let out = parse("retrieve,class=od\n\nretrieve,class=rd").unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn single_newline_continues_the_same_request() {
        let out = parse("retrieve,class=od,\ndate=20240101").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("date"), ["20240101"]);
    }

    #[test]
    fn comments_are_ignored() {
        let out = parse("# a comment\nretrieve,class=od # trailing comment\n").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("class"), ["od"]);
    }

    #[test]
    fn quoted_values_preserve_delimiters() {
        let out = parse(r#"retrieve,area="a/b,c=d""#).unwrap();
        assert_eq!(out[0].get("area"), ["a/b,c=d"]);
    }

    #[test]
    fn quoted_values_support_escapes() {
        let out = parse(r#"retrieve,area="a\"b\\c""#).unwrap();
        assert_eq!(out[0].get("area"), [r#"a"b\c"#]);
    }

    #[test]
    fn textual_print_round_trips_through_the_parser() {
        let original = parse("retrieve,class=od,date=20240101/20240102").unwrap();
        let text = original[0].to_text();
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed[0].get("class"), original[0].get("class"));
        assert_eq!(reparsed[0].get("date"), original[0].get("date"));
    }

    #[test]
    fn missing_equals_is_a_parse_error() {
        let err = parse("retrieve,class od").unwrap_err();
        assert!(matches!(err, MarsError::Parse { .. }));
    }
}
