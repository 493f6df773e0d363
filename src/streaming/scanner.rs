//! Incremental markup tokenizer.
//!
//! Splits a buffered byte stream into text runs and markup tokens without
//! decoding anything: every byte read is appended verbatim to the caller's
//! buffer, so records can be reassembled exactly as they appeared. Only
//! enough structure is recognised to find where each token ends (quoted
//! attribute values, comments, CDATA sections, processing instructions and
//! declarations may all contain a bare `>`).

use crate::routes::{Result, RouteError};
use memchr::memchr;
use std::io::{self, BufRead};

/// Kind of token most recently appended by [`XmlScanner::next_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Character data up to the next `<`.
    Text,
    /// `<name ...>` or `<name .../>`.
    StartTag { self_closing: bool },
    /// `</name>`.
    EndTag,
    /// Comment, processing instruction, CDATA section or declaration.
    Markup,
}

/// Forward-only tokenizer over a buffered reader.
pub struct XmlScanner<R: BufRead> {
    reader: R,
    input: String,
    offset: u64,
}

impl<R: BufRead> XmlScanner<R> {
    pub fn new(reader: R, input: impl Into<String>) -> Self {
        Self {
            reader,
            input: input.into(),
            offset: 0,
        }
    }

    /// Name of the input used in diagnostics.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Append character data up to (not including) the next `<` to `buf`.
    ///
    /// Returns the number of bytes appended; zero means the next byte is
    /// `<` or the input is exhausted.
    pub fn read_text(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let mut copied = 0;
        loop {
            let available = self
                .reader
                .fill_buf()
                .map_err(|source| unreadable(&self.input, source))?;
            if available.is_empty() {
                break;
            }
            let (take, at_markup) = match memchr(b'<', available) {
                Some(pos) => (pos, true),
                None => (available.len(), false),
            };
            buf.extend_from_slice(&available[..take]);
            self.reader.consume(take);
            self.offset += take as u64;
            copied += take;
            if at_markup {
                break;
            }
        }
        Ok(copied)
    }

    /// Append the next token to `buf` and report its kind, or `None` at end
    /// of input.
    pub fn next_token(&mut self, buf: &mut Vec<u8>) -> Result<Option<TokenKind>> {
        if self.read_text(buf)? > 0 {
            return Ok(Some(TokenKind::Text));
        }

        let start = buf.len();
        let token_offset = self.offset;
        if self.read_chunk(buf)? == 0 {
            return Ok(None);
        }

        loop {
            if let Some(kind) = classify(&buf[start..]) {
                return Ok(Some(kind));
            }
            if self.read_chunk(buf)? == 0 {
                return Err(RouteError::Syntax {
                    input: self.input.clone(),
                    offset: token_offset,
                    message: format!("unterminated markup '{}'", preview(&buf[start..])),
                });
            }
        }
    }

    fn read_chunk(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let n = self
            .reader
            .read_until(b'>', buf)
            .map_err(|source| unreadable(&self.input, source))?;
        self.offset += n as u64;
        Ok(n)
    }
}

/// Classify a token that starts with `<`, or return `None` if it is not
/// complete yet.
fn classify(token: &[u8]) -> Option<TokenKind> {
    if token.last() != Some(&b'>') {
        return None;
    }

    if token.starts_with(b"<!--") {
        return (token.len() >= 7 && token.ends_with(b"-->")).then_some(TokenKind::Markup);
    }
    if token.starts_with(b"<![CDATA[") {
        return (token.len() >= 12 && token.ends_with(b"]]>")).then_some(TokenKind::Markup);
    }
    if token.starts_with(b"<?") {
        return (token.len() >= 4 && token.ends_with(b"?>")).then_some(TokenKind::Markup);
    }
    if token.starts_with(b"<!") {
        return (quotes_balanced(token) && brackets_balanced(token)).then_some(TokenKind::Markup);
    }

    if !quotes_balanced(token) {
        return None;
    }
    if token.starts_with(b"</") {
        Some(TokenKind::EndTag)
    } else {
        Some(TokenKind::StartTag {
            self_closing: token.ends_with(b"/>"),
        })
    }
}

#[inline]
fn quotes_balanced(token: &[u8]) -> bool {
    let mut quote: Option<u8> = None;
    for &b in token {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {}
        }
    }
    quote.is_none()
}

// DOCTYPE internal subsets: `<!DOCTYPE routes [ <!ENTITY ...> ]>`
fn brackets_balanced(token: &[u8]) -> bool {
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for &b in token {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
    depth == 0
}

fn unreadable(input: &str, source: io::Error) -> RouteError {
    RouteError::InputUnreadable {
        input: input.to_string(),
        source,
    }
}

fn preview(token: &[u8]) -> String {
    let end = token.len().min(40);
    String::from_utf8_lossy(&token[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(content: &str) -> Vec<(TokenKind, String)> {
        let mut scanner = XmlScanner::new(content.as_bytes(), "test");
        let mut out = Vec::new();
        let mut buf = Vec::new();
        while let Some(kind) = scanner.next_token(&mut buf).unwrap() {
            out.push((kind, String::from_utf8(buf.clone()).unwrap()));
            buf.clear();
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        let toks = tokens("<a x=\"1\">hi<b/></a>");
        assert_eq!(
            toks,
            vec![
                (
                    TokenKind::StartTag {
                        self_closing: false
                    },
                    "<a x=\"1\">".to_string()
                ),
                (TokenKind::Text, "hi".to_string()),
                (TokenKind::StartTag { self_closing: true }, "<b/>".to_string()),
                (TokenKind::EndTag, "</a>".to_string()),
            ]
        );
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let toks = tokens("<person note='a > b' depart=\"1\"/>");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].0, TokenKind::StartTag { self_closing: true });
        assert_eq!(toks[0].1, "<person note='a > b' depart=\"1\"/>");
    }

    #[test]
    fn test_comment_and_cdata_with_gt() {
        let toks = tokens("<!-- a > b --><![CDATA[x > y]]><?pi a>b?>");
        let kinds: Vec<_> = toks.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![TokenKind::Markup; 3]);
        assert_eq!(toks[0].1, "<!-- a > b -->");
        assert_eq!(toks[1].1, "<![CDATA[x > y]]>");
        assert_eq!(toks[2].1, "<?pi a>b?>");
    }

    #[test]
    fn test_doctype_with_internal_subset() {
        let toks = tokens("<!DOCTYPE r [<!ENTITY e \"v\">]><r/>");
        assert_eq!(toks[0].0, TokenKind::Markup);
        assert_eq!(toks[0].1, "<!DOCTYPE r [<!ENTITY e \"v\">]>");
        assert_eq!(toks[1].0, TokenKind::StartTag { self_closing: true });
    }

    #[test]
    fn test_doctype_bracket_inside_literal() {
        let toks = tokens("<!DOCTYPE r [<!ENTITY e \"]\">]><r/>");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].0, TokenKind::Markup);
        assert_eq!(toks[0].1, "<!DOCTYPE r [<!ENTITY e \"]\">]>");
        assert_eq!(toks[1].0, TokenKind::StartTag { self_closing: true });
    }

    #[test]
    fn test_read_failure_names_input() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("device gone"))
            }
        }

        let mut scanner = XmlScanner::new(io::BufReader::new(Broken), "flaky.rou.xml");
        let err = scanner.next_token(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, RouteError::InputUnreadable { .. }), "{err:?}");
        assert!(err.to_string().contains("flaky.rou.xml"));
    }

    #[test]
    fn test_offset_tracks_consumed_bytes() {
        let content = "  <a/>\n";
        let mut scanner = XmlScanner::new(content.as_bytes(), "test");
        let mut buf = Vec::new();
        while scanner.next_token(&mut buf).unwrap().is_some() {}
        assert_eq!(scanner.offset(), content.len() as u64);
        assert_eq!(buf, content.as_bytes());
    }

    #[test]
    fn test_unterminated_tag() {
        let mut scanner = XmlScanner::new(&b"<a x=\"1>"[..], "cut.xml");
        let mut buf = Vec::new();
        let err = scanner.next_token(&mut buf).unwrap_err();
        match err {
            RouteError::Syntax { input, offset, .. } => {
                assert_eq!(input, "cut.xml");
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_small_buffer_boundaries() {
        let content = "<routes>\n  <vehicle id=\"v\"/>\n  <!-- c -->\n</routes>";
        let reader = std::io::BufReader::with_capacity(3, content.as_bytes());
        let mut scanner = XmlScanner::new(reader, "tiny");
        let mut buf = Vec::new();
        let mut count = 0;
        while scanner.next_token(&mut buf).unwrap().is_some() {
            count += 1;
        }
        assert_eq!(buf, content.as_bytes());
        assert_eq!(count, 7);
    }
}
