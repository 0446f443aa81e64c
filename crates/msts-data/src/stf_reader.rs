//! Token source over one STF document.
//!
//! [`StfReader`] owns the lexed tokens of a whole file and hands them out one
//! at a time. There is a single token of lookahead and no backtracking; the
//! block dispatcher in [`crate::dispatch`] is built on top of it.

use std::path::{Path, PathBuf};

use msts_types::{Unit, UnitClass, UnitMismatch};

use crate::numeric::{self, NumericError};
use crate::stf_lexer::{self, LexError, Located, Token};

#[derive(Debug, thiserror::Error)]
pub enum StfError {
    /// A delimiter or leaf value is missing or of the wrong kind.
    #[error("{file}:{line}:{col}: {msg}")]
    Structural {
        file: String,
        line: usize,
        col: usize,
        msg: String,
    },
    #[error("{file}:{line}:{col}: {source}")]
    Unit {
        file: String,
        line: usize,
        col: usize,
        #[source]
        source: UnitMismatch,
    },
    #[error("{file}: {source}")]
    Lex {
        file: String,
        #[source]
        source: LexError,
    },
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct StfReader {
    file: String,
    tokens: Vec<Located<Token>>,
    pos: usize,
}

impl StfReader {
    /// Read and tokenize the file at `path`.
    ///
    /// The whole file is read up front, so the handle is closed again before
    /// this returns, whether or not lexing succeeds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| StfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path.display().to_string(), &decode_text(&bytes))
    }

    /// Tokenize in-memory source; `file` is only used in diagnostics.
    pub fn from_source(file: impl Into<String>, input: &str) -> Result<Self, StfError> {
        let file = file.into();
        let tokens = match stf_lexer::lex(input) {
            Ok(tokens) => tokens,
            Err(source) => return Err(StfError::Lex { file, source }),
        };
        Ok(Self {
            file,
            tokens: strip_comment_blocks(tokens),
            pos: 0,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.line).unwrap_or(0)
    }

    pub fn col(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.col).unwrap_or(0)
    }

    pub fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.value)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// The next token if it could be a keyword. Compare with
    /// `eq_ignore_ascii_case`; keywords are case-insensitive.
    pub fn peek_keyword(&self) -> Option<&str> {
        self.peek().text()
    }

    /// True when the next token closes the current block (or the input ended).
    pub fn at_block_end(&self) -> bool {
        matches!(self.peek(), Token::RParen | Token::Eof)
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    pub fn err(&self, msg: &str) -> StfError {
        StfError::Structural {
            file: self.file.clone(),
            line: self.line(),
            col: self.col(),
            msg: msg.into(),
        }
    }

    fn unit_err(&self, line: usize, col: usize, source: UnitMismatch) -> StfError {
        StfError::Unit {
            file: self.file.clone(),
            line,
            col,
            source,
        }
    }

    pub fn expect(&mut self, expected: &Token) -> Result<(), StfError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(&format!("expected `{expected}`, got `{}`", self.peek())))
        }
    }

    pub fn expect_open(&mut self) -> Result<(), StfError> {
        self.expect(&Token::LParen)
    }

    pub fn expect_close(&mut self) -> Result<(), StfError> {
        self.expect(&Token::RParen)
    }

    /// Consume a keyword (a word or string token).
    pub fn read_keyword(&mut self) -> Result<String, StfError> {
        match self.peek() {
            Token::Word(_) | Token::Str(_) => Ok(self.read_item()),
            tok => Err(self.err(&format!("expected keyword, got `{tok}`"))),
        }
    }

    fn read_item(&mut self) -> String {
        match self.advance() {
            Token::Word(s) | Token::Str(s) => s,
            _ => String::new(),
        }
    }

    /// Any value token as text: quoted strings, bare words and numbers alike.
    pub fn read_string(&mut self) -> Result<String, StfError> {
        match self.peek() {
            Token::Word(_) | Token::Str(_) => Ok(self.read_item()),
            tok => Err(self.err(&format!("expected string, got `{tok}`"))),
        }
    }

    /// Read an integer. When the next token closes the block `default` is
    /// returned without consuming anything; a missing value without a
    /// default, or end of file, is an error.
    pub fn read_int(&mut self, default: Option<i32>) -> Result<i32, StfError> {
        if let (Token::RParen, Some(d)) = (self.peek(), default) {
            return Ok(d);
        }
        let text = self.read_string()?;
        text.parse::<i32>().map_err(|_| {
            self.err_before(&format!("expected integer, got `{text}`"))
        })
    }

    pub fn read_uint(&mut self, default: Option<u32>) -> Result<u32, StfError> {
        if let (Token::RParen, Some(d)) = (self.peek(), default) {
            return Ok(d);
        }
        let text = self.read_string()?;
        text.parse::<u32>().map_err(|_| {
            self.err_before(&format!("expected unsigned integer, got `{text}`"))
        })
    }

    /// Read a number, converting an optional unit suffix of `class` to the
    /// class's canonical unit. Without a suffix `default_unit` applies, or
    /// the value is taken as canonical when that is `None` too.
    pub fn read_number(
        &mut self,
        class: UnitClass,
        default_unit: Option<Unit>,
    ) -> Result<f32, StfError> {
        let (line, col) = (self.line(), self.col());
        let text = self.read_string()?;
        match numeric::to_canonical(&text, class, default_unit) {
            Ok(v) => Ok(v as f32),
            Err(NumericError::Unit(mismatch)) => Err(self.unit_err(line, col, mismatch)),
            Err(e @ NumericError::NotANumber(_)) => Err(self.err_before(&e.to_string())),
        }
    }

    /// `( <number> ... )`; the remainder of the block is ignored.
    pub fn read_number_block(
        &mut self,
        class: UnitClass,
        default_unit: Option<Unit>,
    ) -> Result<f32, StfError> {
        self.expect_open()?;
        let v = self.read_number(class, default_unit)?;
        self.skip_rest_of_block()?;
        Ok(v)
    }

    /// `( <integer> ... )`
    pub fn read_uint_block(&mut self, default: Option<u32>) -> Result<u32, StfError> {
        self.expect_open()?;
        let v = self.read_uint(default)?;
        self.skip_rest_of_block()?;
        Ok(v)
    }

    /// `( <string> ... )`
    pub fn read_string_block(&mut self) -> Result<String, StfError> {
        self.expect_open()?;
        let s = self.read_string()?;
        self.skip_rest_of_block()?;
        Ok(s)
    }

    /// Skip everything up to and including the `)` closing the current block.
    pub fn skip_rest_of_block(&mut self) -> Result<(), StfError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Eof => return Err(self.err("unexpected end of file, expected `)`")),
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                Token::RParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip the block that follows a keyword, if there is one. A keyword not
    /// followed by `(` stands alone and nothing more is consumed.
    pub fn skip_block(&mut self) -> Result<(), StfError> {
        if self.peek() == &Token::LParen {
            self.advance();
            self.skip_rest_of_block()
        } else {
            Ok(())
        }
    }

    /// Structural error located at the token just consumed.
    pub(crate) fn err_before(&self, msg: &str) -> StfError {
        let tok = self
            .pos
            .checked_sub(1)
            .and_then(|p| self.tokens.get(p));
        StfError::Structural {
            file: self.file.clone(),
            line: tok.map(|t| t.line).unwrap_or(0),
            col: tok.map(|t| t.col).unwrap_or(0),
            msg: msg.into(),
        }
    }
}

/// Decode raw file bytes. MSTS tools write UTF-16LE with a byte order mark;
/// hand-edited files are usually 8-bit.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        String::from_utf8_lossy(body).into_owned()
    }
}

fn is_comment_keyword(word: &str) -> bool {
    word.eq_ignore_ascii_case("comment")
        || word.eq_ignore_ascii_case("skip")
        || word.starts_with('_')
        || word.starts_with('#')
}

/// Drop `comment ( ... )`, `skip ( ... )` and `_x ( ... )` / `#x ( ... )`
/// blocks so decoders never see them.
fn strip_comment_blocks(tokens: Vec<Located<Token>>) -> Vec<Located<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(tok) = iter.next() {
        let is_comment = matches!(&tok.value, Token::Word(w) if is_comment_keyword(w))
            && iter.peek().is_some_and(|t| t.value == Token::LParen);
        if !is_comment {
            out.push(tok);
            continue;
        }
        let mut depth = 0usize;
        while let Some(t) = iter.peek() {
            match t.value {
                // leave an unbalanced comment's Eof for the parser to report
                Token::Eof => break,
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                _ => {}
            }
            iter.next();
            if depth == 0 {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(input: &str) -> StfReader {
        StfReader::from_source("test.stf", input).expect("lex")
    }

    #[test]
    fn read_scalars() {
        let mut r = reader("( 42 -7 \"name\" word )");
        r.expect_open().expect("(");
        assert_eq!(r.read_uint(None).expect("uint"), 42);
        assert_eq!(r.read_int(None).expect("int"), -7);
        assert_eq!(r.read_string().expect("string"), "name");
        assert_eq!(r.read_string().expect("word"), "word");
        assert!(r.at_block_end());
        r.expect_close().expect(")");
        assert!(r.at_eof());
    }

    #[test]
    fn int_default_at_block_end() {
        let mut r = reader("( )");
        r.expect_open().expect("(");
        assert_eq!(r.read_int(Some(3)).expect("default"), 3);
        assert!(r.read_int(None).is_err());
    }

    #[test]
    fn int_default_does_not_hide_truncation() {
        let mut r = reader("( 5");
        r.expect_open().expect("(");
        assert_eq!(r.read_uint(Some(1)).expect("value"), 5);
        let err = r.read_uint(Some(1)).unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }), "{err}");
        assert!(r.read_int(Some(-1)).is_err());
    }

    #[test]
    fn bad_integer_reports_its_position() {
        let mut r = reader("(\n  x1 )");
        r.expect_open().expect("(");
        let err = r.read_int(None).unwrap_err();
        assert_eq!(err.to_string(), "test.stf:2:3: expected integer, got `x1`");
    }

    #[test]
    fn expect_reports_mismatch() {
        let mut r = reader("world");
        let err = r.expect_open().unwrap_err();
        assert!(matches!(err, StfError::Structural { line: 1, col: 1, .. }));
        assert_eq!(err.to_string(), "test.stf:1:1: expected `(`, got `world`");
    }

    #[test]
    fn number_block_with_unit() {
        let mut r = reader("( 3ft extra ) next");
        let v = r
            .read_number_block(UnitClass::Distance, None)
            .expect("number");
        assert!((v - 0.9144).abs() < 1e-6);
        assert_eq!(r.peek_keyword(), Some("next"));
    }

    #[test]
    fn unit_error_points_at_the_number() {
        let mut r = reader("( 10.5mph )");
        let err = r
            .read_number_block(UnitClass::Distance, None)
            .unwrap_err();
        assert!(matches!(err, StfError::Unit { line: 1, col: 3, .. }));
        assert_eq!(
            err.to_string(),
            "test.stf:1:3: unit suffix `mph` is not a distance unit"
        );
    }

    #[test]
    fn skip_rest_of_nested_block() {
        let mut r = reader("( a ( b ( c ) ) d ) after");
        r.expect_open().expect("(");
        r.skip_rest_of_block().expect("skip");
        assert_eq!(r.peek_keyword(), Some("after"));
    }

    #[test]
    fn skip_rest_of_block_at_eof() {
        let mut r = reader("( a ( b )");
        r.expect_open().expect("(");
        let err = r.skip_rest_of_block().unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }));
    }

    #[test]
    fn skip_block_without_block() {
        let mut r = reader("value next");
        r.read_keyword().expect("keyword");
        r.skip_block().expect("nothing to skip");
        assert_eq!(r.peek_keyword(), Some("next"));
    }

    #[test]
    fn comment_blocks_are_invisible() {
        let mut r = reader(
            "comment ( ignored ( nested ) ) Skip ( x ) _info ( y ) #note ( z ) kept ( 1 )",
        );
        assert_eq!(r.read_keyword().expect("keyword"), "kept");
    }

    #[test]
    fn comment_word_without_block_is_kept() {
        let mut r = reader("( _flag )");
        r.expect_open().expect("(");
        assert_eq!(r.read_string().expect("string"), "_flag");
    }

    #[test]
    fn lex_errors_carry_the_file_name() {
        let err = StfReader::from_source("bad.env", "world ( \"open").err().expect("error");
        assert_eq!(
            err.to_string(),
            "bad.env: line 1, col 9: unterminated string"
        );
    }

    #[test]
    fn decode_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "world ( )".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "world ( )");
    }

    #[test]
    fn decode_utf8_with_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFworld"), "world");
        assert_eq!(decode_text(b"world"), "world");
    }

    #[test]
    fn open_missing_file() {
        let err = StfReader::open("/nonexistent/dir/file.env").err().expect("error");
        assert!(matches!(err, StfError::Io { .. }));
        assert!(err.to_string().starts_with("reading /nonexistent/dir/file.env: "));
    }
}
