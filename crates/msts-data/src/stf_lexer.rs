//! Tokenizer for the MSTS structured text (STF) format.
//!
//! STF is whitespace separated: parentheses are always tokens of their own,
//! `"..."` delimits strings, and everything else is a bare word. Numbers and
//! their unit suffixes are bare words too (`10.5m`, `60mph`); the reader
//! decides how to interpret a word from the context it is read in.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    /// Keyword, identifier or number (with optional unit suffix).
    Word(String),
    /// Quoted string with escapes resolved and `+` concatenation applied.
    Str(String),
    Eof,
}

impl Token {
    /// Text of a word or string token.
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Word(w) => f.write_str(w),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Located<T> {
    pub value: T,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("line {line}, col {col}: {msg}")]
    Error {
        line: usize,
        col: usize,
        msg: String,
    },
}

/// Prefix of the signature line that opens MSTS text files.
const HEADER_PREFIX: &str = "SIMISA@";

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Cursor over the source that keeps line and column in step with the
/// characters it hands out.
#[derive(Clone)]
struct Cursor<'a> {
    chars: Chars<'a>,
    line: usize,
    col: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        match c {
            '\n' => {
                self.line += 1;
                self.col = 1;
            }
            '\r' => {
                // \r\n counts as one line break; a lone \r is one too
                if self.chars.peek() != Some(&'\n') {
                    self.line += 1;
                    self.col = 1;
                }
            }
            _ => self.col += 1,
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }
}

pub fn lex(input: &str) -> Result<Vec<Located<Token>>, LexError> {
    let mut tokens = Vec::new();
    let mut cur = Cursor::new(input);

    loop {
        cur.skip_whitespace();
        let Some(ch) = cur.peek() else {
            break;
        };
        let (line, col) = (cur.line, cur.col);

        let value = match ch {
            '(' => {
                cur.bump();
                Token::LParen
            }
            ')' => {
                cur.bump();
                Token::RParen
            }
            '"' => {
                let mut s = read_string(&mut cur)?;
                // "abc" + "def" continues the same string
                loop {
                    let mut ahead = cur.clone();
                    ahead.skip_whitespace();
                    if ahead.peek() != Some('+') {
                        break;
                    }
                    ahead.bump();
                    ahead.skip_whitespace();
                    if ahead.peek() != Some('"') {
                        break;
                    }
                    cur = ahead;
                    s.push_str(&read_string(&mut cur)?);
                }
                Token::Str(s)
            }
            _ => {
                let mut word = String::new();
                while let Some(c) = cur.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    cur.bump();
                }
                if tokens.is_empty() && word.starts_with(HEADER_PREFIX) {
                    continue;
                }
                Token::Word(word)
            }
        };

        tokens.push(Located { value, line, col });
    }

    tokens.push(Located {
        value: Token::Eof,
        line: cur.line,
        col: cur.col,
    });

    Ok(tokens)
}

/// Read a quoted string; the cursor sits on the opening quote.
fn read_string(cur: &mut Cursor<'_>) -> Result<String, LexError> {
    let (line, col) = (cur.line, cur.col);
    let unterminated = || LexError::Error {
        line,
        col,
        msg: "unterminated string".into(),
    };

    cur.bump();
    let mut s = String::new();
    loop {
        match cur.bump() {
            Some('"') => return Ok(s),
            Some('\\') => match cur.bump() {
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some(c) => s.push(c),
                None => return Err(unterminated()),
            },
            Some(c) => s.push(c),
            None => return Err(unterminated()),
        }
    }
}
