//! Keyword dispatch over `( keyword ( ... ) keyword ( ... ) )` blocks.
//!
//! Every schema decoder is a stack of these: a [`DispatchTable`] per nesting
//! level maps the keywords it understands to handlers, and
//! [`StfReader::parse_block`] walks one block calling them. Keywords nobody
//! registered are skipped with their block, so newer files with extra data
//! still load.

use crate::stf_lexer::Token;
use crate::stf_reader::{StfError, StfReader};

/// Outcome of offering a keyword to a [`BlockVisitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The visitor consumed the value or block after the keyword.
    Handled,
    /// Not a keyword of this block; the dispatcher skips what follows.
    Unknown,
}

/// Receives the keywords of one block, in file order.
pub trait BlockVisitor {
    /// Called with the reader positioned just after `keyword`. On
    /// [`Visit::Handled`] exactly the value or block belonging to the keyword
    /// must have been consumed.
    fn visit(&mut self, reader: &mut StfReader, keyword: &str) -> Result<Visit, StfError>;
}

pub type Handler<'h> = Box<dyn FnMut(&mut StfReader) -> Result<(), StfError> + 'h>;

/// Keyword to handler bindings for one block, built at the call site.
///
/// Lookup is ASCII case-insensitive. If a keyword is bound twice the first
/// binding wins.
#[derive(Default)]
pub struct DispatchTable<'h> {
    entries: Vec<(&'static str, Handler<'h>)>,
}

impl<'h> DispatchTable<'h> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn on(
        mut self,
        keyword: &'static str,
        handler: impl FnMut(&mut StfReader) -> Result<(), StfError> + 'h,
    ) -> Self {
        self.entries.push((keyword, Box::new(handler)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlockVisitor for DispatchTable<'_> {
    fn visit(&mut self, reader: &mut StfReader, keyword: &str) -> Result<Visit, StfError> {
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
        {
            Some((_, handler)) => {
                handler(reader)?;
                Ok(Visit::Handled)
            }
            None => Ok(Visit::Unknown),
        }
    }
}

impl StfReader {
    /// Walk one `( ... )` block, offering each keyword to `visitor`.
    ///
    /// With `open_consumed` the caller has already taken the `(` (usually
    /// because leading positional values had to be read first). Returns once
    /// the matching `)` is consumed; running out of input first is an error.
    pub fn parse_block<V: BlockVisitor + ?Sized>(
        &mut self,
        open_consumed: bool,
        visitor: &mut V,
    ) -> Result<(), StfError> {
        if !open_consumed {
            self.expect_open()?;
        }
        loop {
            match self.peek() {
                Token::RParen => {
                    self.expect_close()?;
                    return Ok(());
                }
                Token::Eof => {
                    return Err(self.err("unexpected end of file, expected `)`"));
                }
                _ => self.dispatch_one(visitor)?,
            }
        }
    }

    /// Walk the top level of a document: keywords until end of input, with
    /// no enclosing block.
    pub fn parse_file<V: BlockVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<(), StfError> {
        loop {
            match self.peek() {
                Token::Eof => return Ok(()),
                Token::RParen => return Err(self.err("unexpected `)` at top level")),
                _ => self.dispatch_one(visitor)?,
            }
        }
    }

    fn dispatch_one<V: BlockVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<(), StfError> {
        let line = self.line();
        if self.peek() == &Token::LParen {
            // a block with no keyword in front of it
            log::debug!("{}:{line}: skipping anonymous block", self.file_name());
            return self.skip_block();
        }
        let keyword = self.read_keyword()?;
        match visitor.visit(self, &keyword)? {
            Visit::Handled => log::trace!("{}:{line}: handled `{keyword}`", self.file_name()),
            Visit::Unknown => {
                log::debug!("{}:{line}: skipping unknown keyword `{keyword}`", self.file_name());
                self.skip_block()?;
            }
        }
        Ok(())
    }
}
