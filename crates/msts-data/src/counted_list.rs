//! Lists that open with the number of records they contain:
//! `( <count> item ( ... ) item ( ... ) ... )`.
//!
//! Files in the wild do not always agree with their own counts, so the
//! declared count only sizes the result. Records past the count are consumed
//! and dropped; slots the file never filled stay `None`.

use crate::dispatch::{BlockVisitor, Visit};
use crate::stf_reader::{StfError, StfReader};

/// Largest record count a list may declare. Slots are allocated up front,
/// so anything above this is reported as a structural error.
pub const MAX_DECLARED_COUNT: usize = 1 << 20;

/// How record keywords are admitted against the remaining count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListGate {
    /// Decode a record only while the remaining count is positive.
    #[default]
    Counted,
    /// The first record is always decoded, whatever the count says; the
    /// rest are gated like [`ListGate::Counted`].
    FirstItemAlwaysProcessed,
}

/// Builds one record; receives the slot index it is destined for.
pub type ItemMaker<'m, T> = Box<dyn FnMut(&mut StfReader, usize) -> Result<T, StfError> + 'm>;

/// Explicit state of one counted list: the item keywords, the slots being
/// filled and how many records the count still admits.
pub struct CountedList<'m, T> {
    makers: Vec<(&'static str, ItemMaker<'m, T>)>,
    gate: ListGate,
    slots: Vec<Option<T>>,
    next_slot: usize,
    remaining: usize,
    seen: usize,
}

impl<'m, T> CountedList<'m, T> {
    pub fn new(declared: usize) -> Self {
        Self::with_reserved_head(declared, 0)
    }

    /// Like [`CountedList::new`] but with `reserved` leading slots that are
    /// never filled; the first record lands in slot `reserved`.
    ///
    /// `declared + reserved` slots are allocated immediately. Counts read
    /// from a file should go through [`StfReader::read_count`] first.
    pub fn with_reserved_head(declared: usize, reserved: usize) -> Self {
        let mut slots = Vec::with_capacity(declared + reserved);
        slots.resize_with(declared + reserved, || None);
        Self {
            makers: Vec::new(),
            gate: ListGate::Counted,
            slots,
            next_slot: reserved,
            remaining: declared,
            seen: 0,
        }
    }

    pub fn gate(mut self, gate: ListGate) -> Self {
        self.gate = gate;
        self
    }

    /// Register a record keyword.
    pub fn item(
        mut self,
        keyword: &'static str,
        maker: impl FnMut(&mut StfReader, usize) -> Result<T, StfError> + 'm,
    ) -> Self {
        self.makers.push((keyword, Box::new(maker)));
        self
    }

    /// Records the declared count still admits.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn into_slots(self) -> Vec<Option<T>> {
        self.slots
    }

    fn admits_next(&self) -> bool {
        match self.gate {
            ListGate::Counted => self.remaining > 0,
            ListGate::FirstItemAlwaysProcessed => self.seen == 0 || self.remaining > 0,
        }
    }
}

impl<T> BlockVisitor for CountedList<'_, T> {
    fn visit(&mut self, reader: &mut StfReader, keyword: &str) -> Result<Visit, StfError> {
        let Some(maker) = self
            .makers
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(keyword))
        else {
            return Ok(Visit::Unknown);
        };

        if !self.admits_next() {
            log::debug!(
                "{}:{}: `{keyword}` beyond the declared count, discarded",
                reader.file_name(),
                reader.line()
            );
            self.seen += 1;
            reader.skip_block()?;
            return Ok(Visit::Handled);
        }

        let index = self.next_slot;
        let item = (self.makers[maker].1)(reader, index)?;
        self.seen += 1;
        self.remaining = self.remaining.saturating_sub(1);
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(item);
                self.next_slot += 1;
            }
            None => log::debug!(
                "{}: `{keyword}` has no slot (declared count 0), discarded",
                reader.file_name()
            ),
        }
        Ok(Visit::Handled)
    }
}

impl StfReader {
    /// Read a declared record count, rejecting counts above
    /// [`MAX_DECLARED_COUNT`].
    pub fn read_count(&mut self) -> Result<usize, StfError> {
        let count = self.read_uint(None)? as usize;
        if count > MAX_DECLARED_COUNT {
            return Err(self.err_before(&format!(
                "declared count {count} exceeds the limit of {MAX_DECLARED_COUNT}"
            )));
        }
        Ok(count)
    }

    /// Read `( <count> records... )`. `build` receives the declared count and
    /// returns the list that will collect the records.
    pub fn read_counted_list<'m, T>(
        &mut self,
        build: impl FnOnce(usize) -> CountedList<'m, T>,
    ) -> Result<Vec<Option<T>>, StfError> {
        self.expect_open()?;
        let declared = self.read_count()?;
        let mut list = build(declared);
        self.parse_block(true, &mut list)?;
        if list.remaining() > 0 {
            log::debug!(
                "{}: list declared {declared} records, {} missing",
                self.file_name(),
                list.remaining()
            );
        }
        Ok(list.into_slots())
    }
}
