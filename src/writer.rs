// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential encoding of flattened device tree blobs.
//!
//! [`FdtEncoder`] is the contract the flattener drives: a tree is emitted as
//! a stream of node-begin, property and node-end records, bracketed by the
//! memory reservation block and the final fix-ups. [`FdtWriter`] implements
//! it on top of a fixed-size, caller-provided buffer and never writes past
//! its end.

use alloc::borrow::ToOwned;
use alloc::collections::btree_map::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use zerocopy::IntoBytes;

use crate::error::EncodeError;
use crate::fdt::{
    FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_LAST_COMP_VERSION, FDT_MAGIC, FDT_PROP,
    FDT_TAGSIZE, FDT_VERSION, FdtHeader, FdtPropHeader, FdtReserveEntry, align_tag_offset,
};
use crate::memreserve::MemoryReservation;

/// A sink for the records of a flattened device tree.
///
/// Calls must follow the order of the format: `finish_reservemap` once, then
/// a balanced sequence of `begin_node`/`end_node` pairs enclosing the
/// `property` calls of each node, then `finish` once.
pub trait FdtEncoder {
    /// Terminates the memory reservation block and starts the structure
    /// block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block cannot be terminated.
    fn finish_reservemap(&mut self) -> Result<(), EncodeError>;

    /// Opens a node record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn begin_node(&mut self, name: &str) -> Result<(), EncodeError>;

    /// Emits a property of the currently open node.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn property(&mut self, name: &str, value: &[u8]) -> Result<(), EncodeError>;

    /// Closes the currently open node.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn end_node(&mut self) -> Result<(), EncodeError>;

    /// Completes the blob and returns its total size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be completed.
    fn finish(&mut self) -> Result<usize, EncodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Reservations,
    Structure { depth: usize, root_closed: bool },
    Finished,
}

/// An [`FdtEncoder`] writing into a fixed-size byte buffer.
///
/// Property names are collected into a deduplicated strings block, which is
/// placed after the structure block by [`FdtWriter::finish`]. Space for
/// pending strings is accounted for at every step, so running out of room is
/// reported by the call that would overflow.
///
/// # Examples
///
/// ```
/// # use device_tree_builder::writer::{FdtEncoder, FdtWriter};
/// let mut buf = [0u8; 128];
/// let mut writer = FdtWriter::new(&mut buf).unwrap();
/// writer.finish_reservemap().unwrap();
/// writer.begin_node("").unwrap();
/// writer.property("model", b"test\0").unwrap();
/// writer.end_node().unwrap();
/// let size = writer.finish().unwrap();
/// assert_eq!(size, 98);
/// ```
#[derive(Debug)]
pub struct FdtWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    off_dt_struct: usize,
    state: WriterState,
    strings_block: Vec<u8>,
    string_map: BTreeMap<String, u32>,
}

impl<'a> FdtWriter<'a> {
    /// Starts a new blob at the beginning of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NoSpace`] if `buf` cannot hold the header, or
    /// [`EncodeError::TooLarge`] if its length does not fit in 32 bits.
    pub fn new(buf: &'a mut [u8]) -> Result<Self, EncodeError> {
        let totalsize = u32::try_from(buf.len()).map_err(|_| EncodeError::TooLarge)?;
        let header_size = size_of::<FdtHeader>();
        let header = FdtHeader {
            magic: FDT_MAGIC.into(),
            totalsize: totalsize.into(),
            off_dt_struct: 0u32.into(),
            off_dt_strings: 0u32.into(),
            off_mem_rsvmap: to_u32(header_size)?.into(),
            version: FDT_VERSION.into(),
            last_comp_version: FDT_LAST_COMP_VERSION.into(),
            boot_cpuid_phys: 0u32.into(),
            size_dt_strings: 0u32.into(),
            size_dt_struct: 0u32.into(),
        };
        header
            .write_to_prefix(buf)
            .map_err(|_| EncodeError::NoSpace)?;

        Ok(Self {
            buf,
            pos: header_size,
            off_dt_struct: 0,
            state: WriterState::Reservations,
            strings_block: Vec::new(),
            string_map: BTreeMap::new(),
        })
    }

    /// Appends an entry to the memory reservation block.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::BadState`] once the reservation block has been
    /// terminated, or [`EncodeError::NoSpace`] if the entry does not fit.
    pub fn add_reservation(&mut self, reservation: MemoryReservation) -> Result<(), EncodeError> {
        if self.state != WriterState::Reservations {
            return Err(EncodeError::BadState);
        }
        let entry = FdtReserveEntry::from(reservation);
        self.reserve(size_of::<FdtReserveEntry>(), 0)?
            .copy_from_slice(entry.as_bytes());
        Ok(())
    }

    /// Returns the number of bytes written so far, not counting pending
    /// strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pos
    }

    /// Returns `true` if nothing past the header has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == size_of::<FdtHeader>()
    }

    /// Claims the next `len` bytes of the structure area, provided they fit
    /// together with the strings block and `extra_strings` more bytes of
    /// strings.
    fn reserve(&mut self, len: usize, extra_strings: usize) -> Result<&mut [u8], EncodeError> {
        let end = self.pos.checked_add(len).ok_or(EncodeError::TooLarge)?;
        let needed = end
            .checked_add(self.strings_block.len() + extra_strings)
            .ok_or(EncodeError::TooLarge)?;
        if needed > self.buf.len() {
            return Err(EncodeError::NoSpace);
        }
        let start = self.pos;
        self.pos = end;
        let slice = &mut self.buf[start..end];
        slice.fill(0);
        Ok(slice)
    }

    /// Returns the node depth and whether the root has been closed, if the
    /// structure block is being written.
    fn structure_state(&self) -> Result<(usize, bool), EncodeError> {
        match self.state {
            WriterState::Structure { depth, root_closed } => Ok((depth, root_closed)),
            _ => Err(EncodeError::BadState),
        }
    }
}

impl FdtEncoder for FdtWriter<'_> {
    fn finish_reservemap(&mut self) -> Result<(), EncodeError> {
        if self.state != WriterState::Reservations {
            return Err(EncodeError::BadState);
        }
        // The terminating entry is all zeroes.
        self.reserve(size_of::<FdtReserveEntry>(), 0)?;
        self.off_dt_struct = self.pos;
        self.state = WriterState::Structure {
            depth: 0,
            root_closed: false,
        };
        Ok(())
    }

    fn begin_node(&mut self, name: &str) -> Result<(), EncodeError> {
        let (depth, root_closed) = self.structure_state()?;
        if root_closed {
            return Err(EncodeError::BadState);
        }
        if name.contains(['/', '\0']) {
            return Err(EncodeError::BadName);
        }

        let record_len = FDT_TAGSIZE + align_tag_offset(name.len() + 1);
        let record = self.reserve(record_len, 0)?;
        record[..FDT_TAGSIZE].copy_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
        record[FDT_TAGSIZE..FDT_TAGSIZE + name.len()].copy_from_slice(name.as_bytes());

        self.state = WriterState::Structure {
            depth: depth + 1,
            root_closed,
        };
        Ok(())
    }

    fn property(&mut self, name: &str, value: &[u8]) -> Result<(), EncodeError> {
        let (depth, _) = self.structure_state()?;
        if depth == 0 {
            return Err(EncodeError::BadState);
        }
        if name.contains('\0') {
            return Err(EncodeError::BadName);
        }

        let existing = self.string_map.get(name).copied();
        let new_string_len = if existing.is_some() { 0 } else { name.len() + 1 };
        let nameoff = match existing {
            Some(offset) => offset,
            None => to_u32(self.strings_block.len())?,
        };
        let prop_header = FdtPropHeader {
            len: to_u32(value.len())?.into(),
            nameoff: nameoff.into(),
        };

        let value_start = FDT_TAGSIZE + size_of::<FdtPropHeader>();
        let record_len = align_tag_offset(value_start + value.len());
        let record = self.reserve(record_len, new_string_len)?;
        record[..FDT_TAGSIZE].copy_from_slice(&FDT_PROP.to_be_bytes());
        record[FDT_TAGSIZE..value_start].copy_from_slice(prop_header.as_bytes());
        record[value_start..value_start + value.len()].copy_from_slice(value);

        if existing.is_none() {
            self.strings_block.extend_from_slice(name.as_bytes());
            self.strings_block.push(0);
            self.string_map.insert(name.to_owned(), nameoff);
        }
        Ok(())
    }

    fn end_node(&mut self) -> Result<(), EncodeError> {
        let (depth, _) = self.structure_state()?;
        if depth == 0 {
            return Err(EncodeError::BadState);
        }
        self.reserve(FDT_TAGSIZE, 0)?
            .copy_from_slice(&FDT_END_NODE.to_be_bytes());
        self.state = WriterState::Structure {
            depth: depth - 1,
            root_closed: depth == 1,
        };
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, EncodeError> {
        let (depth, root_closed) = self.structure_state()?;
        if depth != 0 || !root_closed {
            return Err(EncodeError::BadState);
        }
        self.reserve(FDT_TAGSIZE, 0)?
            .copy_from_slice(&FDT_END.to_be_bytes());

        let off_dt_strings = self.pos;
        let totalsize = off_dt_strings + self.strings_block.len();
        self.buf[off_dt_strings..totalsize].copy_from_slice(&self.strings_block);

        let header = FdtHeader {
            magic: FDT_MAGIC.into(),
            totalsize: to_u32(totalsize)?.into(),
            off_dt_struct: to_u32(self.off_dt_struct)?.into(),
            off_dt_strings: to_u32(off_dt_strings)?.into(),
            off_mem_rsvmap: to_u32(size_of::<FdtHeader>())?.into(),
            version: FDT_VERSION.into(),
            last_comp_version: FDT_LAST_COMP_VERSION.into(),
            boot_cpuid_phys: 0u32.into(),
            size_dt_strings: to_u32(self.strings_block.len())?.into(),
            size_dt_struct: to_u32(off_dt_strings - self.off_dt_struct)?.into(),
        };
        header
            .write_to_prefix(self.buf)
            .map_err(|_| EncodeError::NoSpace)?;

        self.pos = totalsize;
        self.state = WriterState::Finished;
        Ok(totalsize)
    }
}

fn to_u32(value: usize) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::TooLarge)
}
