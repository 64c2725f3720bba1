// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A minimal FDT decoder used to check flattened output.

#![allow(dead_code)]

use std::ffi::CStr;

use device_tree_builder::error::EncodeError;
use device_tree_builder::model::{DeviceTree, NodeId};
use device_tree_builder::writer::FdtEncoder;
use zerocopy::byteorder::big_endian;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, Unaligned, Immutable, KnownLayout)]
pub struct Header {
    pub magic: big_endian::U32,
    pub totalsize: big_endian::U32,
    pub off_dt_struct: big_endian::U32,
    pub off_dt_strings: big_endian::U32,
    pub off_mem_rsvmap: big_endian::U32,
    pub version: big_endian::U32,
    pub last_comp_version: big_endian::U32,
    pub boot_cpuid_phys: big_endian::U32,
    pub size_dt_strings: big_endian::U32,
    pub size_dt_struct: big_endian::U32,
}

/// An owned node read back from a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub properties: Vec<(String, Vec<u8>)>,
    pub children: Vec<Node>,
}

impl Node {
    /// Converts the subtree of `tree` below `id` for comparison.
    pub fn from_tree(tree: &DeviceTree, id: NodeId) -> Self {
        let node = &tree[id];
        Self {
            name: node.name().to_owned(),
            properties: node
                .properties()
                .map(|prop| (prop.name().to_owned(), prop.value().to_vec()))
                .collect(),
            children: node
                .children()
                .map(|child| Self::from_tree(tree, child))
                .collect(),
        }
    }
}

/// A decoded blob.
#[derive(Debug)]
pub struct Blob {
    pub header: Header,
    pub reservations: Vec<(u64, u64)>,
    pub root: Node,
    pub strings: Vec<u8>,
}

/// Decodes `dtb`, panicking on anything malformed.
pub fn decode(dtb: &[u8]) -> Blob {
    let (header, _) = Header::read_from_prefix(dtb).unwrap();
    assert_eq!(header.magic.get(), FDT_MAGIC);
    assert_eq!(header.totalsize.get() as usize, dtb.len());
    assert_eq!(header.version.get(), 17);
    assert_eq!(header.last_comp_version.get(), 16);

    let mut reservations = Vec::new();
    let mut offset = header.off_mem_rsvmap.get() as usize;
    loop {
        let address = read_u64(dtb, offset);
        let size = read_u64(dtb, offset + 8);
        offset += 16;
        if address == 0 && size == 0 {
            break;
        }
        reservations.push((address, size));
    }
    assert_eq!(offset, header.off_dt_struct.get() as usize);

    let strings_start = header.off_dt_strings.get() as usize;
    let strings_end = strings_start + header.size_dt_strings.get() as usize;
    let strings = &dtb[strings_start..strings_end];

    let struct_start = header.off_dt_struct.get() as usize;
    let mut cursor = Cursor {
        dtb,
        strings,
        offset: struct_start,
    };
    assert_eq!(cursor.token(), FDT_BEGIN_NODE);
    let root = cursor.node();
    assert_eq!(cursor.token(), FDT_END);
    assert_eq!(
        cursor.offset - struct_start,
        header.size_dt_struct.get() as usize
    );
    assert_eq!(cursor.offset, strings_start);

    Blob {
        header,
        reservations,
        root,
        strings: strings.to_vec(),
    }
}

struct Cursor<'a> {
    dtb: &'a [u8],
    strings: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn token(&mut self) -> u32 {
        loop {
            let token = read_u32(self.dtb, self.offset);
            self.offset += 4;
            if token != FDT_NOP {
                return token;
            }
        }
    }

    /// Reads a node whose `FDT_BEGIN_NODE` token has been consumed.
    fn node(&mut self) -> Node {
        let name = c_str(&self.dtb[self.offset..]);
        self.offset = (self.offset + name.len() + 1).next_multiple_of(4);

        let mut node = Node {
            name,
            properties: Vec::new(),
            children: Vec::new(),
        };
        loop {
            match self.token() {
                FDT_PROP => {
                    let len = read_u32(self.dtb, self.offset) as usize;
                    let nameoff = read_u32(self.dtb, self.offset + 4) as usize;
                    let value_start = self.offset + 8;
                    let value = self.dtb[value_start..value_start + len].to_vec();
                    self.offset = (value_start + len).next_multiple_of(4);
                    assert!(
                        node.children.is_empty(),
                        "property after a child node"
                    );
                    node.properties.push((c_str(&self.strings[nameoff..]), value));
                }
                FDT_BEGIN_NODE => node.children.push(self.node()),
                FDT_END_NODE => return node,
                token => panic!("unexpected token {token:#x} at {:#x}", self.offset - 4),
            }
        }
    }
}

fn read_u32(dtb: &[u8], offset: usize) -> u32 {
    big_endian::U32::read_from_prefix(&dtb[offset..]).unwrap().0.get()
}

fn read_u64(dtb: &[u8], offset: usize) -> u64 {
    big_endian::U64::read_from_prefix(&dtb[offset..]).unwrap().0.get()
}

fn c_str(bytes: &[u8]) -> String {
    CStr::from_bytes_until_nul(bytes)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned()
}

/// An encoder call, as seen by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FinishReservemap,
    BeginNode(String),
    Property(String, Vec<u8>),
    EndNode,
    Finish,
}

/// An encoder that records every call and fails the `fail_at`-th one.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub fail_at: Option<(usize, EncodeError)>,
}

impl Recorder {
    pub fn failing_at(index: usize, error: EncodeError) -> Self {
        Self {
            events: Vec::new(),
            fail_at: Some((index, error)),
        }
    }

    fn record(&mut self, event: Event) -> Result<(), EncodeError> {
        let index = self.events.len();
        self.events.push(event);
        match self.fail_at {
            Some((fail_index, error)) if fail_index == index => Err(error),
            _ => Ok(()),
        }
    }
}

impl FdtEncoder for Recorder {
    fn finish_reservemap(&mut self) -> Result<(), EncodeError> {
        self.record(Event::FinishReservemap)
    }

    fn begin_node(&mut self, name: &str) -> Result<(), EncodeError> {
        self.record(Event::BeginNode(name.to_owned()))
    }

    fn property(&mut self, name: &str, value: &[u8]) -> Result<(), EncodeError> {
        self.record(Event::Property(name.to_owned(), value.to_vec()))
    }

    fn end_node(&mut self) -> Result<(), EncodeError> {
        self.record(Event::EndNode)
    }

    fn finish(&mut self) -> Result<usize, EncodeError> {
        self.record(Event::Finish)?;
        Ok(self.events.len())
    }
}
