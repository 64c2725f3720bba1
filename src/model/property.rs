// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::string::String;
use alloc::vec::Vec;
use core::ffi::CStr;

use zerocopy::{FromBytes, big_endian};

/// A named, immutable byte value attached to a
/// [`DeviceTreeNode`](super::DeviceTreeNode).
///
/// Properties are created and replaced through the node's `set_property*`
/// methods; the value of an existing property is never modified in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTreeProperty {
    name: String,
    value: Vec<u8>,
}

impl DeviceTreeProperty {
    pub(crate) fn new(name: String, value: Vec<u8>) -> Self {
        Self { name, value }
    }

    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of this property.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the length of the value in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns `true` if the value is empty, as for boolean properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Returns the value as a single big-endian cell, or `None` if it is not
    /// exactly 4 bytes long.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// tree[root].set_property_cells("#address-cells", &[2]);
    /// assert_eq!(tree[root].property("#address-cells").unwrap().as_u32(), Some(2));
    /// ```
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        big_endian::U32::read_from_bytes(&self.value)
            .ok()
            .map(big_endian::U32::get)
    }

    /// Returns the value as a single big-endian 64-bit integer, or `None` if
    /// it is not exactly 8 bytes long.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        big_endian::U64::read_from_bytes(&self.value)
            .ok()
            .map(big_endian::U64::get)
    }

    /// Returns the value as a string, or `None` if it is not a single
    /// NUL-terminated UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// tree[root].set_property_string("model", "virt");
    /// assert_eq!(tree[root].property("model").unwrap().as_str(), Some("virt"));
    /// ```
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        CStr::from_bytes_with_nul(&self.value)
            .ok()
            .and_then(|cstr| cstr.to_str().ok())
    }
}
