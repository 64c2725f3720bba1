// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::string::String;
use alloc::vec::Vec;

use indexmap::IndexMap;
use twox_hash::xxhash64;

use super::NodeId;
use super::property::DeviceTreeProperty;

/// The name of the phandle property.
pub const PHANDLE: &str = "phandle";
/// The legacy name of the phandle property, still read by older kernels.
pub const LINUX_PHANDLE: &str = "linux,phandle";

/// A node of a [`DeviceTree`](super::DeviceTree).
///
/// Properties are kept in an [`IndexMap`], which provides O(1) lookups by
/// name while preserving the order in which they are flattened. Children are
/// handles into the owning tree, in attachment order.
#[derive(Debug, Clone)]
pub struct DeviceTreeNode {
    name: String,
    parent: Option<NodeId>,
    properties: IndexMap<String, DeviceTreeProperty, xxhash64::State>,
    pub(super) children: Vec<NodeId>,
}

impl DeviceTreeNode {
    /// # Panics
    ///
    /// Panics if `name` contains a `/`.
    pub(super) fn new(name: String, parent: Option<NodeId>) -> Self {
        assert!(
            !name.contains('/'),
            "node name `{name}` must not contain `/`"
        );
        Self {
            name,
            parent,
            properties: IndexMap::with_hasher(xxhash64::State::with_seed(0xdead_cafe)),
            children: Vec::new(),
        }
    }

    /// Returns the name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent of this node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns `true` if this node is the root of its tree.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns the children of this node, in the order they were added.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().copied()
    }

    /// Returns the properties of this node, in the order they are flattened.
    pub fn properties(&self) -> impl Iterator<Item = &DeviceTreeProperty> {
        self.properties.values()
    }

    /// Finds a property by its name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// tree[root].set_property("my-prop", [1, 2, 3, 4]);
    /// let prop = tree[root].property("my-prop").unwrap();
    /// assert_eq!(prop.value(), &[1, 2, 3, 4]);
    /// assert!(tree[root].property("other").is_none());
    /// ```
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&DeviceTreeProperty> {
        self.properties.get(name)
    }

    /// Sets a property, replacing any existing property of the same name.
    ///
    /// The property is always placed last, so replacing a value also moves it
    /// to the end of the property order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// tree[root].set_property("a", [1]);
    /// tree[root].set_property("b", [2]);
    /// tree[root].set_property("a", [3]);
    /// let names: Vec<_> = tree[root].properties().map(|p| p.name()).collect();
    /// assert_eq!(names, ["b", "a"]);
    /// ```
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> &DeviceTreeProperty {
        let name = name.into();
        self.properties.shift_remove(&name);
        let property = DeviceTreeProperty::new(name.clone(), value.into());
        let (index, _) = self.properties.insert_full(name, property);
        &self.properties[index]
    }

    /// Removes a property by its name. Does nothing if there is no such
    /// property.
    pub fn delete_property(&mut self, name: &str) {
        self.properties.shift_remove(name);
    }

    /// Sets a property with an empty value, as used for boolean properties.
    pub fn set_property_empty(&mut self, name: impl Into<String>) -> &DeviceTreeProperty {
        self.set_property(name, Vec::new())
    }

    /// Sets a property to a NUL-terminated string.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// let prop = tree[root].set_property_string("compatible", "linux,dummy-virt");
    /// assert_eq!(prop.value(), b"linux,dummy-virt\0");
    /// ```
    pub fn set_property_string(
        &mut self,
        name: impl Into<String>,
        value: &str,
    ) -> &DeviceTreeProperty {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.set_property(name, bytes)
    }

    /// Sets a property to a list of 32-bit cells, each stored big-endian.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// let prop = tree[root].set_property_cells("interrupts", &[0, 0x2a, 4]);
    /// assert_eq!(prop.value(), &[0, 0, 0, 0, 0, 0, 0, 0x2a, 0, 0, 0, 4]);
    /// ```
    pub fn set_property_cells(
        &mut self,
        name: impl Into<String>,
        cells: &[u32],
    ) -> &DeviceTreeProperty {
        let bytes: Vec<u8> = cells.iter().flat_map(|cell| cell.to_be_bytes()).collect();
        self.set_property(name, bytes)
    }

    /// Sets a property to a list of 64-bit values, each stored big-endian.
    pub fn set_property_u64s(
        &mut self,
        name: impl Into<String>,
        values: &[u64],
    ) -> &DeviceTreeProperty {
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|value| value.to_be_bytes())
            .collect();
        self.set_property(name, bytes)
    }

    /// Sets `name` to a copy of the value of the property `source`.
    ///
    /// Returns `None`, leaving the node unchanged, if there is no property
    /// called `source`.
    pub fn copy_property(
        &mut self,
        source: &str,
        name: impl Into<String>,
    ) -> Option<&DeviceTreeProperty> {
        let value = self.properties.get(source)?.value().to_vec();
        Some(self.set_property(name, value))
    }

    /// Sets both the `phandle` and the legacy `linux,phandle` property to
    /// `phandle`.
    ///
    /// # Panics
    ///
    /// Panics if `phandle` is 0 or `0xffff_ffff`, which are reserved.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// let intc = tree.add_subnode(root, "intc");
    /// tree[intc].set_phandle(1);
    /// assert_eq!(tree[intc].property("phandle").unwrap().as_u32(), Some(1));
    /// assert_eq!(tree[intc].property("linux,phandle").unwrap().as_u32(), Some(1));
    /// ```
    pub fn set_phandle(&mut self, phandle: u32) {
        assert!(
            phandle != 0 && phandle != u32::MAX,
            "phandle {phandle:#x} is reserved"
        );
        self.set_property_cells(LINUX_PHANDLE, &[phandle]);
        self.set_property_cells(PHANDLE, &[phandle]);
    }
}
