// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A mutable, in-memory representation of a device tree.
//!
//! This module provides the [`DeviceTree`], [`DeviceTreeNode`], and
//! [`DeviceTreeProperty`] types, which are used to build a device tree in
//! memory. The [`DeviceTree`] can then be flattened to a blob.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use log::warn;

mod node;
mod property;
pub use node::{DeviceTreeNode, LINUX_PHANDLE, PHANDLE};
pub use property::DeviceTreeProperty;

/// A handle to a node of a [`DeviceTree`].
///
/// Handles are only meaningful for the tree that returned them. A handle to a
/// node removed with [`DeviceTree::remove_node`] is never reused, and using it
/// afterwards panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A mutable, in-memory representation of a device tree.
///
/// The tree owns all of its nodes; nodes are addressed through [`NodeId`]
/// handles and can be accessed by indexing the tree. Each node's children are
/// kept in the order they were added, which is also the order in which they
/// are flattened.
///
/// # Examples
///
/// ```
/// # use device_tree_builder::model::DeviceTree;
/// let mut tree = DeviceTree::new();
/// let root = tree.root();
/// let cpus = tree.add_subnode(root, "cpus");
/// let cpu0 = tree.add_subnode(cpus, "cpu@0");
/// tree[cpu0].set_property_string("device_type", "cpu");
///
/// assert_eq!(tree.get_node(root, "/cpus/cpu@0"), Some(cpu0));
/// assert_eq!(tree.get_node_relative(cpus, "cpu@0"), Some(cpu0));
/// ```
#[derive(Debug, Clone)]
pub struct DeviceTree {
    nodes: Vec<Option<DeviceTreeNode>>,
    root: NodeId,
}

impl Default for DeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTree {
    /// Creates a tree consisting of an unnamed root node, as expected of a
    /// complete device tree.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("")
    }

    /// Creates a tree consisting of a single root node with the given name.
    ///
    /// # Panics
    ///
    /// Panics if `name` contains a `/`.
    #[must_use]
    pub fn with_root(name: impl Into<String>) -> Self {
        let root = DeviceTreeNode::new(name.into(), None);
        Self {
            nodes: alloc::vec![Some(root)],
            root: NodeId(0),
        }
    }

    /// Returns the root node of the tree.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for `id`, or `None` if it has been removed.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DeviceTreeNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Returns the node for `id` mutably, or `None` if it has been removed.
    #[must_use]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DeviceTreeNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Creates a new node called `name` and appends it to the children of
    /// `parent`.
    ///
    /// Sibling names are not required to be unique, but path lookups only
    /// ever find the first child with a given name.
    ///
    /// # Panics
    ///
    /// Panics if `name` contains a `/` or if `parent` has been removed.
    pub fn add_subnode(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let name = name.into();
        if self.child(parent, &name).is_some() {
            warn!(
                "adding a duplicate node `{name}` under `{}`; it is unreachable by path",
                self.path(parent)
            );
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(DeviceTreeNode::new(name, Some(parent))));
        self[parent].children.push(id);
        id
    }

    /// Removes a node together with all of its descendants and their
    /// properties.
    ///
    /// # Panics
    ///
    /// Panics if `id` is the root of the tree or has already been removed.
    pub fn remove_node(&mut self, id: NodeId) {
        assert!(id != self.root, "the root node cannot be removed");
        let parent = self[id].parent().expect("only the root has no parent");
        self[parent].children.retain(|&child| child != id);

        let mut pending = alloc::vec![id];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes[id.0].take() {
                pending.extend(node.children);
            }
        }
    }

    /// Finds the first direct child of `node` called `name`.
    #[must_use]
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self[node].children().find(|&child| self[child].name() == name)
    }

    /// Resolves a `/`-separated path relative to `node`.
    ///
    /// Each segment names a direct child of the node found so far; resolution
    /// stops at the first segment that does not match. An empty segment, such
    /// as the one after a trailing `/`, matches a child with an empty name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// let a = tree.add_subnode(root, "a");
    /// let b = tree.add_subnode(a, "b");
    /// assert_eq!(tree.get_node_relative(root, "a/b"), Some(b));
    /// assert_eq!(tree.get_node_relative(a, "b"), Some(b));
    /// assert_eq!(tree.get_node_relative(root, "a/x/b"), None);
    /// ```
    #[must_use]
    pub fn get_node_relative(&self, node: NodeId, path: &str) -> Option<NodeId> {
        path.split('/')
            .try_fold(node, |current, segment| self.child(current, segment))
    }

    /// Resolves an absolute path, starting at `root`.
    ///
    /// The leading `/` is stripped and the rest is resolved with
    /// [`get_node_relative`](Self::get_node_relative). In particular, `"/"`
    /// on its own names a child with an empty name rather than `root` itself.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not a root node or `path` does not start with `/`.
    #[must_use]
    pub fn get_node(&self, root: NodeId, path: &str) -> Option<NodeId> {
        assert!(self[root].is_root(), "path lookup must start at a root node");
        let Some(relative) = path.strip_prefix('/') else {
            panic!("path `{path}` is not absolute");
        };
        self.get_node_relative(root, relative)
    }

    /// Resolves an absolute path from the root of this tree.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        self.get_node(self.root, path)
    }

    /// Returns the absolute path of `node`, following parent links up to the
    /// root.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// let soc = tree.add_subnode(root, "soc");
    /// let uart = tree.add_subnode(soc, "uart@9000000");
    /// assert_eq!(tree.path(uart), "/soc/uart@9000000");
    /// assert_eq!(tree.path(root), "/");
    /// ```
    #[must_use]
    pub fn path(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = node;
        while let Some(parent) = self[current].parent() {
            segments.push(self[current].name());
            current = parent;
        }
        if segments.is_empty() {
            return String::from("/");
        }

        let mut path = String::new();
        for segment in segments.iter().rev() {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

impl Index<NodeId> for DeviceTree {
    type Output = DeviceTreeNode;

    fn index(&self, id: NodeId) -> &DeviceTreeNode {
        self.get(id)
            .unwrap_or_else(|| panic!("{id:?} does not refer to a node of this tree"))
    }
}

impl IndexMut<NodeId> for DeviceTree {
    fn index_mut(&mut self, id: NodeId) -> &mut DeviceTreeNode {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("{id:?} does not refer to a node of this tree"))
    }
}
