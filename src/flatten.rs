// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::error::{FlattenError, FlattenStep};
use crate::model::{DeviceTree, NodeId};
use crate::writer::{FdtEncoder, FdtWriter};

impl DeviceTree {
    /// Flattens the tree below `root` into a blob of at most `capacity`
    /// bytes.
    ///
    /// The blob has an empty memory reservation block. Nodes are emitted in
    /// depth-first preorder: each node's properties in their current order,
    /// then its children in the order they were added.
    ///
    /// The returned buffer is truncated to the total size recorded in the
    /// blob's header.
    ///
    /// # Errors
    ///
    /// Returns a [`FlattenError`] naming the step that failed, typically
    /// because `capacity` is too small. No partial output is returned.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not a root node.
    ///
    /// # Examples
    ///
    /// ```
    /// # use device_tree_builder::model::DeviceTree;
    /// let mut tree = DeviceTree::new();
    /// let root = tree.root();
    /// tree[root].set_property_cells("#address-cells", &[2]);
    /// let dtb = tree.flatten(root, 4096).unwrap();
    /// assert_eq!(&dtb[..4], &[0xd0, 0x0d, 0xfe, 0xed]);
    ///
    /// let err = tree.flatten(root, 60).unwrap_err();
    /// assert_eq!(err.to_string(), "error flattening device tree: begin_node(): insufficient space in the output buffer");
    /// ```
    pub fn flatten(&self, root: NodeId, capacity: usize) -> Result<Vec<u8>, FlattenError> {
        assert!(self[root].is_root(), "only a root node can be flattened");

        let mut dtb = vec![0; capacity];
        let result = FdtWriter::new(&mut dtb)
            .map_err(|e| FlattenError::new(FlattenStep::Create, e))
            .and_then(|mut writer| self.flatten_into(root, &mut writer));

        match result {
            Ok(size) => {
                debug!("flattened device tree into {size} of {capacity} bytes");
                dtb.truncate(size);
                Ok(dtb)
            }
            Err(e) => {
                warn!("{e} (capacity {capacity} bytes)");
                Err(e)
            }
        }
    }

    /// Drives `encoder` through the records of the tree below `root` and
    /// returns the size reported by [`FdtEncoder::finish`].
    ///
    /// The first failing call aborts the traversal; nothing else is emitted
    /// after it.
    ///
    /// # Errors
    ///
    /// Returns a [`FlattenError`] wrapping the first error reported by
    /// `encoder`.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not a root node.
    pub fn flatten_into<E: FdtEncoder + ?Sized>(
        &self,
        root: NodeId,
        encoder: &mut E,
    ) -> Result<usize, FlattenError> {
        assert!(self[root].is_root(), "only a root node can be flattened");

        encoder
            .finish_reservemap()
            .map_err(|e| FlattenError::new(FlattenStep::FinishReservemap, e))?;
        self.flatten_node(root, encoder)?;
        encoder
            .finish()
            .map_err(|e| FlattenError::new(FlattenStep::Finish, e))
    }

    fn flatten_node<E: FdtEncoder + ?Sized>(
        &self,
        id: NodeId,
        encoder: &mut E,
    ) -> Result<(), FlattenError> {
        let node = &self[id];
        trace!("flattening node `{}`", node.name());

        encoder
            .begin_node(node.name())
            .map_err(|e| FlattenError::new(FlattenStep::BeginNode, e))?;

        for prop in node.properties() {
            encoder
                .property(prop.name(), prop.value())
                .map_err(|e| FlattenError::new(FlattenStep::Property, e))?;
        }

        for child in node.children() {
            self.flatten_node(child, encoder)?;
        }

        encoder
            .end_node()
            .map_err(|e| FlattenError::new(FlattenStep::EndNode, e))
    }
}
