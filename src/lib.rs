// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for building device trees in memory and flattening them into
//! Flattened Device Tree (FDT) blobs.
//!
//! The library is write-only: it produces blobs for firmware, boot loaders
//! and guest kernels to consume, but does not parse them.
//!
//! ## Building a tree
//!
//! A [`DeviceTree`](model::DeviceTree) owns all of its nodes and hands out
//! [`NodeId`](model::NodeId) handles to them. Nodes are created with
//! [`DeviceTree::add_subnode`](model::DeviceTree::add_subnode), found by
//! path with [`DeviceTree::get_node`](model::DeviceTree::get_node), and their
//! properties are set through
//! [`DeviceTreeNode`](model::DeviceTreeNode) helpers that take care of the
//! big-endian encoding of cells and 64-bit values.
//!
//! ## Flattening
//!
//! [`DeviceTree::flatten`](model::DeviceTree::flatten) walks the tree and
//! drives an [`FdtWriter`](writer::FdtWriter) over a buffer of the requested
//! capacity. Property order and child order are preserved exactly in the
//! output. Running out of space is reported as a
//! [`FlattenError`](error::FlattenError) naming the failing step.
//!
//! # Examples
//!
//! ```
//! use device_tree_builder::model::DeviceTree;
//!
//! let mut tree = DeviceTree::new();
//! let root = tree.root();
//! tree[root].set_property_string("compatible", "linux,dummy-virt");
//! tree[root].set_property_cells("#address-cells", &[2]);
//! tree[root].set_property_cells("#size-cells", &[2]);
//!
//! let memory = tree.add_subnode(root, "memory@40000000");
//! tree[memory].set_property_string("device_type", "memory");
//! tree[memory].set_property_u64s("reg", &[0x4000_0000, 0x800_0000]);
//!
//! let intc = tree.add_subnode(root, "intc@8000000");
//! tree[intc].set_phandle(1);
//! tree[root].set_property_cells("interrupt-parent", &[1]);
//!
//! let dtb = tree.flatten(root, 0x1000).unwrap();
//! assert_eq!(&dtb[..4], &0xd00d_feed_u32.to_be_bytes());
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

extern crate alloc;

pub mod error;
mod fdt;
mod flatten;
pub mod memreserve;
pub mod model;
pub mod writer;

pub use error::FlattenError;
pub use memreserve::MemoryReservation;
