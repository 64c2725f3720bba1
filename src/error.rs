// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `device_tree_builder` crate.

use core::fmt;

/// An error reported by an [`FdtEncoder`](crate::writer::FdtEncoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The output buffer is too small for the data being written.
    NoSpace,
    /// The operation is not valid in the encoder's current state, e.g. a
    /// property emitted outside of any node.
    BadState,
    /// A node name contains a `/` or a NUL character.
    BadName,
    /// A length or offset does not fit in the 32-bit fields of the format.
    TooLarge,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpace => write!(f, "insufficient space in the output buffer"),
            Self::BadState => write!(f, "operation not valid in the current encoder state"),
            Self::BadName => write!(f, "invalid node name"),
            Self::TooLarge => write!(f, "value does not fit in a 32-bit field"),
        }
    }
}

impl core::error::Error for EncodeError {}

/// The encoding step during which flattening failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlattenStep {
    /// Placing the header at the start of the output buffer.
    Create,
    /// Terminating the memory reservation block.
    FinishReservemap,
    /// Opening a node record.
    BeginNode,
    /// Emitting a property record.
    Property,
    /// Closing a node record.
    EndNode,
    /// Writing the end token, the strings block and the final header.
    Finish,
}

impl fmt::Display for FlattenStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::FinishReservemap => "finish_reservemap",
            Self::BeginNode => "begin_node",
            Self::Property => "property",
            Self::EndNode => "end_node",
            Self::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// An error that can occur when flattening a device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct FlattenError {
    /// The step that failed.
    pub step: FlattenStep,
    /// The reason the encoder gave for the failure.
    pub cause: EncodeError,
}

impl FlattenError {
    pub(crate) fn new(step: FlattenStep, cause: EncodeError) -> Self {
        Self { step, cause }
    }
}

impl fmt::Display for FlattenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error flattening device tree: {}(): {}",
            self.step, self.cause
        )
    }
}

impl core::error::Error for FlattenError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.cause)
    }
}
