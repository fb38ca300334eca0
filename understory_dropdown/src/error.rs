// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the dropdown controller.

use alloc::string::String;

/// Structural misuse detected while rendering a [`Dropdown`](crate::Dropdown).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DropdownError {
    /// A direct child of the controller is not a dropdown child.
    ///
    /// Only reported when [`DropdownProps::strict_children`](crate::DropdownProps::strict_children)
    /// is set; otherwise the node is passed through untouched.
    #[error("invalid dropdown child at position {index}: `{kind}`")]
    InvalidChild {
        /// Position among the direct children.
        index: usize,
        /// Element kind of the offending node.
        kind: String,
    },
}
