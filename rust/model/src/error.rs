// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for model store operations.

use crate::element::GlobalId;

/// Result type alias for model store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or mutating a model store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced element does not exist in the store.
    #[error("element not found: {0}")]
    ElementNotFound(GlobalId),

    /// Two elements share the same GlobalId.
    #[error("duplicate element GlobalId: {0}")]
    DuplicateElement(GlobalId),

    /// A system, connection or containment record points at an unknown element.
    #[error("{context} references unknown element {id}")]
    UnknownReference { context: String, id: GlobalId },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Reading or writing a snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
