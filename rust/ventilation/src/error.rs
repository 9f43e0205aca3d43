// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for ventilation analysis.

/// Result type alias for ventilation analysis.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during ventilation analysis.
///
/// Missing data (geometry, quantities, unmatched terminals) is never an
/// error: it is logged and the affected element contributes nothing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the supply nor the return marker occurs in the system name,
    /// so the traversal direction is unknown.
    #[error("cannot determine flow direction of system {system:?}")]
    UndeterminedFlowDirection { system: String },

    /// The system has no air-handling unit to start a traversal from.
    #[error("system {system:?} has no air-handling unit")]
    MissingAirHandlingUnit { system: String },

    /// Error raised by the model store.
    #[error(transparent)]
    Model(#[from] ifc_lite_hvac_model::Error),
}
