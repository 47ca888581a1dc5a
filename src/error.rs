// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types
//!
//! Two families with different audiences:
//! - [`ValidationError`]: a cable write the user asked for is not allowed.
//!   Raised before anything is written.
//! - [`ContractViolation`]: the tracer was handed input that breaks its
//!   preconditions (mixed origins, dangling references). These indicate a
//!   bug or corrupted store and abort the operation.
//!
//! Incomplete, split and inactive paths are not errors; see
//! [`crate::path::PathState`].

use crate::types::{NodeKind, PathNode};
use uuid::Uuid;

/// A serialized path node carried a type id no [`NodeKind`] maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown path node type id: {0}")]
pub struct UnknownNodeKind(pub u8);

/// User-facing cable validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A new cable needs terminations on both ends
    #[error("Must define A and B terminations when creating a new cable")]
    MissingTerminations,

    /// A requested termination does not exist
    #[error("Termination not found: {0}")]
    UnknownTermination(Uuid),

    /// One end of the cable mixes termination kinds
    #[error("Cannot connect different termination types to same end of cable ({first} and {second})")]
    MixedTerminationTypes {
        /// Kind of the first termination on the end
        first: NodeKind,
        /// The first kind that differs from it
        second: NodeKind,
    },

    /// The two ends are not allowed to be cabled together
    #[error("Incompatible termination types: {a} and {b}")]
    IncompatibleTerminations {
        /// A-side kind
        a: NodeKind,
        /// B-side kind
        b: NodeKind,
    },

    /// The same object appears on both ends
    #[error("A and B terminations cannot connect to the same object ({0})")]
    SelfConnection(PathNode),

    /// Two multi-position rear ports with different position counts
    #[error("Rear ports with {a} and {b} positions cannot be connected; position counts must match")]
    RearPortPositionMismatch {
        /// A-side position count
        a: u16,
        /// B-side position count
        b: u16,
    },

    /// A front port cabled to the rear port it passes through to
    #[error("A front port cannot be connected to its corresponding rear port ({0})")]
    FrontPortToOwnRearPort(Uuid),

    /// One end is front ports of several rear ports, some multi-position
    #[error("Front ports on one end of a cable map to {count} rear ports; with multi-position rear ports they must share one")]
    FrontPortsSpanMultiPositionRearPorts {
        /// Number of distinct rear ports behind the end
        count: usize,
    },

    /// The termination already belongs to another cable
    #[error("{termination} already has a cable attached (#{cable})")]
    AlreadyCabled {
        /// The termination
        termination: PathNode,
        /// The cable it is attached to
        cable: Uuid,
    },

    /// The interface type never takes a cable (virtual, wireless, LAG...)
    #[error("Cables cannot be terminated to {interface_type} interfaces")]
    NonConnectableInterface {
        /// The offending interface type
        interface_type: String,
    },

    /// Circuit terminations on a provider network stay uncabled
    #[error("Circuit terminations attached to a provider network may not be cabled")]
    ProviderNetworkCircuit(Uuid),

    /// A length was given without a unit
    #[error("Must specify a unit when setting a cable length")]
    LengthWithoutUnit,

    /// A negative length
    #[error("Length must be a positive number (got {0})")]
    NegativeLength(f64),

    /// A termination failed its own structural checks
    #[error("Invalid termination {name}: {reason}")]
    InvalidTermination {
        /// Termination name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Broken tracer preconditions; fatal for the operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    /// Tracing needs at least one origin
    #[error("cannot trace a path from an empty termination set")]
    EmptyOrigin,

    /// A termination set mixes kinds
    #[error("termination set mixes {expected} and {found}")]
    MixedTerminationKinds {
        /// Kind of the first member
        expected: NodeKind,
        /// A differing kind
        found: NodeKind,
    },

    /// Multiple origins must share one cable
    #[error("origin terminations are attached to different cables")]
    OriginsOnDifferentCables,

    /// Terminations of one hop sit on different ends of the same cable
    #[error("terminations attached to cable {cable} disagree on their cable end")]
    InconsistentCableEnd {
        /// The cable
        cable: Uuid,
    },

    /// An endpoint row has no cable end recorded
    #[error("termination {termination} is attached to cable {cable} without a cable end")]
    MissingCableEnd {
        /// The termination
        termination: PathNode,
        /// The cable
        cable: Uuid,
    },

    /// A front port references a rear port the store does not have
    #[error("front port {front_port} references missing rear port {rear_port}")]
    MissingRearPort {
        /// The front port
        front_port: Uuid,
        /// The missing rear port
        rear_port: Uuid,
    },

    /// Front ports fanned into several rear ports, some multi-position
    #[error("front ports map to {count} rear ports and at least one has multiple positions")]
    AmbiguousRearPortPositions {
        /// Number of distinct rear ports
        count: usize,
    },

    /// Circuit terminations of one hop sit on different circuit sides
    #[error("circuit terminations reached over cable {cable} are on different circuit sides")]
    MixedCircuitSides {
        /// The cable
        cable: Uuid,
    },

    /// The trace ran past the configured segment ceiling
    #[error("path exceeds the maximum of {limit} segments")]
    HopLimitExceeded {
        /// The ceiling
        limit: usize,
    },
}

/// Crate-level error for store and plant operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested write is not allowed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The tracer's preconditions were broken
    #[error("cable path contract violated: {0}")]
    Contract(#[from] ContractViolation),

    /// Lookup of an object that does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up
        kind: &'static str,
        /// The key that missed
        id: String,
    },

    /// An object with this id already exists
    #[error("duplicate id: {0}")]
    DuplicateId(Uuid),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
