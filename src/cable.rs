// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cable write requests and validation
//!
//! A cable write arrives as a [`CableRequest`] (create) or [`CableUpdate`]
//! (modify). Both are checked by [`validate_cable`] against the resolved
//! A and B termination sets before the plant touches the store.

use crate::compat::CompatibilityTable;
use crate::error::ValidationError;
use crate::store::TerminationStore;
use crate::types::{Cable, CableStatus, CableType, LengthUnit, NodeKind, PathNode, Termination};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Request to create a cable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CableRequest {
    /// Fixed id (generated when absent)
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Physical media
    #[serde(rename = "type", default)]
    pub cable_type: Option<CableType>,
    /// Lifecycle status
    #[serde(default)]
    pub status: CableStatus,
    /// Label
    #[serde(default)]
    pub label: Option<String>,
    /// Color as a hex string
    #[serde(default)]
    pub color: Option<String>,
    /// Length in `length_unit`
    #[serde(default)]
    pub length: Option<f64>,
    /// Unit of `length`
    #[serde(default)]
    pub length_unit: Option<LengthUnit>,
    /// A-side termination ids
    #[serde(default)]
    pub a_terminations: Vec<Uuid>,
    /// B-side termination ids
    #[serde(default)]
    pub b_terminations: Vec<Uuid>,
}

impl CableRequest {
    /// Connected cable between two termination sets
    #[must_use]
    pub fn new(a_terminations: Vec<Uuid>, b_terminations: Vec<Uuid>) -> Self {
        Self {
            a_terminations,
            b_terminations,
            ..Self::default()
        }
    }

    /// Set the status
    #[must_use]
    pub fn with_status(mut self, status: CableStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the length
    #[must_use]
    pub fn with_length(mut self, length: f64, unit: LengthUnit) -> Self {
        self.length = Some(length);
        self.length_unit = Some(unit);
        self
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the media type
    #[must_use]
    pub fn with_type(mut self, cable_type: CableType) -> Self {
        self.cable_type = Some(cable_type);
        self
    }

    /// The cable record this request describes, with derived fields set
    #[must_use]
    pub fn to_cable(&self) -> Cable {
        let mut cable = Cable::new(self.id.unwrap_or_else(Uuid::new_v4));
        cable.cable_type = self.cable_type;
        cable.status = self.status;
        cable.label.clone_from(&self.label);
        cable.color.clone_from(&self.color);
        cable.length = self.length;
        cable.length_unit = self.length_unit;
        cable.refresh_derived();
        cable
    }
}

/// Partial modification of an existing cable
///
/// `None` leaves a field alone. `length: Some(None)` clears the length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CableUpdate {
    /// New status
    pub status: Option<CableStatus>,
    /// New media type
    pub cable_type: Option<CableType>,
    /// New label
    pub label: Option<String>,
    /// New color
    pub color: Option<String>,
    /// New length, or `Some(None)` to clear it
    pub length: Option<Option<f64>>,
    /// New length unit
    pub length_unit: Option<LengthUnit>,
    /// Replacement A-side termination ids
    pub a_terminations: Option<Vec<Uuid>>,
    /// Replacement B-side termination ids
    pub b_terminations: Option<Vec<Uuid>>,
}

impl CableUpdate {
    /// Apply the scalar fields to `cable` and refresh its derived fields
    pub fn apply_to(&self, cable: &mut Cable) {
        if let Some(status) = self.status {
            cable.status = status;
        }
        if self.cable_type.is_some() {
            cable.cable_type = self.cable_type;
        }
        if self.label.is_some() {
            cable.label.clone_from(&self.label);
        }
        if self.color.is_some() {
            cable.color.clone_from(&self.color);
        }
        if let Some(length) = self.length {
            cable.length = length;
        }
        if self.length_unit.is_some() {
            cable.length_unit = self.length_unit;
        }
        cable.refresh_derived();
    }

    /// Whether the update touches either termination set
    #[must_use]
    pub fn changes_terminations(&self) -> bool {
        self.a_terminations.is_some() || self.b_terminations.is_some()
    }
}

/// Check a cable and its resolved termination sets before writing
///
/// Rules are applied in a fixed order and the first failure is returned.
/// Terminations already attached to `cable` itself are not treated as
/// taken, so the same function validates creates and updates.
pub fn validate_cable<S>(
    store: &S,
    compat: &CompatibilityTable,
    cable: &Cable,
    a_terminations: &[Termination],
    b_terminations: &[Termination],
) -> Result<(), ValidationError>
where
    S: TerminationStore + ?Sized,
{
    if let Some(length) = cable.length {
        if cable.length_unit.is_none() {
            return Err(ValidationError::LengthWithoutUnit);
        }
        if length < 0.0 {
            return Err(ValidationError::NegativeLength(length));
        }
    }

    let (Some(a_head), Some(b_head)) = (a_terminations.first(), b_terminations.first()) else {
        return Err(ValidationError::MissingTerminations);
    };

    let a_kind = side_kind(a_terminations)?;
    let b_kind = side_kind(b_terminations)?;
    if !compat.is_compatible(a_kind, b_kind) {
        return Err(ValidationError::IncompatibleTerminations { a: a_kind, b: b_kind });
    }

    let a_nodes: BTreeSet<PathNode> = a_terminations.iter().map(Termination::node).collect();
    if let Some(shared) = b_terminations.iter().map(Termination::node).find(|n| a_nodes.contains(n)) {
        return Err(ValidationError::SelfConnection(shared));
    }

    if a_kind == NodeKind::RearPort && b_kind == NodeKind::RearPort {
        let a_positions = a_head.positions().unwrap_or(1);
        let b_positions = b_head.positions().unwrap_or(1);
        if a_positions > 1 && b_positions > 1 && a_positions != b_positions {
            return Err(ValidationError::RearPortPositionMismatch {
                a: a_positions,
                b: b_positions,
            });
        }
    }

    for (near, far) in [(a_terminations, b_terminations), (b_terminations, a_terminations)] {
        let far_ids: BTreeSet<Uuid> = far.iter().map(|t| t.id).collect();
        if let Some(front_port) = near
            .iter()
            .find(|t| t.rear_port_mapping().is_some_and(|(rear_port, _)| far_ids.contains(&rear_port)))
        {
            return Err(ValidationError::FrontPortToOwnRearPort(front_port.id));
        }
    }

    for (side, kind) in [(a_terminations, a_kind), (b_terminations, b_kind)] {
        if kind != NodeKind::FrontPort {
            continue;
        }
        let rear_ports = store.rear_ports_for_front_ports(side);
        if rear_ports.len() > 1 && rear_ports.iter().any(|rp| rp.positions().unwrap_or(1) > 1) {
            return Err(ValidationError::FrontPortsSpanMultiPositionRearPorts {
                count: rear_ports.len(),
            });
        }
    }

    for termination in a_terminations.iter().chain(b_terminations) {
        validate_termination(store, compat, cable, termination)?;
    }

    Ok(())
}

fn side_kind(terminations: &[Termination]) -> Result<NodeKind, ValidationError> {
    let first = terminations[0].node_kind();
    match terminations.iter().map(Termination::node_kind).find(|k| *k != first) {
        Some(second) => Err(ValidationError::MixedTerminationTypes { first, second }),
        None => Ok(first),
    }
}

fn validate_termination<S>(
    store: &S,
    compat: &CompatibilityTable,
    cable: &Cable,
    termination: &Termination,
) -> Result<(), ValidationError>
where
    S: TerminationStore + ?Sized,
{
    if let (Some(existing), _) = store.cable_and_side(termination) {
        if existing.id != cable.id {
            return Err(ValidationError::AlreadyCabled {
                termination: termination.node(),
                cable: existing.id,
            });
        }
    }

    if let Some(interface_type) = termination.interface_type() {
        if !compat.is_connectable_interface(interface_type) {
            return Err(ValidationError::NonConnectableInterface {
                interface_type: interface_type.to_string(),
            });
        }
    }

    if termination.provider_network().is_some() {
        return Err(ValidationError::ProviderNetworkCircuit(termination.id));
    }

    Ok(())
}
