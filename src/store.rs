// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Termination store interfaces and the in-memory topology store
//!
//! The tracer only ever talks to a [`TerminationStore`]; the path record
//! additionally needs the write side in [`PathStore`]. [`Topology`] is the
//! in-memory implementation backing [`crate::graph::CablePlant`].
//!
//! Every collection returned here comes back in store insertion order so
//! that tracing the same topology twice yields identical paths.

use crate::path::CablePath;
use crate::types::{
    Cable, CableEnd, CableEndpoint, Location, NodeKind, PathNode, PathObject, ProviderNetwork,
    Termination, TerminationKind, Topology,
};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Read access to terminations and cables, as the path builder needs it
pub trait TerminationStore {
    /// Look up a single termination
    fn termination(&self, node: PathNode) -> Option<Termination>;

    /// Look up a cable
    fn cable(&self, id: Uuid) -> Option<Cable>;

    /// Look up a provider network
    fn provider_network(&self, id: Uuid) -> Option<ProviderNetwork>;

    /// Look up a location
    fn location(&self, id: Uuid) -> Option<Location>;

    /// Current cable and cable end of a termination, if it is cabled
    fn cable_and_side(&self, termination: &Termination) -> (Option<Cable>, Option<CableEnd>);

    /// All terminations on the end of `cable` opposite to `side`
    fn remote_endpoints(&self, cable: Uuid, side: CableEnd) -> Vec<Termination>;

    /// Bulk fetch of every object of one kind among `ids`
    fn batch_load(&self, kind: NodeKind, ids: &[Uuid]) -> HashMap<Uuid, PathObject>;

    /// Distinct rear ports the given front ports pass through to
    fn rear_ports_for_front_ports(&self, front_ports: &[Termination]) -> Vec<Termination>;

    /// Front ports of the given rear ports, optionally only at `positions`
    fn front_ports_for_rear_ports(
        &self,
        rear_ports: &[Uuid],
        positions: Option<&[u16]>,
    ) -> Vec<Termination>;

    /// The circuit termination on the other side of the same circuit
    fn paired_circuit_termination(&self, termination: &Termination) -> Option<Termination>;
}

/// Persistence of cable path records
pub trait PathStore: TerminationStore {
    /// Look up a path record
    fn path(&self, id: Uuid) -> Option<CablePath>;

    /// Ids of every path whose node index contains `node`
    fn paths_containing(&self, node: PathNode) -> Vec<Uuid>;

    /// Insert or replace a path record and point its origins at it
    fn save_path(&mut self, path: &CablePath);

    /// Remove a path record and clear every pointer to it
    fn delete_path(&mut self, id: Uuid);
}

impl Topology {
    /// Look up a termination by id alone
    #[must_use]
    pub fn termination_by_id(&self, id: Uuid) -> Option<&Termination> {
        self.terminations.iter().find(|t| t.id == id)
    }

    /// Mutable lookup of a termination by id
    pub fn termination_by_id_mut(&mut self, id: Uuid) -> Option<&mut Termination> {
        self.terminations.iter_mut().find(|t| t.id == id)
    }

    /// Borrowing lookup of a cable
    #[must_use]
    pub fn cable_ref(&self, id: Uuid) -> Option<&Cable> {
        self.cables.iter().find(|c| c.id == id)
    }

    /// The endpoint row attaching `node` to a cable, if any
    #[must_use]
    pub fn endpoint_of(&self, node: PathNode) -> Option<&CableEndpoint> {
        self.endpoints.iter().find(|e| e.termination == node)
    }

    /// Terminations attached to one end of a cable
    #[must_use]
    pub fn terminations_on(&self, cable: Uuid, end: CableEnd) -> Vec<Termination> {
        self.endpoints
            .iter()
            .filter(|e| e.cable == cable && e.cable_end == end)
            .filter_map(|e| self.termination_by_id(e.termination.id).cloned())
            .collect()
    }

    /// Display name of a termination, prefixed with its device when known
    #[must_use]
    pub fn display_name(&self, termination: &Termination) -> String {
        let device = termination
            .device
            .and_then(|id| self.devices.iter().find(|d| d.id == id));
        match device {
            Some(d) => format!("{}:{}", d.name, termination.name),
            None => termination.name.clone(),
        }
    }

    /// Display name of any path object
    #[must_use]
    pub fn object_name(&self, object: &PathObject) -> String {
        match object {
            PathObject::Termination(t) => self.display_name(t),
            PathObject::Cable(c) => c.label.clone().unwrap_or_else(|| format!("#{}", short_id(c.id))),
            PathObject::ProviderNetwork(n) => n.name.clone(),
            PathObject::Location(l) => l.name.clone(),
        }
    }

    /// Replace the endpoints on one end of a cable with `terminations`
    ///
    /// Returns the nodes that were detached. The device cache on each
    /// endpoint is refreshed from its termination.
    pub fn reconcile_endpoints(
        &mut self,
        cable: Uuid,
        end: CableEnd,
        terminations: &[Termination],
    ) -> Vec<PathNode> {
        let wanted: BTreeSet<PathNode> = terminations.iter().map(Termination::node).collect();

        let mut removed = Vec::new();
        self.endpoints.retain(|e| {
            if e.cable == cable && e.cable_end == end && !wanted.contains(&e.termination) {
                removed.push(e.termination);
                false
            } else {
                true
            }
        });

        for termination in terminations {
            let node = termination.node();
            match self
                .endpoints
                .iter_mut()
                .find(|e| e.cable == cable && e.cable_end == end && e.termination == node)
            {
                Some(existing) => existing.device = termination.device,
                None => self.endpoints.push(CableEndpoint {
                    cable,
                    cable_end: end,
                    termination: node,
                    device: termination.device,
                }),
            }
        }

        removed
    }

    /// Destinations of the path originating at `termination`
    #[must_use]
    pub fn connected_endpoints(&self, termination: Uuid) -> Vec<PathObject> {
        self.termination_by_id(termination)
            .and_then(|t| t.path)
            .and_then(|id| self.paths.iter().find(|p| p.id == id))
            .map(|p| p.destinations(self).to_vec())
            .unwrap_or_default()
    }
}

/// First eight hex digits of an id, for compact display
#[must_use]
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

impl TerminationStore for Topology {
    fn termination(&self, node: PathNode) -> Option<Termination> {
        self.termination_by_id(node.id)
            .filter(|t| t.node_kind() == node.kind)
            .cloned()
    }

    fn cable(&self, id: Uuid) -> Option<Cable> {
        self.cable_ref(id).cloned()
    }

    fn provider_network(&self, id: Uuid) -> Option<ProviderNetwork> {
        self.provider_networks.iter().find(|n| n.id == id).cloned()
    }

    fn location(&self, id: Uuid) -> Option<Location> {
        self.locations.iter().find(|l| l.id == id).cloned()
    }

    fn cable_and_side(&self, termination: &Termination) -> (Option<Cable>, Option<CableEnd>) {
        match self.endpoint_of(termination.node()) {
            Some(endpoint) => (self.cable(endpoint.cable), Some(endpoint.cable_end)),
            None => (None, None),
        }
    }

    fn remote_endpoints(&self, cable: Uuid, side: CableEnd) -> Vec<Termination> {
        self.terminations_on(cable, side.opposite())
    }

    fn batch_load(&self, kind: NodeKind, ids: &[Uuid]) -> HashMap<Uuid, PathObject> {
        let wanted: BTreeSet<Uuid> = ids.iter().copied().collect();
        match kind {
            NodeKind::Cable => self
                .cables
                .iter()
                .filter(|c| wanted.contains(&c.id))
                .map(|c| (c.id, PathObject::Cable(c.clone())))
                .collect(),
            NodeKind::ProviderNetwork => self
                .provider_networks
                .iter()
                .filter(|n| wanted.contains(&n.id))
                .map(|n| (n.id, PathObject::ProviderNetwork(n.clone())))
                .collect(),
            NodeKind::Location => self
                .locations
                .iter()
                .filter(|l| wanted.contains(&l.id))
                .map(|l| (l.id, PathObject::Location(l.clone())))
                .collect(),
            _ => self
                .terminations
                .iter()
                .filter(|t| t.node_kind() == kind && wanted.contains(&t.id))
                .map(|t| (t.id, PathObject::Termination(t.clone())))
                .collect(),
        }
    }

    fn rear_ports_for_front_ports(&self, front_ports: &[Termination]) -> Vec<Termination> {
        let wanted: BTreeSet<Uuid> = front_ports
            .iter()
            .filter_map(|fp| fp.rear_port_mapping().map(|(rear_port, _)| rear_port))
            .collect();
        self.terminations
            .iter()
            .filter(|t| wanted.contains(&t.id) && t.node_kind() == NodeKind::RearPort)
            .cloned()
            .collect()
    }

    fn front_ports_for_rear_ports(
        &self,
        rear_ports: &[Uuid],
        positions: Option<&[u16]>,
    ) -> Vec<Termination> {
        self.terminations
            .iter()
            .filter(|t| match t.rear_port_mapping() {
                Some((rear_port, position)) => {
                    rear_ports.contains(&rear_port)
                        && positions.map_or(true, |p| p.contains(&position))
                }
                None => false,
            })
            .cloned()
            .collect()
    }

    fn paired_circuit_termination(&self, termination: &Termination) -> Option<Termination> {
        let TerminationKind::CircuitTermination {
            circuit, term_side, ..
        } = termination.kind
        else {
            return None;
        };
        self.terminations
            .iter()
            .find(|t| {
                t.id != termination.id
                    && matches!(
                        t.kind,
                        TerminationKind::CircuitTermination { circuit: c, term_side: s, .. }
                            if c == circuit && s == term_side.opposite()
                    )
            })
            .cloned()
    }
}

impl PathStore for Topology {
    fn path(&self, id: Uuid) -> Option<CablePath> {
        self.paths.iter().find(|p| p.id == id).cloned()
    }

    fn paths_containing(&self, node: PathNode) -> Vec<Uuid> {
        self.paths
            .iter()
            .filter(|p| p.contains(node))
            .map(|p| p.id)
            .collect()
    }

    fn save_path(&mut self, path: &CablePath) {
        let origins: BTreeSet<Uuid> = path
            .path
            .first()
            .map(|group| group.iter().map(|n| n.id).collect())
            .unwrap_or_default();

        match self.paths.iter_mut().find(|p| p.id == path.id) {
            Some(existing) => *existing = path.detached(),
            None => self.paths.push(path.detached()),
        }

        // One pass over the terminations: point origins here, drop stale pointers
        for termination in &mut self.terminations {
            if origins.contains(&termination.id) {
                termination.path = Some(path.id);
            } else if termination.path == Some(path.id) {
                termination.path = None;
            }
        }
    }

    fn delete_path(&mut self, id: Uuid) {
        self.paths.retain(|p| p.id != id);
        for termination in &mut self.terminations {
            if termination.path == Some(id) {
                termination.path = None;
            }
        }
    }
}
