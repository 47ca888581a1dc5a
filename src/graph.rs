// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! The cable plant: topology persistence, cable writes and path upkeep
//!
//! [`CablePlant`] owns the [`Topology`] and is the only place cables are
//! written. Every cable write ends in [`CablePlant::after_cable_write`],
//! which retraces the paths the write could have changed. A petgraph view
//! of the physical topology backs DOT export and the partitioning of paths
//! into independent groups.

use crate::cable::{validate_cable, CableRequest, CableUpdate};
use crate::compat::CompatibilityTable;
use crate::error::{ContractViolation, Error, ValidationError};
use crate::path::{CablePath, PathState, RetraceOutcome};
use crate::store::{PathStore, TerminationStore};
use crate::trace::PathBuilder;
use crate::types::{
    CableEnd, Circuit, Device, Location, NodeKind, PathNode, PathObject, ProviderNetwork,
    Termination, TerminationKind, Topology, REARPORT_POSITIONS_MAX,
};
use anyhow::{Context, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Topology file inside the data directory
pub const TOPOLOGY_FILE: &str = "topology.json";

/// How two nodes of the plant graph are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Termination attached to a cable
    Attached(CableEnd),
    /// Front port passing through to its rear port
    PassThrough,
    /// The two sides of one circuit
    Circuit,
    /// Circuit termination ending in a provider network or location
    Terminates,
}

/// Bulk load document for [`CablePlant::import`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportDocument {
    /// Devices
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Provider networks
    #[serde(default)]
    pub provider_networks: Vec<ProviderNetwork>,
    /// Locations
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Circuits
    #[serde(default)]
    pub circuits: Vec<Circuit>,
    /// Terminations; rear ports are added before front ports
    #[serde(default)]
    pub terminations: Vec<Termination>,
    /// Cables, created in order
    #[serde(default)]
    pub cables: Vec<CableRequest>,
}

/// Counts from an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Terminations added
    pub terminations: usize,
    /// Cables created
    pub cables: usize,
    /// Paths stored afterwards
    pub paths: usize,
}

/// Outcome of [`CablePlant::trace_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSummary {
    /// Paths traced and stored
    pub traced: usize,
    /// Of those, complete
    pub complete: usize,
    /// Of those, split
    pub split: usize,
    /// Origins whose trace broke a contract
    pub failed: Vec<(PathNode, ContractViolation)>,
}

/// The physical topology with its traced paths
pub struct CablePlant {
    /// Undirected view of terminations, cables and circuit links
    graph: UnGraph<PathNode, Link>,
    /// Map from path node to graph index
    node_indices: HashMap<PathNode, NodeIndex>,
    /// The store
    pub topology: Topology,
    compat: CompatibilityTable,
    builder: PathBuilder,
}

impl Default for CablePlant {
    fn default() -> Self {
        Self::new()
    }
}

impl CablePlant {
    /// Create an empty plant with default compatibility and hop limit
    #[must_use]
    pub fn new() -> Self {
        Self::from_topology(Topology::default())
    }

    /// Wrap an existing topology
    #[must_use]
    pub fn from_topology(mut topology: Topology) -> Self {
        for path in &mut topology.paths {
            path.refresh_nodes();
        }
        let mut plant = Self {
            graph: UnGraph::new_undirected(),
            node_indices: HashMap::new(),
            topology,
            compat: CompatibilityTable::default(),
            builder: PathBuilder::default(),
        };
        plant.rebuild_graph();
        plant
    }

    /// Replace the compatibility table
    #[must_use]
    pub fn with_compatibility(mut self, compat: CompatibilityTable) -> Self {
        self.compat = compat;
        self
    }

    /// Replace the path builder
    #[must_use]
    pub fn with_builder(mut self, builder: PathBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The compatibility table in use
    #[must_use]
    pub fn compatibility(&self) -> &CompatibilityTable {
        &self.compat
    }

    /// The path builder in use
    #[must_use]
    pub fn builder(&self) -> PathBuilder {
        self.builder
    }

    /// Load the plant from a data directory containing topology.json
    pub fn load(dir: &Path) -> Result<Self> {
        let topology_path = dir.join(TOPOLOGY_FILE);

        let topology: Topology = if topology_path.exists() {
            let content = fs::read_to_string(&topology_path)
                .with_context(|| format!("Failed to read {}", topology_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", topology_path.display()))?
        } else {
            Topology::default()
        };

        debug!(
            terminations = topology.terminations.len(),
            cables = topology.cables.len(),
            paths = topology.paths.len(),
            "Loaded topology"
        );
        Ok(Self::from_topology(topology))
    }

    /// Save the plant to a data directory
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let topology_path = dir.join(TOPOLOGY_FILE);
        let json = serde_json::to_string_pretty(&self.topology)
            .context("Failed to serialize topology")?;
        fs::write(&topology_path, json)
            .with_context(|| format!("Failed to write {}", topology_path.display()))?;

        Ok(())
    }

    /// Rebuild the petgraph from the store
    pub fn rebuild_graph(&mut self) {
        self.graph.clear();
        self.node_indices.clear();

        let nodes: Vec<PathNode> = self
            .topology
            .terminations
            .iter()
            .map(Termination::node)
            .chain(self.topology.cables.iter().map(|c| c.node()))
            .chain(
                self.topology
                    .provider_networks
                    .iter()
                    .map(|n| PathNode::new(NodeKind::ProviderNetwork, n.id)),
            )
            .chain(
                self.topology
                    .locations
                    .iter()
                    .map(|l| PathNode::new(NodeKind::Location, l.id)),
            )
            .collect();
        for node in nodes {
            let idx = self.graph.add_node(node);
            self.node_indices.insert(node, idx);
        }

        let mut links: Vec<(PathNode, PathNode, Link)> = self
            .topology
            .endpoints
            .iter()
            .map(|e| {
                (
                    e.termination,
                    PathNode::new(NodeKind::Cable, e.cable),
                    Link::Attached(e.cable_end),
                )
            })
            .collect();

        // Circuit sides keyed by circuit, so pairing is one pass
        let mut circuit_sides: HashMap<Uuid, Vec<PathNode>> = HashMap::new();
        for termination in &self.topology.terminations {
            links.extend(structural_links(termination));
            if let TerminationKind::CircuitTermination { circuit, .. } = termination.kind {
                circuit_sides.entry(circuit).or_default().push(termination.node());
            }
        }
        for sides in circuit_sides.values() {
            if let [a, z] = sides.as_slice() {
                links.push((*a, *z, Link::Circuit));
            }
        }

        for (from, to, link) in links {
            self.add_link(from, to, link);
        }
    }

    /// Add one termination and its structural links to the graph
    fn link_termination(&mut self, termination: &Termination) {
        self.add_node(termination.node());
        for (from, to, link) in structural_links(termination) {
            self.add_link(from, to, link);
        }
        if let Some(peer) = self.topology.paired_circuit_termination(termination) {
            self.add_link(termination.node(), peer.node(), Link::Circuit);
        }
    }

    /// Add one cable and its endpoints to the graph
    fn link_cable(&mut self, cable: Uuid) {
        let node = PathNode::new(NodeKind::Cable, cable);
        self.add_node(node);
        let attached: Vec<(PathNode, CableEnd)> = self
            .topology
            .endpoints
            .iter()
            .filter(|e| e.cable == cable)
            .map(|e| (e.termination, e.cable_end))
            .collect();
        for (termination, end) in attached {
            self.add_link(termination, node, Link::Attached(end));
        }
    }

    fn add_link(&mut self, from: PathNode, to: PathNode, link: Link) {
        if let (Some(&from_idx), Some(&to_idx)) = (self.node_indices.get(&from), self.node_indices.get(&to)) {
            self.graph.add_edge(from_idx, to_idx, link);
        }
    }

    /// Put back `snapshot` when a write failed after touching the store
    fn restore_on_error<T>(&mut self, snapshot: Topology, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            warn!(%err, "Cable write aborted; restoring topology");
            self.topology = snapshot;
            self.rebuild_graph();
        }
        result
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Add a device
    pub fn add_device(&mut self, device: Device) -> Result<Uuid, Error> {
        if self.topology.devices.iter().any(|d| d.id == device.id) {
            return Err(Error::DuplicateId(device.id));
        }
        let id = device.id;
        self.topology.devices.push(device);
        Ok(id)
    }

    /// Add a provider network
    pub fn add_provider_network(&mut self, network: ProviderNetwork) -> Result<Uuid, Error> {
        if self.topology.provider_networks.iter().any(|n| n.id == network.id) {
            return Err(Error::DuplicateId(network.id));
        }
        let id = network.id;
        self.add_node(PathNode::new(NodeKind::ProviderNetwork, id));
        self.topology.provider_networks.push(network);
        Ok(id)
    }

    /// Add a location
    pub fn add_location(&mut self, location: Location) -> Result<Uuid, Error> {
        if self.topology.locations.iter().any(|l| l.id == location.id) {
            return Err(Error::DuplicateId(location.id));
        }
        let id = location.id;
        self.add_node(PathNode::new(NodeKind::Location, id));
        self.topology.locations.push(location);
        Ok(id)
    }

    /// Add a circuit
    pub fn add_circuit(&mut self, circuit: Circuit) -> Result<Uuid, Error> {
        if self.topology.circuits.iter().any(|c| c.id == circuit.id) {
            return Err(Error::DuplicateId(circuit.id));
        }
        let id = circuit.id;
        self.topology.circuits.push(circuit);
        Ok(id)
    }

    /// Add a termination after checking its references
    pub fn add_termination(&mut self, termination: Termination) -> Result<Uuid, Error> {
        if self.topology.termination_by_id(termination.id).is_some() {
            return Err(Error::DuplicateId(termination.id));
        }
        self.check_termination(&termination)?;

        let id = termination.id;
        let peer = self.topology.paired_circuit_termination(&termination);
        let snapshot = peer.as_ref().map(|_| self.topology.clone());
        self.link_termination(&termination);
        self.topology.terminations.push(termination);
        debug!(termination = %id, "Added termination");

        // A new far side can extend paths that stopped at its peer
        if let (Some(peer), Some(snapshot)) = (peer, snapshot) {
            let result = self.retrace_paths_containing(peer.node());
            self.restore_on_error(snapshot, result)?;
        }
        Ok(id)
    }

    fn check_termination(&self, termination: &Termination) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidTermination {
            name: termination.name.clone(),
            reason,
        };

        if let Some(device) = termination.device {
            if !self.topology.devices.iter().any(|d| d.id == device) {
                return Err(invalid(format!("device {device} not found")));
            }
        }

        match &termination.kind {
            TerminationKind::RearPort { positions } => {
                if !(1..=REARPORT_POSITIONS_MAX).contains(positions) {
                    return Err(invalid(format!(
                        "rear port positions must be between 1 and {REARPORT_POSITIONS_MAX}"
                    )));
                }
            }
            TerminationKind::FrontPort {
                rear_port,
                rear_port_position,
            } => {
                let Some(positions) = self
                    .topology
                    .termination_by_id(*rear_port)
                    .and_then(Termination::positions)
                else {
                    return Err(invalid(format!("rear port {rear_port} not found")));
                };
                if !(1..=positions).contains(rear_port_position) {
                    return Err(invalid(format!(
                        "position {rear_port_position} is out of range; rear port has {positions} position(s)"
                    )));
                }
                let taken = self
                    .topology
                    .front_ports_for_rear_ports(&[*rear_port], Some(&[*rear_port_position]));
                if let Some(other) = taken.first() {
                    return Err(invalid(format!(
                        "position {rear_port_position} is already mapped to front port {}",
                        other.name
                    )));
                }
            }
            TerminationKind::CircuitTermination {
                circuit,
                term_side,
                provider_network,
                location,
            } => {
                if !self.topology.circuits.iter().any(|c| c.id == *circuit) {
                    return Err(invalid(format!("circuit {circuit} not found")));
                }
                let side_taken = self
                    .topology
                    .terminations
                    .iter()
                    .any(|t| matches!(t.kind, TerminationKind::CircuitTermination { circuit: c, term_side: s, .. } if c == *circuit && s == *term_side));
                if side_taken {
                    return Err(invalid(format!("circuit already has a {term_side} side")));
                }
                match (provider_network, location) {
                    (Some(_), Some(_)) => {
                        return Err(invalid(
                            "a circuit termination attaches to a location or a provider network, not both".into(),
                        ));
                    }
                    (Some(network), None) => {
                        if self.topology.provider_network(*network).is_none() {
                            return Err(invalid(format!("provider network {network} not found")));
                        }
                    }
                    (None, Some(site)) => {
                        if self.topology.location(*site).is_none() {
                            return Err(invalid(format!("location {site} not found")));
                        }
                    }
                    (None, None) => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn add_node(&mut self, node: PathNode) {
        if !self.node_indices.contains_key(&node) {
            let idx = self.graph.add_node(node);
            self.node_indices.insert(node, idx);
        }
    }

    // =========================================================================
    // Cable writes
    // =========================================================================

    /// Create a cable and trace the paths it completes
    pub fn connect(&mut self, request: &CableRequest) -> Result<Uuid, Error> {
        let cable = request.to_cable();
        if self.topology.cable_ref(cable.id).is_some() {
            return Err(Error::DuplicateId(cable.id));
        }
        let a_terminations = self.resolve(&request.a_terminations)?;
        let b_terminations = self.resolve(&request.b_terminations)?;
        validate_cable(&self.topology, &self.compat, &cable, &a_terminations, &b_terminations)?;

        let id = cable.id;
        let snapshot = self.topology.clone();
        self.topology.cables.push(cable);
        self.topology.reconcile_endpoints(id, CableEnd::A, &a_terminations);
        self.topology.reconcile_endpoints(id, CableEnd::B, &b_terminations);
        info!(
            cable = %id,
            a = a_terminations.len(),
            b = b_terminations.len(),
            "Created cable"
        );

        let result = self.after_cable_write(id, &[]);
        self.restore_on_error(snapshot, result)?;
        self.link_cable(id);
        Ok(id)
    }

    /// Modify a cable
    ///
    /// Termination changes retrace through [`Self::after_cable_write`]. A
    /// status change alone deactivates the cable's paths when it leaves
    /// `connected` and retraces them when it returns.
    pub fn update_cable(&mut self, id: Uuid, update: &CableUpdate) -> Result<(), Error> {
        let current = self
            .topology
            .cable_ref(id)
            .cloned()
            .ok_or_else(|| Error::not_found("cable", id))?;
        let mut cable = current.clone();
        update.apply_to(&mut cable);

        let a_terminations = match &update.a_terminations {
            Some(ids) => self.resolve(ids)?,
            None => self.topology.terminations_on(id, CableEnd::A),
        };
        let b_terminations = match &update.b_terminations {
            Some(ids) => self.resolve(ids)?,
            None => self.topology.terminations_on(id, CableEnd::B),
        };
        validate_cable(&self.topology, &self.compat, &cable, &a_terminations, &b_terminations)?;

        let status_changed = cable.status != current.status;
        let snapshot = self.topology.clone();
        if let Some(slot) = self.topology.cables.iter_mut().find(|c| c.id == id) {
            *slot = cable.clone();
        }
        let mut removed = self.topology.reconcile_endpoints(id, CableEnd::A, &a_terminations);
        removed.extend(self.topology.reconcile_endpoints(id, CableEnd::B, &b_terminations));
        info!(cable = %id, status = %cable.status, detached = removed.len(), "Updated cable");

        let result = if update.changes_terminations() {
            self.after_cable_write(id, &removed)
        } else if status_changed {
            self.after_status_change(id, cable.is_connected())
        } else {
            Ok(())
        };
        self.restore_on_error(snapshot, result)?;
        if update.changes_terminations() {
            self.rebuild_graph();
        }
        Ok(())
    }

    /// Delete a cable, its endpoints, and retrace every path through it
    pub fn delete_cable(&mut self, id: Uuid) -> Result<(), Error> {
        if self.topology.cable_ref(id).is_none() {
            return Err(Error::not_found("cable", id));
        }
        let affected = self
            .topology
            .paths_containing(PathNode::new(NodeKind::Cable, id));

        let snapshot = self.topology.clone();
        self.topology.endpoints.retain(|e| e.cable != id);
        self.topology.cables.retain(|c| c.id != id);
        info!(cable = %id, paths = affected.len(), "Deleted cable");

        let result = affected
            .into_iter()
            .try_for_each(|path_id| self.retrace_path(path_id).map(|_| ()));
        self.restore_on_error(snapshot, result)?;
        self.rebuild_graph();
        Ok(())
    }

    /// Post-write hook for a created or re-terminated cable
    ///
    /// - paths originating at `removed` terminations are deleted
    /// - every path through the cable or its terminations is retraced
    /// - each side that can originate a path gets one whose origin is the
    ///   side's full termination set
    ///
    /// Leaves the graph view alone; callers relink or rebuild it.
    pub fn after_cable_write(&mut self, cable: Uuid, removed: &[PathNode]) -> Result<(), Error> {
        for node in removed {
            for path_id in self.origin_paths(|group| group.contains(node)) {
                self.topology.delete_path(path_id);
                debug!(path = %path_id, termination = %node, "Deleted path of detached origin");
            }
        }

        let mut affected = self
            .topology
            .paths_containing(PathNode::new(NodeKind::Cable, cable));
        for end in [CableEnd::A, CableEnd::B] {
            for termination in self.topology.terminations_on(cable, end) {
                for path_id in self.topology.paths_containing(termination.node()) {
                    if !affected.contains(&path_id) {
                        affected.push(path_id);
                    }
                }
            }
        }
        for path_id in affected {
            self.retrace_path(path_id)?;
        }

        for end in [CableEnd::A, CableEnd::B] {
            let terminations = self.topology.terminations_on(cable, end);
            let Some(first) = terminations.first() else {
                continue;
            };
            if !first.node_kind().is_path_endpoint() {
                continue;
            }

            let wanted: BTreeSet<PathNode> = terminations.iter().map(Termination::node).collect();
            let exists = !self
                .origin_paths(|group| group.iter().copied().collect::<BTreeSet<_>>() == wanted)
                .is_empty();
            if exists {
                continue;
            }

            for path_id in self.origin_paths(|group| group.iter().any(|n| wanted.contains(n))) {
                self.topology.delete_path(path_id);
            }
            self.create_path(&terminations)?;
        }
        Ok(())
    }

    fn after_status_change(&mut self, cable: Uuid, connected: bool) -> Result<(), Error> {
        let affected = self
            .topology
            .paths_containing(PathNode::new(NodeKind::Cable, cable));
        if connected {
            for path_id in affected {
                self.retrace_path(path_id)?;
            }
        } else {
            for path_id in affected {
                if let Some(mut path) = self.topology.path(path_id) {
                    path.is_active = false;
                    path.save(&mut self.topology);
                }
            }
            info!(cable = %cable, "Cable no longer connected; deactivated its paths");
        }
        Ok(())
    }

    // =========================================================================
    // Paths
    // =========================================================================

    fn origin_paths(&self, mut matches: impl FnMut(&[PathNode]) -> bool) -> Vec<Uuid> {
        self.topology
            .paths
            .iter()
            .filter(|p| p.path.first().is_some_and(|group| matches(group.as_slice())))
            .map(|p| p.id)
            .collect()
    }

    fn create_path(&mut self, origins: &[Termination]) -> Result<Option<Uuid>, Error> {
        match CablePath::from_origin(&self.topology, &self.builder, origins) {
            Ok(Some(mut path)) => {
                path.save(&mut self.topology);
                info!(path = %path.id, state = %path.state(), "Created cable path");
                Ok(Some(path.id))
            }
            Ok(None) => Ok(None),
            Err(violation) => {
                error!(origin = ?origins.first().map(Termination::node), %violation, "Cable path contract violated");
                Err(violation.into())
            }
        }
    }

    /// Retrace one stored path; `Ok(None)` if it does not exist
    pub fn retrace_path(&mut self, id: Uuid) -> Result<Option<RetraceOutcome>, Error> {
        let Some(mut path) = self.topology.path(id) else {
            return Ok(None);
        };
        let builder = self.builder;
        match path.retrace(&mut self.topology, &builder) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(violation) => {
                error!(path = %id, %violation, "Cable path contract violated during retrace");
                Err(violation.into())
            }
        }
    }

    /// Retrace every path that passes through `node`
    pub fn retrace_paths_containing(&mut self, node: PathNode) -> Result<usize, Error> {
        let affected = self.topology.paths_containing(node);
        for path_id in &affected {
            self.retrace_path(*path_id)?;
        }
        Ok(affected.len())
    }

    /// Discard every stored path and trace again from every cabled origin
    ///
    /// Contract violations are logged and collected; they do not stop the
    /// remaining origins from being traced.
    pub fn trace_all(&mut self) -> TraceSummary {
        let existing: Vec<Uuid> = self.topology.paths.iter().map(|p| p.id).collect();
        for id in existing {
            self.topology.delete_path(id);
        }

        let mut summary = TraceSummary::default();
        let cables: Vec<Uuid> = self.topology.cables.iter().map(|c| c.id).collect();
        for cable in cables {
            for end in [CableEnd::A, CableEnd::B] {
                let origins = self.topology.terminations_on(cable, end);
                if !origins.first().is_some_and(|t| t.node_kind().is_path_endpoint()) {
                    continue;
                }
                match CablePath::from_origin(&self.topology, &self.builder, &origins) {
                    Ok(Some(mut path)) => {
                        path.save(&mut self.topology);
                        summary.traced += 1;
                        match path.state() {
                            PathState::CompleteActive | PathState::CompleteInactive => {
                                summary.complete += 1;
                            }
                            PathState::Split => summary.split += 1,
                            PathState::Incomplete => {}
                        }
                    }
                    Ok(None) => {}
                    Err(violation) => {
                        error!(cable = %cable, end = %end, %violation, "Cable path contract violated");
                        summary.failed.push((origins[0].node(), violation));
                    }
                }
            }
        }

        info!(
            traced = summary.traced,
            complete = summary.complete,
            split = summary.split,
            failed = summary.failed.len(),
            "Traced all cable paths"
        );
        summary
    }

    /// The path originating at a termination
    #[must_use]
    pub fn path_for(&self, termination: Uuid) -> Option<&CablePath> {
        let path_id = self.topology.termination_by_id(termination)?.path?;
        self.topology.paths.iter().find(|p| p.id == path_id)
    }

    /// All stored paths
    #[must_use]
    pub fn paths(&self) -> &[CablePath] {
        &self.topology.paths
    }

    /// Partition stored paths by connected component of the plant graph
    ///
    /// Paths in different groups share no cable, port or circuit and can be
    /// retraced independently.
    #[must_use]
    pub fn independent_path_groups(&self) -> Vec<Vec<Uuid>> {
        let mut components = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut groups: Vec<Vec<Uuid>> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for path in &self.topology.paths {
            let Some(idx) = path
                .path
                .first()
                .and_then(|group| group.first())
                .and_then(|origin| self.node_indices.get(origin))
            else {
                continue;
            };
            let root = components.find(idx.index());
            let slot = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(path.id);
        }
        groups
    }

    fn resolve(&self, ids: &[Uuid]) -> Result<Vec<Termination>, Error> {
        ids.iter()
            .map(|id| {
                self.topology
                    .termination_by_id(*id)
                    .cloned()
                    .ok_or(Error::Validation(ValidationError::UnknownTermination(*id)))
            })
            .collect()
    }

    // =========================================================================
    // Import / export
    // =========================================================================

    /// Load an import document into the plant
    ///
    /// Stops at the first invalid object; cables are validated and their
    /// paths traced exactly as [`Self::connect`] does.
    pub fn import(&mut self, document: ImportDocument) -> Result<ImportSummary, Error> {
        for device in document.devices {
            self.add_device(device)?;
        }
        for network in document.provider_networks {
            self.add_provider_network(network)?;
        }
        for location in document.locations {
            self.add_location(location)?;
        }
        for circuit in document.circuits {
            self.add_circuit(circuit)?;
        }

        let (front_ports, others): (Vec<_>, Vec<_>) = document
            .terminations
            .into_iter()
            .partition(|t| t.node_kind() == NodeKind::FrontPort);
        let mut summary = ImportSummary::default();
        for termination in others.into_iter().chain(front_ports) {
            self.add_termination(termination)?;
            summary.terminations += 1;
        }

        for (index, request) in document.cables.iter().enumerate() {
            if let Err(err) = self.connect(request) {
                error!(index, %err, "Failed to import cable");
                return Err(err);
            }
            summary.cables += 1;
        }

        summary.paths = self.topology.paths.len();
        info!(
            terminations = summary.terminations,
            cables = summary.cables,
            paths = summary.paths,
            "Imported topology"
        );
        Ok(summary)
    }

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("graph cabletrace {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        // Terminations, clustered by device
        for device in &self.topology.devices {
            let _ = writeln!(dot, "  subgraph cluster_{} {{", device.id.simple());
            let _ = writeln!(dot, "    label=\"{}\";", device.name);
            dot.push_str("    style=dashed;\n");
            for termination in self
                .topology
                .terminations
                .iter()
                .filter(|t| t.device == Some(device.id))
            {
                let _ = writeln!(
                    dot,
                    "    \"{}\" [label=\"{}\\n{}\"];",
                    termination.id,
                    termination.name,
                    termination.node_kind()
                );
            }
            dot.push_str("  }\n");
        }
        for termination in self.topology.terminations.iter().filter(|t| t.device.is_none()) {
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\\n{}\"];",
                termination.id,
                termination.name,
                termination.node_kind()
            );
        }
        for network in &self.topology.provider_networks {
            let _ = writeln!(dot, "  \"{}\" [label=\"{}\", shape=ellipse];", network.id, network.name);
        }
        for location in &self.topology.locations {
            let _ = writeln!(dot, "  \"{}\" [label=\"{}\", shape=house];", location.id, location.name);
        }

        dot.push('\n');

        // Cables as edges between every A/B pair
        for cable in &self.topology.cables {
            let label = self.topology.object_name(&PathObject::Cable(cable.clone()));
            let style = if cable.is_connected() { "solid" } else { "dashed" };
            for a in self.topology.terminations_on(cable.id, CableEnd::A) {
                for b in self.topology.terminations_on(cable.id, CableEnd::B) {
                    let _ = writeln!(
                        dot,
                        "  \"{}\" -- \"{}\" [label=\"{}\", style={}];",
                        a.id, b.id, label, style
                    );
                }
            }
        }

        for edge in self.graph.edge_references() {
            let style = match edge.weight() {
                Link::Attached(_) => continue,
                Link::PassThrough => "dotted",
                Link::Circuit => "bold",
                Link::Terminates => "tapered",
            };
            let _ = writeln!(
                dot,
                "  \"{}\" -- \"{}\" [style={}];",
                self.graph[edge.source()].id,
                self.graph[edge.target()].id,
                style
            );
        }

        dot.push_str("}\n");
        dot
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.topology).context("Failed to serialize topology to JSON")
    }
}

/// Pass-through and circuit attachment links of one termination
fn structural_links(termination: &Termination) -> Vec<(PathNode, PathNode, Link)> {
    let node = termination.node();
    let mut links = Vec::new();
    if let Some((rear_port, _)) = termination.rear_port_mapping() {
        links.push((node, PathNode::new(NodeKind::RearPort, rear_port), Link::PassThrough));
    }
    if let Some(network) = termination.provider_network() {
        links.push((node, PathNode::new(NodeKind::ProviderNetwork, network), Link::Terminates));
    }
    if let Some(location) = termination.location() {
        links.push((node, PathNode::new(NodeKind::Location, location), Link::Terminates));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CableStatus, LengthUnit, TermSide};

    fn iface(plant: &mut CablePlant, name: &str) -> Uuid {
        plant
            .add_termination(Termination::interface(name, None, "1000base-t"))
            .unwrap()
    }

    #[test]
    fn test_connect_traces_both_sides() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");

        let cable = plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();

        assert_eq!(plant.paths().len(), 2);
        let forward = plant.path_for(a).unwrap();
        assert_eq!(forward.state(), PathState::CompleteActive);
        assert_eq!(forward.get_cable_ids(), vec![cable]);
        assert!(plant.path_for(b).is_some());
    }

    #[test]
    fn test_failed_validation_leaves_store_unchanged() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let psu = plant
            .add_termination(Termination::power_port("psu0", None))
            .unwrap();

        let err = plant.connect(&CableRequest::new(vec![a], vec![psu])).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::IncompatibleTerminations { .. })));
        assert!(plant.topology.cables.is_empty());
        assert!(plant.topology.endpoints.is_empty());
        assert!(plant.paths().is_empty());
    }

    #[test]
    fn test_aborted_connect_restores_store() {
        let mut plant = CablePlant::new().with_builder(PathBuilder::new(1));
        let i1 = iface(&mut plant, "eth0");
        let i2 = iface(&mut plant, "eth1");
        let rear = plant
            .add_termination(Termination::rear_port("rp1", None, 1))
            .unwrap();
        let front = plant
            .add_termination(Termination::front_port("fp1", None, rear, 1))
            .unwrap();
        plant.connect(&CableRequest::new(vec![i1], vec![front])).unwrap();
        let paths_before = plant.paths().to_vec();
        let edges_before = plant.graph.edge_count();

        let err = plant.connect(&CableRequest::new(vec![rear], vec![i2])).unwrap_err();

        assert!(matches!(err, Error::Contract(ContractViolation::HopLimitExceeded { limit: 1 })));
        assert_eq!(plant.topology.cables.len(), 1);
        assert_eq!(plant.topology.endpoints.len(), 2);
        assert_eq!(plant.paths(), paths_before.as_slice());
        assert!(plant.path_for(i2).is_none());
        assert_eq!(plant.graph.edge_count(), edges_before);
    }

    #[test]
    fn test_aborted_update_restores_store() {
        let mut plant = CablePlant::new().with_builder(PathBuilder::new(1));
        let i1 = iface(&mut plant, "eth0");
        let i2 = iface(&mut plant, "eth1");
        let i3 = iface(&mut plant, "eth2");
        let rear = plant
            .add_termination(Termination::rear_port("rp1", None, 1))
            .unwrap();
        let front = plant
            .add_termination(Termination::front_port("fp1", None, rear, 1))
            .unwrap();
        plant.connect(&CableRequest::new(vec![i1], vec![front])).unwrap();
        let cable = plant.connect(&CableRequest::new(vec![i2], vec![i3])).unwrap();
        let paths_before = plant.paths().to_vec();

        // Moving the A end onto the rear port would make i1's path two cables long
        let update = CableUpdate {
            a_terminations: Some(vec![rear]),
            ..CableUpdate::default()
        };
        assert!(plant.update_cable(cable, &update).is_err());

        assert_eq!(plant.topology.terminations_on(cable, CableEnd::A)[0].id, i2);
        assert_eq!(plant.paths(), paths_before.as_slice());
        assert!(plant.path_for(i2).is_some());
    }

    #[test]
    fn test_incremental_graph_matches_rebuild() {
        let mut plant = CablePlant::new();
        let network = plant
            .add_provider_network(ProviderNetwork {
                id: Uuid::new_v4(),
                name: "transit".into(),
            })
            .unwrap();
        let circuit = plant
            .add_circuit(Circuit {
                id: Uuid::new_v4(),
                cid: "CID-1".into(),
            })
            .unwrap();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let rear = plant
            .add_termination(Termination::rear_port("rp1", None, 2))
            .unwrap();
        let front = plant
            .add_termination(Termination::front_port("fp1", None, rear, 1))
            .unwrap();
        let ct_a = plant
            .add_termination(Termination::circuit_termination("A", circuit, TermSide::A))
            .unwrap();
        plant
            .add_termination(Termination::circuit_termination("Z", circuit, TermSide::Z).with_provider_network(network))
            .unwrap();
        plant.connect(&CableRequest::new(vec![a], vec![front])).unwrap();
        plant.connect(&CableRequest::new(vec![b], vec![ct_a])).unwrap();

        let rebuilt = CablePlant::from_topology(plant.topology.clone());
        assert_eq!(plant.graph.node_count(), rebuilt.graph.node_count());
        assert_eq!(plant.graph.edge_count(), rebuilt.graph.edge_count());
        // 2 cables x 2 ends, pass-through, circuit pair, provider network
        assert_eq!(plant.graph.edge_count(), 7);
        assert_eq!(plant.independent_path_groups(), rebuilt.independent_path_groups());
    }

    #[test]
    fn test_unknown_termination() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let ghost = Uuid::new_v4();
        let err = plant.connect(&CableRequest::new(vec![a], vec![ghost])).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::UnknownTermination(id)) if id == ghost));
    }

    #[test]
    fn test_status_change_deactivates_then_restores() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let cable = plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();

        let planned = CableUpdate {
            status: Some(CableStatus::Planned),
            ..CableUpdate::default()
        };
        plant.update_cable(cable, &planned).unwrap();
        assert!(plant.paths().iter().all(|p| !p.is_active && p.is_complete));

        let connected = CableUpdate {
            status: Some(CableStatus::Connected),
            ..CableUpdate::default()
        };
        plant.update_cable(cable, &connected).unwrap();
        assert!(plant.paths().iter().all(|p| p.is_active));
    }

    #[test]
    fn test_length_update_keeps_paths() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let cable = plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();
        let before: Vec<Uuid> = plant.paths().iter().map(|p| p.id).collect();

        let update = CableUpdate {
            length: Some(Some(12.0)),
            length_unit: Some(LengthUnit::Feet),
            ..CableUpdate::default()
        };
        plant.update_cable(cable, &update).unwrap();

        let after: Vec<Uuid> = plant.paths().iter().map(|p| p.id).collect();
        assert_eq!(before, after);
        let path = plant.path_for(a).unwrap();
        assert_eq!(path.get_total_length(&plant.topology), (Some(3.6576), true));
    }

    #[test]
    fn test_reterminating_moves_the_path() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let c = iface(&mut plant, "eth2");
        let cable = plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();

        let update = CableUpdate {
            b_terminations: Some(vec![c]),
            ..CableUpdate::default()
        };
        plant.update_cable(cable, &update).unwrap();

        assert!(plant.path_for(b).is_none());
        assert!(plant.path_for(c).is_some());
        let forward = plant.path_for(a).unwrap();
        assert_eq!(forward.path.last(), Some(&vec![PathNode::new(NodeKind::Interface, c)]));
        assert_eq!(plant.paths().len(), 2);
    }

    #[test]
    fn test_delete_cable_removes_paths() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let cable = plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();

        plant.delete_cable(cable).unwrap();

        assert!(plant.paths().is_empty());
        assert!(plant.topology.endpoints.is_empty());
        assert_eq!(plant.topology.termination_by_id(a).and_then(|t| t.path), None);
        assert!(matches!(plant.delete_cable(cable), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_front_port_checks() {
        let mut plant = CablePlant::new();
        let rear = plant
            .add_termination(Termination::rear_port("rp1", None, 2))
            .unwrap();
        plant
            .add_termination(Termination::front_port("fp1", None, rear, 1))
            .unwrap();

        let taken = plant.add_termination(Termination::front_port("fp1b", None, rear, 1));
        assert!(matches!(taken, Err(Error::Validation(ValidationError::InvalidTermination { .. }))));

        let out_of_range = plant.add_termination(Termination::front_port("fp3", None, rear, 3));
        assert!(out_of_range.is_err());

        let dangling = plant.add_termination(Termination::front_port("fpx", None, Uuid::new_v4(), 1));
        assert!(dangling.is_err());

        let too_many = plant.add_termination(Termination::rear_port("rpx", None, 2000));
        assert!(too_many.is_err());
    }

    #[test]
    fn test_independent_path_groups() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        let c = iface(&mut plant, "eth2");
        let d = iface(&mut plant, "eth3");
        plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();
        plant.connect(&CableRequest::new(vec![c], vec![d])).unwrap();

        let groups = plant.independent_path_groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 2));
    }

    #[test]
    fn test_trace_all_rebuilds_paths() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();
        plant.topology.paths.clear();

        let summary = plant.trace_all();
        assert_eq!(summary.traced, 2);
        assert_eq!(summary.complete, 2);
        assert!(summary.failed.is_empty());
        assert!(plant.path_for(a).is_some());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        plant.connect(&CableRequest::new(vec![a], vec![b])).unwrap();
        plant.save(dir.path()).unwrap();

        let loaded = CablePlant::load(dir.path()).unwrap();
        assert_eq!(loaded.paths(), plant.paths());
        assert_eq!(loaded.path_for(a).map(|p| p.id), plant.path_for(a).map(|p| p.id));
    }

    #[test]
    fn test_to_dot() {
        let mut plant = CablePlant::new();
        let a = iface(&mut plant, "eth0");
        let b = iface(&mut plant, "eth1");
        plant
            .connect(&CableRequest::new(vec![a], vec![b]).with_label("uplink"))
            .unwrap();

        let dot = plant.to_dot();
        assert!(dot.starts_with("graph cabletrace {"));
        assert!(dot.contains("uplink"));
        assert!(dot.contains(&format!("\"{a}\" -- \"{b}\"")));
    }
}
