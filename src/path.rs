// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cable path records
//!
//! A [`CablePath`] is the persisted outcome of one trace. Hop groups are
//! laid out as `near, cable, far` per cable crossed; pass-through and
//! circuit hops append the next near group after the far one, and a
//! circuit ending in a provider network or location appends the peer
//! circuit termination and the terminal node. Integer division of the hop
//! count by three therefore always equals the number of cables.

use crate::error::ContractViolation;
use crate::store::{PathStore, TerminationStore};
use crate::trace::{PathBuilder, PathTrace};
use crate::types::{round_length, NodeKind, PathNode, PathObject, Termination};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Terminal state of a traced path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PathState {
    /// Stopped at an uncabled port or a circuit without a far side
    Incomplete,
    /// Reached its destination over connected cables only
    CompleteActive,
    /// Reached its destination, but some cable is not connected
    CompleteInactive,
    /// Stopped at a fan-out it could not resolve
    Split,
}

/// What [`CablePath::retrace`] did to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetraceOutcome {
    /// The path was rebuilt and saved
    Updated,
    /// The origin is no longer cabled; the record was deleted
    Deleted,
}

/// One `near / link / far` slice of a path, as shown to users
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSegment {
    /// Termination(s) on the near side
    pub near: Vec<PathObject>,
    /// The cable (or terminal node) in the middle
    pub link: Vec<PathObject>,
    /// Termination(s) on the far side
    pub far: Vec<PathObject>,
}

/// A traced path from an origin termination set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CablePath {
    /// Unique identifier
    pub id: Uuid,
    /// Ordered hop groups
    pub path: Vec<Vec<PathNode>>,
    /// Destination reached
    pub is_complete: bool,
    /// Complete over connected cables only
    pub is_active: bool,
    /// Stopped at an unresolved fan-out
    pub is_split: bool,
    /// Flattened index of every node in `path`, refreshed on save
    #[serde(default)]
    pub nodes: Vec<PathNode>,
    #[serde(skip)]
    objects: OnceCell<Vec<Vec<PathObject>>>,
}

impl PartialEq for CablePath {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.path == other.path
            && self.is_complete == other.is_complete
            && self.is_active == other.is_active
            && self.is_split == other.is_split
            && self.nodes == other.nodes
    }
}

impl From<PathTrace> for CablePath {
    fn from(trace: PathTrace) -> Self {
        let mut path = Self {
            id: Uuid::new_v4(),
            path: trace.path,
            is_complete: trace.is_complete,
            is_active: trace.is_active,
            is_split: trace.is_split,
            nodes: Vec::new(),
            objects: OnceCell::new(),
        };
        path.refresh_nodes();
        path
    }
}

impl CablePath {
    /// Trace a new (unsaved) path from `origins`
    ///
    /// `Ok(None)` means the origins are not cabled and no record should
    /// exist.
    pub fn from_origin<S>(
        store: &S,
        builder: &PathBuilder,
        origins: &[Termination],
    ) -> Result<Option<Self>, ContractViolation>
    where
        S: TerminationStore + ?Sized,
    {
        Ok(builder.trace_from_origin(store, origins)?.map(Self::from))
    }

    /// Recompute the flattened node index
    pub fn refresh_nodes(&mut self) {
        self.nodes = self.path.iter().flatten().copied().collect();
    }

    /// Copy of this record without its materialized objects
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            objects: OnceCell::new(),
            ..self.clone()
        }
    }

    /// Persist the record and point its origins at it
    pub fn save<S: PathStore + ?Sized>(&mut self, store: &mut S) {
        self.refresh_nodes();
        store.save_path(self);
        debug!(path = %self.id, hops = self.path.len(), "Saved cable path");
    }

    /// Rebuild this path from its recorded origins
    ///
    /// If the origins are no longer cabled the record is deleted from the
    /// store; otherwise the new hops and flags overwrite this record and
    /// are saved.
    pub fn retrace<S: PathStore + ?Sized>(
        &mut self,
        store: &mut S,
        builder: &PathBuilder,
    ) -> Result<RetraceOutcome, ContractViolation> {
        let origins = self.origin_terminations(&*store);
        let traced = if origins.is_empty() {
            None
        } else {
            builder.trace_from_origin(&*store, &origins)?
        };

        match traced {
            Some(trace) => {
                self.path = trace.path;
                self.is_complete = trace.is_complete;
                self.is_active = trace.is_active;
                self.is_split = trace.is_split;
                self.objects = OnceCell::new();
                self.save(store);
                Ok(RetraceOutcome::Updated)
            }
            None => {
                store.delete_path(self.id);
                info!(path = %self.id, "Origin no longer cabled; deleted cable path");
                Ok(RetraceOutcome::Deleted)
            }
        }
    }

    /// Origin terminations that still exist in the store
    pub fn origin_terminations<S: TerminationStore + ?Sized>(&self, store: &S) -> Vec<Termination> {
        self.path
            .first()
            .map(|group| group.iter().filter_map(|node| store.termination(*node)).collect())
            .unwrap_or_default()
    }

    /// Number of cables the path crosses
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.path.len() / 3
    }

    /// Whether `node` appears anywhere in the path
    #[must_use]
    pub fn contains(&self, node: PathNode) -> bool {
        self.nodes.contains(&node)
    }

    /// Kind of the origin termination(s)
    #[must_use]
    pub fn origin_kind(&self) -> Option<NodeKind> {
        self.path.first().and_then(|g| g.first()).map(|n| n.kind)
    }

    /// Kind of the destination, for complete paths
    #[must_use]
    pub fn destination_kind(&self) -> Option<NodeKind> {
        if !self.is_complete {
            return None;
        }
        self.path.last().and_then(|g| g.first()).map(|n| n.kind)
    }

    /// Terminal state of the path
    #[must_use]
    pub fn state(&self) -> PathState {
        match (self.is_split, self.is_complete, self.is_active) {
            (true, _, _) => PathState::Split,
            (false, false, _) => PathState::Incomplete,
            (false, true, true) => PathState::CompleteActive,
            (false, true, false) => PathState::CompleteInactive,
        }
    }

    /// Every cable id in the path, in traversal order
    #[must_use]
    pub fn get_cable_ids(&self) -> Vec<Uuid> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Cable)
            .map(|n| n.id)
            .collect()
    }

    /// Total length in meters and whether every cable had a length
    ///
    /// The total is `None` when no cable in the path has a length.
    pub fn get_total_length<S: TerminationStore + ?Sized>(&self, store: &S) -> (Option<f64>, bool) {
        let cable_ids = self.get_cable_ids();
        let lengths: Vec<f64> = cable_ids
            .iter()
            .filter_map(|id| store.cable(*id).and_then(|c| c.abs_length))
            .collect();
        let is_definitive = lengths.len() == cable_ids.len();
        let total = if lengths.is_empty() {
            None
        } else {
            Some(round_length(lengths.iter().sum()))
        };
        (total, is_definitive)
    }

    /// Every hop group resolved to its objects
    ///
    /// Loaded once per record with one batch lookup per node kind. Nodes
    /// whose object has since been deleted are skipped.
    pub fn path_objects<S: TerminationStore + ?Sized>(&self, store: &S) -> &[Vec<PathObject>] {
        self.objects.get_or_init(|| {
            let mut by_kind: BTreeMap<NodeKind, Vec<Uuid>> = BTreeMap::new();
            for node in self.path.iter().flatten() {
                by_kind.entry(node.kind).or_default().push(node.id);
            }
            let loaded: BTreeMap<NodeKind, _> = by_kind
                .into_iter()
                .map(|(kind, ids)| (kind, store.batch_load(kind, &ids)))
                .collect();

            self.path
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .filter_map(|node| loaded.get(&node.kind).and_then(|m| m.get(&node.id)).cloned())
                        .collect()
                })
                .collect()
        })
    }

    /// The origin objects
    pub fn origins<S: TerminationStore + ?Sized>(&self, store: &S) -> &[PathObject] {
        self.path_objects(store).first().map_or(&[], Vec::as_slice)
    }

    /// The destination objects; empty unless the path is complete
    pub fn destinations<S: TerminationStore + ?Sized>(&self, store: &S) -> &[PathObject] {
        if !self.is_complete {
            return &[];
        }
        self.path_objects(store).last().map_or(&[], Vec::as_slice)
    }

    /// Candidate next hops of a split path
    ///
    /// - stopped at rear port(s): every front port of those rear ports
    /// - stopped at front ports: the rear ports they pass through to
    /// - stopped at circuit terminations: the far side of each circuit
    pub fn get_split_nodes<S: TerminationStore + ?Sized>(&self, store: &S) -> Vec<Termination> {
        if !self.is_split {
            return Vec::new();
        }
        let last: Vec<Termination> = self
            .path_objects(store)
            .last()
            .map(|group| group.iter().filter_map(PathObject::as_termination).cloned().collect())
            .unwrap_or_default();
        let Some(head) = last.first() else {
            return Vec::new();
        };

        match head.node_kind() {
            NodeKind::RearPort => {
                let rear_ports: Vec<Uuid> = last.iter().map(|t| t.id).collect();
                store.front_ports_for_rear_ports(&rear_ports, None)
            }
            NodeKind::FrontPort => store.rear_ports_for_front_ports(&last),
            NodeKind::CircuitTermination => last
                .iter()
                .filter_map(|ct| store.paired_circuit_termination(ct))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The path as `near / link / far` segments
    ///
    /// A trailing partial segment is padded with empty groups.
    pub fn trace<S: TerminationStore + ?Sized>(&self, store: &S) -> Vec<TraceSegment> {
        self.path_objects(store)
            .chunks(3)
            .map(|chunk| {
                let mut groups = chunk.iter().cloned();
                TraceSegment {
                    near: groups.next().unwrap_or_default(),
                    link: groups.next().unwrap_or_default(),
                    far: groups.next().unwrap_or_default(),
                }
            })
            .collect()
    }
}
