// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Path builder - walks the physical topology from an origin
//!
//! The walk appends one hop group per step: the current termination set,
//! the cable attached to it, then the far-side termination set. The far
//! side decides the next hop:
//!
//! - front ports continue through their rear port, remembering the
//!   positions taken when the rear port carries more than one
//! - rear ports fan back out to front ports, either position 1 or the
//!   positions remembered on the way in; with neither, the path is split
//! - circuit terminations continue from the other side of the circuit
//! - anything else is the far endpoint and completes the path

use crate::error::ContractViolation;
use crate::store::TerminationStore;
use crate::types::{CableEnd, NodeKind, PathNode, Termination, TerminationKind};
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Default ceiling on the number of cables a single path may traverse
pub const DEFAULT_MAX_SEGMENTS: usize = 100;

/// Result of one trace, before it is wrapped in a path record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTrace {
    /// Ordered hop groups
    pub path: Vec<Vec<PathNode>>,
    /// The trace reached a genuine endpoint or path terminal
    pub is_complete: bool,
    /// Complete, and every cable traversed is connected
    pub is_active: bool,
    /// The trace stopped at an ambiguous fan-out
    pub is_split: bool,
}

/// Traces cable paths over a [`TerminationStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathBuilder {
    max_segments: usize,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEGMENTS)
    }
}

impl PathBuilder {
    /// Builder refusing paths longer than `max_segments` cables
    #[must_use]
    pub fn new(max_segments: usize) -> Self {
        Self { max_segments }
    }

    /// The segment ceiling
    #[must_use]
    pub fn max_segments(&self) -> usize {
        self.max_segments
    }

    /// Trace the path starting at `origins`
    ///
    /// `origins` must be non-empty, of one kind and attached to the same end
    /// of the same cable. Returns `Ok(None)` when the origins are not
    /// cabled at all; no path record should exist for them.
    pub fn trace_from_origin<S>(
        &self,
        store: &S,
        origins: &[Termination],
    ) -> Result<Option<PathTrace>, ContractViolation>
    where
        S: TerminationStore + ?Sized,
    {
        if origins.is_empty() {
            return Err(ContractViolation::EmptyOrigin);
        }
        ensure_homogeneous(origins)?;
        let origin_cables: BTreeSet<Option<Uuid>> = origins
            .iter()
            .map(|t| store.cable_and_side(t).0.map(|c| c.id))
            .collect();
        if origin_cables.len() > 1 {
            return Err(ContractViolation::OriginsOnDifferentCables);
        }

        let mut path: Vec<Vec<PathNode>> = Vec::new();
        let mut position_stack: Vec<Vec<u16>> = Vec::new();
        let mut is_complete = false;
        let mut is_active = true;
        let mut is_split = false;
        let mut segments = 0usize;
        let mut terminations = origins.to_vec();

        while !terminations.is_empty() {
            ensure_homogeneous(&terminations)?;

            let links: Vec<_> = terminations.iter().map(|t| store.cable_and_side(t)).collect();
            let cable_ids: BTreeSet<Option<Uuid>> =
                links.iter().map(|(cable, _)| cable.as_ref().map(|c| c.id)).collect();
            if cable_ids.len() > 1 {
                // e.g. front ports of one rear port cabled onward to different places
                warn!(hop = path.len(), "Terminations diverge onto different cables; path is split");
                is_split = true;
                break;
            }

            path.push(nodes(&terminations));

            let Some((cable, local_end)) = links.first().cloned() else {
                break;
            };
            let Some(cable) = cable else {
                if path.len() == 1 {
                    debug!("Origin is not cabled; no path");
                    return Ok(None);
                }
                debug!(hop = path.len(), "Reached an uncabled termination; path is incomplete");
                break;
            };

            segments += 1;
            if segments > self.max_segments {
                return Err(ContractViolation::HopLimitExceeded {
                    limit: self.max_segments,
                });
            }

            path.push(vec![cable.node()]);
            if !cable.is_connected() {
                is_active = false;
            }

            let local_end = local_end.ok_or(ContractViolation::MissingCableEnd {
                termination: terminations[0].node(),
                cable: cable.id,
            })?;
            let ends: BTreeSet<Option<CableEnd>> = links.iter().map(|(_, end)| *end).collect();
            if ends.len() > 1 {
                return Err(ContractViolation::InconsistentCableEnd { cable: cable.id });
            }

            let remote = store.remote_endpoints(cable.id, local_end);
            trace!(cable = %cable.id, far = remote.len(), "Crossed cable");
            path.push(nodes(&remote));

            let Some(head) = remote.first() else {
                break;
            };
            ensure_homogeneous(&remote)?;

            match &head.kind {
                TerminationKind::FrontPort { .. } => {
                    let wanted: BTreeSet<Uuid> = remote
                        .iter()
                        .filter_map(|fp| fp.rear_port_mapping().map(|(rear_port, _)| rear_port))
                        .collect();
                    let rear_ports = store.rear_ports_for_front_ports(&remote);
                    if rear_ports.len() < wanted.len() {
                        let found: BTreeSet<Uuid> = rear_ports.iter().map(|rp| rp.id).collect();
                        let missing = wanted.difference(&found).next().copied().unwrap_or_default();
                        return Err(ContractViolation::MissingRearPort {
                            front_port: head.id,
                            rear_port: missing,
                        });
                    }

                    if rear_ports.len() > 1 {
                        if rear_ports.iter().any(|rp| rp.positions().unwrap_or(1) > 1) {
                            return Err(ContractViolation::AmbiguousRearPortPositions {
                                count: rear_ports.len(),
                            });
                        }
                    } else if rear_ports.first().and_then(Termination::positions).unwrap_or(1) > 1 {
                        let positions: Vec<u16> = remote
                            .iter()
                            .filter_map(|fp| fp.rear_port_mapping().map(|(_, position)| position))
                            .collect();
                        trace!(?positions, "Entering multi-position rear port");
                        position_stack.push(positions);
                    }
                    terminations = rear_ports;
                }

                TerminationKind::RearPort { positions } => {
                    let front_ports = if remote.len() > 1 || *positions == 1 {
                        let rear_ports: Vec<Uuid> = remote.iter().map(|rp| rp.id).collect();
                        store.front_ports_for_rear_ports(&rear_ports, Some(&[1]))
                    } else if let Some(stacked) = position_stack.pop() {
                        trace!(positions = ?stacked, "Leaving multi-position rear port");
                        store.front_ports_for_rear_ports(&[head.id], Some(&stacked))
                    } else {
                        warn!(rear_port = %head.id, "No position to follow through rear port; path is split");
                        is_split = true;
                        break;
                    };
                    terminations = front_ports;
                }

                TerminationKind::CircuitTermination { term_side, .. } => {
                    if remote.iter().any(|ct| ct.term_side() != Some(*term_side)) {
                        return Err(ContractViolation::MixedCircuitSides { cable: cable.id });
                    }
                    let Some(peer) = store.paired_circuit_termination(head) else {
                        debug!(circuit_termination = %head.id, "Circuit has no far side");
                        break;
                    };

                    if let Some(network) = peer.provider_network() {
                        path.push(vec![peer.node()]);
                        path.push(vec![PathNode::new(NodeKind::ProviderNetwork, network)]);
                        is_complete = true;
                        break;
                    }
                    if let Some(location) = peer.location() {
                        if store.cable_and_side(&peer).0.is_none() {
                            path.push(vec![peer.node()]);
                            path.push(vec![PathNode::new(NodeKind::Location, location)]);
                            is_complete = true;
                            break;
                        }
                    }
                    terminations = vec![peer];
                }

                _ => {
                    is_complete = true;
                    break;
                }
            }
        }

        let is_active = is_active && is_complete;
        debug!(
            hops = path.len(),
            is_complete,
            is_active,
            is_split,
            "Traced cable path"
        );
        Ok(Some(PathTrace {
            path,
            is_complete,
            is_active,
            is_split,
        }))
    }
}

fn nodes(terminations: &[Termination]) -> Vec<PathNode> {
    terminations.iter().map(Termination::node).collect()
}

fn ensure_homogeneous(terminations: &[Termination]) -> Result<(), ContractViolation> {
    let Some(first) = terminations.first() else {
        return Ok(());
    };
    let expected = first.node_kind();
    match terminations.iter().map(Termination::node_kind).find(|k| *k != expected) {
        Some(found) => Err(ContractViolation::MixedTerminationKinds { expected, found }),
        None => Ok(()),
    }
}
