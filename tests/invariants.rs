// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for traced cable paths
//!
//! These tests verify, over generated patch-panel and trunk chains:
//! 1. Path structure - cable groups sit at every third hop, one cable each
//! 2. Flags - inactive whenever a cable is not connected, complete only at
//!    a genuine endpoint
//! 3. Stability - retracing is idempotent and tracing is deterministic

mod common;

use cabletrace::prelude::*;
use common::Lab;
use proptest::prelude::*;
use uuid::Uuid;

// =============================================================================
// Chain Generator
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Hop {
    /// Single-position patch panel
    Panel,
    /// Pair of 4-position panels joined by a trunk, entered at a position
    Trunk(u16),
}

#[derive(Debug, Clone)]
struct Chain {
    hops: Vec<(Hop, bool)>,
    end_cabled: bool,
    end_connected: bool,
}

fn hop() -> impl Strategy<Value = Hop> {
    prop_oneof![Just(Hop::Panel), (1u16..=4).prop_map(Hop::Trunk)]
}

fn chain() -> impl Strategy<Value = Chain> {
    (
        prop::collection::vec((hop(), any::<bool>()), 0..5),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(hops, end_cabled, end_connected)| Chain {
            hops,
            end_cabled,
            end_connected,
        })
}

fn status(connected: bool) -> CableStatus {
    if connected {
        CableStatus::Connected
    } else {
        CableStatus::Planned
    }
}

struct Built {
    lab: Lab,
    origin: Uuid,
    cables: Vec<Uuid>,
    statuses: Vec<bool>,
}

fn build(chain: &Chain) -> Built {
    let mut lab = Lab::new();
    let sw1 = lab.device("sw1");
    let origin = lab.iface(sw1, "eth0");
    let mut previous = origin;
    let mut cables = Vec::new();
    let mut statuses = Vec::new();

    for (index, (hop, connected)) in chain.hops.iter().enumerate() {
        let panel = lab.device(&format!("pp{index}"));
        match hop {
            Hop::Panel => {
                let rear = lab.rear(panel, "rear", 1);
                let front = lab.front(panel, "front", rear, 1);
                cables.push(lab.cable_with(
                    CableRequest::new(vec![previous], vec![front]).with_status(status(*connected)),
                ));
                statuses.push(*connected);
                previous = rear;
            }
            Hop::Trunk(position) => {
                let far = lab.device(&format!("pp{index}-far"));
                let near_rear = lab.rear(panel, "trunk", 4);
                let far_rear = lab.rear(far, "trunk", 4);
                let mut near_front = Uuid::nil();
                let mut far_front = Uuid::nil();
                for p in 1..=4u16 {
                    let n = lab.front(panel, &format!("front{p}"), near_rear, p);
                    let f = lab.front(far, &format!("front{p}"), far_rear, p);
                    if p == *position {
                        near_front = n;
                        far_front = f;
                    }
                }
                cables.push(lab.cable_with(
                    CableRequest::new(vec![previous], vec![near_front]).with_status(status(*connected)),
                ));
                statuses.push(*connected);
                cables.push(lab.cable(&[near_rear], &[far_rear]));
                statuses.push(true);
                previous = far_front;
            }
        }
    }

    if chain.end_cabled {
        let sw2 = lab.device("sw2");
        let end = lab.iface(sw2, "eth0");
        cables.push(lab.cable_with(
            CableRequest::new(vec![previous], vec![end]).with_status(status(chain.end_connected)),
        ));
        statuses.push(chain.end_connected);
    }

    Built {
        lab,
        origin,
        cables,
        statuses,
    }
}

fn assert_structure(path: &CablePath) {
    assert!(!path.path.is_empty());
    assert!(path.path[0].iter().all(|n| n.kind.is_path_endpoint()));
    for (index, group) in path.path.iter().enumerate() {
        let cables = group.iter().filter(|n| n.kind == NodeKind::Cable).count();
        if index % 3 == 1 {
            assert_eq!(group.len(), 1, "cable group {index} must hold exactly one node");
            assert_eq!(cables, 1);
        } else {
            assert_eq!(cables, 0, "termination group {index} holds a cable");
        }
    }
    assert_eq!(path.segment_count(), path.get_cable_ids().len());
    if path.is_complete {
        let last = path.path.last().and_then(|g| g.first()).map(|n| n.kind);
        assert!(last.is_some_and(|k| k.is_path_endpoint() || k.is_path_terminal()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_chain_paths_hold_invariants(chain in chain()) {
        let built = build(&chain);
        let plant = &built.lab.plant;

        if built.cables.is_empty() {
            prop_assert!(plant.path_for(built.origin).is_none());
            return Ok(());
        }

        let path = plant.path_for(built.origin).unwrap();
        assert_structure(path);

        prop_assert_eq!(path.get_cable_ids(), built.cables.clone());
        prop_assert_eq!(path.is_complete, chain.end_cabled);
        prop_assert!(!path.is_split);

        let all_connected = built.statuses.iter().all(|c| *c);
        prop_assert_eq!(path.is_active, chain.end_cabled && all_connected);

        for other in plant.paths() {
            assert_structure(other);
        }
    }

    #[test]
    fn prop_retrace_is_idempotent(chain in chain()) {
        let mut built = build(&chain);
        let Some(before) = built.lab.plant.path_for(built.origin).cloned() else {
            return Ok(());
        };

        built.lab.plant.retrace_path(before.id).unwrap();
        let once = built.lab.plant.path_for(built.origin).unwrap().clone();
        built.lab.plant.retrace_path(before.id).unwrap();
        let twice = built.lab.plant.path_for(built.origin).unwrap().clone();

        prop_assert_eq!(&once, &before);
        prop_assert_eq!(&twice, &once);
    }
}

// =============================================================================
// Deterministic Checks
// =============================================================================

#[test]
fn test_trace_all_is_deterministic() {
    let chain = Chain {
        hops: vec![(Hop::Panel, true), (Hop::Trunk(3), true), (Hop::Panel, false)],
        end_cabled: true,
        end_connected: true,
    };
    let mut built = build(&chain);

    let snapshot = |plant: &CablePlant| -> Vec<(Vec<Vec<PathNode>>, bool, bool, bool)> {
        plant
            .paths()
            .iter()
            .map(|p| (p.path.clone(), p.is_complete, p.is_active, p.is_split))
            .collect()
    };

    let first = {
        built.lab.plant.trace_all();
        snapshot(&built.lab.plant)
    };
    let second = {
        built.lab.plant.trace_all();
        snapshot(&built.lab.plant)
    };
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_hop_limit_is_a_contract_violation() {
    let mut lab = Lab::new();
    lab.plant = CablePlant::new().with_builder(PathBuilder::new(2));
    let sw1 = lab.device("sw1");
    let origin = lab.iface(sw1, "eth0");

    let mut previous = origin;
    for index in 0..2 {
        let panel = lab.device(&format!("pp{index}"));
        let rear = lab.rear(panel, "rear", 1);
        let front = lab.front(panel, "front", rear, 1);
        lab.cable(&[previous], &[front]);
        previous = rear;
    }

    let sw2 = lab.device("sw2");
    let end = lab.iface(sw2, "eth0");
    let err = lab
        .plant
        .connect(&CableRequest::new(vec![previous], vec![end]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Contract(ContractViolation::HopLimitExceeded { limit: 2 })
    ));
}

#[test]
fn test_mixed_origin_kinds_are_rejected() {
    let mut lab = Lab::new();
    let sw1 = lab.device("sw1");
    let iface = lab.iface(sw1, "eth0");
    let console = lab.add(Termination::console_port("con0", Some(sw1)));

    let origins = vec![lab.termination(iface), lab.termination(console)];
    let err = lab
        .plant
        .builder()
        .trace_from_origin(&lab.plant.topology, &origins)
        .unwrap_err();
    assert!(matches!(err, ContractViolation::MixedTerminationKinds { .. }));
}

#[test]
fn test_path_survives_json_round_trip() {
    let chain = Chain {
        hops: vec![(Hop::Trunk(2), true)],
        end_cabled: true,
        end_connected: true,
    };
    let built = build(&chain);
    let dir = tempfile::tempdir().unwrap();
    built.lab.plant.save(dir.path()).unwrap();

    let loaded = CablePlant::load(dir.path()).unwrap();
    let path = loaded.path_for(built.origin).unwrap();
    assert_eq!(path, built.lab.plant.path_for(built.origin).unwrap());
    assert_structure(path);
}
