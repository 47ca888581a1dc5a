// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Shared fixtures for building cable plants in tests
#![allow(dead_code)]

use cabletrace::prelude::*;
use uuid::Uuid;

/// A cable plant with shorthand constructors
pub struct Lab {
    pub plant: CablePlant,
}

impl Lab {
    pub fn new() -> Self {
        Self {
            plant: CablePlant::new(),
        }
    }

    pub fn device(&mut self, name: &str) -> Uuid {
        self.plant
            .add_device(Device {
                id: Uuid::new_v4(),
                name: name.into(),
            })
            .unwrap()
    }

    pub fn iface(&mut self, device: Uuid, name: &str) -> Uuid {
        self.plant
            .add_termination(Termination::interface(name, Some(device), "1000base-t"))
            .unwrap()
    }

    pub fn rear(&mut self, device: Uuid, name: &str, positions: u16) -> Uuid {
        self.plant
            .add_termination(Termination::rear_port(name, Some(device), positions))
            .unwrap()
    }

    pub fn front(&mut self, device: Uuid, name: &str, rear: Uuid, position: u16) -> Uuid {
        self.plant
            .add_termination(Termination::front_port(name, Some(device), rear, position))
            .unwrap()
    }

    pub fn circuit(&mut self, cid: &str) -> Uuid {
        self.plant
            .add_circuit(Circuit {
                id: Uuid::new_v4(),
                cid: cid.into(),
            })
            .unwrap()
    }

    pub fn provider_network(&mut self, name: &str) -> Uuid {
        self.plant
            .add_provider_network(ProviderNetwork {
                id: Uuid::new_v4(),
                name: name.into(),
            })
            .unwrap()
    }

    pub fn location(&mut self, name: &str) -> Uuid {
        self.plant
            .add_location(Location {
                id: Uuid::new_v4(),
                name: name.into(),
            })
            .unwrap()
    }

    pub fn add(&mut self, termination: Termination) -> Uuid {
        self.plant.add_termination(termination).unwrap()
    }

    pub fn cable(&mut self, a: &[Uuid], b: &[Uuid]) -> Uuid {
        self.plant
            .connect(&CableRequest::new(a.to_vec(), b.to_vec()))
            .unwrap()
    }

    pub fn cable_with(&mut self, request: CableRequest) -> Uuid {
        self.plant.connect(&request).unwrap()
    }

    /// Path node of a termination
    pub fn node(&self, id: Uuid) -> PathNode {
        self.termination(id).node()
    }

    pub fn termination(&self, id: Uuid) -> Termination {
        self.plant.topology.termination_by_id(id).unwrap().clone()
    }

    /// The stored path originating at `termination`
    pub fn path(&self, termination: Uuid) -> CablePath {
        self.plant.path_for(termination).unwrap().clone()
    }

    /// Hop groups of a path as bare ids
    pub fn hops(path: &CablePath) -> Vec<Vec<Uuid>> {
        path.path
            .iter()
            .map(|group| group.iter().map(|n| n.id).collect())
            .collect()
    }
}
