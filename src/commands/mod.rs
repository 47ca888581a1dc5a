// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod cable;
pub mod completions;
pub mod config;
pub mod export;
pub mod import;
pub mod path;
pub mod trace;

use crate::config::Config;
use crate::graph::CablePlant;
use crate::types::{Termination, Topology};
use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Session {
    /// Effective configuration
    pub config: Config,
    /// Print JSON instead of text
    pub json: bool,
    /// Colorize text output
    pub color: bool,
}

impl Session {
    /// Load the plant from the configured data directory
    pub fn load_plant(&self) -> Result<CablePlant> {
        let data_dir = &self.config.data_dir;
        let plant = CablePlant::load(data_dir)
            .with_context(|| format!("Failed to load topology from {}", data_dir.display()))?;
        Ok(plant
            .with_compatibility(self.config.compatibility.clone())
            .with_builder(self.config.path_builder()))
    }

    /// Save the plant back to the data directory
    pub fn save_plant(&self, plant: &CablePlant) -> Result<()> {
        plant.save(&self.config.data_dir)
    }

    /// Print `value` as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to serialize output")?
        );
        Ok(())
    }
}

/// Find a termination by id, `device:name` or a unique name
pub fn resolve_termination<'a>(topology: &'a Topology, key: &str) -> Result<&'a Termination> {
    if let Ok(id) = key.parse::<Uuid>() {
        return topology
            .termination_by_id(id)
            .ok_or_else(|| anyhow::anyhow!("Termination not found: {}", key));
    }

    let matches: Vec<&Termination> = match key.split_once(':') {
        Some((device, name)) => topology
            .terminations
            .iter()
            .filter(|t| {
                t.name == name
                    && t.device
                        .and_then(|id| topology.devices.iter().find(|d| d.id == id))
                        .is_some_and(|d| d.name == device)
            })
            .collect(),
        None => topology.terminations.iter().filter(|t| t.name == key).collect(),
    };

    match matches.as_slice() {
        [one] => Ok(one),
        [] => anyhow::bail!("Termination not found: {}", key),
        many => anyhow::bail!(
            "Termination name '{}' is ambiguous ({} matches); use device:name or the id",
            key,
            many.len()
        ),
    }
}

/// Parse a full or abbreviated path/cable id against `candidates`
pub fn resolve_id(candidates: impl IntoIterator<Item = Uuid>, key: &str, kind: &str) -> Result<Uuid> {
    if let Ok(id) = key.parse::<Uuid>() {
        return Ok(id);
    }
    let prefix = key.to_lowercase();
    let matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.simple().to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => anyhow::bail!("No {} matches '{}'", kind, key),
        _ => anyhow::bail!("{} id prefix '{}' is ambiguous", kind, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Device;

    fn topology() -> Topology {
        let mut topology = Topology::default();
        let sw1 = Device {
            id: Uuid::new_v4(),
            name: "sw1".into(),
        };
        let sw2 = Device {
            id: Uuid::new_v4(),
            name: "sw2".into(),
        };
        topology.terminations.push(Termination::interface("eth0", Some(sw1.id), "1000base-t"));
        topology.terminations.push(Termination::interface("eth0", Some(sw2.id), "1000base-t"));
        topology.terminations.push(Termination::power_feed("feed-a"));
        topology.devices.extend([sw1, sw2]);
        topology
    }

    #[test]
    fn test_resolve_by_device_and_name() {
        let topology = topology();
        let found = resolve_termination(&topology, "sw2:eth0").unwrap();
        assert_eq!(found.id, topology.terminations[1].id);
    }

    #[test]
    fn test_resolve_unique_name_and_id() {
        let topology = topology();
        let feed = resolve_termination(&topology, "feed-a").unwrap();
        let by_id = resolve_termination(&topology, &feed.id.to_string()).unwrap();
        assert_eq!(feed, by_id);
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let topology = topology();
        let err = resolve_termination(&topology, "eth0").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_resolve_id_prefix() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let prefix = &ids[0].simple().to_string()[..12];
        assert_eq!(resolve_id(ids, prefix, "path").unwrap(), ids[0]);
        assert!(resolve_id(ids, "zzzz", "path").is_err());
    }
}
