// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Termination compatibility tables
//!
//! Which termination kinds may be cabled to which, and which interface
//! types never take a cable. Handed to cable validation as a value so a
//! deployment can override it from configuration.

use crate::types::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Interface types that are logical or wireless and never take a cable
pub const NON_CONNECTABLE_INTERFACE_TYPES: &[&str] = &[
    "virtual",
    "bridge",
    "lag",
    "ieee802.11a",
    "ieee802.11g",
    "ieee802.11n",
    "ieee802.11ac",
    "ieee802.11ad",
    "ieee802.11ax",
    "gsm",
    "cdma",
    "lte",
];

/// Cable compatibility configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityTable {
    /// Kind -> kinds it may be cabled to
    #[serde(default = "default_pairs")]
    pub pairs: BTreeMap<NodeKind, BTreeSet<NodeKind>>,
    /// Interface type slugs that may not be cabled
    #[serde(default = "default_non_connectable")]
    pub non_connectable_interface_types: BTreeSet<String>,
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            non_connectable_interface_types: default_non_connectable(),
        }
    }
}

fn default_pairs() -> BTreeMap<NodeKind, BTreeSet<NodeKind>> {
    use NodeKind::{
        CircuitTermination, ConsolePort, ConsoleServerPort, FrontPort, Interface, PowerFeed,
        PowerOutlet, PowerPort, RearPort,
    };

    let table: [(NodeKind, &[NodeKind]); 9] = [
        (CircuitTermination, &[Interface, FrontPort, RearPort, CircuitTermination]),
        (ConsolePort, &[ConsoleServerPort, FrontPort, RearPort]),
        (ConsoleServerPort, &[ConsolePort, FrontPort, RearPort]),
        (Interface, &[Interface, CircuitTermination, FrontPort, RearPort]),
        (
            FrontPort,
            &[ConsolePort, ConsoleServerPort, Interface, FrontPort, RearPort, CircuitTermination],
        ),
        (PowerFeed, &[PowerPort]),
        (PowerOutlet, &[PowerPort]),
        (PowerPort, &[PowerOutlet, PowerFeed]),
        (
            RearPort,
            &[ConsolePort, ConsoleServerPort, Interface, FrontPort, RearPort, CircuitTermination],
        ),
    ];

    table
        .into_iter()
        .map(|(kind, peers)| (kind, peers.iter().copied().collect()))
        .collect()
}

fn default_non_connectable() -> BTreeSet<String> {
    NON_CONNECTABLE_INTERFACE_TYPES
        .iter()
        .map(|t| (*t).to_string())
        .collect()
}

impl CompatibilityTable {
    /// Whether an `a`-kind termination may be cabled to a `b`-kind one
    #[must_use]
    pub fn is_compatible(&self, a: NodeKind, b: NodeKind) -> bool {
        self.pairs.get(&a).is_some_and(|peers| peers.contains(&b))
    }

    /// All kinds `kind` may be cabled to
    #[must_use]
    pub fn compatible_with(&self, kind: NodeKind) -> Vec<NodeKind> {
        self.pairs
            .get(&kind)
            .map(|peers| peers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether an interface of this type may take a cable
    #[must_use]
    pub fn is_connectable_interface(&self, interface_type: &str) -> bool {
        !self.non_connectable_interface_types.contains(interface_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_symmetric() {
        let table = CompatibilityTable::default();
        for (kind, peers) in &table.pairs {
            for peer in peers {
                assert!(
                    table.is_compatible(*peer, *kind),
                    "{peer} -> {kind} missing while {kind} -> {peer} exists"
                );
            }
        }
    }

    #[test]
    fn test_power_only_pairs_with_power() {
        let table = CompatibilityTable::default();
        assert!(table.is_compatible(NodeKind::PowerPort, NodeKind::PowerOutlet));
        assert!(table.is_compatible(NodeKind::PowerPort, NodeKind::PowerFeed));
        assert!(!table.is_compatible(NodeKind::PowerPort, NodeKind::Interface));
        assert!(!table.is_compatible(NodeKind::PowerOutlet, NodeKind::FrontPort));
    }

    #[test]
    fn test_console_pairs() {
        let table = CompatibilityTable::default();
        assert!(table.is_compatible(NodeKind::ConsolePort, NodeKind::ConsoleServerPort));
        assert!(table.is_compatible(NodeKind::ConsolePort, NodeKind::RearPort));
        assert!(!table.is_compatible(NodeKind::ConsolePort, NodeKind::ConsolePort));
        assert!(!table.is_compatible(NodeKind::ConsolePort, NodeKind::Interface));
    }

    #[test]
    fn test_path_only_kinds_are_never_cabled() {
        let table = CompatibilityTable::default();
        assert!(table.compatible_with(NodeKind::ProviderNetwork).is_empty());
        assert!(table.compatible_with(NodeKind::Location).is_empty());
        assert!(!table.is_compatible(NodeKind::Interface, NodeKind::Location));
    }

    #[test]
    fn test_non_connectable_interfaces() {
        let table = CompatibilityTable::default();
        assert!(!table.is_connectable_interface("virtual"));
        assert!(!table.is_connectable_interface("lag"));
        assert!(!table.is_connectable_interface("ieee802.11ac"));
        assert!(table.is_connectable_interface("1000base-t"));
    }

    #[test]
    fn test_override_from_json() {
        let json = r#"{ "pairs": { "interface": ["interface"] } }"#;
        let table: CompatibilityTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.compatible_with(NodeKind::Interface), vec![NodeKind::Interface]);
        assert!(!table.is_compatible(NodeKind::Interface, NodeKind::FrontPort));
        // Unspecified keys fall back to the defaults
        assert!(!table.is_connectable_interface("virtual"));
    }
}
