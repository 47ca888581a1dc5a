// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Cabletrace library - cable path tracing for a physical network topology
//!
//! This crate walks a physical-layer topology (devices, ports, cables,
//! circuits) and records the end-to-end path from an origin termination,
//! following pass-through front/rear ports, multi-position trunks and
//! circuits. Paths are persisted as [`path::CablePath`] records and kept
//! current by explicit post-write hooks on the [`graph::CablePlant`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cable;
pub mod commands;
pub mod compat;
pub mod config;
pub mod error;
pub mod graph;
pub mod path;
pub mod store;
pub mod trace;

/// Core data types for the physical topology
pub mod types {
    use crate::error::UnknownNodeKind;
    use crate::path::CablePath;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use uuid::Uuid;

    // =========================================================================
    // Path Nodes
    // =========================================================================

    /// Every kind of object that can appear in a cable path
    #[derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        strum::Display,
        strum::EnumString,
        strum::IntoStaticStr,
        strum::EnumIter,
    )]
    #[serde(rename_all = "lowercase")]
    #[strum(serialize_all = "lowercase")]
    pub enum NodeKind {
        /// Network interface
        Interface,
        /// Console port
        ConsolePort,
        /// Console server port
        ConsoleServerPort,
        /// Power port (consumer side)
        PowerPort,
        /// Power outlet (supply side)
        PowerOutlet,
        /// Power feed from a power panel
        PowerFeed,
        /// Pass-through front port
        FrontPort,
        /// Pass-through rear port
        RearPort,
        /// One side (A or Z) of a circuit
        CircuitTermination,
        /// Provider network a circuit terminates into
        ProviderNetwork,
        /// Site/location a circuit terminates into
        Location,
        /// A cable
        Cable,
    }

    impl NodeKind {
        /// Stable numeric type id used in the serialized path format
        #[must_use]
        pub fn type_id(self) -> u8 {
            match self {
                Self::Interface => 1,
                Self::ConsolePort => 2,
                Self::ConsoleServerPort => 3,
                Self::PowerPort => 4,
                Self::PowerOutlet => 5,
                Self::PowerFeed => 6,
                Self::FrontPort => 7,
                Self::RearPort => 8,
                Self::CircuitTermination => 9,
                Self::ProviderNetwork => 10,
                Self::Location => 11,
                Self::Cable => 12,
            }
        }

        /// Inverse of [`NodeKind::type_id`]
        pub fn from_type_id(type_id: u8) -> Result<Self, UnknownNodeKind> {
            Ok(match type_id {
                1 => Self::Interface,
                2 => Self::ConsolePort,
                3 => Self::ConsoleServerPort,
                4 => Self::PowerPort,
                5 => Self::PowerOutlet,
                6 => Self::PowerFeed,
                7 => Self::FrontPort,
                8 => Self::RearPort,
                9 => Self::CircuitTermination,
                10 => Self::ProviderNetwork,
                11 => Self::Location,
                12 => Self::Cable,
                other => return Err(UnknownNodeKind(other)),
            })
        }

        /// Kinds a path may originate from (and end at as a genuine endpoint)
        #[must_use]
        pub fn is_path_endpoint(self) -> bool {
            matches!(
                self,
                Self::Interface
                    | Self::ConsolePort
                    | Self::ConsoleServerPort
                    | Self::PowerPort
                    | Self::PowerOutlet
                    | Self::PowerFeed
            )
        }

        /// Kinds that relay a signal to another port instead of ending it
        #[must_use]
        pub fn is_pass_through(self) -> bool {
            matches!(self, Self::FrontPort | Self::RearPort)
        }

        /// Kinds that terminate a path without ever carrying a cable
        #[must_use]
        pub fn is_path_terminal(self) -> bool {
            matches!(self, Self::ProviderNetwork | Self::Location)
        }
    }

    /// Reference to one object in a path: `(kind, id)`
    ///
    /// Serialized as the tuple `(type_id, object_id)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(into = "(u8, Uuid)", try_from = "(u8, Uuid)")]
    pub struct PathNode {
        /// Object kind
        pub kind: NodeKind,
        /// Object id
        pub id: Uuid,
    }

    impl PathNode {
        /// Build a node reference
        #[must_use]
        pub fn new(kind: NodeKind, id: Uuid) -> Self {
            Self { kind, id }
        }
    }

    impl From<PathNode> for (u8, Uuid) {
        fn from(node: PathNode) -> Self {
            (node.kind.type_id(), node.id)
        }
    }

    impl TryFrom<(u8, Uuid)> for PathNode {
        type Error = UnknownNodeKind;

        fn try_from((type_id, id): (u8, Uuid)) -> Result<Self, Self::Error> {
            Ok(Self::new(NodeKind::from_type_id(type_id)?, id))
        }
    }

    impl fmt::Display for PathNode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}:{}", self.kind, self.id)
        }
    }

    // =========================================================================
    // Sides
    // =========================================================================

    /// Which end of a cable a termination is attached to
    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
    )]
    pub enum CableEnd {
        /// A side
        A,
        /// B side
        B,
    }

    impl CableEnd {
        /// The other end of the cable
        #[must_use]
        pub fn opposite(self) -> Self {
            match self {
                Self::A => Self::B,
                Self::B => Self::A,
            }
        }
    }

    /// Which side of a circuit a circuit termination sits on
    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
    )]
    pub enum TermSide {
        /// A side
        A,
        /// Z side
        Z,
    }

    impl TermSide {
        /// The other side of the circuit
        #[must_use]
        pub fn opposite(self) -> Self {
            match self {
                Self::A => Self::Z,
                Self::Z => Self::A,
            }
        }
    }

    // =========================================================================
    // Terminations
    // =========================================================================

    /// Maximum number of positions on a rear port
    pub const REARPORT_POSITIONS_MAX: u16 = 1024;

    /// Variant-specific attributes of a termination
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    pub enum TerminationKind {
        /// Network interface
        Interface {
            /// Interface type slug (e.g. `1000base-t`, `virtual`, `lag`)
            interface_type: String,
        },
        /// Console port
        ConsolePort,
        /// Console server port
        ConsoleServerPort,
        /// Power port
        PowerPort,
        /// Power outlet
        PowerOutlet,
        /// Power feed
        PowerFeed,
        /// Front port mapped onto one position of a rear port
        FrontPort {
            /// Rear port this front port passes through to
            rear_port: Uuid,
            /// 1-based position on the rear port
            rear_port_position: u16,
        },
        /// Rear port carrying one or more positions
        RearPort {
            /// Number of front-port positions carried
            positions: u16,
        },
        /// One side of a circuit
        CircuitTermination {
            /// Owning circuit
            circuit: Uuid,
            /// Side of the circuit
            term_side: TermSide,
            /// Provider network this side terminates into, if any
            #[serde(default, skip_serializing_if = "Option::is_none")]
            provider_network: Option<Uuid>,
            /// Location this side terminates at, if any
            #[serde(default, skip_serializing_if = "Option::is_none")]
            location: Option<Uuid>,
        },
    }

    /// A physical connector that can anchor one end of a cable
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Termination {
        /// Unique identifier
        pub id: Uuid,
        /// Display name (unique per device by convention)
        pub name: String,
        /// Parent device, if any
        #[serde(default)]
        pub device: Option<Uuid>,
        /// Cable path originating here (denormalized, written with the path)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub path: Option<Uuid>,
        /// Variant attributes
        #[serde(flatten)]
        pub kind: TerminationKind,
    }

    impl Termination {
        fn build(name: &str, device: Option<Uuid>, kind: TerminationKind) -> Self {
            Self {
                id: Uuid::new_v4(),
                name: name.into(),
                device,
                path: None,
                kind,
            }
        }

        /// New interface of the given type
        #[must_use]
        pub fn interface(name: &str, device: Option<Uuid>, interface_type: &str) -> Self {
            Self::build(
                name,
                device,
                TerminationKind::Interface {
                    interface_type: interface_type.into(),
                },
            )
        }

        /// New console port
        #[must_use]
        pub fn console_port(name: &str, device: Option<Uuid>) -> Self {
            Self::build(name, device, TerminationKind::ConsolePort)
        }

        /// New console server port
        #[must_use]
        pub fn console_server_port(name: &str, device: Option<Uuid>) -> Self {
            Self::build(name, device, TerminationKind::ConsoleServerPort)
        }

        /// New power port
        #[must_use]
        pub fn power_port(name: &str, device: Option<Uuid>) -> Self {
            Self::build(name, device, TerminationKind::PowerPort)
        }

        /// New power outlet
        #[must_use]
        pub fn power_outlet(name: &str, device: Option<Uuid>) -> Self {
            Self::build(name, device, TerminationKind::PowerOutlet)
        }

        /// New power feed (power feeds hang off a panel, not a device)
        #[must_use]
        pub fn power_feed(name: &str) -> Self {
            Self::build(name, None, TerminationKind::PowerFeed)
        }

        /// New rear port with `positions` positions
        #[must_use]
        pub fn rear_port(name: &str, device: Option<Uuid>, positions: u16) -> Self {
            Self::build(name, device, TerminationKind::RearPort { positions })
        }

        /// New front port mapped to `position` on `rear_port`
        #[must_use]
        pub fn front_port(name: &str, device: Option<Uuid>, rear_port: Uuid, position: u16) -> Self {
            Self::build(
                name,
                device,
                TerminationKind::FrontPort {
                    rear_port,
                    rear_port_position: position,
                },
            )
        }

        /// New circuit termination on `term_side` of `circuit`
        #[must_use]
        pub fn circuit_termination(name: &str, circuit: Uuid, term_side: TermSide) -> Self {
            Self::build(
                name,
                None,
                TerminationKind::CircuitTermination {
                    circuit,
                    term_side,
                    provider_network: None,
                    location: None,
                },
            )
        }

        /// Attach a circuit termination to a provider network
        #[must_use]
        pub fn with_provider_network(mut self, network: Uuid) -> Self {
            if let TerminationKind::CircuitTermination { provider_network, .. } = &mut self.kind {
                *provider_network = Some(network);
            }
            self
        }

        /// Attach a circuit termination to a location
        #[must_use]
        pub fn with_location(mut self, site: Uuid) -> Self {
            if let TerminationKind::CircuitTermination { location, .. } = &mut self.kind {
                *location = Some(site);
            }
            self
        }

        /// The node kind of this termination
        #[must_use]
        pub fn node_kind(&self) -> NodeKind {
            match self.kind {
                TerminationKind::Interface { .. } => NodeKind::Interface,
                TerminationKind::ConsolePort => NodeKind::ConsolePort,
                TerminationKind::ConsoleServerPort => NodeKind::ConsoleServerPort,
                TerminationKind::PowerPort => NodeKind::PowerPort,
                TerminationKind::PowerOutlet => NodeKind::PowerOutlet,
                TerminationKind::PowerFeed => NodeKind::PowerFeed,
                TerminationKind::FrontPort { .. } => NodeKind::FrontPort,
                TerminationKind::RearPort { .. } => NodeKind::RearPort,
                TerminationKind::CircuitTermination { .. } => NodeKind::CircuitTermination,
            }
        }

        /// Path node reference for this termination
        #[must_use]
        pub fn node(&self) -> PathNode {
            PathNode::new(self.node_kind(), self.id)
        }

        /// Rear port and position, for front ports
        #[must_use]
        pub fn rear_port_mapping(&self) -> Option<(Uuid, u16)> {
            match self.kind {
                TerminationKind::FrontPort {
                    rear_port,
                    rear_port_position,
                } => Some((rear_port, rear_port_position)),
                _ => None,
            }
        }

        /// Position count, for rear ports
        #[must_use]
        pub fn positions(&self) -> Option<u16> {
            match self.kind {
                TerminationKind::RearPort { positions } => Some(positions),
                _ => None,
            }
        }

        /// Circuit side, for circuit terminations
        #[must_use]
        pub fn term_side(&self) -> Option<TermSide> {
            match self.kind {
                TerminationKind::CircuitTermination { term_side, .. } => Some(term_side),
                _ => None,
            }
        }

        /// Provider network, for circuit terminations
        #[must_use]
        pub fn provider_network(&self) -> Option<Uuid> {
            match self.kind {
                TerminationKind::CircuitTermination { provider_network, .. } => provider_network,
                _ => None,
            }
        }

        /// Location, for circuit terminations
        #[must_use]
        pub fn location(&self) -> Option<Uuid> {
            match self.kind {
                TerminationKind::CircuitTermination { location, .. } => location,
                _ => None,
            }
        }

        /// Interface type slug, for interfaces
        #[must_use]
        pub fn interface_type(&self) -> Option<&str> {
            match &self.kind {
                TerminationKind::Interface { interface_type } => Some(interface_type),
                _ => None,
            }
        }
    }

    /// A device that owns terminations
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Device {
        /// Unique identifier
        pub id: Uuid,
        /// Device name
        pub name: String,
    }

    /// A provider network a circuit can terminate into
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProviderNetwork {
        /// Unique identifier
        pub id: Uuid,
        /// Network name
        pub name: String,
    }

    /// A site/location a circuit can terminate at
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Location {
        /// Unique identifier
        pub id: Uuid,
        /// Location name
        pub name: String,
    }

    /// A provider circuit with A and Z terminations
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Circuit {
        /// Unique identifier
        pub id: Uuid,
        /// Provider circuit id
        pub cid: String,
    }

    // =========================================================================
    // Cables
    // =========================================================================

    /// Physical cable media
    #[derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        strum::Display,
        strum::EnumString,
    )]
    #[serde(rename_all = "kebab-case")]
    #[strum(serialize_all = "kebab-case")]
    pub enum CableType {
        /// CAT3
        Cat3,
        /// CAT5
        Cat5,
        /// CAT5e
        Cat5e,
        /// CAT6
        Cat6,
        /// CAT6a
        Cat6a,
        /// CAT7
        Cat7,
        /// CAT7a
        Cat7a,
        /// CAT8
        Cat8,
        /// Direct attach copper (active)
        DacActive,
        /// Direct attach copper (passive)
        DacPassive,
        /// MRJ21 trunk
        Mrj21Trunk,
        /// Coaxial
        Coaxial,
        /// Multimode fiber
        Mmf,
        /// Multimode fiber (OM1)
        MmfOm1,
        /// Multimode fiber (OM2)
        MmfOm2,
        /// Multimode fiber (OM3)
        MmfOm3,
        /// Multimode fiber (OM4)
        MmfOm4,
        /// Singlemode fiber
        Smf,
        /// Singlemode fiber (OS1)
        SmfOs1,
        /// Singlemode fiber (OS2)
        SmfOs2,
        /// Active optical cabling
        Aoc,
        /// Power
        Power,
        /// Other
        Other,
    }

    /// Cable lifecycle status
    #[derive(
        Debug,
        Clone,
        Copy,
        Default,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        strum::Display,
        strum::EnumString,
    )]
    #[serde(rename_all = "lowercase")]
    #[strum(serialize_all = "lowercase")]
    pub enum CableStatus {
        /// Installed and carrying signal
        #[default]
        Connected,
        /// Not yet installed
        Planned,
        /// Being removed
        Decommissioning,
    }

    /// Unit for a cable length
    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
    )]
    pub enum LengthUnit {
        /// Kilometers
        #[serde(rename = "km")]
        #[strum(serialize = "km")]
        Kilometers,
        /// Meters
        #[serde(rename = "m")]
        #[strum(serialize = "m")]
        Meters,
        /// Centimeters
        #[serde(rename = "cm")]
        #[strum(serialize = "cm")]
        Centimeters,
        /// Miles
        #[serde(rename = "mi")]
        #[strum(serialize = "mi")]
        Miles,
        /// Feet
        #[serde(rename = "ft")]
        #[strum(serialize = "ft")]
        Feet,
        /// Inches
        #[serde(rename = "in")]
        #[strum(serialize = "in")]
        Inches,
    }

    impl LengthUnit {
        /// Convert a length in this unit to meters
        #[must_use]
        pub fn to_meters(self, length: f64) -> f64 {
            let factor = match self {
                Self::Kilometers => 1000.0,
                Self::Meters => 1.0,
                Self::Centimeters => 0.01,
                Self::Miles => 1609.344,
                Self::Feet => 0.3048,
                Self::Inches => 0.0254,
            };
            round_length(length * factor)
        }
    }

    /// Round a length to the four decimal places lengths are stored with
    #[must_use]
    pub fn round_length(meters: f64) -> f64 {
        (meters * 10_000.0).round() / 10_000.0
    }

    /// A physical cable between an A-side and a B-side termination set
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Cable {
        /// Unique identifier
        pub id: Uuid,
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
        /// Length normalized to meters (derived on every save)
        #[serde(default)]
        pub abs_length: Option<f64>,
        /// When the cable was created
        pub created: DateTime<Utc>,
        /// When the cable was last written
        pub last_updated: DateTime<Utc>,
    }

    impl Cable {
        /// New connected cable with no length
        #[must_use]
        pub fn new(id: Uuid) -> Self {
            let now = Utc::now();
            Self {
                id,
                cable_type: None,
                status: CableStatus::Connected,
                label: None,
                color: None,
                length: None,
                length_unit: None,
                abs_length: None,
                created: now,
                last_updated: now,
            }
        }

        /// Path node reference for this cable
        #[must_use]
        pub fn node(&self) -> PathNode {
            PathNode::new(NodeKind::Cable, self.id)
        }

        /// Whether the cable is carrying signal
        #[must_use]
        pub fn is_connected(&self) -> bool {
            self.status == CableStatus::Connected
        }

        /// Recompute derived fields before a write
        pub fn refresh_derived(&mut self) {
            if self.length.is_none() {
                self.length_unit = None;
            }
            self.abs_length = match (self.length, self.length_unit) {
                (Some(length), Some(unit)) => Some(unit.to_meters(length)),
                _ => None,
            };
            self.last_updated = Utc::now();
        }
    }

    /// Attachment of one termination to one end of one cable
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CableEndpoint {
        /// Owning cable
        pub cable: Uuid,
        /// End of the cable
        pub cable_end: CableEnd,
        /// Attached termination
        pub termination: PathNode,
        /// Parent device of the termination (cached for filtering)
        #[serde(default)]
        pub device: Option<Uuid>,
    }

    // =========================================================================
    // Materialized path objects
    // =========================================================================

    /// Any object a path node can resolve to
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "object", rename_all = "snake_case")]
    pub enum PathObject {
        /// A port or circuit termination
        Termination(Termination),
        /// A cable
        Cable(Cable),
        /// A provider network
        ProviderNetwork(ProviderNetwork),
        /// A site/location
        Location(Location),
    }

    impl PathObject {
        /// Path node reference for this object
        #[must_use]
        pub fn node(&self) -> PathNode {
            match self {
                Self::Termination(t) => t.node(),
                Self::Cable(c) => c.node(),
                Self::ProviderNetwork(n) => PathNode::new(NodeKind::ProviderNetwork, n.id),
                Self::Location(l) => PathNode::new(NodeKind::Location, l.id),
            }
        }

        /// The termination, if this object is one
        #[must_use]
        pub fn as_termination(&self) -> Option<&Termination> {
            match self {
                Self::Termination(t) => Some(t),
                _ => None,
            }
        }

        /// The cable, if this object is one
        #[must_use]
        pub fn as_cable(&self) -> Option<&Cable> {
            match self {
                Self::Cable(c) => Some(c),
                _ => None,
            }
        }
    }

    // =========================================================================
    // Topology Store
    // =========================================================================

    /// The complete persisted topology
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Topology {
        /// All devices
        #[serde(default)]
        pub devices: Vec<Device>,
        /// All terminations
        #[serde(default)]
        pub terminations: Vec<Termination>,
        /// All provider networks
        #[serde(default)]
        pub provider_networks: Vec<ProviderNetwork>,
        /// All locations
        #[serde(default)]
        pub locations: Vec<Location>,
        /// All circuits
        #[serde(default)]
        pub circuits: Vec<Circuit>,
        /// All cables
        #[serde(default)]
        pub cables: Vec<Cable>,
        /// All cable endpoints
        #[serde(default)]
        pub endpoints: Vec<CableEndpoint>,
        /// All traced cable paths
        #[serde(default)]
        pub paths: Vec<CablePath>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::cable::{CableRequest, CableUpdate};
    pub use crate::compat::CompatibilityTable;
    pub use crate::error::{ContractViolation, Error, ValidationError};
    pub use crate::graph::CablePlant;
    pub use crate::path::{CablePath, PathState, RetraceOutcome};
    pub use crate::store::{PathStore, TerminationStore};
    pub use crate::trace::PathBuilder;
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
