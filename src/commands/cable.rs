// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cable commands - connect, modify and remove cables

use super::{resolve_id, resolve_termination, Session};
use crate::cable::{CableRequest, CableUpdate};
use crate::store::short_id;
use crate::types::{CableEnd, CableStatus, CableType, LengthUnit, Topology};
use anyhow::{Context, Result};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Options accepted by the cable subcommands
#[derive(Debug, Clone, Default)]
pub struct CableArgs {
    /// Cable id or id prefix (update, delete)
    pub cable: Option<String>,
    /// A-side terminations
    pub a: Vec<String>,
    /// B-side terminations
    pub b: Vec<String>,
    /// Status slug
    pub status: Option<String>,
    /// Media type slug
    pub cable_type: Option<String>,
    /// Length value
    pub length: Option<f64>,
    /// Length unit slug
    pub unit: Option<String>,
    /// Label
    pub label: Option<String>,
    /// Color
    pub color: Option<String>,
}

#[derive(Serialize)]
struct CableRow {
    id: Uuid,
    status: CableStatus,
    #[serde(rename = "type")]
    cable_type: Option<CableType>,
    label: Option<String>,
    length: Option<f64>,
    length_unit: Option<LengthUnit>,
    a: Vec<String>,
    b: Vec<String>,
}

/// Run cable command
pub fn run(session: &Session, action: &str, args: CableArgs) -> Result<()> {
    let mut plant = session.load_plant()?;

    match action {
        "connect" | "create" | "add" => {
            let a_terminations = resolve_all(&plant.topology, &args.a)?;
            let b_terminations = resolve_all(&plant.topology, &args.b)?;
            let mut request = CableRequest::new(a_terminations, b_terminations);
            if let Some(status) = &args.status {
                request.status = parse(status, "status")?;
            }
            if let Some(cable_type) = &args.cable_type {
                request.cable_type = Some(parse(cable_type, "cable type")?);
            }
            request.length = args.length;
            request.length_unit = args.unit.as_deref().map(|u| parse(u, "length unit")).transpose()?;
            request.label = args.label;
            request.color = args.color;

            let id = plant.connect(&request).context("Failed to create cable")?;
            session.save_plant(&plant)?;
            println!("Created cable {}", id);
        }

        "update" | "set" => {
            let id = cable_id(&plant.topology, args.cable.as_deref())?;
            let update = CableUpdate {
                status: args.status.as_deref().map(|s| parse(s, "status")).transpose()?,
                cable_type: args
                    .cable_type
                    .as_deref()
                    .map(|t| parse(t, "cable type"))
                    .transpose()?,
                label: args.label,
                color: args.color,
                length: args.length.map(Some),
                length_unit: args.unit.as_deref().map(|u| parse(u, "length unit")).transpose()?,
                a_terminations: optional_side(&plant.topology, &args.a)?,
                b_terminations: optional_side(&plant.topology, &args.b)?,
            };
            plant
                .update_cable(id, &update)
                .with_context(|| format!("Failed to update cable {}", id))?;
            session.save_plant(&plant)?;
            println!("Updated cable {}", id);
        }

        "delete" | "remove" | "rm" => {
            let id = cable_id(&plant.topology, args.cable.as_deref())?;
            plant
                .delete_cable(id)
                .with_context(|| format!("Failed to delete cable {}", id))?;
            session.save_plant(&plant)?;
            println!("Deleted cable {}", id);
        }

        "list" | "ls" => {
            let rows: Vec<CableRow> = plant
                .topology
                .cables
                .iter()
                .map(|c| CableRow {
                    id: c.id,
                    status: c.status,
                    cable_type: c.cable_type,
                    label: c.label.clone(),
                    length: c.length,
                    length_unit: c.length_unit,
                    a: side_names(&plant.topology, c.id, CableEnd::A),
                    b: side_names(&plant.topology, c.id, CableEnd::B),
                })
                .collect();

            if session.json {
                return session.print_json(&rows);
            }
            if rows.is_empty() {
                println!("No cables");
            }
            for row in rows {
                let length = match (row.length, row.length_unit) {
                    (Some(l), Some(u)) => format!(" {l}{u}"),
                    _ => String::new(),
                };
                println!(
                    "{}  {:<15} {} <-> {}{}",
                    short_id(row.id),
                    row.status,
                    row.a.join(", "),
                    row.b.join(", "),
                    length
                );
            }
        }

        other => anyhow::bail!(
            "Unknown cable action: {}. Valid: connect, update, delete, list",
            other
        ),
    }

    Ok(())
}

fn parse<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown {}: {}", what, value))
}

fn resolve_all(topology: &Topology, keys: &[String]) -> Result<Vec<Uuid>> {
    keys.iter()
        .map(|key| resolve_termination(topology, key).map(|t| t.id))
        .collect()
}

fn optional_side(topology: &Topology, keys: &[String]) -> Result<Option<Vec<Uuid>>> {
    if keys.is_empty() {
        Ok(None)
    } else {
        resolve_all(topology, keys).map(Some)
    }
}

fn cable_id(topology: &Topology, key: Option<&str>) -> Result<Uuid> {
    let key = key.ok_or_else(|| anyhow::anyhow!("A cable id is required"))?;
    resolve_id(topology.cables.iter().map(|c| c.id), key, "cable")
}

fn side_names(topology: &Topology, cable: Uuid, end: CableEnd) -> Vec<String> {
    topology
        .terminations_on(cable, end)
        .iter()
        .map(|t| topology.display_name(t))
        .collect()
}
