// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Path commands - inspect and rebuild stored cable paths

use super::{resolve_id, Session};
use crate::graph::CablePlant;
use crate::path::{CablePath, PathState, RetraceOutcome};
use crate::store::short_id;
use crate::types::PathObject;
use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
struct PathRow {
    id: Uuid,
    origin: String,
    destination: String,
    state: PathState,
    segments: usize,
}

impl PathRow {
    fn new(plant: &CablePlant, path: &CablePath) -> Self {
        let names = |objects: &[PathObject]| {
            objects
                .iter()
                .map(|o| plant.topology.object_name(o))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            id: path.id,
            origin: names(path.origins(&plant.topology)),
            destination: names(path.destinations(&plant.topology)),
            state: path.state(),
            segments: path.segment_count(),
        }
    }
}

/// Run path command
pub fn run(session: &Session, action: &str, id: Option<String>) -> Result<()> {
    let mut plant = session.load_plant()?;

    match action {
        "list" | "ls" => {
            let rows: Vec<PathRow> = plant.paths().iter().map(|p| PathRow::new(&plant, p)).collect();
            if session.json {
                return session.print_json(&rows);
            }
            if rows.is_empty() {
                println!("No cable paths");
            }
            for row in rows {
                let destination = if row.destination.is_empty() { "-" } else { row.destination.as_str() };
                println!(
                    "{}  {:<17} {} -> {} ({} segment(s))",
                    short_id(row.id),
                    row.state,
                    row.origin,
                    destination,
                    row.segments
                );
            }
        }

        "show" => {
            let path = find(&plant, id.as_deref())?;
            if session.json {
                return session.print_json(path);
            }
            let row = PathRow::new(&plant, path);
            println!("Path {}", path.id);
            println!("  origin:      {}", row.origin);
            println!("  destination: {}", if row.destination.is_empty() { "-" } else { row.destination.as_str() });
            println!("  state:       {}", row.state);
            println!("  segments:    {}", row.segments);
            for (hop, group) in path.path_objects(&plant.topology).iter().enumerate() {
                let names: Vec<String> = group.iter().map(|o| plant.topology.object_name(o)).collect();
                println!("  [{hop}] {}", names.join(", "));
            }
        }

        "retrace" => {
            let ids: Vec<Uuid> = match id.as_deref() {
                Some(key) => vec![find(&plant, Some(key))?.id],
                None => plant.paths().iter().map(|p| p.id).collect(),
            };
            let mut updated = 0;
            let mut deleted = 0;
            for path_id in ids {
                match plant
                    .retrace_path(path_id)
                    .with_context(|| format!("Failed to retrace path {}", path_id))?
                {
                    Some(RetraceOutcome::Updated) => updated += 1,
                    Some(RetraceOutcome::Deleted) => deleted += 1,
                    None => {}
                }
            }
            session.save_plant(&plant)?;
            println!("Retraced {} path(s); {} deleted", updated, deleted);
        }

        "rebuild" => {
            let summary = plant.trace_all();
            session.save_plant(&plant)?;
            println!(
                "Traced {} path(s): {} complete, {} split, {} failed",
                summary.traced,
                summary.complete,
                summary.split,
                summary.failed.len()
            );
            for (origin, violation) in &summary.failed {
                eprintln!("  {}: {}", origin, violation);
            }
            if !summary.failed.is_empty() {
                anyhow::bail!("{} origin(s) could not be traced", summary.failed.len());
            }
        }

        "split-nodes" => {
            let path = find(&plant, id.as_deref())?;
            let nodes = path.get_split_nodes(&plant.topology);
            if session.json {
                return session.print_json(&nodes);
            }
            if !path.is_split {
                println!("Path {} is not split", short_id(path.id));
            }
            for termination in nodes {
                println!("{} ({})", plant.topology.display_name(&termination), termination.node_kind());
            }
        }

        "groups" => {
            let groups = plant.independent_path_groups();
            if session.json {
                return session.print_json(&groups);
            }
            for (index, group) in groups.iter().enumerate() {
                let ids: Vec<String> = group.iter().map(|id| short_id(*id)).collect();
                println!("group {}: {}", index + 1, ids.join(" "));
            }
        }

        other => anyhow::bail!(
            "Unknown path action: {}. Valid: list, show, retrace, rebuild, split-nodes, groups",
            other
        ),
    }

    Ok(())
}

fn find<'a>(plant: &'a CablePlant, key: Option<&str>) -> Result<&'a CablePath> {
    let key = key.ok_or_else(|| anyhow::anyhow!("A path id is required"))?;
    let id = resolve_id(plant.paths().iter().map(|p| p.id), key, "path")?;
    plant
        .paths()
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow::anyhow!("Path not found: {}", key))
}
