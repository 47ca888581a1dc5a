// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trace command - show the cable path from a termination

use super::{resolve_termination, Session};
use crate::path::{CablePath, PathState, TraceSegment};
use crate::types::{PathObject, Topology};
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
struct TraceReport<'a> {
    origin: String,
    path: Option<Uuid>,
    state: PathState,
    is_complete: bool,
    is_active: bool,
    is_split: bool,
    total_length: Option<f64>,
    length_is_definitive: bool,
    cables: Vec<Uuid>,
    segments: &'a [TraceSegment],
}

/// Run the trace command
///
/// Endpoint terminations show their stored path. Pass-through ports and
/// circuit terminations never own one, so they are traced on the fly.
pub fn run(session: &Session, termination: &str) -> Result<()> {
    let plant = session.load_plant()?;
    let topology = &plant.topology;
    let origin = resolve_termination(topology, termination)?;
    let origin_name = topology.display_name(origin);

    let path = match plant.path_for(origin.id) {
        Some(stored) => stored.clone(),
        None => match CablePath::from_origin(topology, &plant.builder(), std::slice::from_ref(origin))? {
            Some(traced) => traced,
            None => {
                println!("{} is not cabled", origin_name);
                return Ok(());
            }
        },
    };

    let segments = path.trace(topology);
    let (total_length, length_is_definitive) = path.get_total_length(topology);

    if session.json {
        return session.print_json(&TraceReport {
            origin: origin_name,
            path: plant.path_for(origin.id).map(|p| p.id),
            state: path.state(),
            is_complete: path.is_complete,
            is_active: path.is_active,
            is_split: path.is_split,
            total_length,
            length_is_definitive,
            cables: path.get_cable_ids(),
            segments: &segments,
        });
    }

    for (index, segment) in segments.iter().enumerate() {
        if index == 0 || segment.near != segments[index - 1].far {
            println!("{}", paint_group(session, topology, &segment.near));
        }
        if !segment.link.is_empty() {
            println!("  {}", paint_link(session, topology, &segment.link));
        }
        if !segment.far.is_empty() {
            println!("{}", paint_group(session, topology, &segment.far));
        }
    }

    println!();
    let state = path.state().to_string();
    let state = if !session.color {
        state
    } else {
        match path.state() {
            PathState::CompleteActive => state.green().to_string(),
            PathState::CompleteInactive => state.yellow().to_string(),
            PathState::Incomplete | PathState::Split => state.red().to_string(),
        }
    };
    println!("Status:   {}", state);
    println!("Segments: {}", path.segment_count());
    match total_length {
        Some(meters) if length_is_definitive => println!("Length:   {meters}m"),
        Some(meters) => println!("Length:   {meters}m (some cables have no length)"),
        None => println!("Length:   unknown"),
    }

    if path.is_split {
        let next: Vec<String> = path
            .get_split_nodes(topology)
            .iter()
            .map(|t| topology.display_name(t))
            .collect();
        println!("Split at: {}", next.join(", "));
    }

    Ok(())
}

fn paint_group(session: &Session, topology: &Topology, group: &[PathObject]) -> String {
    let names: Vec<String> = group
        .iter()
        .map(|object| {
            let label = match object {
                PathObject::Termination(t) => format!("{} ({})", topology.display_name(t), t.node_kind()),
                other => format!("{} ({})", topology.object_name(other), other.node().kind),
            };
            if session.color {
                label.bold().to_string()
            } else {
                label
            }
        })
        .collect();
    names.join(", ")
}

fn paint_link(session: &Session, topology: &Topology, link: &[PathObject]) -> String {
    let names: Vec<String> = link
        .iter()
        .map(|object| match object {
            PathObject::Cable(cable) => {
                let mut details = vec![cable.status.to_string()];
                if let Some(cable_type) = cable.cable_type {
                    details.push(cable_type.to_string());
                }
                if let (Some(length), Some(unit)) = (cable.length, cable.length_unit) {
                    details.push(format!("{length}{unit}"));
                }
                let text = format!("| cable {} [{}]", topology.object_name(object), details.join(", "));
                if !session.color {
                    text
                } else if cable.is_connected() {
                    text.cyan().to_string()
                } else {
                    text.yellow().to_string()
                }
            }
            other => format!("| {}", topology.object_name(other)),
        })
        .collect();
    names.join(", ")
}
