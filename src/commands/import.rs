// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Import command - bulk load terminations and cables from a JSON document

use super::Session;
use crate::graph::ImportDocument;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Run the import command
pub fn run(session: &Session, file: &Path) -> Result<()> {
    info!("Importing {}", file.display());

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document: ImportDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let mut plant = session.load_plant()?;
    let summary = plant
        .import(document)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    session.save_plant(&plant)?;

    if session.json {
        return session.print_json(&summary);
    }
    println!(
        "Imported {} termination(s) and {} cable(s); {} path(s) traced",
        summary.terminations, summary.cables, summary.paths
    );
    Ok(())
}
