// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

use super::Session;
use anyhow::{Context, Result};

/// Print the effective configuration, or one key of it
pub fn run(session: &Session, key: Option<&str>) -> Result<()> {
    let value = toml::Value::try_from(&session.config).context("Failed to serialize configuration")?;

    let selected = match key {
        Some(key) => value
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?,
        None => &value,
    };

    if session.json {
        return session.print_json(selected);
    }
    match selected {
        toml::Value::Table(_) => print!(
            "{}",
            toml::to_string_pretty(selected).context("Failed to render configuration")?
        ),
        toml::Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
    Ok(())
}
