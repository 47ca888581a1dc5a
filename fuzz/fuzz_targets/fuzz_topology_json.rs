// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use cabletrace::graph::CablePlant;
use cabletrace::types::Topology;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(topology) = serde_json::from_slice::<Topology>(data) else {
        return;
    };

    // Arbitrary stores may break tracer contracts; they must never panic it
    let mut plant = CablePlant::from_topology(topology);
    let _ = plant.trace_all();
    for path in plant.paths() {
        assert_eq!(path.segment_count(), path.get_cable_ids().len());
        let _ = path.trace(&plant.topology);
        let _ = path.get_total_length(&plant.topology);
    }
    let _ = plant.to_dot();
});
