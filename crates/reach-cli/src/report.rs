// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Text rendering of scenario reports.

use std::io::{self, Write};

use comfy_table::{presets::UTF8_FULL, Table};

use crate::scenario::Report;

fn flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "-"
    }
}

/// Object state table.
pub fn objects_table(report: &Report) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "object",
        "position",
        "active",
        "hovered",
        "contacted",
        "grasped",
        "suspended",
    ]);
    for o in &report.objects {
        let p = o.position;
        table.add_row(vec![
            o.name.clone(),
            format!("({:.3}, {:.3}, {:.3})", p.x(), p.y(), p.z()),
            flag(o.active).to_owned(),
            flag(o.hovered).to_owned(),
            flag(o.contacted).to_owned(),
            flag(o.grasped).to_owned(),
            flag(o.suspended).to_owned(),
        ]);
    }
    table
}

/// Event count table, by name.
pub fn events_table(report: &Report) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["event", "count"]);
    for (name, count) in &report.events {
        table.add_row(vec![name.clone(), count.to_string()]);
    }
    table
}

/// Writes the human-readable report.
pub fn write_text(out: &mut impl Write, report: &Report) -> io::Result<()> {
    writeln!(
        out,
        "scenario {}: {} ticks, {:.3} s simulated",
        report.name, report.ticks, report.time
    )?;
    writeln!(out, "{}", objects_table(report))?;
    writeln!(out, "{}", events_table(report))?;
    if report.misbehaving > 0 {
        writeln!(out, "misbehaving behaviours: {}", report.misbehaving)?;
    }
    Ok(())
}
