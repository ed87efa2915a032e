//! `credsync jobs`: the job catalogue with config overrides applied.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use credsync_types::config::SchedulerConfig;

use crate::jobs::plan;

#[derive(Serialize)]
struct JobRow {
    name: &'static str,
    interval_secs: u64,
    enabled: bool,
    summary: &'static str,
}

pub fn list_jobs(config: &SchedulerConfig, json: bool) -> Result<()> {
    let rows: Vec<JobRow> = plan(config)?
        .into_iter()
        .map(|planned| JobRow {
            name: planned.job.name,
            interval_secs: planned.interval.as_secs(),
            enabled: planned.enabled,
            summary: planned.job.summary,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Job").fg(Color::White),
        Cell::new("Every").fg(Color::White),
        Cell::new("Enabled").fg(Color::White),
        Cell::new("Purpose").fg(Color::White),
    ]);

    for row in &rows {
        let enabled = if row.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(row.name).fg(Color::Cyan),
            Cell::new(human_interval(row.interval_secs)),
            enabled,
            Cell::new(row.summary),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} dispatcher tick: {} ms",
        style("i").blue().bold(),
        config.tick_ms
    );
    println!();
    Ok(())
}

fn human_interval(secs: u64) -> String {
    match secs {
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}
