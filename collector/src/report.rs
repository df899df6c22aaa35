use crate::TimeRange;
use chrono::SecondsFormat;
use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use serde::Serialize;

/// Outcome counters of one resource within a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTally {
    pub events_emitted: usize,
    pub fetch_failures: usize,
    pub alignment_failures: usize,
    pub sink_failures: usize,
}

impl ResourceTally {
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.alignment_failures + self.sink_failures
    }
}

/// What one collection cycle did, resource by resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub mode: &'static str,
    pub window: TimeRange,
    pub ranges: Vec<TimeRange>,
    /// In configured resource order.
    resources: Vec<(String, ResourceTally)>,
}

impl CycleReport {
    pub fn new(mode: &'static str, window: TimeRange, resources: &[String]) -> Self {
        Self {
            mode,
            window,
            ranges: Vec::new(),
            resources: resources
                .iter()
                .map(|resource| (resource.clone(), ResourceTally::default()))
                .collect(),
        }
    }

    pub fn tally(&self, resource: &str) -> Option<&ResourceTally> {
        self.resources
            .iter()
            .find(|(name, _)| name == resource)
            .map(|(_, tally)| tally)
    }

    pub(crate) fn tally_mut(&mut self, resource: &str) -> &mut ResourceTally {
        let index = match self.resources.iter().position(|(name, _)| name == resource) {
            Some(index) => index,
            None => {
                self.resources.push((resource.to_string(), ResourceTally::default()));
                self.resources.len() - 1
            }
        };
        &mut self.resources[index].1
    }

    pub fn total_events(&self) -> usize {
        self.resources.iter().map(|(_, tally)| tally.events_emitted).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.resources.iter().map(|(_, tally)| tally.failures()).sum()
    }

    /// Table for humans, one row per resource plus a totals row.
    pub fn format(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Resource").add_attribute(Attribute::Bold),
                Cell::new("Events").add_attribute(Attribute::Bold),
                Cell::new("Fetch failures").add_attribute(Attribute::Bold),
                Cell::new("Alignment failures").add_attribute(Attribute::Bold),
                Cell::new("Sink failures").add_attribute(Attribute::Bold),
            ]);

        for (resource, tally) in &self.resources {
            let color = if tally.failures() == 0 { Color::Green } else { Color::Yellow };
            table.add_row(vec![
                Cell::new(resource).fg(color),
                Cell::new(tally.events_emitted),
                failure_cell(tally.fetch_failures),
                failure_cell(tally.alignment_failures),
                failure_cell(tally.sink_failures),
            ]);
        }

        let totals = self.resources.iter().fold(ResourceTally::default(), |acc, (_, tally)| ResourceTally {
            events_emitted: acc.events_emitted + tally.events_emitted,
            fetch_failures: acc.fetch_failures + tally.fetch_failures,
            alignment_failures: acc.alignment_failures + tally.alignment_failures,
            sink_failures: acc.sink_failures + tally.sink_failures,
        });
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(totals.events_emitted).add_attribute(Attribute::Bold),
            Cell::new(totals.fetch_failures).add_attribute(Attribute::Bold),
            Cell::new(totals.alignment_failures).add_attribute(Attribute::Bold),
            Cell::new(totals.sink_failures).add_attribute(Attribute::Bold),
        ]);

        format!(
            "\n{} collection of {} in {} range(s)\n{table}\n",
            self.mode,
            self.window,
            self.ranges.len()
        )
    }

    pub fn summary(&self) -> serde_json::Value {
        let resources: serde_json::Map<String, serde_json::Value> = self
            .resources
            .iter()
            .map(|(resource, tally)| (resource.clone(), serde_json::json!(tally)))
            .collect();

        serde_json::json!({
            "mode": self.mode,
            "window": {
                "start": self.window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
                "end": self.window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            "ranges": self.ranges.len(),
            "events": self.total_events(),
            "failures": self.total_failures(),
            "resources": resources,
        })
    }
}

fn failure_cell(count: usize) -> Cell {
    let cell = Cell::new(count);
    if count > 0 {
        cell.fg(Color::Red)
    } else {
        cell
    }
}
