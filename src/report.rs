//! Report model shared by every check, and its text rendering.

use serde::Serialize;
use std::fmt::Write as _;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// `label: count`, or `label: count unit`
    Count {
        label: String,
        count: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    /// A table the check needed is absent
    Unavailable { table: String },
    /// Free-form listing line
    Item { text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titled(heading: impl Into<String>) -> Self {
        Self {
            heading: Some(heading.into()),
            entries: Vec::new(),
        }
    }

    pub fn count(&mut self, label: impl Into<String>, count: i64) -> &mut Self {
        self.entries.push(Entry::Count {
            label: label.into(),
            count,
            unit: None,
        });
        self
    }

    /// Count followed by what is counted, e.g. `Site SITE_01: 2 sessions`.
    pub fn count_of(
        &mut self,
        label: impl Into<String>,
        count: i64,
        unit: impl Into<String>,
    ) -> &mut Self {
        self.entries.push(Entry::Count {
            label: label.into(),
            count,
            unit: Some(unit.into()),
        });
        self
    }

    pub fn unavailable(&mut self, table: impl Into<String>) -> &mut Self {
        self.entries.push(Entry::Unavailable {
            table: table.into(),
        });
        self
    }

    pub fn item(&mut self, text: impl Into<String>) -> &mut Self {
        self.entries.push(Entry::Item { text: text.into() });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    /// Command-line name of the check
    pub check: String,
    pub title: String,
    pub sections: Vec<Section>,
}

impl CheckReport {
    pub fn new(check: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// French text rendering, one check per block. Listing lines are always
    /// rendered as `  - text`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        writeln!(out, "=== {} ===", self.title).ok();
        for section in &self.sections {
            let indent = match &section.heading {
                Some(heading) => {
                    writeln!(out, "\n{heading}:").ok();
                    "  "
                }
                None => "",
            };
            for entry in &section.entries {
                match entry {
                    Entry::Count { label, count, unit } => {
                        write!(out, "{indent}{label}: {count}").ok();
                        if let Some(unit) = unit {
                            write!(out, " {unit}").ok();
                        }
                        out.push('\n');
                    }
                    Entry::Unavailable { table } => {
                        writeln!(out, "{indent}Table {table} n'existe pas encore").ok();
                    }
                    Entry::Item { text } => {
                        writeln!(out, "  - {text}").ok();
                    }
                }
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a batch of reports in the requested format.
pub fn render(reports: &[CheckReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(reports
            .iter()
            .map(CheckReport::to_text)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> CheckReport {
        let mut report = CheckReport::new("migration", "Vérification des données existantes");
        let mut totals = Section::new();
        totals.count("Sessions", 4).unavailable("Formateurs");
        report.push(totals);
        let mut listing = Section::new();
        listing
            .count_of("Total", 1, "sessions sans documents")
            .item("Session 3 (Site: SITE_02)");
        report.push(listing);
        let mut grouped = Section::titled("Sessions par site");
        grouped.count_of("Site SITE_02", 1, "sessions");
        report.push(grouped);
        report
    }

    #[test]
    fn text_rendering() {
        assert_eq!(
            sample().to_text(),
            "=== Vérification des données existantes ===\n\
             Sessions: 4\n\
             Table Formateurs n'existe pas encore\n\
             Total: 1 sessions sans documents\n  \
             - Session 3 (Site: SITE_02)\n\
             \n\
             Sessions par site:\n  \
             Site SITE_02: 1 sessions\n"
        );
    }

    #[test]
    fn text_batches_are_blank_line_separated() {
        let rendered = render(&[sample(), sample()], OutputFormat::Text).unwrap();
        assert!(rendered.contains("1 sessions\n\n=== Vérification"));
    }

    #[test]
    fn json_entries_are_tagged() {
        let rendered = render(&[sample()], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let entries = &value[0]["sections"][0]["entries"];
        assert_eq!(entries[0]["kind"], "count");
        assert_eq!(entries[0]["count"], 4);
        assert_eq!(entries[1]["kind"], "unavailable");
        assert_eq!(entries[1]["table"], "Formateurs");
        assert!(entries[0].get("unit").is_none());
        assert!(value[0]["sections"][0].get("heading").is_none());
        let listing = &value[0]["sections"][1]["entries"];
        assert_eq!(listing[0]["unit"], "sessions sans documents");
    }
}
