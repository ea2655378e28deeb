//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use glossa_domain::{KnowledgeBoundary, QueryInterpretation, SqlResult, Text2SqlResponse};
use glossa_schema::SchemaCatalog;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a pipeline response.
    ///
    /// Unless `all` is set, the table view shows only the primary interpretation's SQL.
    /// JSON always carries the full response.
    pub fn format_response(&self, response: &Text2SqlResponse, all: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
            OutputFormat::Table => Ok(self.format_response_table(response, all)),
            OutputFormat::Quiet => Ok(response
                .primary_sql()
                .map(|r| r.sql.clone())
                .unwrap_or_default()),
        }
    }

    fn format_response_table(&self, response: &Text2SqlResponse, all: bool) -> String {
        let mut sections = Vec::new();

        let mut header = format!(
            "{} {}\n{} {:.2}",
            self.colorize("Interpreted as:", "cyan"),
            response.interpreted_as,
            self.colorize("Ambiguity:", "cyan"),
            response.ambiguity_level
        );
        if response.multiple_interpretations {
            header.push_str(&format!(" ({} interpretations)", response.interpretations.len()));
        }
        sections.push(header);

        if let Some(table) = mappings_table(&response.primary_interpretation) {
            sections.push(table);
        }

        let shown: Vec<&SqlResult> = response
            .sql_results
            .iter()
            .filter(|r| all || r.is_primary)
            .collect();
        if shown.is_empty() {
            sections.push(self.warning("No SQL generated."));
        }
        for result in shown {
            sections.push(self.format_sql_result(result));
        }

        if !response.unresolved.is_empty() {
            sections.push(format!(
                "{}\n{}",
                self.warning(&format!("{} unresolved mention(s)", response.unresolved.len())),
                boundaries_table(&response.unresolved)
            ));
        }

        sections.join("\n\n")
    }

    fn format_sql_result(&self, result: &SqlResult) -> String {
        let mut title = format!("[{}] {}", result.interpretation_index + 1, result.approach);
        if result.is_primary {
            title.push_str(" (primary)");
        }

        let mut lines = vec![
            self.colorize(&title, "magenta"),
            result.sql.clone(),
        ];
        if !result.explanation.is_empty() {
            lines.push(result.explanation.clone());
        }
        for assumption in &result.assumptions {
            lines.push(format!("  - {}", assumption));
        }
        lines.join("\n")
    }

    /// Format the contents of a schema catalog.
    pub fn format_catalog(&self, catalog: &SchemaCatalog) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(catalog)?),
            OutputFormat::Quiet => Ok(catalog
                .tables
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if catalog.tables.is_empty() {
                    return Ok(self.colorize("No tables found.", "yellow"));
                }

                let mut tables = Builder::default();
                tables.push_record(["Table", "Columns", "Description"]);
                for table in &catalog.tables {
                    let columns: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
                    tables.push_record([
                        table.name.clone(),
                        columns.join(", "),
                        table.description.clone(),
                    ]);
                }
                let mut out = styled(tables);

                if !catalog.glossary.is_empty() {
                    let mut terms = Builder::default();
                    terms.push_record(["Term", "Maps to", "Weight"]);
                    for term in &catalog.glossary {
                        let mut targets = term.mapped_tables.clone();
                        targets.extend(term.mapped_columns.iter().map(|c| c.qualified()));
                        terms.push_record([
                            term.name.clone(),
                            targets.join(", "),
                            format!("{:.2}", term.weight),
                        ]);
                    }
                    out.push_str("\n\n");
                    out.push_str(&styled(terms));
                }
                Ok(out)
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Mention-to-schema mappings of one interpretation, or None when nothing resolved.
fn mappings_table(interp: &QueryInterpretation) -> Option<String> {
    if interp.entities.is_empty() && interp.attributes.is_empty() && interp.concepts.is_empty() {
        return None;
    }

    let mut builder = Builder::default();
    builder.push_record(["Mention", "Resolved to", "Method", "Confidence"]);
    for entity in interp.entities.values() {
        builder.push_record([
            entity.mention.clone(),
            entity.table_name.clone(),
            entity.resolution_method.to_string(),
            format!("{:.2}", entity.confidence),
        ]);
    }
    for attribute in interp.attributes.values() {
        builder.push_record([
            attribute.mention.clone(),
            format!("{}.{}", attribute.table_name, attribute.column_name),
            attribute.resolution_method.to_string(),
            format!("{:.2}", attribute.confidence),
        ]);
    }
    for concept in interp.concepts.values() {
        let kind = if concept.is_composite { "composite concept" } else { "concept" };
        builder.push_record([
            concept.concept.clone(),
            concept.implementation.sql_fragment.clone(),
            kind.to_string(),
            format!("{:.2}", concept.confidence),
        ]);
    }
    Some(styled(builder))
}

fn boundaries_table(boundaries: &[KnowledgeBoundary]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Type", "Mention", "Confidence", "Suggestions"]);
    for boundary in boundaries {
        builder.push_record([
            boundary.boundary_type.to_string(),
            boundary.component.clone(),
            format!("{:.2}", boundary.confidence),
            boundary.suggestions.join("\n"),
        ]);
    }
    styled(builder)
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}
