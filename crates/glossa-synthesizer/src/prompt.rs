//! Prompts for SQL generation and explanation

use crate::template::column_for;
use glossa_domain::{ImplementationKind, QueryInterpretation, SchemaSnapshot, StructuredQuery};
use std::fmt::Write;

/// Builds the SQL generation prompt for one interpretation
pub struct SqlPromptBuilder<'a> {
    interpretation: &'a QueryInterpretation,
    query: &'a StructuredQuery,
    schema: &'a SchemaSnapshot,
    dialect: String,
    max_columns_per_table: usize,
}

impl<'a> SqlPromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(
        interpretation: &'a QueryInterpretation,
        query: &'a StructuredQuery,
        schema: &'a SchemaSnapshot,
    ) -> Self {
        Self {
            interpretation,
            query,
            schema,
            dialect: "sql".to_string(),
            max_columns_per_table: 40,
        }
    }

    /// Target dialect tag
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Limit the columns listed per table
    pub fn with_max_columns(mut self, max_columns_per_table: usize) -> Self {
        self.max_columns_per_table = max_columns_per_table;
        self
    }

    /// Build the complete generation prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();
        let interp = self.interpretation;
        let query = self.query;

        prompt.push_str(SQL_INSTRUCTIONS);
        prompt.push_str("\n\n");

        let _ = writeln!(prompt, "Question: {}", query.raw_query);
        let _ = writeln!(
            prompt,
            "Interpretation: {} (confidence {:.2})\n",
            interp.rationale, interp.confidence
        );

        prompt.push_str("Tables:\n");
        for table in interp.referenced_tables(query) {
            let columns: Vec<String> = self
                .schema
                .columns_of(&table)
                .iter()
                .take(self.max_columns_per_table)
                .map(|c| {
                    if c.data_type.is_empty() {
                        c.name.clone()
                    } else {
                        format!("{} ({})", c.name, c.data_type)
                    }
                })
                .collect();
            if columns.is_empty() {
                let _ = writeln!(prompt, "- {}", table);
            } else {
                let _ = writeln!(prompt, "- {}: {}", table, columns.join(", "));
            }
        }

        let joins = interp.relevant_join_paths(query);
        if !joins.is_empty() {
            prompt.push_str("\nJoins:\n");
            for path in joins {
                let conditions: Vec<String> = path.columns.iter().map(|c| c.condition()).collect();
                let _ = writeln!(
                    prompt,
                    "- {} ON {}",
                    path.path.join(" -> "),
                    conditions.join(" AND ")
                );
            }
        }

        if !interp.attributes.is_empty() {
            prompt.push_str("\nColumns:\n");
            for (mention, attr) in &interp.attributes {
                let _ = writeln!(prompt, "- \"{}\" is {}", mention, attr.column_ref().qualified());
            }
        }

        if !query.filters.is_empty() {
            prompt.push_str("\nFilters:\n");
            for filter in &query.filters {
                let field = column_for(interp, &filter.field).unwrap_or_else(|| filter.field.clone());
                let _ = writeln!(prompt, "- {} {} {}", field, filter.operator, filter.value);
            }
        }

        if !query.time_references.is_empty() {
            let times: Vec<&str> = query.time_references.iter().map(|t| t.text.as_str()).collect();
            let _ = writeln!(prompt, "\nTime references: {}", times.join(", "));
        }

        if !interp.concepts.is_empty() {
            prompt.push_str("\nBusiness concepts:\n");
            for concept in interp.concepts.values() {
                let kind = match concept.implementation.kind {
                    ImplementationKind::Filter => "filter",
                    ImplementationKind::Selection => "selection",
                    ImplementationKind::Calculation => "calculation",
                    ImplementationKind::Mapping => "mapping",
                };
                let _ = writeln!(
                    prompt,
                    "- {} ({}): {} [{}]",
                    concept.concept, kind, concept.interpretation, concept.implementation.sql_fragment
                );
            }
        }

        if !query.aggregation_functions.is_empty() {
            let aggs: Vec<String> = query
                .aggregation_functions
                .iter()
                .map(|a| {
                    let field = column_for(interp, &a.field).unwrap_or_else(|| a.field.clone());
                    format!("{}({})", a.function.to_uppercase(), field)
                })
                .collect();
            let _ = writeln!(prompt, "\nAggregations: {}", aggs.join(", "));
        }

        if !query.grouping_dimensions.is_empty() {
            let groups: Vec<String> = query
                .grouping_dimensions
                .iter()
                .map(|g| column_for(interp, g).unwrap_or_else(|| g.clone()))
                .collect();
            let _ = writeln!(prompt, "Group by: {}", groups.join(", "));
        }

        if !query.sorting_criteria.is_empty() {
            let sorts: Vec<String> = query
                .sorting_criteria
                .iter()
                .map(|s| {
                    let field = column_for(interp, &s.field).unwrap_or_else(|| s.field.clone());
                    format!("{} {}", field, s.direction.as_sql())
                })
                .collect();
            let _ = writeln!(prompt, "Order by: {}", sorts.join(", "));
        }

        if let Some(limit) = query.limit {
            let _ = writeln!(prompt, "Limit: {}", limit);
        }

        prompt.push('\n');
        let _ = write!(
            prompt,
            "Return only the SQL query in a single ```{} fenced code block.",
            self.dialect
        );

        prompt
    }
}

/// Build the explanation prompt for generated SQL
pub fn explanation_prompt(question: &str, sql: &str, rationale: &str) -> String {
    format!(
        "{}\n\nQuestion: {}\nInterpretation: {}\n\nSQL:\n{}\n\n{}",
        EXPLANATION_INSTRUCTIONS, question, rationale, sql, EXPLANATION_FORMAT_REMINDER
    )
}

/// Generation instructions
const SQL_INSTRUCTIONS: &str = r#"You are an expert SQL author. Write one SQL query that answers the question below using ONLY the tables, columns and joins listed.

Rules:
- Use the listed join conditions when combining tables
- Qualify every column with its table name
- Apply the business concept fragments as given
- Do not invent tables or columns"#;

/// Explanation instructions
const EXPLANATION_INSTRUCTIONS: &str = r#"Explain in plain language what the following SQL query returns and how it answers the question. Keep it short and avoid SQL jargon."#;

const EXPLANATION_FORMAT_REMINDER: &str = r#"After the explanation, list every assumption the query makes under a heading "Assumptions:" with one "- " bullet per assumption."#;
