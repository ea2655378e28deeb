//! Prompts and JSON schemas for the oracle calls made during resolution

use glossa_domain::{GlossaryTerm, ResolvedConcept, ResolvedEntity, SchemaSnapshot};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// Build the parser prompt
pub fn parse_prompt(query: &str, hints: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(PARSE_INSTRUCTIONS);
    prompt.push_str("\n\n");

    if !hints.is_empty() {
        prompt.push_str("Context hints:\n");
        for hint in hints {
            let _ = writeln!(prompt, "- {}", hint);
        }
        prompt.push('\n');
    }

    prompt.push_str("Question:\n---\n");
    prompt.push_str(query.trim());
    prompt.push_str("\n---\n\n");
    prompt.push_str(PARSE_FORMAT_REMINDER);
    prompt
}

/// Schema of the parser answer
pub fn parse_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "primary_intent": { "type": "string" },
            "main_entities": string_list(),
            "attributes": string_list(),
            "filters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "operator": { "type": "string" },
                        "value": { "type": "string" }
                    },
                    "required": ["field", "value"]
                }
            },
            "grouping_dimensions": string_list(),
            "sorting_criteria": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "direction": { "type": "string", "enum": ["asc", "desc"] }
                    },
                    "required": ["field"]
                }
            },
            "time_references": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "type": { "type": "string", "enum": ["absolute", "relative"] }
                    },
                    "required": ["text"]
                }
            },
            "aggregation_functions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "function": { "type": "string" },
                        "field": { "type": "string" }
                    },
                    "required": ["function"]
                }
            },
            "limit": { "type": ["integer", "null"] },
            "identified_ambiguities": string_list()
        },
        "required": ["primary_intent", "main_entities"]
    })
}

/// Build the fallback prompt asking which table a mention names
pub fn entity_prompt(mention: &str, query: &str, schema: &SchemaSnapshot, terms: &[GlossaryTerm]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Identify the database table that the phrase refers to.\n\n");
    let _ = writeln!(prompt, "Phrase: \"{}\"", mention);
    let _ = writeln!(prompt, "Question: {}\n", query);
    prompt.push_str("Tables:\n");
    for table in &schema.tables {
        if table.description.is_empty() {
            let _ = writeln!(prompt, "- {}", table.name);
        } else {
            let _ = writeln!(prompt, "- {}: {}", table.name, table.description);
        }
    }
    push_terms(&mut prompt, terms);
    prompt.push_str(
        "\nAnswer with JSON: {\"table\": \"<table name or empty>\", \"confidence\": <0.0-1.0>}. \
         Use an empty table when none fits.",
    );
    prompt
}

/// Schema of the table answer
pub fn entity_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "table": { "type": "string" },
            "confidence": { "type": "number" }
        },
        "required": ["table"]
    })
}

/// Build the fallback prompt asking which column a mention names
pub fn attribute_prompt(
    mention: &str,
    query: &str,
    schema: &SchemaSnapshot,
    tables: &[String],
    terms: &[GlossaryTerm],
) -> String {
    let mut prompt = String::new();
    prompt.push_str("Identify the database column that the phrase refers to.\n\n");
    let _ = writeln!(prompt, "Phrase: \"{}\"", mention);
    let _ = writeln!(prompt, "Question: {}\n", query);
    prompt.push_str("Columns:\n");
    for table in tables {
        let columns: Vec<&str> = schema.columns_of(table).iter().map(|c| c.name.as_str()).collect();
        let _ = writeln!(prompt, "- {}: {}", table, columns.join(", "));
    }
    push_terms(&mut prompt, terms);
    prompt.push_str(
        "\nAnswer with JSON: {\"table\": \"<table>\", \"column\": \"<column or empty>\", \
         \"confidence\": <0.0-1.0>}. Use an empty column when none fits.",
    );
    prompt
}

/// Schema of the column answer
pub fn attribute_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "table": { "type": "string" },
            "column": { "type": "string" },
            "confidence": { "type": "number" }
        },
        "required": ["table", "column"]
    })
}

fn push_terms(prompt: &mut String, terms: &[GlossaryTerm]) {
    if terms.is_empty() {
        return;
    }
    prompt.push_str("\nRelated glossary terms:\n");
    for term in terms {
        let _ = writeln!(prompt, "- {}: {}", term.name, term.definition);
    }
}

/// Build the prompt for a concept with no glossary match
pub fn concept_prompt(concept: &str, query: &str, schema: &SchemaSnapshot) -> String {
    let mut prompt = String::new();
    prompt.push_str("Explain the business concept below in terms of the database schema.\n\n");
    let _ = writeln!(prompt, "Concept: \"{}\"", concept);
    let _ = writeln!(prompt, "Question: {}\n", query);
    prompt.push_str("Schema:\n");
    for table in &schema.tables {
        let columns: Vec<&str> = schema
            .columns_of(&table.name)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let _ = writeln!(prompt, "- {}({})", table.name, columns.join(", "));
    }
    prompt.push_str(CONCEPT_FORMAT_REMINDER);
    prompt
}

/// Schema of the concept answer
pub fn concept_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "interpretation": { "type": "string" },
            "implementation": {
                "type": "object",
                "properties": {
                    "type": { "type": "string", "enum": ["filter", "selection", "calculation", "mapping"] },
                    "sql_fragment": { "type": "string" },
                    "tables_involved": string_list(),
                    "columns_involved": string_list()
                }
            },
            "confidence": { "type": "number" },
            "alternatives": string_list()
        },
        "required": ["interpretation", "implementation"]
    })
}

/// Build the prompt asking for competing interpretations of an ambiguous query
pub fn interpretations_prompt(
    query: &str,
    ambiguities: &[String],
    entities: &BTreeMap<String, ResolvedEntity>,
    concepts: &BTreeMap<String, ResolvedConcept>,
    schema: &SchemaSnapshot,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Propose alternative interpretations of an ambiguous business question. \
         Return 2 or 3 readings, most likely first.\n\n",
    );
    let _ = writeln!(prompt, "Question: {}", query);
    if !ambiguities.is_empty() {
        let _ = writeln!(prompt, "Ambiguous terms: {}", ambiguities.join(", "));
    }

    prompt.push_str("\nCurrent entity resolutions:\n");
    if entities.is_empty() {
        prompt.push_str("- (none)\n");
    }
    for (mention, entity) in entities {
        let _ = writeln!(
            prompt,
            "- \"{}\" -> {} ({:.2})",
            mention, entity.table_name, entity.confidence
        );
    }

    if !concepts.is_empty() {
        prompt.push_str("\nCurrent concept resolutions:\n");
        for (concept, resolved) in concepts {
            let _ = writeln!(prompt, "- \"{}\": {}", concept, resolved.interpretation);
        }
    }

    let _ = writeln!(prompt, "\nAvailable tables: {}", schema.table_names().join(", "));
    prompt.push_str(INTERPRETATIONS_FORMAT_REMINDER);
    prompt
}

/// Schema of the interpretations answer
pub fn interpretations_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "interpretations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "rationale": { "type": "string" },
                        "confidence": { "type": "number" },
                        "entity_reassignments": {
                            "type": "object",
                            "additionalProperties": { "type": "string" }
                        },
                        "concept_reinterpretations": {
                            "type": "object",
                            "additionalProperties": { "type": "string" }
                        }
                    },
                    "required": ["rationale", "confidence"]
                }
            }
        },
        "required": ["interpretations"]
    })
}

const PARSE_INSTRUCTIONS: &str = r#"Extract the structure of the following business question so it can be translated to SQL.

Identify:
- primary_intent: what the user wants, in a few words
- main_entities: the business objects asked about (candidate tables)
- attributes: properties of those objects (candidate columns)
- filters: conditions as {field, operator, value}
- grouping_dimensions, sorting_criteria ({field, direction}), aggregation_functions ({function, field})
- time_references: time expressions as {text, type} where type is "absolute" or "relative"
- limit: the requested number of rows, if any
- identified_ambiguities: words or phrases whose meaning is unclear"#;

const PARSE_FORMAT_REMINDER: &str =
    "Respond with a single JSON object using exactly these keys. Use empty lists for facets that do not apply and null for a missing limit.";

const CONCEPT_FORMAT_REMINDER: &str = r#"
Answer with JSON: {"interpretation": "<what the concept means>", "implementation": {"type": "filter|selection|calculation|mapping", "sql_fragment": "<SQL>", "tables_involved": [...], "columns_involved": [...]}, "confidence": <0.0-1.0>, "alternatives": [...]}"#;

const INTERPRETATIONS_FORMAT_REMINDER: &str = r#"
Answer with JSON: {"interpretations": [{"rationale": "<why this reading>", "confidence": <0.0-1.0>, "entity_reassignments": {"<mention>": "<table>"}, "concept_reinterpretations": {"<concept>": "<meaning>"}}]}"#;
