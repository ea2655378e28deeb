//! Deterministic SQL rendering used when the oracle cannot produce SQL

use glossa_domain::{ImplementationKind, QueryInterpretation, StructuredQuery};
use std::collections::HashSet;

/// Assumption recorded whenever template SQL is used
pub const TEMPLATE_ASSUMPTION: &str =
    "SQL was rendered from a template because the language model was unavailable";

/// SQL emitted when no table could be resolved at all
pub const UNRESOLVED_SQL: &str = "SELECT NULL WHERE 1 = 0";

/// Template output
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSql {
    /// Rendered SQL
    pub sql: String,
    /// What the template had to assume or leave out
    pub assumptions: Vec<String>,
}

/// Qualified column an attribute mention resolved to
pub fn column_for(interp: &QueryInterpretation, mention: &str) -> Option<String> {
    interp
        .attributes
        .get(mention.trim())
        .map(|attr| attr.column_ref().qualified())
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn literal(value: &str) -> String {
    let value = value.trim();
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        quote(value.trim_matches(|c| c == '\'' || c == '"'))
    }
}

fn condition(column: &str, operator: &str, value: &str) -> String {
    let op = operator.trim().to_lowercase();
    match op.as_str() {
        "" | "=" | "==" | "is" | "eq" | "equals" => format!("{} = {}", column, literal(value)),
        "!=" | "<>" | "ne" | "is not" | "not equals" => format!("{} <> {}", column, literal(value)),
        ">" | ">=" | "<" | "<=" => format!("{} {} {}", column, op, literal(value)),
        "contains" => format!("{} LIKE {}", column, quote(&format!("%{}%", value.trim()))),
        "like" => format!("{} LIKE {}", column, quote(value.trim())),
        "in" => {
            let items: Vec<String> = value.split(',').map(literal).collect();
            format!("{} IN ({})", column, items.join(", "))
        }
        other => format!("{} {} {}", column, other.to_uppercase(), literal(value)),
    }
}

/// Strip a leading `WHERE` from a concept fragment
fn where_body(fragment: &str) -> &str {
    let trimmed = fragment.trim();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("where ") => trimmed[6..].trim(),
        _ => trimmed,
    }
}

/// Render SQL for an interpretation without the oracle
///
/// `SELECT` resolved columns (or `*`), `FROM` the first table, one `JOIN ... ON` per
/// discovered join hop, concept filters and parsed filters in `WHERE`, then
/// `GROUP BY`, `ORDER BY` and `LIMIT`. Always records [`TEMPLATE_ASSUMPTION`].
pub fn render(interp: &QueryInterpretation, query: &StructuredQuery) -> TemplateSql {
    let mut assumptions = vec![TEMPLATE_ASSUMPTION.to_string()];
    let tables = interp.referenced_tables(query);
    let Some(first) = tables.first() else {
        assumptions.push("No table could be resolved for this question".to_string());
        return TemplateSql {
            sql: UNRESOLVED_SQL.to_string(),
            assumptions,
        };
    };

    let mut ignored = Vec::new();
    let mut resolve = |mention: &str| {
        let column = column_for(interp, mention);
        if column.is_none() && !ignored.iter().any(|m: &String| m == mention) {
            ignored.push(mention.to_string());
        }
        column
    };

    // SELECT
    let groups: Vec<String> = query
        .grouping_dimensions
        .iter()
        .filter_map(|g| resolve(g.as_str()))
        .collect();
    let mut select: Vec<String> = Vec::new();
    if query.aggregation_functions.is_empty() {
        for attr in &query.attributes {
            if let Some(column) = resolve(attr.as_str()) {
                if !select.contains(&column) {
                    select.push(column);
                }
            }
        }
    } else {
        select.extend(groups.iter().cloned());
        for agg in &query.aggregation_functions {
            let field = agg.field.trim();
            let target = if field.is_empty() || field == "*" {
                Some("*".to_string())
            } else {
                resolve(field)
            };
            if let Some(target) = target {
                select.push(format!("{}({})", agg.function.trim().to_uppercase(), target));
            }
        }
    }
    if select.is_empty() {
        select.push("*".to_string());
    }

    let mut lines = vec![
        format!("SELECT {}", select.join(", ")),
        format!("FROM {}", first),
    ];

    // JOIN
    let mut joined: HashSet<String> = HashSet::from([first.clone()]);
    let paths = interp.relevant_join_paths(query);
    for table in tables.iter().skip(1) {
        if joined.contains(table) {
            continue;
        }
        let forward = paths
            .iter()
            .find(|p| &p.target == table && joined.contains(&p.source));
        let backward = paths
            .iter()
            .find(|p| &p.source == table && joined.contains(&p.target));

        if let Some(path) = forward {
            for hop in &path.columns {
                if joined.insert(hop.right.table.clone()) {
                    lines.push(format!("JOIN {} ON {}", hop.right.table, hop.condition()));
                }
            }
        } else if let Some(path) = backward {
            for hop in path.columns.iter().rev() {
                if joined.insert(hop.left.table.clone()) {
                    lines.push(format!("JOIN {} ON {}", hop.left.table, hop.condition()));
                }
            }
        } else {
            joined.insert(table.clone());
            lines.push(format!("CROSS JOIN {}", table));
            assumptions.push(format!(
                "No join path was found for {}; it is cross joined",
                table
            ));
        }
    }

    // WHERE
    let mut conditions: Vec<String> = interp
        .concepts
        .values()
        .filter(|c| c.implementation.kind == ImplementationKind::Filter)
        .map(|c| where_body(&c.implementation.sql_fragment).to_string())
        .filter(|body| !body.is_empty())
        .collect();
    for filter in &query.filters {
        if let Some(column) = resolve(filter.field.as_str()) {
            conditions.push(condition(&column, &filter.operator, &filter.value));
        }
    }
    if !conditions.is_empty() {
        lines.push(format!("WHERE {}", conditions.join("\n  AND ")));
    }

    if !groups.is_empty() {
        lines.push(format!("GROUP BY {}", groups.join(", ")));
    }

    let order: Vec<String> = query
        .sorting_criteria
        .iter()
        .filter_map(|s| resolve(s.field.as_str()).map(|c| format!("{} {}", c, s.direction.as_sql())))
        .collect();
    if !order.is_empty() {
        lines.push(format!("ORDER BY {}", order.join(", ")));
    }

    if let Some(limit) = query.limit {
        lines.push(format!("LIMIT {}", limit));
    }

    for mention in ignored {
        assumptions.push(format!("'{}' could not be mapped to a column and was left out", mention));
    }
    for time in &query.time_references {
        assumptions.push(format!("The time reference '{}' was not applied", time.text));
    }

    TemplateSql {
        sql: lines.join("\n"),
        assumptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        customers_fixture, orders_fixture, status_attribute, status_filter,
    };
    use glossa_domain::{Aggregation, SortCriterion, SortDirection};

    #[test]
    fn test_select_all_from_single_table() {
        let (interp, query, _) = customers_fixture();
        let rendered = render(&interp, &query);
        assert_eq!(rendered.sql, "SELECT *\nFROM customers");
        assert_eq!(rendered.assumptions, vec![TEMPLATE_ASSUMPTION]);
    }

    #[test]
    fn test_filters_and_limit() {
        let (mut interp, mut query, _) = customers_fixture();
        interp.attributes.insert("status".to_string(), status_attribute());
        query.filters.push(status_filter());
        query.limit = Some(5);

        let rendered = render(&interp, &query);
        assert_eq!(
            rendered.sql,
            "SELECT *\nFROM customers\nWHERE customers.status = 'active'\nLIMIT 5"
        );
    }

    #[test]
    fn test_join_and_aggregation() {
        let (interp, mut query, _) = orders_fixture();
        query.aggregation_functions.push(Aggregation {
            function: "sum".to_string(),
            field: "total".to_string(),
        });
        query.grouping_dimensions.push("name".to_string());
        query.sorting_criteria.push(SortCriterion {
            field: "total".to_string(),
            direction: SortDirection::Desc,
        });

        let sql = render(&interp, &query).sql;
        assert_eq!(
            sql,
            "SELECT customers.name, SUM(orders.total)\n\
             FROM orders\n\
             JOIN customers ON orders.customer_id = customers.id\n\
             GROUP BY customers.name\n\
             ORDER BY orders.total DESC"
        );
    }

    #[test]
    fn test_unresolved_mentions_become_assumptions() {
        let (interp, mut query, _) = customers_fixture();
        query.attributes.push("loyalty tier".to_string());
        let rendered = render(&interp, &query);
        assert!(rendered
            .assumptions
            .iter()
            .any(|a| a.contains("'loyalty tier' could not be mapped")));
    }

    #[test]
    fn test_attribute_table_joins_through_discovered_path() {
        let (mut interp, mut query, _) = orders_fixture();
        interp.entities.remove("orders");
        query.main_entities = vec!["customers".to_string()];

        let rendered = render(&interp, &query);
        assert_eq!(
            rendered.sql,
            "SELECT customers.name, orders.total\n\
             FROM customers\n\
             JOIN orders ON orders.customer_id = customers.id"
        );
        assert_eq!(rendered.assumptions, vec![TEMPLATE_ASSUMPTION]);
    }

    #[test]
    fn test_missing_join_path_is_cross_join() {
        let (mut interp, query, _) = orders_fixture();
        interp.join_paths.clear();
        let rendered = render(&interp, &query);
        assert!(rendered.sql.contains("CROSS JOIN customers"));
        assert_eq!(rendered.assumptions.len(), 2);
    }

    #[test]
    fn test_conditions() {
        assert_eq!(condition("t.a", "contains", "bob"), "t.a LIKE '%bob%'");
        assert_eq!(condition("t.a", ">=", "10"), "t.a >= 10");
        assert_eq!(condition("t.a", "in", "x, y"), "t.a IN ('x', 'y')");
        assert_eq!(condition("t.a", "=", "O'Hara"), "t.a = 'O''Hara'");
        assert_eq!(where_body("where t.a = 1"), "t.a = 1");
    }
}
