//! Approach classification of generated SQL

use glossa_domain::SqlApproach;
use regex::Regex;
use std::sync::OnceLock;

/// Tag used when a rationale has no alphanumeric word
pub const DEFAULT_TAG: &str = "interpretation";

struct Keywords {
    group_by: Regex,
    cte: Regex,
    select: Regex,
    union: Regex,
    join: Regex,
}

fn keywords() -> Option<&'static Keywords> {
    static KEYWORDS: OnceLock<Option<Keywords>> = OnceLock::new();
    KEYWORDS
        .get_or_init(|| {
            Some(Keywords {
                group_by: Regex::new(r"(?i)\bGROUP\s+BY\b").ok()?,
                cte: Regex::new(r"(?i)(?:^\s*WITH\s|\bWITH\s+RECURSIVE\b|\bWITH\s+\w+\s+AS\s*\()").ok()?,
                select: Regex::new(r"(?i)\bSELECT\b").ok()?,
                union: Regex::new(r"(?i)\bUNION\b").ok()?,
                join: Regex::new(r"(?i)\bJOIN\b").ok()?,
            })
        })
        .as_ref()
}

/// Classify SQL by keyword presence; the first matching rule wins
///
/// 1. `GROUP BY` → aggregation
/// 2. a `WITH` clause → common table expression
/// 3. more than one `SELECT` → subquery
/// 4. `UNION` → union
/// 5. more than two `JOIN`s → multi join
/// 6. otherwise → direct query
pub fn classify(sql: &str) -> SqlApproach {
    let Some(kw) = keywords() else {
        return SqlApproach::DirectQuery;
    };

    if kw.group_by.is_match(sql) {
        SqlApproach::Aggregation
    } else if kw.cte.is_match(sql) {
        SqlApproach::CommonTableExpression
    } else if kw.select.find_iter(sql).count() > 1 {
        SqlApproach::Subquery
    } else if kw.union.is_match(sql) {
        SqlApproach::Union
    } else if kw.join.find_iter(sql).count() > 2 {
        SqlApproach::MultiJoin
    } else {
        SqlApproach::DirectQuery
    }
}

/// Lowercased first alphanumeric word of a rationale
pub fn rationale_tag(rationale: &str) -> String {
    rationale
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_TAG.to_string())
}

/// `"{approach}_{tag}"`
pub fn approach_label(approach: SqlApproach, rationale: &str) -> String {
    format!("{}_{}", approach, rationale_tag(rationale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_rules() {
        assert_eq!(
            classify("SELECT status, COUNT(*) FROM orders GROUP BY status"),
            SqlApproach::Aggregation
        );
        assert_eq!(
            classify("WITH recent AS (SELECT * FROM orders) SELECT * FROM recent"),
            SqlApproach::CommonTableExpression
        );
        assert_eq!(
            classify("SELECT * FROM customers WHERE id IN (SELECT customer_id FROM orders)"),
            SqlApproach::Subquery
        );
        assert_eq!(
            classify("SELECT a FROM t JOIN u ON t.x = u.x JOIN v ON u.y = v.y JOIN w ON v.z = w.z"),
            SqlApproach::MultiJoin
        );
        assert_eq!(classify("select * from customers"), SqlApproach::DirectQuery);
    }

    #[test]
    fn test_rule_order() {
        // GROUP BY wins over the CTE and the nested SELECT
        let sql = "WITH x AS (SELECT * FROM orders) SELECT status, COUNT(*) FROM x GROUP BY status";
        assert_eq!(classify(sql), SqlApproach::Aggregation);
        // two SELECTs classify a UNION as a subquery
        assert_eq!(classify("SELECT a FROM t UNION SELECT a FROM u"), SqlApproach::Subquery);
    }

    #[test]
    fn test_keywords_inside_identifiers_do_not_count() {
        assert_eq!(
            classify("SELECT rejoin_date, reunion_flag FROM members"),
            SqlApproach::DirectQuery
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            approach_label(SqlApproach::DirectQuery, "single clear interpretation"),
            "direct_query_single"
        );
        assert_eq!(
            approach_label(SqlApproach::Aggregation, "  (Revenue-focused) reading"),
            "aggregation_revenue"
        );
        assert_eq!(rationale_tag("..."), DEFAULT_TAG);
    }
}
