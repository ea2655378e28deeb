//! Join path search over declared relationships
//!
//! Relationships are edges usable in both directions. The search is breadth-first,
//! so the path with the fewest hops wins; among paths of equal length the one with
//! the highest confidence (product of edge confidences) wins. Paths whose
//! confidence falls below the threshold are pruned as soon as they do.

use crate::catalog::Relationship;
use glossa_domain::{ColumnRef, JoinColumns, JoinPath};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Longest path considered, in hops
pub const MAX_JOIN_HOPS: usize = 4;

#[derive(Debug, Clone)]
struct Edge {
    to: String,
    columns: JoinColumns,
    confidence: f64,
}

#[derive(Debug, Clone)]
struct Partial {
    tables: Vec<String>,
    columns: Vec<JoinColumns>,
    confidence: f64,
}

fn adjacency(relationships: &[Relationship]) -> HashMap<&str, Vec<Edge>> {
    let mut edges: HashMap<&str, Vec<Edge>> = HashMap::new();
    for rel in relationships {
        let forward = JoinColumns {
            left: ColumnRef::new(&rel.source_table, &rel.source_column),
            right: ColumnRef::new(&rel.target_table, &rel.target_column),
        };
        let backward = JoinColumns {
            left: forward.right.clone(),
            right: forward.left.clone(),
        };
        edges.entry(rel.source_table.as_str()).or_default().push(Edge {
            to: rel.target_table.clone(),
            columns: forward,
            confidence: rel.confidence,
        });
        edges.entry(rel.target_table.as_str()).or_default().push(Edge {
            to: rel.source_table.clone(),
            columns: backward,
            confidence: rel.confidence,
        });
    }
    edges
}

/// Shortest sufficiently confident path from `source` to `target`
pub fn find_path(
    relationships: &[Relationship],
    source: &str,
    target: &str,
    min_confidence: f64,
) -> Option<JoinPath> {
    if source == target {
        return Some(JoinPath {
            source: source.to_string(),
            target: target.to_string(),
            path: vec![source.to_string()],
            columns: Vec::new(),
            confidence: 1.0,
        });
    }

    let edges = adjacency(relationships);
    let mut visited: HashSet<String> = HashSet::from([source.to_string()]);
    let mut frontier = vec![Partial {
        tables: vec![source.to_string()],
        columns: Vec::new(),
        confidence: 1.0,
    }];

    for _ in 0..MAX_JOIN_HOPS {
        // best partial path per newly reached table at this depth
        let mut next: BTreeMap<String, Partial> = BTreeMap::new();

        for partial in &frontier {
            let Some(last) = partial.tables.last() else {
                continue;
            };
            for edge in edges.get(last.as_str()).into_iter().flatten() {
                if visited.contains(&edge.to) {
                    continue;
                }
                let confidence = partial.confidence * edge.confidence;
                if confidence < min_confidence {
                    continue;
                }
                let better = next
                    .get(&edge.to)
                    .map(|existing| confidence > existing.confidence)
                    .unwrap_or(true);
                if better {
                    let mut tables = partial.tables.clone();
                    tables.push(edge.to.clone());
                    let mut columns = partial.columns.clone();
                    columns.push(edge.columns.clone());
                    next.insert(
                        edge.to.clone(),
                        Partial {
                            tables,
                            columns,
                            confidence,
                        },
                    );
                }
            }
        }

        if let Some(found) = next.remove(target) {
            return Some(JoinPath {
                source: source.to_string(),
                target: target.to_string(),
                path: found.tables,
                columns: found.columns,
                confidence: found.confidence,
            });
        }
        if next.is_empty() {
            return None;
        }

        visited.extend(next.keys().cloned());
        frontier = next.into_values().collect();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(st: &str, sc: &str, tt: &str, tc: &str, confidence: f64) -> Relationship {
        Relationship {
            source_table: st.to_string(),
            source_column: sc.to_string(),
            target_table: tt.to_string(),
            target_column: tc.to_string(),
            confidence,
        }
    }

    fn shop() -> Vec<Relationship> {
        vec![
            rel("orders", "customer_id", "customers", "id", 0.95),
            rel("order_items", "order_id", "orders", "id", 0.9),
            rel("order_items", "product_id", "products", "id", 0.9),
        ]
    }

    #[test]
    fn test_direct_path() {
        let path = find_path(&shop(), "orders", "customers", 0.7).unwrap();
        assert_eq!(path.path, vec!["orders", "customers"]);
        assert_eq!(path.columns[0].condition(), "orders.customer_id = customers.id");
        assert!((path.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_direction() {
        let path = find_path(&shop(), "customers", "orders", 0.7).unwrap();
        assert_eq!(path.columns[0].condition(), "customers.id = orders.customer_id");
    }

    #[test]
    fn test_multi_hop_confidence_is_product() {
        let path = find_path(&shop(), "customers", "products", 0.7).unwrap();
        assert_eq!(path.path, vec!["customers", "orders", "order_items", "products"]);
        assert!((path.confidence - 0.95 * 0.9 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_prunes_path() {
        assert!(find_path(&shop(), "customers", "products", 0.8).is_none());
    }

    #[test]
    fn test_disconnected_tables() {
        assert!(find_path(&shop(), "customers", "suppliers", 0.0).is_none());
    }

    #[test]
    fn test_equal_length_prefers_confidence() {
        let rels = vec![
            rel("a", "b_id", "b", "id", 0.8),
            rel("a", "c_id", "c", "id", 0.99),
            rel("b", "d_id", "d", "id", 0.9),
            rel("c", "d_id", "d", "id", 0.9),
        ];
        let path = find_path(&rels, "a", "d", 0.5).unwrap();
        assert_eq!(path.path, vec!["a", "c", "d"]);
    }
}
