//! Knowledge boundaries: explicit records of what could not be resolved

use crate::scoring::text_similarity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of "did you mean" suggestions attached to a boundary
pub const MAX_NAME_SUGGESTIONS: usize = 3;

/// What kind of mention hit the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    /// No table found for an entity mention
    UnknownEntity,
    /// No column found for an attribute mention
    UnknownAttribute,
    /// No column found for a field used in a filter
    UnresolvedFilter,
    /// No glossary term or oracle reading for a concept
    UnknownConcept,
}

impl BoundaryType {
    fn noun(&self) -> &'static str {
        match self {
            BoundaryType::UnknownEntity => "table",
            BoundaryType::UnknownAttribute | BoundaryType::UnresolvedFilter => "column",
            BoundaryType::UnknownConcept => "business concept",
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryType::UnknownEntity => "unknown_entity",
            BoundaryType::UnknownAttribute => "unknown_attribute",
            BoundaryType::UnresolvedFilter => "unresolved_filter",
            BoundaryType::UnknownConcept => "unknown_concept",
        };
        f.write_str(name)
    }
}

/// A mention that could not be resolved above a usable confidence
///
/// Boundaries are reported in the response instead of silently dropping the
/// mention. `suggestions` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBoundary {
    /// Kind of boundary
    pub boundary_type: BoundaryType,
    /// The mention or concept text
    pub component: String,
    /// Best confidence reached, 0 when nothing matched
    pub confidence: f64,
    /// Why resolution stopped
    pub explanation: String,
    /// Remediation hints
    pub suggestions: Vec<String>,
}

impl KnowledgeBoundary {
    /// Build a boundary for an unresolved mention
    ///
    /// `known_names` are the schema names (tables or `table.column`) the mention was
    /// compared with; the closest ones become "did you mean" suggestions.
    pub fn unresolved(
        boundary_type: BoundaryType,
        component: impl Into<String>,
        best_confidence: f64,
        known_names: &[String],
    ) -> Self {
        let component = component.into();
        let noun = boundary_type.noun();

        let explanation = if best_confidence > 0.0 {
            format!(
                "'{}' matched a {} only with confidence {:.2}, below the usable threshold",
                component, noun, best_confidence
            )
        } else {
            format!("'{}' did not match any known {}", component, noun)
        };

        let mut suggestions: Vec<String> = closest_names(&component, known_names)
            .into_iter()
            .map(|name| format!("Did you mean '{}'?", name))
            .collect();
        suggestions.push(format!(
            "Add a glossary term for '{}' mapped to the intended {}",
            component, noun
        ));
        if boundary_type == BoundaryType::UnresolvedFilter {
            suggestions.push(format!(
                "Rephrase the condition on '{}' using a column name from the schema",
                component
            ));
        }

        Self {
            boundary_type,
            component,
            confidence: best_confidence.clamp(0.0, 1.0),
            explanation,
            suggestions,
        }
    }

    /// Attach an extra explanation sentence (e.g. the oracle failure reason)
    pub fn with_detail(mut self, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref().trim();
        if !detail.is_empty() {
            self.explanation = format!("{} ({})", self.explanation, detail);
        }
        self
    }
}

/// Names most similar to the mention, best first
fn closest_names(mention: &str, known_names: &[String]) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = known_names
        .iter()
        .map(|name| {
            // compare against the bare column for `table.column` names as well
            let bare = name.rsplit('.').next().unwrap_or(name);
            let score = text_similarity(mention, name).max(text_similarity(mention, bare));
            (score, name)
        })
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(MAX_NAME_SUGGESTIONS)
        .map(|(_, name)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_suggestions_never_empty() {
        let boundary =
            KnowledgeBoundary::unresolved(BoundaryType::UnknownEntity, "widgets", 0.0, &[]);
        assert!(!boundary.suggestions.is_empty());
        assert!(boundary.explanation.contains("did not match"));
    }

    #[test]
    fn test_closest_names_suggested_first() {
        let boundary = KnowledgeBoundary::unresolved(
            BoundaryType::UnresolvedFilter,
            "order status",
            0.0,
            &names(&["orders.status", "orders.total", "customers.email"]),
        );
        assert_eq!(boundary.suggestions[0], "Did you mean 'orders.status'?");
        assert!(boundary
            .suggestions
            .iter()
            .any(|s| s.starts_with("Rephrase the condition")));
    }

    #[test]
    fn test_low_confidence_explanation() {
        let boundary =
            KnowledgeBoundary::unresolved(BoundaryType::UnknownAttribute, "amt", 0.31, &[])
                .with_detail("oracle timed out");
        assert!(boundary.explanation.contains("0.31"));
        assert!(boundary.explanation.ends_with("(oracle timed out)"));
        assert_eq!(boundary.boundary_type.to_string(), "unknown_attribute");
    }
}
