//! Keyword-based categorization of events.
//!
//! A category is an opaque tag (a Google Calendar `colorId` in practice)
//! derived from an event's summary and description.

use std::fmt;

use crate::record::EventRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    pub fn new(value: impl Into<String>) -> Self {
        Category(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `keyword` anywhere in the text maps to `category`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub keyword: String,
    pub category: Category,
}

/// When every marker in `all_of` appears in the text, `category` wins outright.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub all_of: Vec<String>,
    pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRules {
    pub keywords: Vec<KeywordRule>,
    pub overrides: Vec<OverrideRule>,
}

/// Resolves events to categories using a fixed set of rules.
#[derive(Debug, Clone)]
pub struct Categorizer {
    /// Lowercased, longest keyword first
    keywords: Vec<KeywordRule>,
    overrides: Vec<OverrideRule>,
}

impl Categorizer {
    pub fn new(rules: CategoryRules) -> Self {
        let mut keywords: Vec<KeywordRule> = rules
            .keywords
            .into_iter()
            .map(|rule| KeywordRule {
                keyword: rule.keyword.trim().to_lowercase(),
                category: rule.category,
            })
            .filter(|rule| !rule.keyword.is_empty())
            .collect();

        // Longest first so "anatomy lab quiz" is tried before "lab"; ties by keyword
        keywords.sort_by(|a, b| {
            b.keyword
                .chars()
                .count()
                .cmp(&a.keyword.chars().count())
                .then_with(|| a.keyword.cmp(&b.keyword))
        });

        let overrides = rules
            .overrides
            .into_iter()
            .map(|rule| OverrideRule {
                all_of: rule
                    .all_of
                    .iter()
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect(),
                category: rule.category,
            })
            .filter(|rule| !rule.all_of.is_empty())
            .collect();

        Categorizer {
            keywords,
            overrides,
        }
    }

    pub fn categorize(&self, record: &EventRecord) -> Option<&Category> {
        self.categorize_text(&record.summary, &record.description)
    }

    pub fn categorize_text(&self, summary: &str, description: &str) -> Option<&Category> {
        let text = format!("{} {}", summary, description).to_lowercase();

        if let Some(rule) = self
            .overrides
            .iter()
            .find(|rule| rule.all_of.iter().all(|marker| text.contains(marker.as_str())))
        {
            return Some(&rule.category);
        }

        self.keywords
            .iter()
            .find(|rule| text.contains(rule.keyword.as_str()))
            .map(|rule| &rule.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(keyword: &str, category: &str) -> KeywordRule {
        KeywordRule {
            keyword: keyword.to_string(),
            category: Category::new(category),
        }
    }

    fn categorizer() -> Categorizer {
        Categorizer::new(CategoryRules {
            keywords: vec![
                keyword("lab", "5"),
                keyword("Anatomy Lab", "9"),
                keyword("lecture", "2"),
                keyword("exam", "7"),
            ],
            overrides: vec![OverrideRule {
                all_of: vec!["anatomy".to_string(), "quiz".to_string()],
                category: Category::new("11"),
            }],
        })
    }

    #[test]
    fn test_longest_keyword_wins() {
        let c = categorizer();

        assert_eq!(c.categorize_text("Anatomy Lab", "").map(Category::as_str), Some("9"));
        assert_eq!(c.categorize_text("Histology Lab", "").map(Category::as_str), Some("5"));
    }

    #[test]
    fn test_override_beats_keyword_scan() {
        let c = categorizer();

        assert_eq!(
            c.categorize_text("Gross Anatomy Lab Quiz", "").map(Category::as_str),
            Some("11")
        );
    }

    #[test]
    fn test_override_needs_every_marker() {
        let c = categorizer();

        assert_eq!(c.categorize_text("Pharmacology Quiz", "").map(Category::as_str), None);
    }

    #[test]
    fn test_description_and_case_are_considered() {
        let c = categorizer();

        assert_eq!(
            c.categorize_text("Block 2", "Final EXAM in room 4").map(Category::as_str),
            Some("7")
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let c = categorizer();

        assert_eq!(c.categorize_text("Office hours", "Drop in"), None);
    }

    #[test]
    fn test_equal_length_keywords_resolve_deterministically() {
        let c = Categorizer::new(CategoryRules {
            keywords: vec![keyword("quiz", "1"), keyword("exam", "2")],
            overrides: vec![],
        });

        // Both match; "exam" sorts before "quiz"
        assert_eq!(c.categorize_text("Quiz and exam", "").map(Category::as_str), Some("2"));
    }

    #[test]
    fn test_empty_keywords_are_ignored() {
        let c = Categorizer::new(CategoryRules {
            keywords: vec![keyword("  ", "1")],
            overrides: vec![],
        });

        assert_eq!(c.categorize_text("Anything", ""), None);
    }
}
