//! Category registry: an immutable, ordered table of category definitions.
//!
//! Two registries back a survey (sectors and headwinds). Both are built once
//! from host-supplied data and shared read-only across conversations.

use crate::error::{ConferenceBotError, Result};
use crate::matcher::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A canonical category and the keywords that point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryDefinition {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Read-only registry of categories in declaration order.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    kind: String,
    categories: Vec<Arc<CategoryDefinition>>,
}

impl CategoryRegistry {
    /// Build a registry, lowercasing keywords and rejecting blank or duplicate names.
    ///
    /// `kind` is the singular label used in prompts ("sector", "challenge").
    pub fn new(kind: impl Into<String>, definitions: Vec<CategoryDefinition>) -> Result<Self> {
        let kind = kind.into();
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(definitions.len());

        for def in definitions {
            let name = def.name.trim().to_string();
            if name.is_empty() {
                return Err(ConferenceBotError::Catalog {
                    message: format!("{kind} registry contains a category with a blank name"),
                });
            }
            if !seen.insert(normalize(&name)) {
                return Err(ConferenceBotError::Catalog {
                    message: format!("duplicate {kind} category: '{name}'"),
                });
            }

            // Keywords are matched case-insensitively; dedupe after folding.
            let mut kw_seen = HashSet::new();
            let keywords = def
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty() && kw_seen.insert(k.clone()))
                .collect();

            categories.push(Arc::new(CategoryDefinition { name, keywords }));
        }

        if categories.is_empty() {
            return Err(ConferenceBotError::Catalog {
                message: format!("{kind} registry is empty"),
            });
        }

        Ok(Self { kind, categories })
    }

    /// Singular label for this registry's categories.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Lookup by canonical name, folded the same way the matcher folds text.
    pub fn lookup(&self, name: &str) -> Option<Arc<CategoryDefinition>> {
        let needle = normalize(name);
        self.categories
            .iter()
            .find(|c| normalize(&c.name) == needle)
            .cloned()
    }

    /// All categories in declaration order.
    pub fn all(&self) -> &[Arc<CategoryDefinition>] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Canonical names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CategoryRegistry {
        CategoryRegistry::new(
            "sector",
            vec![
                CategoryDefinition::new("Utilities", &["Water", "gas", "water"]),
                CategoryDefinition::new("Healthcare", &["hospital"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let reg = sample();
        assert_eq!(reg.lookup("utilities").unwrap().name, "Utilities");
        assert_eq!(reg.lookup("  HEALTHCARE ").unwrap().name, "Healthcare");
        assert!(reg.lookup("Education").is_none());
    }

    #[test]
    fn test_lookup_folds_like_the_matcher() {
        let reg = CategoryRegistry::new(
            "sector",
            vec![CategoryDefinition::new("Technology & IT", &[])],
        )
        .unwrap();
        assert!(reg.lookup("technology   &  it").is_some());
        // Full-width letters fold under NFKC
        assert!(reg.lookup("Ｔｅｃｈｎｏｌｏｇｙ & ＩＴ").is_some());
    }

    #[test]
    fn test_all_preserves_declaration_order() {
        let reg = sample();
        assert_eq!(reg.names(), vec!["Utilities", "Healthcare"]);
    }

    #[test]
    fn test_keywords_folded_and_deduped() {
        let reg = sample();
        assert_eq!(reg.all()[0].keywords, vec!["water", "gas"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = CategoryRegistry::new(
            "sector",
            vec![
                CategoryDefinition::new("Education", &[]),
                CategoryDefinition::new("education", &[]),
            ],
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate sector category"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = CategoryRegistry::new("challenge", vec![CategoryDefinition::new("  ", &[])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(CategoryRegistry::new("sector", vec![]).is_err());
    }
}
