use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

const BUILTIN_TABLE: &str = include_str!("../../config/knowledge.toml");

/// Errors that can occur while loading a knowledge base
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse knowledge base: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid knowledge base: {0}")]
    Invalid(String),
}

/// Category → search terms and course → category affinity tables.
///
/// Stands in for an embedding model: the text generator derives its search
/// terms from `keywords`, the semantic generator weighs a user's aptitude
/// scores with `affinities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub version: String,
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub affinities: BTreeMap<String, BTreeMap<String, f64>>,
}

impl KnowledgeBase {
    /// The table shipped with the service
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let kb = Self::from_toml_str(&raw)?;
        tracing::info!(
            "Loaded knowledge base {} from {} ({} categories, {} courses)",
            kb.version,
            path.as_ref().display(),
            kb.keywords.len(),
            kb.affinities.len()
        );
        Ok(kb)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, KnowledgeError> {
        let kb: KnowledgeBase = toml::from_str(raw)?;
        kb.normalized()
    }

    /// Lower-case every key and term, reject weights outside [0, 1]
    fn normalized(self) -> Result<Self, KnowledgeError> {
        if self.version.trim().is_empty() {
            return Err(KnowledgeError::Invalid("version must not be empty".to_string()));
        }

        let keywords = self
            .keywords
            .into_iter()
            .map(|(category, terms)| {
                let terms = terms
                    .into_iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                (category.trim().to_lowercase(), terms)
            })
            .collect();

        let mut affinities = BTreeMap::new();
        for (course, weights) in self.affinities {
            let mut normalized = BTreeMap::new();
            for (category, weight) in weights {
                if !(0.0..=1.0).contains(&weight) {
                    return Err(KnowledgeError::Invalid(format!(
                        "affinity {}.{} = {} is outside [0, 1]",
                        course, category, weight
                    )));
                }
                normalized.insert(category.trim().to_lowercase(), weight);
            }
            affinities.insert(course.trim().to_lowercase(), normalized);
        }

        Ok(Self {
            version: self.version,
            keywords,
            affinities,
        })
    }

    /// Search terms for the given categories, de-duplicated in first-seen order.
    /// Unknown categories contribute nothing.
    pub fn terms_for(&self, categories: &[&str]) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for list in categories.iter().filter_map(|c| self.keywords.get(*c)) {
            for term in list {
                if !terms.contains(term) {
                    terms.push(term.clone());
                }
            }
        }
        terms
    }

    /// Affinity row for a course name: the longest table key contained in the
    /// lower-cased name. Earlier keys win ties.
    pub fn affinity_for(&self, course_name: &str) -> Option<&BTreeMap<String, f64>> {
        let name = course_name.to_lowercase();
        let mut best: Option<(&str, &BTreeMap<String, f64>)> = None;

        for (key, row) in &self.affinities {
            if key.is_empty() || !name.contains(key.as_str()) {
                continue;
            }
            match best {
                Some((current, _)) if current.len() >= key.len() => {}
                _ => best = Some((key.as_str(), row)),
            }
        }

        best.map(|(_, row)| row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_parses() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert_eq!(kb.version, "builtin-1");
        assert!(kb.keywords.contains_key("logical"));
        assert!(kb.affinities.contains_key("computer science"));
    }

    #[test]
    fn test_terms_deduplicated_in_order() {
        let kb = KnowledgeBase::builtin().unwrap();
        let terms = kb.terms_for(&["logical", "analytical"]);

        assert_eq!(terms[0], "computer");
        assert_eq!(terms.iter().filter(|t| t.as_str() == "data").count(), 1);
        assert!(terms.contains(&"statistics".to_string()));
    }

    #[test]
    fn test_unknown_category_has_no_terms() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert!(kb.terms_for(&["astrology"]).is_empty());
    }

    #[test]
    fn test_longest_affinity_key_wins() {
        let kb = KnowledgeBase::builtin().unwrap();

        let row = kb.affinity_for("B.Tech Mechanical Engineering").unwrap();
        assert_eq!(row.get("technical"), Some(&0.95));

        let row = kb.affinity_for("Computer Science and Engineering").unwrap();
        assert_eq!(row.get("logical"), Some(&0.9));

        assert!(kb.affinity_for("Underwater Basket Weaving").is_none());
    }

    #[test]
    fn test_custom_table_normalized() {
        let kb = KnowledgeBase::from_toml_str(
            r#"
            version = "test-2"
            [keywords]
            Logical = [" Code ", ""]
            [affinities."Robotics"]
            Technical = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(kb.keywords.get("logical"), Some(&vec!["code".to_string()]));
        assert_eq!(kb.affinity_for("Robotics Lab").and_then(|r| r.get("technical")), Some(&0.7));
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let result = KnowledgeBase::from_toml_str(
            r#"
            version = "bad"
            [affinities.law]
            legal = 1.5
            "#,
        );
        assert!(matches!(result, Err(KnowledgeError::Invalid(_))));
    }
}
