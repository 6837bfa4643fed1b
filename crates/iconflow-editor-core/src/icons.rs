//! The icon catalog: named SVG snippets with labels, categories and search
//! keywords.
//!
//! The host loads the catalog (typically a JSON file) before constructing an
//! editor; the core only ever consumes a resolved snapshot. An unknown icon
//! name falls back to the catalog's configured default key.

use std::collections::HashMap;

use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IconError {
    #[error("invalid icon catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IconData {
    pub label: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub svg: String,
}

#[derive(Debug, Clone)]
pub struct IconSet {
    icons: HashMap<SmolStr, IconData>,
    default_key: SmolStr,
}

impl IconSet {
    pub fn new(default_key: impl Into<SmolStr>) -> IconSet {
        IconSet {
            icons: HashMap::new(),
            default_key: default_key.into(),
        }
    }

    /// Parse a catalog from its JSON form: an object mapping icon names to
    /// icon data.
    pub fn from_json(json: &str, default_key: impl Into<SmolStr>) -> Result<IconSet, IconError> {
        let raw: HashMap<String, IconData> = serde_json::from_str(json)?;
        let icons = raw
            .into_iter()
            .map(|(name, data)| (SmolStr::new(name), data))
            .collect();
        let set = IconSet {
            icons,
            default_key: default_key.into(),
        };
        tracing::debug!(icons = set.len(), "icon catalog loaded");
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, data: IconData) {
        self.icons.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&IconData> {
        self.icons.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.icons.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// The SVG markup for an icon, falling back to the default key's SVG,
    /// then to the empty string.
    pub fn svg_for(&self, name: &str) -> &str {
        self.icons
            .get(name)
            .or_else(|| self.icons.get(&self.default_key))
            .map(|d| d.svg.as_str())
            .unwrap_or("")
    }

    /// Icon names in a stable order, for picker UIs.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.icons.keys().map(SmolStr::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Case-insensitive lookup over names, labels, categories and keywords.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();
        let mut hits: Vec<&str> = self
            .icons
            .iter()
            .filter(|(name, data)| {
                name.to_lowercase().contains(&query)
                    || data.label.to_lowercase().contains(&query)
                    || data.category.to_lowercase().contains(&query)
                    || data
                        .keywords
                        .iter()
                        .any(|k| k.to_lowercase().contains(&query))
            })
            .map(|(name, _)| name.as_str())
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "heart": {
            "label": "Heart",
            "category": "emotions",
            "keywords": ["love", "like"],
            "svg": "<svg>heart</svg>"
        },
        "star": {
            "label": "Star",
            "category": "objects",
            "keywords": ["favorite", "rating"],
            "svg": "<svg>star</svg>"
        },
        "coffee": {
            "label": "Coffee",
            "category": "food",
            "keywords": ["drink", "cafe"],
            "svg": "<svg>coffee</svg>"
        }
    }"#;

    #[test]
    fn test_from_json() {
        let set = IconSet::from_json(CATALOG, "heart").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("star").unwrap().label, "Star");
        assert_eq!(set.names(), vec!["coffee", "heart", "star"]);
    }

    #[test]
    fn test_svg_fallback_chain() {
        let set = IconSet::from_json(CATALOG, "heart").unwrap();
        assert_eq!(set.svg_for("star"), "<svg>star</svg>");
        assert_eq!(set.svg_for("nonexistent"), "<svg>heart</svg>");

        let empty = IconSet::new("heart");
        assert_eq!(empty.svg_for("anything"), "");
    }

    #[test]
    fn test_search() {
        let set = IconSet::from_json(CATALOG, "heart").unwrap();
        assert_eq!(set.search("rating"), vec!["star"]);
        assert_eq!(set.search("HEART"), vec!["heart"]);
        assert_eq!(set.search("food"), vec!["coffee"]);
        assert!(set.search("zzz").is_empty());
    }

    #[test]
    fn test_bad_catalog_rejected() {
        assert!(IconSet::from_json("not json", "heart").is_err());
        assert!(IconSet::from_json(r#"{"x": {"label": "X"}}"#, "heart").is_err());
    }
}
