//! Static viewpoint and news-source definitions.
//!
//! The bundled catalog ships inside the binary; `CATALOG_PATH` can point at
//! a replacement file with the same shape.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use tracing::info;

use crate::error::CatalogError;

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub id: String,
    pub name: String,
    /// Persona text the reaction prompt is conditioned on.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSource {
    pub id: String,
    pub name: String,
    pub rss_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub viewpoints: Vec<Viewpoint>,
    #[serde(default)]
    pub sources: Vec<NewsSource>,
}

impl Catalog {
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Loads `path` when given, the bundled catalog otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            None => Self::bundled(),
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
                    path: path.to_string(),
                    source,
                })?;
                let catalog = Self::from_json(&raw)?;
                info!(
                    "Loaded catalog from {} ({} viewpoints, {} sources)",
                    path,
                    catalog.viewpoints.len(),
                    catalog.sources.len()
                );
                Ok(catalog)
            }
        }
    }

    /// Parses a catalog, keeping the first entry for any repeated id.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let mut catalog: Catalog = serde_json::from_str(raw)?;
        let mut seen = HashSet::new();
        catalog.viewpoints.retain(|v| seen.insert(v.id.clone()));
        seen.clear();
        catalog.sources.retain(|s| seen.insert(s.id.clone()));
        Ok(catalog)
    }

    pub fn viewpoint(&self, id: &str) -> Result<&Viewpoint, CatalogError> {
        self.viewpoints
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| CatalogError::UnknownViewpoint(id.to_string()))
    }

    pub fn source(&self, id: &str) -> Result<&NewsSource, CatalogError> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CatalogError::UnknownSource(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = Catalog::bundled().unwrap();
        assert!(!catalog.viewpoints.is_empty());
        assert!(!catalog.sources.is_empty());
        for viewpoint in &catalog.viewpoints {
            assert!(!viewpoint.description.is_empty(), "{}", viewpoint.id);
        }
        for source in &catalog.sources {
            assert!(source.rss_url.starts_with("http"), "{}", source.id);
        }
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(catalog.viewpoint("centrist").unwrap().name, "Centrist");
        assert_eq!(catalog.source("npr").unwrap().name, "NPR");
        assert!(matches!(
            catalog.viewpoint("nope"),
            Err(CatalogError::UnknownViewpoint(id)) if id == "nope"
        ));
        assert!(matches!(catalog.source("nope"), Err(CatalogError::UnknownSource(_))));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let raw = r#"{
            "viewpoints": [
                {"id": "a", "name": "First", "description": "one"},
                {"id": "a", "name": "Second", "description": "two"}
            ]
        }"#;
        let catalog = Catalog::from_json(raw).unwrap();
        assert_eq!(catalog.viewpoints.len(), 1);
        assert_eq!(catalog.viewpoints[0].name, "First");
        assert!(catalog.sources.is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Catalog::load(Some("/nonexistent/catalog.json")),
            Err(CatalogError::Read { .. })
        ));
    }
}
