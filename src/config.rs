use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use crate::cluster::ClusteringMethod;
use crate::error::{Error, Result};
use crate::events::Granularity;
use crate::filter::DocumentFilter;
use crate::temporal::Period;
use crate::text::StopWords;

/// Pre-extraction document filters; an absent field disables its filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub languages: Option<BTreeSet<String>>,
    pub min_text_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub granularity: Granularity,
    /// Minimum in-cluster document frequency a mention value needs to survive.
    pub cluster_threshold: f64,
    pub clustering: ClusteringMethod,
    /// Language tag -> stop words. Built-in English and French when absent.
    pub stop_words: Option<BTreeMap<String, Vec<String>>>,
    /// Language assumed for documents without a tag.
    pub default_language: String,
    pub query_period: Option<Period>,
    pub filters: FilterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Sentence,
            cluster_threshold: 0.3,
            clustering: ClusteringMethod::Hierarchical,
            stop_words: None,
            default_language: "en".to_string(),
            query_period: None,
            filters: FilterConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let cfg: PipelineConfig = serde_json::from_str(&raw)?;
        debug!("Loaded pipeline config - path={}", path.display());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cluster_threshold) {
            return Err(Error::invalid_input(format!(
                "cluster_threshold must lie in [0, 1], got {}",
                self.cluster_threshold
            )));
        }
        if let ClusteringMethod::Medoids { k: 0 } = self.clustering {
            return Err(Error::invalid_input("medoids.k must be at least 1"));
        }
        if let Some(q) = &self.query_period {
            q.complete()?;
        }
        Ok(())
    }

    pub fn stop_words(&self) -> StopWords {
        match &self.stop_words {
            Some(lists) => StopWords::from_lists(lists.clone()),
            None => StopWords::builtin(),
        }
    }

    /// Filters in application order: language, text length, publication date.
    pub fn document_filters(&self) -> Vec<DocumentFilter> {
        let mut out = Vec::new();
        if let Some(langs) = &self.filters.languages {
            out.push(DocumentFilter::Language(langs.clone()));
        }
        if let Some(min) = self.filters.min_text_chars {
            out.push(DocumentFilter::MinLength(min));
        }
        if let Some(q) = self.query_period {
            out.push(DocumentFilter::PublicationPeriod(q));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TemporalValue;

    #[test]
    fn test_defaults_from_empty_json() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.cluster_threshold, 0.3);
        assert!(cfg.document_filters().is_empty());
        assert!(cfg.stop_words().for_language("en").contains("the"));
    }

    #[test]
    fn test_full_json() {
        let raw = r#"{
            "granularity": "document",
            "cluster_threshold": 0.5,
            "clustering": {"medoids": {"k": 4}},
            "stop_words": {"en": ["Foo"]},
            "query_period": {"start": {"year": 2020}, "end": {"year": 2020}},
            "filters": {"languages": ["en"], "min_text_chars": 200}
        }"#;
        let cfg: PipelineConfig = serde_json::from_str(raw).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.granularity, Granularity::Document);
        assert_eq!(cfg.clustering, ClusteringMethod::Medoids { k: 4 });
        assert!(cfg.stop_words().for_language("en").contains("foo"));
        assert!(!cfg.stop_words().for_language("en").contains("the"));
        let filters = cfg.document_filters();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[1], DocumentFilter::MinLength(200));
        assert_eq!(filters[2], DocumentFilter::PublicationPeriod(Period::from(TemporalValue::year(2020))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cluster_threshold": 0.5}"#).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap().cluster_threshold, 0.5);

        std::fs::write(&path, r#"{"cluster_threshold": 2.0}"#).unwrap();
        assert!(PipelineConfig::from_file(&path).is_err());
        assert!(matches!(PipelineConfig::from_file(dir.path().join("missing.json")), Err(Error::Io(_))));
    }

    #[test]
    fn test_validate_rejects() {
        let cfg = PipelineConfig { cluster_threshold: 1.2, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig { clustering: ClusteringMethod::Medoids { k: 0 }, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig { query_period: Some(Period::default()), ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
