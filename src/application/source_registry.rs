//! Known catalog sources and their extraction strategies

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::SourceDescriptor;
use crate::infrastructure::config::{bayer_ua, bayer_us};
use crate::infrastructure::{DekalbUaExtractor, ExtractionStrategy};

/// Static source metadata plus the strategies that can crawl them
#[derive(Clone)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
    strategies: HashMap<String, Arc<dyn ExtractionStrategy>>,
}

impl SourceRegistry {
    /// Registry with every built-in source
    pub fn standard() -> Result<Self> {
        let dekalb_ua: Arc<dyn ExtractionStrategy> = Arc::new(DekalbUaExtractor::new()?);
        Ok(Self::new(Self::standard_descriptors(), vec![dekalb_ua]))
    }

    pub fn new(
        descriptors: Vec<SourceDescriptor>,
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
    ) -> Self {
        let strategies = strategies
            .into_iter()
            .map(|strategy| (strategy.source_id().to_string(), strategy))
            .collect();
        Self {
            descriptors,
            strategies,
        }
    }

    pub fn standard_descriptors() -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor {
                id: bayer_ua::SOURCE_ID.to_string(),
                market: bayer_ua::MARKET.to_string(),
                enabled: true,
                reason: None,
                last_run: None,
                fields: [
                    "name",
                    "fao",
                    "grain_type",
                    "maturity_group",
                    "advantages_text",
                    "positioning.*",
                    "density.*",
                    "rating.*",
                ]
                .map(String::from)
                .to_vec(),
            },
            SourceDescriptor {
                id: bayer_us::SOURCE_ID.to_string(),
                market: bayer_us::MARKET.to_string(),
                enabled: false,
                reason: Some(bayer_us::DISABLED_REASON.to_string()),
                last_run: None,
                fields: ["name", "relative_maturity", "trait_package"]
                    .map(String::from)
                    .to_vec(),
            },
        ]
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.id == source_id)
    }

    pub fn strategy(&self, source_id: &str) -> Option<Arc<dyn ExtractionStrategy>> {
        self.strategies.get(source_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = SourceRegistry::standard().unwrap();
        assert_eq!(registry.descriptors().len(), 2);

        let ua = registry.get("bayer_ua_dekalb").unwrap();
        assert!(ua.enabled);
        assert!(ua.fields.contains(&"rating.*".to_string()));
        assert!(registry.strategy("bayer_ua_dekalb").is_some());

        let us = registry.get("bayer_us_dekalb").unwrap();
        assert!(!us.enabled);
        assert!(us.reason.as_deref().unwrap().contains("manual import"));
        assert!(registry.strategy("bayer_us_dekalb").is_none());

        assert!(registry.get("unknown").is_none());
    }
}
