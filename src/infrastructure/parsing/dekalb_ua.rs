//! DEKALB Ukraine product page extractor
//!
//! Pages on cropscience.bayer.ua render hybrid facts as labelled lines:
//! single-line fields (`ФАО: 260`), key/value sections under upper-case
//! headings, and a characteristics section of `label ● ● ● 9` rating lines.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::page_text::{collapse_whitespace, heading_block, key_value_lines, visible_text};
use super::ExtractionStrategy;
use crate::domain::hybrid::truncate_evidence;
use crate::domain::{AttributeValue, CandidateAttribute, Item, TEXT_PATTERN_SELECTOR};
use crate::infrastructure::config::bayer_ua::{self, labels};

/// Extraction strategy for the `bayer_ua_dekalb` source
pub struct DekalbUaExtractor {
    heading_selector: Selector,
    fao: Regex,
    grain_type: Regex,
    maturity_group: Regex,
    heading_like: Regex,
    rating_line: Regex,
    rating_filler: Regex,
}

impl DekalbUaExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading_selector: Selector::parse("h1")
                .map_err(|e| anyhow::anyhow!("invalid heading selector: {e}"))?,
            fao: Self::compile(r"(?i)ФАО:\s*([0-9]{2,4})")?,
            grain_type: Self::compile(r"(?i)Тип зерна:\s*([^\n]+)")?,
            maturity_group: Self::compile(r"(?i)Група стиглості:\s*([^\n]+)")?,
            heading_like: Self::compile(r"^[A-ZА-ЯІЇЄҐ0-9 \-]{5,}$")?,
            rating_line: Self::compile(r"^(.*?)(\d{1,2})$")?,
            rating_filler: Self::compile(r"[●○•\.\-]+")?,
        })
    }

    fn compile(pattern: &str) -> Result<Regex> {
        Regex::new(pattern).with_context(|| format!("invalid extraction pattern {pattern}"))
    }

    /// Crop slug from the path segment right after the catalog marker
    pub fn crop_from_url(url: &str) -> Option<String> {
        let (_, rest) = url.split_once(bayer_ua::CATALOG_MARKER)?;
        let segment = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if segment.is_empty() { None } else { Some(segment) }
    }

    fn heading_name(&self, document: &Html) -> String {
        document
            .select(&self.heading_selector)
            .next()
            .map(|h1| {
                let parts: Vec<&str> = h1
                    .text()
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect();
                collapse_whitespace(&parts.join(" "))
            })
            .unwrap_or_default()
    }

    fn single_line(pattern: &Regex, text: &str) -> Option<String> {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// `(label, score)` pairs from rating lines, filler glyphs removed.
    ///
    /// A repeated label keeps its first position and takes the last score.
    fn rating_lines(&self, block: &str) -> Vec<(String, i64)> {
        let mut ratings: Vec<(String, i64)> = Vec::new();
        for line in block.lines() {
            let Some(caps) = self.rating_line.captures(line.trim()) else {
                continue;
            };
            let (Some(label), Some(score)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let label = collapse_whitespace(&self.rating_filler.replace_all(label.as_str(), " "));
            let Ok(score) = score.as_str().parse::<i64>() else {
                continue;
            };
            if label.is_empty() {
                continue;
            }
            match ratings.iter_mut().find(|(existing, _)| *existing == label) {
                Some(entry) => entry.1 = score,
                None => ratings.push((label, score)),
            }
        }
        ratings
    }
}

/// Collects attribute records that share a page URL and extraction time
struct AttributeSink<'a> {
    url: &'a str,
    extracted_at: DateTime<Utc>,
    attributes: Vec<CandidateAttribute>,
}

impl AttributeSink<'_> {
    fn add(&mut self, key: &str, value: AttributeValue, evidence: &str) {
        if value.is_empty() {
            return;
        }
        let evidence = if evidence.is_empty() {
            value.to_string()
        } else {
            evidence.to_string()
        };
        self.attributes.push(CandidateAttribute {
            key: key.to_string(),
            value,
            evidence: truncate_evidence(&evidence),
            selector: Some(TEXT_PATTERN_SELECTOR.to_string()),
            source_url: Some(self.url.to_string()),
            extracted_at: Some(self.extracted_at),
        });
    }
}

impl ExtractionStrategy for DekalbUaExtractor {
    fn source_id(&self) -> &str {
        bayer_ua::SOURCE_ID
    }

    fn market(&self) -> &str {
        bayer_ua::MARKET
    }

    fn start_url(&self) -> &str {
        bayer_ua::START_URL
    }

    fn catalog_marker(&self) -> &str {
        bayer_ua::CATALOG_MARKER
    }

    fn parse_product(&self, url: &str, html: &str) -> Item {
        let document = Html::parse_document(html);
        let name = self.heading_name(&document);
        let text = visible_text(&document);

        let mut sink = AttributeSink {
            url,
            extracted_at: Utc::now(),
            attributes: Vec::new(),
        };

        if let Some(fao) = Self::single_line(&self.fao, &text) {
            let evidence = format!("{} {fao}", labels::FAO);
            sink.add("fao", AttributeValue::text(fao), &evidence);
        }
        if let Some(grain) = Self::single_line(&self.grain_type, &text) {
            let evidence = format!("{} {grain}", labels::GRAIN_TYPE);
            sink.add("grain_type", AttributeValue::text(grain), &evidence);
        }
        if let Some(group) = Self::single_line(&self.maturity_group, &text) {
            let evidence = format!("{} {group}", labels::MATURITY_GROUP);
            sink.add("maturity_group", AttributeValue::text(group), &evidence);
        }

        if let Some(block) = heading_block(&text, labels::ADVANTAGES, &self.heading_like) {
            sink.add(
                "advantages_text",
                AttributeValue::text(collapse_whitespace(&block)),
                &block,
            );
        }

        for (heading, namespace) in [
            (labels::POSITIONING, "positioning"),
            (labels::DENSITY, "density"),
        ] {
            let Some(block) = heading_block(&text, heading, &self.heading_like) else {
                continue;
            };
            for (key, value) in key_value_lines(&block) {
                let evidence = format!("{key}: {value}");
                sink.add(
                    &format!("{namespace}.{key}"),
                    AttributeValue::text(value),
                    &evidence,
                );
            }
        }

        if let Some(block) = heading_block(&text, labels::CHARACTERISTICS, &self.heading_like) {
            for (label, score) in self.rating_lines(&block) {
                let evidence = format!("{label} {score}");
                sink.add(
                    &format!("rating.{label}"),
                    AttributeValue::integer(score),
                    &evidence,
                );
            }
        }

        debug!(
            "Extracted {} attributes for '{}' from {}",
            sink.attributes.len(),
            name,
            url
        );

        Item {
            crop: Self::crop_from_url(url),
            name,
            market: self.market().to_string(),
            brand: Some(bayer_ua::BRAND.to_string()),
            source_url: url.to_string(),
            attributes: sink.attributes,
        }
    }
}
