//! Line classification for purchase-invoice text.

use regex::{Regex, RegexSet};

use super::patterns::{ITEM_BOUNDARY, ITEM_LINE};
use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::ItemFields;

/// Role of a single text line in the item stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRole {
    /// A complete item line.
    ItemStart(ItemFields),
    /// Customs tariff code for the preceding item.
    CustomsAnnotation(String),
    /// Text extending the preceding item's description.
    DescriptionContinuation,
    /// Administrative text to discard.
    Noise,
    /// Item-shaped line (two leading integers) that is not a complete item.
    NextItemBoundary,
    /// Anything else.
    Unrecognized,
}

/// Classifies lines against the item pattern and the prefix vocabularies.
///
/// Precedence: item line, item boundary, noise, customs code,
/// continuation, unrecognized.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    noise: RegexSet,
    continuation: RegexSet,
    customs: Regex,
}

impl LineClassifier {
    /// Build a classifier from the configured vocabularies.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            noise: prefix_set(&config.noise_prefixes)?,
            continuation: prefix_set(&config.continuation_prefixes)?,
            customs: compile(&format!(
                r"^{}\.?:\s*(\d+)",
                regex::escape(&config.customs_label)
            ))?,
        })
    }

    /// Classify one trimmed line.
    pub fn classify(&self, line: &str) -> LineRole {
        if let Some(caps) = ITEM_LINE.captures(line) {
            return LineRole::ItemStart(ItemFields {
                sequence: caps[1].to_string(),
                code: caps[2].to_string(),
                description: caps[3].to_string(),
                quantity: caps[4].to_string(),
                unit: caps[5].to_string(),
                unit_price: caps[6].to_string(),
                total_price: caps[7].to_string(),
            });
        }

        if ITEM_BOUNDARY.is_match(line) {
            return LineRole::NextItemBoundary;
        }

        if self.noise.is_match(line) {
            return LineRole::Noise;
        }

        if let Some(caps) = self.customs.captures(line) {
            return LineRole::CustomsAnnotation(caps[1].to_string());
        }

        if self.continuation.is_match(line) {
            return LineRole::DescriptionContinuation;
        }

        LineRole::Unrecognized
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default()).expect("default vocabulary compiles")
    }
}

fn prefix_set(prefixes: &[String]) -> Result<RegexSet, ExtractionError> {
    let patterns: Vec<String> = prefixes
        .iter()
        .map(|p| format!("^{}", regex::escape(p)))
        .collect();
    RegexSet::new(&patterns).map_err(|e| ExtractionError::Pattern {
        pattern: patterns.join(" | "),
        reason: e.to_string(),
    })
}

fn compile(pattern: &str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
