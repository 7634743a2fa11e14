//! Brand alert detection
//!
//! Scans the free-text brand field of each valid record for mentions of the
//! tracked brands. Matching is literal substring search on the uppercased
//! field, so "Marca: Zeus / Otra" raises ZEUS.

use chrono::{DateTime, Utc};

use crate::config::BrandPattern;
use crate::models::{AlertStatus, BrandAlert};

/// Detector over a fixed brand table
#[derive(Debug, Clone)]
pub struct BrandDetector {
    /// (brand, uppercased patterns) in table order
    brands: Vec<(String, Vec<String>)>,
}

impl BrandDetector {
    pub fn new(table: &[BrandPattern]) -> Self {
        let brands = table
            .iter()
            .map(|entry| {
                let patterns = entry
                    .patterns
                    .iter()
                    .map(|p| p.trim().to_uppercase())
                    .filter(|p| !p.is_empty())
                    .collect();
                (entry.brand.clone(), patterns)
            })
            .collect();
        Self { brands }
    }

    /// Brands mentioned in `text`, each at most once, in table order
    pub fn detect(&self, text: &str) -> Vec<&str> {
        let upper = text.trim().to_uppercase();
        if upper.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<&str> = Vec::new();
        for (brand, patterns) in &self.brands {
            if found.contains(&brand.as_str()) {
                continue;
            }
            if patterns.iter().any(|p| upper.contains(p.as_str())) {
                found.push(brand);
            }
        }
        found
    }

    /// Alert candidates for one record
    pub fn candidates(
        &self,
        business_key: &str,
        context_label: &str,
        brand_text: &str,
        created_at: DateTime<Utc>,
    ) -> Vec<BrandAlert> {
        if business_key.is_empty() {
            return Vec::new();
        }

        let quoted = brand_text.trim();
        self.detect(brand_text)
            .into_iter()
            .map(|brand| BrandAlert {
                business_key: business_key.to_string(),
                context_label: context_label.to_string(),
                brand_name: brand.to_string(),
                status: AlertStatus::Pending,
                note: format!("Detected automatically in brand field: \"{}\"", quoted),
                created_at,
            })
            .collect()
    }
}
