// Brand registry: deterministic brand-name to verified-domain lookups.
//
// Matching rules, in order: exact name, case-insensitive name,
// case-insensitive alias. Nothing else - in particular no substring matching
// in either direction, so a brand name that happens to be a substring of an
// unrelated domain can never match it.

use serde::{Deserialize, Serialize};

/// One known brand with its verified domains and accepted aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    /// Canonical brand name, e.g. "Amazon"
    pub name: String,
    /// Registered domains verified to belong to this brand
    #[serde(default)]
    pub domains: Vec<String>,
    /// Alternate spellings detectors are known to emit, e.g. "amazon.com",
    /// "AWS"
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl BrandEntry {
    /// Case-insensitive exact membership test against the verified domain
    /// list.
    pub fn owns_domain(&self, registered_domain: &str) -> bool {
        let candidate = registered_domain.trim().to_ascii_lowercase();
        self.domains
            .iter()
            .any(|d| d.trim().to_ascii_lowercase() == candidate)
    }
}

/// Lookup table of known brands, loaded once from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRegistry {
    brands: Vec<BrandEntry>,
}

impl BrandRegistry {
    pub fn new(brands: Vec<BrandEntry>) -> Self {
        Self { brands }
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    /// Resolve a detector-reported brand name to a registry entry.
    ///
    /// Matching is deterministic and documented: exact name first, then
    /// case-insensitive name, then case-insensitive alias. Returns None for
    /// anything else.
    pub fn resolve(&self, brand_name: &str) -> Option<&BrandEntry> {
        let trimmed = brand_name.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(entry) = self.brands.iter().find(|b| b.name == trimmed) {
            return Some(entry);
        }

        let lowered = trimmed.to_ascii_lowercase();
        if let Some(entry) = self
            .brands
            .iter()
            .find(|b| b.name.to_ascii_lowercase() == lowered)
        {
            return Some(entry);
        }

        self.brands.iter().find(|b| {
            b.aliases
                .iter()
                .any(|alias| alias.trim().to_ascii_lowercase() == lowered)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BrandRegistry {
        BrandRegistry::new(vec![
            BrandEntry {
                name: "Amazon".to_string(),
                domains: vec!["amazon.com".to_string(), "amazon.co.uk".to_string()],
                aliases: vec!["amazon.com".to_string(), "AWS".to_string()],
            },
            BrandEntry {
                name: "PayPal".to_string(),
                domains: vec!["paypal.com".to_string()],
                aliases: vec![],
            },
        ])
    }

    #[test]
    fn test_exact_match() {
        let reg = registry();
        assert_eq!(reg.resolve("Amazon").unwrap().name, "Amazon");
    }

    #[test]
    fn test_case_insensitive_match() {
        let reg = registry();
        assert_eq!(reg.resolve("amazon").unwrap().name, "Amazon");
        assert_eq!(reg.resolve("PAYPAL").unwrap().name, "PayPal");
    }

    #[test]
    fn test_alias_match() {
        let reg = registry();
        assert_eq!(reg.resolve("aws").unwrap().name, "Amazon");
        assert_eq!(reg.resolve("amazon.com").unwrap().name, "Amazon");
    }

    #[test]
    fn test_no_substring_matching() {
        let reg = registry();
        // "Amazonia" contains "Amazon" but must not resolve to it
        assert!(reg.resolve("Amazonia").is_none());
        // Nor does a fragment of the name resolve
        assert!(reg.resolve("Pay").is_none());
    }

    #[test]
    fn test_empty_and_whitespace_names() {
        let reg = registry();
        assert!(reg.resolve("").is_none());
        assert!(reg.resolve("   ").is_none());
        assert_eq!(reg.resolve("  Amazon  ").unwrap().name, "Amazon");
    }

    #[test]
    fn test_owns_domain() {
        let reg = registry();
        let amazon = reg.resolve("Amazon").unwrap();
        assert!(amazon.owns_domain("amazon.com"));
        assert!(amazon.owns_domain("AMAZON.CO.UK"));
        assert!(!amazon.owns_domain("amazon-payments.com"));
        assert!(!amazon.owns_domain("notamazon.com"));
    }
}
