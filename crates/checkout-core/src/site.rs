//! # Site Configuration
//!
//! Each storefront site has its own public URL, order number prefix and
//! receipt page. Sites are loaded from `config/sites.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for a single storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Unique site identifier (e.g., "edx")
    pub id: String,

    /// Display name
    pub name: String,

    /// Public base URL of the storefront (e.g., "https://shop.example.com")
    pub base_url: String,

    /// Prefix for order numbers ("EDX" gives "EDX-100001")
    #[serde(default = "default_order_prefix")]
    pub order_prefix: String,

    /// Path of the receipt page
    #[serde(default = "default_receipt_path")]
    pub receipt_path: String,

    /// Whether this site is active
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_order_prefix() -> String {
    "EDX".to_string()
}

fn default_receipt_path() -> String {
    "/checkout/receipt/".to_string()
}

impl Site {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            order_prefix: default_order_prefix(),
            receipt_path: default_receipt_path(),
            active: true,
            metadata: HashMap::new(),
        }
    }

    /// Builder: set order number prefix
    pub fn with_order_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_prefix = prefix.into();
        self
    }

    /// Builder: set receipt path
    pub fn with_receipt_path(mut self, path: impl Into<String>) -> Self {
        self.receipt_path = path.into();
        self
    }

    /// Absolute URL for a path on this site
    pub fn ecommerce_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Receipt page for an order
    pub fn receipt_page_url(&self, order_number: &str, disable_back_button: bool) -> String {
        let mut url = format!(
            "{}?order_number={}",
            self.ecommerce_url(&self.receipt_path),
            order_number
        );
        if disable_back_button {
            url.push_str("&disable_back_button=1");
        }
        url
    }
}

/// Registry of all storefront sites
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRegistry {
    #[serde(default)]
    pub sites: Vec<Site>,

    /// Default site ID (used when no site_id is specified)
    #[serde(default)]
    pub default_site_id: Option<String>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, site: Site) {
        self.sites.push(site);
    }

    /// Add a site with builder pattern
    pub fn with_site(mut self, site: Site) -> Self {
        self.add(site);
        self
    }

    /// Get an active site by ID
    pub fn get(&self, site_id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == site_id && s.active)
    }

    /// The configured default, or the first active site
    pub fn default_site(&self) -> Option<&Site> {
        self.default_site_id
            .as_ref()
            .and_then(|id| self.get(id))
            .or_else(|| self.active_sites().next())
    }

    /// Get site by ID or fall back to default
    pub fn get_or_default(&self, site_id: Option<&str>) -> Option<&Site> {
        match site_id {
            Some(id) => self.get(id).or_else(|| self.default_site()),
            None => self.default_site(),
        }
    }

    pub fn active_sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| s.active)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Load registry from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecommerce_url_joins_paths() {
        let site = Site::new("edx", "edX", "https://shop.example.com/");
        assert_eq!(
            site.ecommerce_url("/checkout/error/"),
            "https://shop.example.com/checkout/error/"
        );
        assert_eq!(
            site.ecommerce_url("checkout/error/"),
            "https://shop.example.com/checkout/error/"
        );
    }

    #[test]
    fn test_receipt_page_url() {
        let site = Site::new("edx", "edX", "https://shop.example.com");
        assert_eq!(
            site.receipt_page_url("EDX-100001", true),
            "https://shop.example.com/checkout/receipt/?order_number=EDX-100001&disable_back_button=1"
        );
        assert_eq!(
            site.receipt_page_url("EDX-100001", false),
            "https://shop.example.com/checkout/receipt/?order_number=EDX-100001"
        );
    }

    #[test]
    fn test_registry_from_toml() {
        let registry = SiteRegistry::from_toml(
            r#"
            default_site_id = "learn"

            [[sites]]
            id = "edx"
            name = "edX"
            base_url = "https://shop.example.com"

            [[sites]]
            id = "learn"
            name = "Learn"
            base_url = "https://learn.example.com"
            order_prefix = "LRN"
            "#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let default = registry.default_site().unwrap();
        assert_eq!(default.id, "learn");
        assert_eq!(default.order_prefix, "LRN");

        let edx = registry.get_or_default(Some("edx")).unwrap();
        assert_eq!(edx.receipt_path, "/checkout/receipt/");

        let fallback = registry.get_or_default(Some("missing")).unwrap();
        assert_eq!(fallback.id, "learn");
    }
}
