//! Static per-platform profiles: where each storefront lives and how its
//! product and search pages are laid out.
//!
//! Platform dispatch is data-driven; nothing outside this table knows about a
//! specific storefront.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use qcprice_core::PlatformId;

/// Placeholder substituted with the percent-encoded query in
/// [`PlatformProfile::search_url_template`].
const QUERY_PLACEHOLDER: &str = "{query}";

/// CSS selectors for a single product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductLocators {
    pub price: &'static str,
    pub name: &'static str,
    pub image: &'static str,
    /// Presence of any node matching this selector marks the item unavailable.
    pub out_of_stock: &'static str,
}

/// CSS selectors for a search-results page. Everything except `item` is
/// evaluated relative to one item node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLocators {
    pub item: &'static str,
    pub name: &'static str,
    pub price: &'static str,
    pub link: &'static str,
    pub image: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: PlatformId,
    pub base_url: &'static str,
    /// Substring that identifies a product URL as belonging to this platform.
    pub domain_fragment: &'static str,
    /// Path and query appended to `base_url`; contains `{query}`.
    pub search_url_template: &'static str,
    pub product_locators: ProductLocators,
    pub search_locators: SearchLocators,
}

static PROFILES: [PlatformProfile; 5] = [
    PlatformProfile {
        platform: PlatformId::Blinkit,
        base_url: "https://blinkit.com",
        domain_fragment: "blinkit.com",
        search_url_template: "/search?q={query}",
        product_locators: ProductLocators {
            price: ".product-price",
            name: ".product-title",
            image: ".product-image img",
            out_of_stock: ".out-of-stock",
        },
        search_locators: SearchLocators {
            item: ".product-item",
            name: ".product-name",
            price: ".product-price",
            link: "a",
            image: ".product-image img",
        },
    },
    PlatformProfile {
        platform: PlatformId::Zepto,
        base_url: "https://www.zeptonow.com",
        domain_fragment: "zepto",
        search_url_template: "/p/search?q={query}",
        product_locators: ProductLocators {
            price: ".css-1qw5nie",
            name: ".product-name",
            image: ".product-image",
            out_of_stock: ".unavailable",
        },
        search_locators: SearchLocators {
            item: ".product-card",
            name: ".product-title",
            price: ".product-price",
            link: "a",
            image: ".product-image img",
        },
    },
    PlatformProfile {
        platform: PlatformId::Swiggy,
        base_url: "https://instamart.swiggy.com",
        domain_fragment: "swiggy.com",
        search_url_template: "/search?query={query}",
        product_locators: ProductLocators {
            price: ".price-tag",
            name: ".item-name",
            image: ".item-image",
            out_of_stock: ".not-available",
        },
        search_locators: SearchLocators {
            item: ".product-item",
            name: ".item-name",
            price: ".price-tag",
            link: "a",
            image: ".item-image img",
        },
    },
    PlatformProfile {
        platform: PlatformId::Bigbasket,
        base_url: "https://www.bigbasket.com",
        domain_fragment: "bigbasket.com",
        search_url_template: "/ps/?q={query}",
        product_locators: ProductLocators {
            price: ".discnt-price",
            name: ".prod-name",
            image: ".product-img",
            out_of_stock: ".sold-out",
        },
        search_locators: SearchLocators {
            item: ".product-item",
            name: ".prod-name",
            price: ".discnt-price",
            link: "a",
            image: ".product-img img",
        },
    },
    PlatformProfile {
        platform: PlatformId::Dunzo,
        base_url: "https://www.dunzo.com",
        domain_fragment: "dunzo.com",
        search_url_template: "/search/{query}",
        product_locators: ProductLocators {
            price: ".price-value",
            name: ".product-name",
            image: ".product-image",
            out_of_stock: ".out-of-stock",
        },
        search_locators: SearchLocators {
            item: ".product-card",
            name: ".product-name",
            price: ".price-value",
            link: "a",
            image: ".product-image img",
        },
    },
];

/// Returns the profile for `platform`. Every platform has exactly one.
#[must_use]
pub fn profile(platform: PlatformId) -> &'static PlatformProfile {
    match platform {
        PlatformId::Blinkit => &PROFILES[0],
        PlatformId::Zepto => &PROFILES[1],
        PlatformId::Swiggy => &PROFILES[2],
        PlatformId::Bigbasket => &PROFILES[3],
        PlatformId::Dunzo => &PROFILES[4],
    }
}

/// Resolves a product URL to its platform by domain-fragment substring.
///
/// Matching is case-insensitive and checks platforms in declaration order.
#[must_use]
pub fn resolve_platform(url: &str) -> Option<PlatformId> {
    let lowered = url.to_ascii_lowercase();
    PROFILES
        .iter()
        .find(|p| lowered.contains(p.domain_fragment))
        .map(|p| p.platform)
}

/// Builds the search URL for `query` on `platform` against its public base URL.
#[must_use]
pub fn search_url(platform: PlatformId, query: &str) -> String {
    search_url_with_base(profile(platform).base_url, platform, query)
}

/// Like [`search_url`] but against an arbitrary base URL (mirrors, local test
/// servers). A trailing `/` on `base` is ignored.
#[must_use]
pub fn search_url_with_base(base: &str, platform: PlatformId, query: &str) -> String {
    let encoded = utf8_percent_encode(query.trim(), NON_ALPHANUMERIC).to_string();
    let path = profile(platform)
        .search_url_template
        .replace(QUERY_PLACEHOLDER, &encoded);
    format!("{}{path}", base.trim_end_matches('/'))
}
