//! The closed set of quick-commerce storefronts the tracker supports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A supported quick-commerce storefront.
///
/// Serialized as the lowercase identifier (`"blinkit"`, `"zepto"`, ...), which
/// is also the value stored in the `tracked_products.platform` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Blinkit,
    Zepto,
    Swiggy,
    Bigbasket,
    Dunzo,
}

impl PlatformId {
    /// Every supported platform, in registry order.
    pub const ALL: [PlatformId; 5] = [
        PlatformId::Blinkit,
        PlatformId::Zepto,
        PlatformId::Swiggy,
        PlatformId::Bigbasket,
        PlatformId::Dunzo,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Blinkit => "blinkit",
            PlatformId::Zepto => "zepto",
            PlatformId::Swiggy => "swiggy",
            PlatformId::Bigbasket => "bigbasket",
            PlatformId::Dunzo => "dunzo",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a string names no supported platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for PlatformId {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPlatform(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_round_trips_every_platform() {
        for platform in PlatformId::ALL {
            assert_eq!(platform.as_str().parse::<PlatformId>(), Ok(platform));
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("BigBasket".parse::<PlatformId>(), Ok(PlatformId::Bigbasket));
    }

    #[test]
    fn from_str_rejects_unknown() {
        let err = "amazon".parse::<PlatformId>().unwrap_err();
        assert_eq!(err, UnknownPlatform("amazon".to_owned()));
    }

    #[test]
    fn serializes_as_lowercase_identifier() {
        let json = serde_json::to_string(&PlatformId::Swiggy).unwrap();
        assert_eq!(json, "\"swiggy\"");
    }
}
