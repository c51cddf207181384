pub mod error;
pub mod extract;
pub mod fetch;
pub mod platform;
pub mod price;
pub mod relevance;
pub mod search;
pub mod tracker;
pub mod update;

pub use error::{ScraperError, TrackerError};
pub use extract::{extract_product, extract_search_results};
pub use fetch::{
    BrowserSession, ChromeRenderer, FetchConfig, Fetcher, PageKind, PageRenderer, RawContent,
    RenderMode, RenderRequest,
};
pub use platform::{
    profile, resolve_platform, search_url, search_url_with_base, PlatformProfile, ProductLocators,
    SearchLocators,
};
pub use price::{parse_price, ParsedPrice};
pub use relevance::{RelevanceScorer, RelevanceWeights};
pub use search::{compare, CandidateSource, Comparison, ComparisonCandidate, SearchOrchestrator};
pub use tracker::PriceTracker;
pub use update::{PriceUpdateJob, UpdateFailure, UpdateReport};
