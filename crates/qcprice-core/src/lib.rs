pub mod app_config;
pub mod config;
pub mod platform;
pub mod products;
pub mod repository;

pub use app_config::{AppConfig, Environment};
pub use config::{
    load_app_config, load_app_config_from_env, load_offline_app_config, ConfigError,
    DEFAULT_USER_AGENT,
};
pub use platform::{PlatformId, UnknownPlatform};
pub use products::{
    is_storable_price, max_storable_price, plan_update, sort_newest_first, NewTrackedProduct,
    PriceHistoryPoint, ProductFilter, ProductUpdate, ScrapedItem, TrackedProduct,
    DEFAULT_CATEGORY,
};
pub use repository::{ProductRepository, RepositoryError};
