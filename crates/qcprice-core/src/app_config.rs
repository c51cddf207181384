#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Hard timeout for the plain-HTTP fast path.
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// When `false`, a fast-path miss is reported as a fetch failure instead
    /// of launching a browser.
    pub browser_enabled: bool,
    pub browser_nav_timeout_secs: u64,
    /// Total navigation attempts, including the first.
    pub browser_nav_attempts: u32,
    pub browser_retry_delay_ms: u64,
    /// Cap on waiting for the price or result locator after navigation.
    pub browser_wait_ms: u64,
    pub search_max_results: usize,
    /// Six-field cron expression for the scheduled price update pass.
    pub update_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("browser_enabled", &self.browser_enabled)
            .field("browser_nav_timeout_secs", &self.browser_nav_timeout_secs)
            .field("browser_nav_attempts", &self.browser_nav_attempts)
            .field("browser_retry_delay_ms", &self.browser_retry_delay_ms)
            .field("browser_wait_ms", &self.browser_wait_ms)
            .field("search_max_results", &self.search_max_results)
            .field("update_cron", &self.update_cron)
            .finish()
    }
}
