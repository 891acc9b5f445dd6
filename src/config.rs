use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRateBasis {
    Subtotal,
    Total,
}

impl DiscountRateBasis {
    fn from_env(value: Option<String>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "total" => Self::Total,
            _ => Self::Subtotal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subtotal => "subtotal",
            Self::Total => "total",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub dev_auth_overrides_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub auth_jwt_secret: Option<String>,
    pub database_url: Option<String>,
    pub db_pool_max_connections: u32,
    pub db_pool_min_connections: u32,
    pub db_pool_acquire_timeout_seconds: u64,
    pub db_pool_idle_timeout_seconds: u64,
    pub org_membership_cache_ttl_seconds: u64,
    pub org_membership_cache_max_entries: u64,
    pub insights_discount_rate_basis: DiscountRateBasis,
    pub insights_overdue_grace_days: i64,
    pub insights_churn_window_days: i64,
    pub insights_default_top_limit: usize,
    pub insights_max_period_days: Option<i64>,
    /// RFM label bands as `(score floor, label)`, descending by floor.
    /// `None` means the built-in bands apply.
    pub insights_rfm_bands: Option<Vec<(u8, String)>>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Meridian ERP API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            trusted_hosts: parse_csv(&env_or("TRUSTED_HOSTS", "localhost,127.0.0.1")),
            dev_auth_overrides_enabled: env_parse_bool_or("DEV_AUTH_OVERRIDES_ENABLED", false),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            auth_jwt_secret: env_opt("AUTH_JWT_SECRET"),
            database_url: env_opt("DATABASE_URL"),
            db_pool_max_connections: env_parse_or("DB_POOL_MAX_CONNECTIONS", 5),
            db_pool_min_connections: env_parse_or("DB_POOL_MIN_CONNECTIONS", 1),
            db_pool_acquire_timeout_seconds: env_parse_or("DB_POOL_ACQUIRE_TIMEOUT_SECONDS", 5),
            db_pool_idle_timeout_seconds: env_parse_or("DB_POOL_IDLE_TIMEOUT_SECONDS", 600),
            org_membership_cache_ttl_seconds: env_parse_or("ORG_MEMBERSHIP_CACHE_TTL_SECONDS", 30),
            org_membership_cache_max_entries: env_parse_or(
                "ORG_MEMBERSHIP_CACHE_MAX_ENTRIES",
                10000,
            ),
            insights_discount_rate_basis: DiscountRateBasis::from_env(env_opt(
                "INSIGHTS_DISCOUNT_RATE_BASIS",
            )),
            insights_overdue_grace_days: env_parse_or("INSIGHTS_OVERDUE_GRACE_DAYS", 30),
            insights_churn_window_days: env_parse_or("INSIGHTS_CHURN_WINDOW_DAYS", 90),
            insights_default_top_limit: env_parse_or("INSIGHTS_DEFAULT_TOP_LIMIT", 10),
            insights_max_period_days: env_opt("INSIGHTS_MAX_PERIOD_DAYS")
                .and_then(|raw| raw.parse::<i64>().ok())
                .filter(|days| *days > 0),
            insights_rfm_bands: env_opt("INSIGHTS_RFM_BANDS")
                .and_then(|raw| parse_rfm_bands(&raw)),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn auth_dev_overrides_enabled(&self) -> bool {
        if self.is_production() {
            return false;
        }
        self.dev_auth_overrides_enabled
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parses `INSIGHTS_RFM_BANDS`, a `floor:label` CSV such as
/// `13:Champions,10:Loyal,7:Promising,5:At Risk,3:Hibernating`. A malformed
/// value yields `None` so the built-in bands stay in effect.
fn parse_rfm_bands(raw: &str) -> Option<Vec<(u8, String)>> {
    let mut bands = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (floor, label) = part.split_once(':')?;
        let floor = floor.trim().parse::<u8>().ok()?;
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        bands.push((floor, label.to_string()));
    }
    if bands.is_empty() {
        return None;
    }
    bands.sort_by(|left, right| right.0.cmp(&left.0));
    Some(bands)
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}
