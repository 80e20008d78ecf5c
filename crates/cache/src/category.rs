//! Provider categories and their default TTLs (spec §4.3).

use std::time::Duration;

use practice_config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Time,
    Market,
    Crypto,
    Weather,
    Fx,
}

impl Category {
    pub fn ttl(self, config: &CacheConfig) -> Duration {
        let ms = match self {
            Category::Time => config.ttl_time_ms,
            Category::Market => config.ttl_market_ms,
            Category::Crypto => config.ttl_crypto_ms,
            Category::Weather => config.ttl_weather_ms,
            Category::Fx => config.ttl_fx_ms,
        };
        Duration::from_millis(ms)
    }
}
