//! # CoinGecko 報價模組
//!
//! 以 simple/price API 取得單一資產對單一法幣的報價，回應格式為
//! `{"bitcoin":{"usd":67123.45}}`。

use std::time::Duration;

use crate::config::SETTINGS;

/// 報價抓取與解析
pub mod price;

/// CoinGecko 採集器
///
/// 保存要請求的 url、逾時時間以及要從回應中取出的 `asset` / `currency` 欄位。
#[derive(Debug, Clone)]
pub struct CoinGecko {
    api: String,
    asset: String,
    currency: String,
    timeout: Duration,
}

impl CoinGecko {
    pub fn new(api: &str, asset: &str, currency: &str) -> Self {
        CoinGecko {
            api: api.to_string(),
            asset: asset.to_string(),
            currency: currency.to_string(),
            timeout: Duration::from_secs(SETTINGS.monitor.request_timeout_secs),
        }
    }

    /// 覆寫單次請求的逾時時間
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_settings() -> Self {
        Self::new(
            &SETTINGS.coingecko.api,
            &SETTINGS.coingecko.asset,
            &SETTINGS.coingecko.currency,
        )
    }
}
