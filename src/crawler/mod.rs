use async_trait::async_trait;

use crate::declare::PriceQuote;

/// CoinGecko 加密貨幣報價
pub mod coingecko;

/// A source of the current asset price.
///
/// Implementations swallow every failure (after logging it) and report it as `None`,
/// so the caller only ever sees "have a price" or "unavailable".
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self) -> Option<PriceQuote>;

    /// 報價來源的位址，只用於啟動時的訊息
    fn endpoint(&self) -> &str;
}
