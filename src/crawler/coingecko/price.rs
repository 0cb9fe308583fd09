use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    crawler::{coingecko::CoinGecko, PriceSource},
    declare::PriceQuote,
    logging, util,
};

impl CoinGecko {
    /// 從回應中取出 body[asset][currency]
    fn extract_price(&self, body: &Value) -> Result<f64> {
        body.get(&self.asset)
            .and_then(|quotes| quotes.get(&self.currency))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                anyhow!(
                    "'{}.{}' is missing or not a number in {}",
                    self.asset,
                    self.currency,
                    body
                )
            })
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    async fn fetch(&self) -> Option<PriceQuote> {
        let body = match util::http::get_json::<Value>(&self.api, self.timeout).await {
            Ok(body) => body,
            Err(why) => {
                log_failure(format!("Error fetching {} price: {:?}", self.asset, why));
                return None;
            }
        };

        match self.extract_price(&body) {
            Ok(amount) => Some(PriceQuote::new(amount)),
            Err(why) => {
                log_failure(format!("Error parsing response: {:?}", why));
                None
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.api
    }
}

fn log_failure(msg: String) {
    logging::error_console(msg.clone());
    logging::error_file_async(msg);
}
