use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub bot: Bot,
    #[serde(default)]
    pub coingecko: CoinGecko,
    #[serde(default)]
    pub monitor: Monitor,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Bot {
    #[serde(default)]
    pub telegram: Telegram,
}

const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
const TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Telegram {
    #[serde(default)]
    pub token: String,
    /// 頻道 id，可能是數字或 @channel 名稱，所以保留字串
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

impl Default for Telegram {
    fn default() -> Self {
        Telegram {
            token: String::new(),
            chat_id: String::new(),
            api_url: default_telegram_api_url(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

const COINGECKO_API: &str = "COINGECKO_API";
const COINGECKO_ASSET: &str = "COINGECKO_ASSET";
const COINGECKO_CURRENCY: &str = "COINGECKO_CURRENCY";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CoinGecko {
    #[serde(default)]
    pub api: String,
    #[serde(default = "default_asset")]
    pub asset: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for CoinGecko {
    fn default() -> Self {
        CoinGecko {
            api: String::new(),
            asset: default_asset(),
            currency: default_currency(),
        }
    }
}

fn default_asset() -> String {
    "bitcoin".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

const MONITOR_INTERVAL_SECS: &str = "MONITOR_INTERVAL_SECS";
const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Monitor {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Monitor {
            interval_secs: DEFAULT_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_console(format!(
            "I can't read {} because {:?}, fall back to env",
            CONFIG_PATH, why
        ));
        App::from_env()
    })
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::from_env())
    }

    /// 從 env 中讀取設定值
    fn from_env() -> Self {
        App::default().override_with(|key| env::var(key).ok())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    /// Overrides every field whose variable `lookup` knows about.
    /// Only the durations are checked: zero or unparsable seconds fall back to the default,
    /// whether they came from json or env. An empty token or url only shows up later as a
    /// failed request.
    fn override_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TELEGRAM_BOT_TOKEN) {
            self.bot.telegram.token = token;
        }

        if let Some(chat_id) = lookup(TELEGRAM_CHAT_ID) {
            self.bot.telegram.chat_id = chat_id;
        }

        if let Some(api_url) = lookup(TELEGRAM_API_URL) {
            self.bot.telegram.api_url = api_url.trim_end_matches('/').to_string();
        }

        if let Some(api) = lookup(COINGECKO_API) {
            self.coingecko.api = api;
        }

        if let Some(asset) = lookup(COINGECKO_ASSET) {
            self.coingecko.asset = asset;
        }

        if let Some(currency) = lookup(COINGECKO_CURRENCY) {
            self.coingecko.currency = currency;
        }

        if let Some(secs) = lookup(MONITOR_INTERVAL_SECS) {
            self.monitor.interval_secs = parse_secs(&secs).unwrap_or(DEFAULT_INTERVAL_SECS);
        }

        if let Some(secs) = lookup(HTTP_TIMEOUT_SECS) {
            self.monitor.request_timeout_secs =
                parse_secs(&secs).unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        }

        // 0 秒會讓輪詢空轉、請求立刻逾時
        if self.monitor.interval_secs == 0 {
            self.monitor.interval_secs = DEFAULT_INTERVAL_SECS;
        }

        if self.monitor.request_timeout_secs == 0 {
            self.monitor.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }

        self
    }
}

/// 正整數秒數，其餘視為無效
fn parse_secs(value: &str) -> Option<u64> {
    u64::from_str(value.trim()).ok().filter(|secs| *secs > 0)
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
