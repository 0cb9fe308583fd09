use chrono::{DateTime, Local};

/// 最近一次成功取得的報價
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub amount: f64,
    /// 取得報價的時間
    pub fetched_at: DateTime<Local>,
}

impl PriceQuote {
    pub fn new(amount: f64) -> Self {
        PriceQuote {
            amount,
            fetched_at: Local::now(),
        }
    }
}

/// What one pass of the monitor loop ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The price was fetched and the message delivered.
    Sent(PriceQuote),
    /// The price was fetched but the notifier reported failure.
    SendFailed(PriceQuote),
    /// No usable price, nothing was posted.
    FetchFailed,
    /// The cycle panicked; the payload message is kept for the log.
    Aborted(String),
}
