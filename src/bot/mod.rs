use async_trait::async_trait;

pub mod telegram;

/// Delivers a preformatted message somewhere.
///
/// `send` never fails loudly: transport errors are logged and reported as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> bool;

    /// 訊息的目的地，只用於啟動時的訊息
    fn destination(&self) -> &str;
}
