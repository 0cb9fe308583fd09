use std::{any::Any, future::Future, panic::AssertUnwindSafe, time::Duration};

use chrono::Local;
use futures::FutureExt;
use tokio::time;

use crate::{
    bot::Notifier,
    crawler::PriceSource,
    declare::CycleOutcome,
    logging,
    util::text::{format_usd, price_update_message},
};

/// 抓取報價 → 推播 → 等待，一直重複到收到中斷訊號
pub struct PriceMonitor<S, N> {
    source: S,
    notifier: N,
    interval: Duration,
}

impl<S, N> PriceMonitor<S, N>
where
    S: PriceSource,
    N: Notifier,
{
    pub fn new(source: S, notifier: N, interval: Duration) -> Self {
        PriceMonitor {
            source,
            notifier,
            interval,
        }
    }

    /// 啟動時的訊息
    pub fn print_banner(&self) {
        logging::println_console("Bitcoin Price Monitor Started");
        logging::println_console(&format!("Fetching from: {}", self.source.endpoint()));
        logging::println_console(&format!("Sending to: {}", self.notifier.destination()));
        logging::println_console(&"-".repeat(50));
    }

    /// Runs cycles separated by `interval` until `shutdown` resolves.
    ///
    /// The shutdown future is raced against the whole cycle, so an interrupt during
    /// a request or during the sleep ends the loop right away.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = async {
                    self.run_cycle().await;
                    time::sleep(self.interval).await;
                } => {}
            }
        }

        logging::println_console("\n\nBot stopped by user");
        logging::info_file_async("Bot stopped by user".to_string());
    }

    /// One fetch → notify pass. A panic inside it is caught and becomes `Aborted`.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let current_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let outcome = match AssertUnwindSafe(self.poll()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => CycleOutcome::Aborted(panic_message(&*panic)),
        };

        report(&current_time, &outcome);

        outcome
    }

    async fn poll(&self) -> CycleOutcome {
        match self.source.fetch().await {
            // 價格為零視同沒有取得報價
            Some(quote) if quote.amount != 0.0 => {
                let message = price_update_message(quote.amount);
                if self.notifier.send(&message).await {
                    CycleOutcome::Sent(quote)
                } else {
                    CycleOutcome::SendFailed(quote)
                }
            }
            _ => CycleOutcome::FetchFailed,
        }
    }
}

fn report(current_time: &str, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Sent(quote) => {
            let line = format!("[{}] ✓ Sent: {}", current_time, format_usd(quote.amount));
            logging::println_console(&line);
            logging::info_file_async(format!(
                "{} (quoted at {})",
                line,
                quote.fetched_at.format("%H:%M:%S%.3f")
            ));
        }
        CycleOutcome::SendFailed(quote) => {
            let line = format!("[{}] ✗ Failed to send message", current_time);
            logging::println_console(&line);
            logging::error_file_async(format!("{} {}", line, format_usd(quote.amount)));
        }
        CycleOutcome::FetchFailed => {
            let line = format!("[{}] ✗ Failed to fetch price", current_time);
            logging::println_console(&line);
            logging::error_file_async(line);
        }
        CycleOutcome::Aborted(why) => {
            let line = format!("Unexpected error: {}", why);
            logging::println_console(&line);
            logging::error_file_async(format!("[{}] {}", current_time, line));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::declare::PriceQuote;

    /// 依序回傳預先排好的報價，排完之後一律失敗；`None` 代表抓取失敗，`NaN` 代表 panic
    struct ScriptedSource {
        prices: Mutex<VecDeque<Option<f64>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(prices: Vec<Option<f64>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = ScriptedSource {
                prices: Mutex::new(prices.into()),
                calls: calls.clone(),
            };
            (source, calls)
        }
    }

    #[async_trait]
    impl PriceSource for ScriptedSource {
        async fn fetch(&self) -> Option<PriceQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.prices.lock().unwrap().pop_front().flatten();
            match next {
                Some(amount) if amount.is_nan() => panic!("price feed exploded"),
                Some(amount) => Some(PriceQuote::new(amount)),
                None => None,
            }
        }

        fn endpoint(&self) -> &str {
            "scripted"
        }
    }

    struct RecordingNotifier {
        succeed: bool,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingNotifier {
        fn new(succeed: bool) -> (Self, Arc<Mutex<Vec<String>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let notifier = RecordingNotifier {
                succeed,
                sent: sent.clone(),
            };
            (notifier, sent)
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> bool {
            self.sent.lock().unwrap().push(message.to_string());
            self.succeed
        }

        fn destination(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_cycle_sends_price() {
        let (source, _) = ScriptedSource::new(vec![Some(67123.45)]);
        let (notifier, sent) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(60));

        match monitor.run_cycle().await {
            CycleOutcome::Sent(quote) => assert_eq!(quote.amount, 67123.45),
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(
            *sent.lock().unwrap(),
            vec!["💰 <b>Bitcoin Price Update</b>\n\n$67,123.45".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cycle_send_failed() {
        let (source, _) = ScriptedSource::new(vec![Some(100.0)]);
        let (notifier, sent) = RecordingNotifier::new(false);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(60));

        assert!(matches!(
            monitor.run_cycle().await,
            CycleOutcome::SendFailed(_)
        ));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_notify() {
        let (source, calls) = ScriptedSource::new(vec![None]);
        let (notifier, sent) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(60));

        assert_eq!(monitor.run_cycle().await, CycleOutcome::FetchFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_price_does_not_notify() {
        let (source, _) = ScriptedSource::new(vec![Some(0.0)]);
        let (notifier, sent) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(60));

        assert_eq!(monitor.run_cycle().await, CycleOutcome::FetchFailed);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (source, _) = ScriptedSource::new(vec![Some(f64::NAN), Some(42.0)]);
        let (notifier, sent) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(60));

        assert_eq!(
            monitor.run_cycle().await,
            CycleOutcome::Aborted("price feed exploded".to_string())
        );
        assert!(matches!(monitor.run_cycle().await, CycleOutcome::Sent(_)));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_repeats_until_shutdown() {
        let (source, calls) = ScriptedSource::new(vec![Some(1.0), None, Some(f64::NAN), Some(2.0)]);
        let (notifier, sent) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_millis(10));
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });

        time::timeout(
            Duration::from_secs(5),
            monitor.run(async {
                let _ = rx.await;
            }),
        )
        .await
        .unwrap();

        // 失敗與 panic 都不會讓迴圈停下來
        assert!(calls.load(Ordering::SeqCst) >= 4);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let (source, calls) = ScriptedSource::new(vec![Some(1.0)]);
        let (notifier, _) = RecordingNotifier::new(true);
        let monitor = PriceMonitor::new(source, notifier, Duration::from_secs(3600));
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(());
        });

        time::timeout(
            Duration::from_secs(5),
            monitor.run(async {
                let _ = rx.await;
            }),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(format!("owned {}", 1));
        assert_eq!(panic_message(&*boxed), "owned 1");

        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
