use std::time::Duration;

use anyhow::Result;

use crate::{
    bot::telegram::Telegram, config::SETTINGS, crawler::coingecko::CoinGecko,
    scheduler::PriceMonitor,
};

pub mod bot;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod logging;
pub mod scheduler;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let monitor = PriceMonitor::new(
        CoinGecko::from_settings(),
        Telegram::from_settings(),
        Duration::from_secs(SETTINGS.monitor.interval_secs),
    );

    monitor.print_banner();
    logging::info_file_async(format!(
        "bitcoin_price_bot 已啟動, Rust OS/Arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    monitor
        .run(async {
            if let Err(why) = tokio::signal::ctrl_c().await {
                logging::error_console(format!("Failed to listen for ctrl-c because {:?}", why));
                // 無法監聽中斷訊號時就一直執行下去
                std::future::pending::<()>().await;
            }
        })
        .await;

    // 背景線程在行程結束時不會被等待，先把停止訊息寫進檔案
    if !logging::flush_file(Duration::from_secs(2)) {
        logging::error_console("Timed out flushing the log file".to_string());
    }

    Ok(())
}
