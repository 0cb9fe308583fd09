use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::SETTINGS, logging::Logger};

#[cfg(test)]
pub(crate) mod test_server;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// The client-wide timeout comes from `monitor.request_timeout_secs`; each request may
/// narrow it with its own timeout.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // reqwest 使用 rustls-no-provider，需先指定 ring 為預設的加密實作
        let _ = rustls::crypto::ring::default_provider().install_default();
        let timeout = Duration::from_secs(SETTINGS.monitor.request_timeout_secs);

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(timeout)
            .timeout(timeout)
            // ===== 連接池 =====
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
///
/// A non-2xx status is an error, the body is not read in that case. `timeout` bounds the
/// whole exchange including reading the body.
pub async fn get_json<RES: DeserializeOwned>(url: &str, timeout: Duration) -> Result<RES> {
    send(Method::GET, url, timeout, None::<fn(_) -> _>)
        .await?
        .json::<RES>()
        .await
        .map_err(|e| anyhow!("Error parsing response JSON: {:?}", e.without_url()))
}

/// Performs an HTTP POST request with a JSON body and returns the (successful) status.
pub async fn post_json<REQ: Serialize>(
    url: &str,
    req: &REQ,
    timeout: Duration,
) -> Result<StatusCode> {
    let res = send(
        Method::POST,
        url,
        timeout,
        Some(|rb: RequestBuilder| rb.json(req)),
    )
    .await?;

    Ok(res.status())
}

/// Sends a single request, there is no retry here: the caller's next cycle is the retry.
///
/// # Errors
///
/// Connection failures, timeouts and any status outside 2xx. The url is stripped from
/// every `reqwest::Error` before it is formatted, only the redacted form is logged.
async fn send(
    method: Method,
    url: &str,
    timeout: Duration,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Response> {
    let visit_log = format!("{method}:{}", redact(url));
    let client = get_client()?;
    let mut rb = client.request(method, url).timeout(timeout);

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            let status = response.status();
            LOGGER.info(format!("{} {} {} ms", visit_log, status, elapsed));

            response.error_for_status().map_err(|why| {
                anyhow!(
                    "{} responded with {} because {:?}",
                    visit_log,
                    status,
                    why.without_url()
                )
            })
        }
        Err(why) => {
            let why = why.without_url();
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {} because {:?}", visit_log, why))
        }
    }
}

/// 隱藏 telegram bot token，避免寫進日誌
fn redact(url: &str) -> String {
    match url.find("/bot") {
        Some(start) => {
            let token_start = start + "/bot".len();
            let token_end = url[token_start..]
                .find('/')
                .map_or(url.len(), |i| token_start + i);
            format!("{}***{}", &url[..token_start], &url[token_end..])
        }
        None => url.to_string(),
    }
}
