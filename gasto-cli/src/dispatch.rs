use std::time::Duration;

use anyhow::{Context, Result, bail};
use gasto_core::ExpenseRecord;
use tracing::info;

/// POST one record as JSON to the configured webhook
pub async fn post_record(url: &str, record: &ExpenseRecord, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let resp = client
        .post(url)
        .timeout(timeout)
        .json(record)
        .send()
        .await
        .with_context(|| format!("webhook request to {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("webhook error: {status} {txt}");
    }
    info!(%url, status = status.as_u16(), "record delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use gasto_core::{CategorySource, Direction};
    use rust_decimal::Decimal;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record() -> ExpenseRecord {
        ExpenseRecord {
            amount: Decimal::new(5000, 2),
            occurred_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            merchant: "mercado".to_string(),
            direction: Direction::Expense,
            details_raw: "gastei r$ 50 no mercado".to_string(),
            category_hint: None,
            category_id: Some("Alimentação".to_string()),
            category_source: Some(CategorySource::Keywords),
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// One-shot HTTP server answering every request with `status_line`
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // the JSON body is the last thing sent
            let mut seen = Vec::new();
            let mut buf = [0u8; 1024];
            while !seen.ends_with(b"}") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => seen.extend_from_slice(&buf[..n]),
                }
            }
            let body = "boom";
            let resp = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(resp.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/webhook")
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let url = serve_once("500 Internal Server Error").await;
        let err = post_record(&url, &record(), Duration::from_secs(5))
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("webhook error: 500"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[tokio::test]
    async fn test_success_status_is_ok() {
        let url = serve_once("200 OK").await;
        post_record(&url, &record(), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let url = format!("http://{addr}/webhook");
        assert!(
            post_record(&url, &record(), Duration::from_secs(2))
                .await
                .is_err()
        );
    }
}
