use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dip_buyer::alpaca::AlpacaRestClient;
use dip_buyer::config::AlpacaConfig;
use dip_buyer::model::bar::Bar;
use dip_buyer::price::{
    sample_from_daily_and_minute, sample_from_window, DailyBarSource, PriceSource,
};
use dip_buyer::yahoo::parse_chart;

const TWO_DAILY_BARS: &str = r#"{"bars":{"VOO":[
    {"t":"2025-03-04T05:00:00Z","o":515.0,"h":516.0,"l":505.0,"c":512.0},
    {"t":"2025-03-03T05:00:00Z","o":530.0,"h":531.0,"l":519.0,"c":520.0}
]},"next_page_token":null}"#;

const TODAY_ONLY_DAILY_BAR: &str = r#"{"bars":{"VOO":[
    {"t":"2025-03-04T05:00:00Z","o":515.0,"h":516.0,"l":505.0,"c":512.0}
]},"next_page_token":null}"#;

const ONE_MINUTE_BAR: &str = r#"{"bars":{"VOO":[
    {"t":"2025-03-04T15:30:00Z","o":508.0,"h":508.5,"l":506.5,"c":507.0}
]},"next_page_token":null}"#;

/// Minimal stand-in for the bars endpoint. Like the real API, a daily request
/// without `start` only sees the current day.
async fn serve_bars(listener: TcpListener, request_lines: Arc<Mutex<Vec<String>>>) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        let line = String::from_utf8_lossy(&head)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        let body = if !line.contains("timeframe=1Day") {
            ONE_MINUTE_BAR
        } else if line.contains("start=") {
            TWO_DAILY_BARS
        } else {
            TODAY_ONLY_DAILY_BAR
        };
        request_lines.lock().unwrap().push(line);
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    }
}

fn bar(day: u32, hour: u32, close: f64) -> Bar {
    Bar {
        timestamp: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
    }
}

#[test]
fn daily_bar_strategy_uses_second_to_last_close_and_latest_minute() {
    let daily = vec![bar(3, 5, 520.0), bar(4, 5, 512.0)];
    let minute = vec![bar(5, 15, 507.0)];
    let sample = sample_from_daily_and_minute("VOO", &daily, &minute).unwrap();
    assert!((sample.previous_close - 520.0).abs() < f64::EPSILON);
    assert!((sample.current_price - 507.0).abs() < f64::EPSILON);
}

#[test]
fn daily_bar_strategy_needs_two_bars() {
    let err = sample_from_daily_and_minute("VOO", &[bar(4, 5, 512.0)], &[bar(5, 15, 507.0)])
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[test]
fn daily_bar_strategy_needs_a_minute_bar() {
    let daily = vec![bar(3, 5, 520.0), bar(4, 5, 512.0)];
    assert!(sample_from_daily_and_minute("VOO", &daily, &[])
        .unwrap_err()
        .is_unavailable());
}

#[test]
fn window_strategy_uses_last_two_closes() {
    let sample = sample_from_window("VOO", &[bar(3, 14, 400.0), bar(4, 14, 390.0)]).unwrap();
    assert!((sample.percent_change() + 2.5).abs() < 1e-9);
}

#[test]
fn window_strategy_needs_two_points() {
    assert!(sample_from_window("VOO", &[]).unwrap_err().is_unavailable());
    assert!(sample_from_window("VOO", &[bar(4, 14, 390.0)])
        .unwrap_err()
        .is_unavailable());
}

#[test]
fn yahoo_chart_skips_null_closes() {
    let body = r#"{"chart":{"result":[{
        "meta":{"symbol":"VOO","currency":"USD"},
        "timestamp":[1741008600,1741095000],
        "indicators":{"quote":[{"open":[530.0,null],"high":[531.0,null],"low":[519.0,null],"close":[520.0,null],"volume":[100,null]}]}
    }],"error":null}}"#;
    let bars = parse_chart("VOO", body).unwrap();
    assert_eq!(bars.len(), 1);
    assert!(sample_from_window("VOO", &bars).unwrap_err().is_unavailable());
}

#[test]
fn yahoo_chart_two_days() {
    let body = r#"{"chart":{"result":[{
        "timestamp":[1741095000,1741008600],
        "indicators":{"quote":[{"open":[515.0,530.0],"high":[516.0,531.0],"low":[505.0,519.0],"close":[507.0,520.0],"volume":[100,100]}]}
    }],"error":null}}"#;
    let bars = parse_chart("VOO", body).unwrap();
    let sample = sample_from_window("VOO", &bars).unwrap();
    assert!((sample.previous_close - 520.0).abs() < f64::EPSILON);
    assert!((sample.current_price - 507.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn daily_bar_source_requests_a_lookback_window() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let request_lines: Arc<Mutex<Vec<String>>> = Arc::default();
    tokio::spawn(serve_bars(listener, request_lines.clone()));

    let config = AlpacaConfig {
        data_base_url: format!("http://{}", addr),
        ..AlpacaConfig::default()
    };
    let client = AlpacaRestClient::new(&config, Duration::from_secs(5)).unwrap();
    let source = DailyBarSource::new(Arc::new(client));

    let run_date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    let sample = source.get_price_sample("VOO", run_date).await.unwrap();
    assert!((sample.previous_close - 520.0).abs() < f64::EPSILON);
    assert!((sample.current_price - 507.0).abs() < f64::EPSILON);

    let lines = request_lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    let daily = &lines[0];
    assert!(daily.starts_with("GET /v2/stocks/bars?"));
    assert!(daily.contains("symbols=VOO"));
    assert!(daily.contains("timeframe=1Day"));
    assert!(daily.contains("limit=2"));
    assert!(daily.contains("sort=desc"));
    assert!(daily.contains("feed=iex"));
    assert!(daily.contains("start=2025-02-23"));
    assert!(lines[1].contains("timeframe=1Min"));
}
