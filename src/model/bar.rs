use chrono::{DateTime, Utc};

/// One OHLC bar as returned by a bar/history endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Sort ascending by timestamp; providers may return newest-first.
pub fn sort_ascending(bars: &mut [Bar]) {
    bars.sort_by_key(|b| b.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, 4, 0, 0).unwrap(),
            open: 100.0,
            high: close.max(100.0),
            low: close.min(100.0),
            close,
        }
    }

    #[test]
    fn sorts_newest_first_input() {
        let mut bars = vec![bar(5, 99.0), bar(3, 101.0), bar(4, 100.0)];
        sort_ascending(&mut bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![101.0, 100.0, 99.0]);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
