//! 内置演示数据
//!
//! Yahoo Finance 不可用时仍能演示筛选效果。数据是固定的，
//! 同一时间窗口总是返回相同的K线

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::HashMap;

use super::MarketDataSource;
use crate::error::{FetchError, FetchResult};
use crate::models::Candle;
use crate::services::market_hours::{ist_date, ist_to_utc, market_close_time, market_open_time};

/// (代码, 名称, 平均 5 分钟成交量, 当前放量倍数, 市值 crore)
const SAMPLE_STOCKS: &[(&str, &str, u64, f64, f64)] = &[
    ("RELIANCE.NS", "Reliance Industries", 412_000, 12.4, 1_950_000.0),
    ("TCS.NS", "Tata Consultancy Services", 96_500, 3.1, 1_420_000.0),
    ("HDFCBANK.NS", "HDFC Bank", 620_000, 1.8, 1_250_000.0),
    ("INFY.NS", "Infosys", 288_000, 15.2, 690_000.0),
    ("ICICIBANK.NS", "ICICI Bank", 540_000, 0.9, 760_000.0),
    ("HINDUNILVR.NS", "Hindustan Unilever", 71_000, 2.2, 590_000.0),
    ("SBIN.NS", "State Bank of India", 1_150_000, 11.0, 650_000.0),
    ("BHARTIARTL.NS", "Bharti Airtel", 233_000, 4.7, 620_000.0),
    ("ITC.NS", "ITC Limited", 870_000, 1.3, 550_000.0),
    ("KOTAKBANK.NS", "Kotak Mahindra Bank", 154_000, 6.6, 350_000.0),
    ("LT.NS", "Larsen & Toubro", 118_000, 10.5, 480_000.0),
    ("BAJFINANCE.NS", "Bajaj Finance", 64_000, 2.9, 430_000.0),
    ("AXISBANK.NS", "Axis Bank", 402_000, 8.1, 330_000.0),
    ("ASIANPAINT.NS", "Asian Paints", 52_000, 1.1, 290_000.0),
    ("MARUTI.NS", "Maruti Suzuki", 21_000, 13.8, 330_000.0),
    ("TITAN.NS", "Titan Company", 47_000, 0.7, 300_000.0),
    ("SUNPHARMA.NS", "Sun Pharmaceutical", 133_000, 5.4, 290_000.0),
    ("ULTRACEMCO.NS", "UltraTech Cement", 18_500, 2.0, 280_000.0),
    ("TATASTEEL.NS", "Tata Steel", 2_900_000, 10.1, 170_000.0),
    ("NTPC.NS", "NTPC Limited", 1_040_000, 3.3, 320_000.0),
    ("SUZLON.NS", "Suzlon Energy", 3_600_000, 18.0, 850.0),
];

/// 演示数据源
#[derive(Debug, Default)]
pub struct SampleSource;

impl SampleSource {
    pub fn new() -> Self {
        Self
    }

    /// 演示股票池
    pub fn securities() -> impl Iterator<Item = (&'static str, &'static str)> {
        SAMPLE_STOCKS.iter().map(|(symbol, name, ..)| (*symbol, *name))
    }

    fn lookup(symbol: &str) -> Option<&'static (&'static str, &'static str, u64, f64, f64)> {
        SAMPLE_STOCKS.iter().find(|s| s.0 == symbol)
    }

    /// 生成一天的K线：截至 to 的最后一根为放量K线，其余为平均成交量
    fn day_candles(date: NaiveDate, average: u64, spike_ratio: f64, to: DateTime<Utc>) -> Vec<Candle> {
        let open = ist_to_utc(date, market_open_time());
        let close = ist_to_utc(date, market_close_time());
        let end = to.min(close);

        let mut candles = Vec::new();
        let mut ts = open;
        while ts < end || ts == open {
            candles.push(Candle::new(ts, average));
            ts += Duration::minutes(5);
        }

        // 基准只取前 10 根，放量K线不影响基准
        if let Some(last) = candles.last_mut() {
            last.volume = (average as f64 * spike_ratio).round() as u64;
        }
        candles
    }
}

#[async_trait]
impl MarketDataSource for SampleSource {
    fn name(&self) -> &'static str {
        "sample"
    }

    async fn intraday_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FetchResult<Vec<Candle>> {
        let (_, _, average, spike_ratio, _) = Self::lookup(symbol)
            .ok_or_else(|| FetchError::Api(format!("unknown sample symbol {}", symbol)))?;

        let mut candles = Vec::new();
        let mut date = ist_date(&from);
        let last = ist_date(&to);
        while date <= last {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += Duration::days(1);
                continue;
            }
            candles.extend(
                Self::day_candles(date, *average, *spike_ratio, to)
                    .into_iter()
                    .filter(|c| c.timestamp >= from && c.timestamp <= to),
            );
            date += Duration::days(1);
        }
        Ok(candles)
    }

    async fn market_caps(&self, symbols: &[String]) -> FetchResult<HashMap<String, f64>> {
        Ok(symbols
            .iter()
            .filter_map(|s| Self::lookup(s).map(|(.., cap_crore)| (s.clone(), cap_crore * 1e7)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sample_candles() {
        let source = SampleSource::new();
        let from = ist_to_utc(date(2024, 1, 12), market_open_time());
        // 周一 10:00 IST
        let to = ist_to_utc(date(2024, 1, 15), chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());

        let candles = source.intraday_candles("INFY.NS", from, to).await.unwrap();
        let friday: Vec<&Candle> = candles.iter().filter(|c| ist_date(&c.timestamp) == date(2024, 1, 12)).collect();
        let monday: Vec<&Candle> = candles.iter().filter(|c| ist_date(&c.timestamp) == date(2024, 1, 15)).collect();

        // 09:15 - 15:25 共 75 根
        assert_eq!(friday.len(), 75);
        assert!(friday[..10].iter().all(|c| c.volume == 288_000));
        // 周末没有K线
        assert_eq!(friday.len() + 9, candles.len());
        // 09:15 - 09:55 共 9 根，最后一根放量
        assert_eq!(monday.len(), 9);
        assert_eq!(monday.last().unwrap().volume, (288_000f64 * 15.2).round() as u64);
    }

    #[tokio::test]
    async fn test_sample_market_caps() {
        let source = SampleSource::new();
        let caps = source
            .market_caps(&["SUZLON.NS".to_string(), "UNKNOWN.NS".to_string()])
            .await
            .unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps["SUZLON.NS"], 850.0 * 1e7);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let now = Utc::now();
        assert!(SampleSource::new().intraday_candles("NOPE.NS", now, now).await.is_err());
    }
}
