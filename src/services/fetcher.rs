//! 行情抓取
//!
//! 为股票池中的每只股票获取基准成交量、当前成交量和市值，
//! 单只股票失败只记录日志并跳过，不影响整批

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::models::{Candle, Security, SymbolSnapshot, TradingSession};
use crate::services::market_data::MarketDataSource;
use crate::services::market_hours::{ist_date, ist_to_utc, market_open_time};

/// 基准使用的K线数量
pub const BASELINE_CANDLES: usize = 10;

/// 抓取参数
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub concurrency: usize,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl From<&FetchConfig> for FetchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            batch_size: config.batch_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
        }
    }
}

/// 一只股票的成交量数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeProfile {
    pub baseline_volume: f64,
    pub current_volume: u64,
}

/// 一批抓取的结果
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub snapshots: Vec<SymbolSnapshot>,
    pub failures: Vec<(String, FetchError)>,
}

/// 从K线中计算基准成交量和当前成交量
///
/// - 基准：前一交易日 09:15 之后按时间排序的前 10 根K线的平均成交量，不足 10 根视为失败
/// - 当前：交易时段日期内最新的一根K线
pub fn volume_profile(
    symbol: &str,
    candles: &[Candle],
    session: &TradingSession,
) -> FetchResult<VolumeProfile> {
    let baseline_start = ist_to_utc(session.previous_date, market_open_time());

    let mut previous: Vec<&Candle> = candles
        .iter()
        .filter(|c| ist_date(&c.timestamp) == session.previous_date && c.timestamp >= baseline_start)
        .collect();
    previous.sort_by_key(|c| c.timestamp);

    if previous.len() < BASELINE_CANDLES {
        return Err(FetchError::InsufficientCandles {
            symbol: symbol.to_string(),
            date: session.previous_date.to_string(),
            found: previous.len(),
            needed: BASELINE_CANDLES,
        });
    }

    let total: u64 = previous
        .iter()
        .take(BASELINE_CANDLES)
        .map(|c| c.volume)
        .sum();
    let baseline_volume = total as f64 / BASELINE_CANDLES as f64;

    let current = candles
        .iter()
        .filter(|c| ist_date(&c.timestamp) == session.session_date)
        .max_by_key(|c| c.timestamp)
        .ok_or_else(|| FetchError::NoCurrentCandle {
            symbol: symbol.to_string(),
            date: session.session_date.to_string(),
        })?;

    Ok(VolumeProfile {
        baseline_volume,
        current_volume: current.volume,
    })
}

/// 抓取一批股票的快照
///
/// 按 batch_size 分批，批内最多 concurrency 个请求同时进行，
/// 批次之间暂停 batch_pause。成交量全部获取完成后再批量请求市值
pub async fn fetch_snapshots(
    source: &dyn MarketDataSource,
    securities: &[Security],
    session: &TradingSession,
    now: DateTime<Utc>,
    settings: &FetchSettings,
) -> FetchOutcome {
    let from = ist_to_utc(session.previous_date, market_open_time());
    let mut outcome = FetchOutcome::default();
    let mut profiles: Vec<(Security, VolumeProfile)> = Vec::new();

    let batches: Vec<&[Security]> = securities.chunks(settings.batch_size).collect();
    let batch_count = batches.len();

    for (i, batch) in batches.into_iter().enumerate() {
        // 每个请求持有自己的 Security，future 才能满足 tokio::spawn 的 Send 要求
        let results: Vec<(Security, FetchResult<VolumeProfile>)> = stream::iter(batch.to_vec())
            .map(|security| async move {
                let result = source
                    .intraday_candles(&security.symbol, from, now)
                    .await
                    .and_then(|candles| volume_profile(&security.symbol, &candles, session));
                (security, result)
            })
            .buffer_unordered(settings.concurrency)
            .collect()
            .await;

        for (security, result) in results {
            match result {
                Ok(profile) => profiles.push((security, profile)),
                Err(e) => {
                    log::warn!("处理 {} 失败: {}", security.symbol, e);
                    outcome.failures.push((security.symbol, e));
                }
            }
        }

        log::debug!("已完成第 {}/{} 批", i + 1, batch_count);
        if i + 1 < batch_count && !settings.batch_pause.is_zero() {
            tokio::time::sleep(settings.batch_pause).await;
        }
    }

    if profiles.is_empty() {
        return outcome;
    }

    let symbols: Vec<String> = profiles.iter().map(|(s, _)| s.symbol.clone()).collect();
    let caps = match source.market_caps(&symbols).await {
        Ok(caps) => caps,
        Err(e) => {
            log::warn!("获取市值失败: {}", e);
            Default::default()
        }
    };

    for (security, profile) in profiles {
        match caps.get(&security.symbol).copied() {
            Some(market_cap) => outcome.snapshots.push(SymbolSnapshot {
                symbol: security.symbol,
                name: security.name,
                baseline_volume: profile.baseline_volume,
                current_volume: profile.current_volume,
                market_cap,
            }),
            None => {
                let err = FetchError::MissingMarketCap(security.symbol.clone());
                log::warn!("处理 {} 失败: {}", security.symbol, err);
                outcome.failures.push((security.symbol, err));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exchange;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session() -> TradingSession {
        TradingSession {
            session_date: date(2024, 1, 15),
            previous_date: date(2024, 1, 12),
        }
    }

    /// 从 09:15 开始每 5 分钟一根
    fn candles_on(day: NaiveDate, volumes: &[u64]) -> Vec<Candle> {
        let open = ist_to_utc(day, market_open_time());
        volumes
            .iter()
            .enumerate()
            .map(|(i, v)| Candle::new(open + ChronoDuration::minutes(5 * i as i64), *v))
            .collect()
    }

    fn security(symbol: &str) -> Security {
        Security {
            symbol: symbol.to_string(),
            name: format!("{} Ltd", symbol),
            exchange: Exchange::Nse,
        }
    }

    #[test]
    fn test_volume_profile() {
        let mut candles = candles_on(date(2024, 1, 12), &[100; 10]);
        // 第 11 根以后不计入基准
        candles.extend(candles_on(date(2024, 1, 12), &[0; 12]).into_iter().skip(10));
        candles.extend(candles_on(date(2024, 1, 15), &[200, 300, 1500]));

        let profile = volume_profile("A.NS", &candles, &session()).unwrap();
        assert_eq!(profile.baseline_volume, 100.0);
        assert_eq!(profile.current_volume, 1500);
    }

    #[test]
    fn test_volume_profile_ignores_pre_open_and_order() {
        let day = date(2024, 1, 12);
        let pre_open = ist_to_utc(day, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let mut candles = vec![Candle::new(pre_open, 1_000_000)];
        let mut regular = candles_on(day, &[10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 5000]);
        regular.reverse();
        candles.extend(regular);
        candles.extend(candles_on(date(2024, 1, 15), &[42]));

        let profile = volume_profile("A.NS", &candles, &session()).unwrap();
        assert_eq!(profile.baseline_volume, 55.0);
        assert_eq!(profile.current_volume, 42);
    }

    #[test]
    fn test_volume_profile_insufficient_baseline() {
        let mut candles = candles_on(date(2024, 1, 12), &[100; 9]);
        candles.extend(candles_on(date(2024, 1, 15), &[1500]));

        match volume_profile("A.NS", &candles, &session()) {
            Err(FetchError::InsufficientCandles { found, needed, .. }) => {
                assert_eq!(found, 9);
                assert_eq!(needed, 10);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_volume_profile_no_current() {
        let candles = candles_on(date(2024, 1, 12), &[100; 10]);
        assert!(matches!(
            volume_profile("A.NS", &candles, &session()),
            Err(FetchError::NoCurrentCandle { .. })
        ));
    }

    #[test]
    fn test_zero_baseline_is_not_an_error() {
        let mut candles = candles_on(date(2024, 1, 12), &[0; 10]);
        candles.extend(candles_on(date(2024, 1, 15), &[900]));
        let profile = volume_profile("C.NS", &candles, &session()).unwrap();
        assert_eq!(profile.baseline_volume, 0.0);
    }

    /// 测试用数据源
    struct StubSource {
        candles: HashMap<String, Vec<Candle>>,
        caps: HashMap<String, f64>,
        caps_fail: bool,
    }

    #[async_trait]
    impl MarketDataSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn intraday_candles(
            &self,
            symbol: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> FetchResult<Vec<Candle>> {
            self.candles
                .get(symbol)
                .cloned()
                .ok_or_else(|| FetchError::Api(format!("404 {}", symbol)))
        }

        async fn market_caps(&self, symbols: &[String]) -> FetchResult<HashMap<String, f64>> {
            if self.caps_fail {
                return Err(FetchError::Api("quote unavailable".to_string()));
            }
            Ok(symbols
                .iter()
                .filter_map(|s| self.caps.get(s).map(|c| (s.clone(), *c)))
                .collect())
        }
    }

    fn stub(caps_fail: bool) -> StubSource {
        let mut candles = HashMap::new();
        let mut good = candles_on(date(2024, 1, 12), &[100; 10]);
        good.extend(candles_on(date(2024, 1, 15), &[1500]));
        candles.insert("GOOD.NS".to_string(), good.clone());
        candles.insert("NOCAP.NS".to_string(), good);
        candles.insert("SHORT.NS".to_string(), candles_on(date(2024, 1, 12), &[100; 3]));

        let mut caps = HashMap::new();
        caps.insert("GOOD.NS".to_string(), 2e10);

        StubSource {
            candles,
            caps,
            caps_fail,
        }
    }

    fn settings() -> FetchSettings {
        FetchSettings {
            concurrency: 2,
            batch_size: 2,
            batch_pause: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshots_skips_failures() {
        let securities: Vec<Security> = ["GOOD.NS", "MISSING.NS", "SHORT.NS", "NOCAP.NS"]
            .iter()
            .map(|s| security(s))
            .collect();

        let outcome =
            fetch_snapshots(&stub(false), &securities, &session(), Utc::now(), &settings()).await;

        assert_eq!(outcome.snapshots.len(), 1);
        let snap = &outcome.snapshots[0];
        assert_eq!(snap.symbol, "GOOD.NS");
        assert_eq!(snap.name, "GOOD.NS Ltd");
        assert_eq!(snap.baseline_volume, 100.0);
        assert_eq!(snap.current_volume, 1500);
        assert_eq!(snap.market_cap, 2e10);

        let mut failed: Vec<&str> = outcome.failures.iter().map(|(s, _)| s.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["MISSING.NS", "NOCAP.NS", "SHORT.NS"]);
    }

    #[tokio::test]
    async fn test_market_cap_failure_fails_fetched_symbols() {
        let securities = vec![security("GOOD.NS")];
        let outcome =
            fetch_snapshots(&stub(true), &securities, &session(), Utc::now(), &settings()).await;
        assert!(outcome.snapshots.is_empty());
        assert!(matches!(outcome.failures[0].1, FetchError::MissingMarketCap(_)));
    }

    #[tokio::test]
    async fn test_fetch_empty_universe() {
        let outcome = fetch_snapshots(&stub(false), &[], &session(), Utc::now(), &settings()).await;
        assert!(outcome.snapshots.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
