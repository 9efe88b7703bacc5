//! 刷新流程
//!
//! 股票池 -> 行情抓取 -> 筛选，每个周期都从头计算，不保留历史

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Kolkata;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::models::CycleReport;
use crate::services::fetcher::{fetch_snapshots, FetchSettings};
use crate::services::market_data::MarketDataSource;
use crate::services::market_hours::MarketCalendar;
use crate::services::screener::{screen_with, ScreenCriteria};
use crate::services::universe::UniverseProvider;

/// 一次完整的筛选流程
pub struct Pipeline {
    universe: UniverseProvider,
    source: Arc<dyn MarketDataSource>,
    calendar: MarketCalendar,
    criteria: ScreenCriteria,
    settings: FetchSettings,
}

impl Pipeline {
    pub fn new(
        universe: UniverseProvider,
        source: Arc<dyn MarketDataSource>,
        calendar: MarketCalendar,
        criteria: ScreenCriteria,
        settings: FetchSettings,
    ) -> Self {
        Self {
            universe,
            source,
            calendar,
            criteria,
            settings,
        }
    }

    /// 根据配置组装
    pub fn from_config(config: &AppConfig, source: Arc<dyn MarketDataSource>) -> anyhow::Result<Self> {
        Ok(Self::new(
            UniverseProvider::from_config(config)?,
            source,
            MarketCalendar::new(config.market.holidays.iter().copied()),
            ScreenCriteria {
                min_spike_ratio: config.screener.min_spike_ratio,
                min_market_cap: config.min_market_cap(),
                top_n: config.screener.top_n,
            },
            FetchSettings::from(&config.fetch),
        ))
    }

    pub fn calendar(&self) -> &MarketCalendar {
        &self.calendar
    }

    /// 执行一个刷新周期
    ///
    /// 不会返回错误：全部失败时结果为空，并在报告中带上错误信息
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let started = Instant::now();
        let session = self.calendar.trading_session(&now);
        let securities = self.universe.securities().await;

        log::info!(
            "开始刷新：{} 只股票，数据源 {}，时段 {}，基准日 {}",
            securities.len(),
            self.source.name(),
            session.session_date,
            session.previous_date
        );

        let outcome = fetch_snapshots(
            self.source.as_ref(),
            &securities,
            &session,
            now,
            &self.settings,
        )
        .await;

        let rows = screen_with(&outcome.snapshots, &self.criteria);

        let error = if securities.is_empty() {
            Some("Failed to fetch stock symbols. Please try again later.".to_string())
        } else if outcome.snapshots.is_empty() {
            let caps_only = !outcome.failures.is_empty()
                && outcome
                    .failures
                    .iter()
                    .all(|(_, e)| matches!(e, FetchError::MissingMarketCap(_)));
            if caps_only {
                Some("Failed to fetch market cap data. Please try again later.".to_string())
            } else {
                Some("Failed to fetch volume data. Please try again later.".to_string())
            }
        } else {
            None
        };

        log::info!(
            "刷新完成：成功 {}，失败 {}，入选 {}，耗时 {:.1}s",
            outcome.snapshots.len(),
            outcome.failures.len(),
            rows.len(),
            started.elapsed().as_secs_f64()
        );

        CycleReport {
            rows,
            market_status: self.calendar.status(&now),
            session_date: session.session_date.to_string(),
            baseline_date: session.previous_date.to_string(),
            updated_at: now.with_timezone(&Kolkata).to_rfc3339(),
            symbols_total: securities.len(),
            symbols_fetched: outcome.snapshots.len(),
            symbols_failed: outcome.failures.len(),
            error,
        }
    }
}
