//! 行情数据源
//!
//! 外部接口返回的动态结构在这里立即转换为 `Candle` 和市值，
//! 其余模块不接触原始响应
//!
//! ## 数据来源
//! - Yahoo Finance：5 分钟K线、市值
//! - 内置演示数据：外部接口不可用时使用

mod sample;
mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, DataSourceKind};
use crate::error::FetchResult;
use crate::models::Candle;

pub use sample::SampleSource;
pub use yahoo::YahooFinanceSource;

/// 行情数据源
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 数据源名称，用于日志
    fn name(&self) -> &'static str;

    /// 获取 [from, to] 区间内的 5 分钟K线，按时间升序
    async fn intraday_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FetchResult<Vec<Candle>>;

    /// 批量获取市值（卢比），缺失的股票不出现在结果中
    async fn market_caps(&self, symbols: &[String]) -> FetchResult<HashMap<String, f64>>;
}

/// 根据配置创建数据源
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn MarketDataSource>> {
    match config.data.source {
        DataSourceKind::Yahoo => Ok(Arc::new(YahooFinanceSource::new(&config.data, &config.api)?)),
        DataSourceKind::Sample => Ok(Arc::new(SampleSource::new())),
    }
}
