//! 股票数据模型
//!
//! 定义筛选流程中使用的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// 印度国家证券交易所
    Nse,
    /// 孟买证券交易所
    Bse,
}

impl Exchange {
    /// Yahoo 代码后缀
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
        }
    }

    /// 根据代码后缀识别交易所
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        if symbol.ends_with(".NS") {
            Some(Exchange::Nse)
        } else if symbol.ends_with(".BO") {
            Some(Exchange::Bse)
        } else {
            None
        }
    }
}

/// 待扫描的证券
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    /// 代码（带交易所后缀，如 RELIANCE.NS）
    pub symbol: String,
    /// 公司名称
    pub name: String,
    /// 所属交易所
    pub exchange: Exchange,
}

/// 5 分钟成交量K线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candle {
    /// K线开始时间
    pub timestamp: DateTime<Utc>,
    /// 成交量
    pub volume: u64,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, volume: u64) -> Self {
        Self { timestamp, volume }
    }
}

/// 单只股票在一个刷新周期内的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    /// 股票代码
    pub symbol: String,
    /// 公司名称
    pub name: String,
    /// 前一交易日前 10 根 5 分钟K线的平均成交量
    pub baseline_volume: f64,
    /// 当前 5 分钟K线成交量
    pub current_volume: u64,
    /// 市值（卢比）
    pub market_cap: f64,
}

impl SymbolSnapshot {
    /// 放量倍数，基准成交量不为正时返回 None
    pub fn spike_ratio(&self) -> Option<f64> {
        if self.baseline_volume > 0.0 {
            Some(self.current_volume as f64 / self.baseline_volume)
        } else {
            None
        }
    }
}

/// 筛选结果中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRow {
    pub symbol: String,
    pub name: String,
    pub current_volume: u64,
    pub baseline_volume: f64,
    pub spike_ratio: f64,
    pub market_cap: f64,
}

/// 筛选结果，按当前成交量降序，最多 top_n 行
pub type ScreenResult = Vec<ScreenRow>;

/// 一次刷新周期的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// 筛选出的股票
    pub rows: ScreenResult,
    /// 市场状态
    pub market_status: super::MarketStatus,
    /// 当前交易时段日期
    pub session_date: String,
    /// 基准交易日日期
    pub baseline_date: String,
    /// 更新时间（IST，RFC 3339）
    pub updated_at: String,
    /// 扫描的股票数量
    pub symbols_total: usize,
    /// 成功获取数据的股票数量
    pub symbols_fetched: usize,
    /// 获取失败的股票数量
    pub symbols_failed: usize,
    /// 需要展示给用户的错误信息
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(baseline: f64, current: u64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: "TEST.NS".to_string(),
            name: "Test".to_string(),
            baseline_volume: baseline,
            current_volume: current,
            market_cap: 2e10,
        }
    }

    #[test]
    fn test_spike_ratio() {
        assert_eq!(snapshot(100.0, 1500).spike_ratio(), Some(15.0));
        assert_eq!(snapshot(0.0, 900).spike_ratio(), None);
        assert_eq!(snapshot(-5.0, 900).spike_ratio(), None);
    }

    #[test]
    fn test_exchange_from_symbol() {
        assert_eq!(Exchange::from_symbol("TCS.NS"), Some(Exchange::Nse));
        assert_eq!(Exchange::from_symbol("500325.BO"), Some(Exchange::Bse));
        assert_eq!(Exchange::from_symbol("AAPL"), None);
        assert_eq!(Exchange::Bse.suffix(), ".BO");
    }
}
