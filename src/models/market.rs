//! 市场状态模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 市场开闭状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Open,
    Closed,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "OPEN",
            MarketStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 交易时段
///
/// - session_date: 取"当前"K线的交易日
/// - previous_date: 提供基准成交量的前一交易日
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSession {
    pub session_date: NaiveDate,
    pub previous_date: NaiveDate,
}

/// 市场状态接口响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MarketStatusInfo {
    pub status: MarketStatus,
    pub now_ist: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals() {
        assert_eq!(MarketStatus::Open.to_string(), "OPEN");
        assert_eq!(MarketStatus::Closed.as_str(), "CLOSED");
        assert_eq!(serde_json::to_string(&MarketStatus::Open).unwrap(), "\"OPEN\"");
    }
}
