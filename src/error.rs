use thiserror::Error;

/// 单只股票数据获取失败的原因
///
/// 这些错误只影响对应的股票，不会中断整批处理
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    Parse(String),

    #[error("{symbol}: only {found} baseline candles on {date}, need {needed}")]
    InsufficientCandles {
        symbol: String,
        date: String,
        found: usize,
        needed: usize,
    },

    #[error("{symbol}: no candle in session {date}")]
    NoCurrentCandle { symbol: String, date: String },

    #[error("{0}: market cap unavailable")]
    MissingMarketCap(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(value: url::ParseError) -> Self {
        Self::Api(format!("bad url: {}", value))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FetchError::InsufficientCandles {
            symbol: "TCS.NS".to_string(),
            date: "2024-01-12".to_string(),
            found: 7,
            needed: 10,
        };
        assert_eq!(
            err.to_string(),
            "TCS.NS: only 7 baseline candles on 2024-01-12, need 10"
        );
        assert_eq!(
            FetchError::MissingMarketCap("INFY.NS".to_string()).to_string(),
            "INFY.NS: market cap unavailable"
        );
    }
}
