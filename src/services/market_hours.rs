//! 印度股市交易时间
//!
//! NSE/BSE 交易时间为周一至周五 09:15 - 15:30（IST），不含交易所假日

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use std::collections::HashSet;

use crate::models::{MarketStatus, TradingSession};

/// 获取印度标准时间
pub fn now_ist() -> DateTime<Tz> {
    Utc::now().with_timezone(&Kolkata)
}

/// 开盘时间 09:15
pub fn market_open_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default()
}

/// 收盘时间 15:30
pub fn market_close_time() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default()
}

/// 交易日历，假日列表来自配置
#[derive(Debug, Clone, Default)]
pub struct MarketCalendar {
    holidays: HashSet<NaiveDate>,
}

impl MarketCalendar {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(holidays: I) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// 是否为交易日（工作日且不是假日）
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// 市场状态
    pub fn status<T: TimeZone>(&self, now: &DateTime<T>) -> MarketStatus {
        let local = now.with_timezone(&Kolkata);
        let time = local.time();
        if self.is_trading_day(local.date_naive())
            && time >= market_open_time()
            && time <= market_close_time()
        {
            MarketStatus::Open
        } else {
            MarketStatus::Closed
        }
    }

    /// date 之前最近的一个交易日
    pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date - Duration::days(1);
        while !self.is_trading_day(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// 当前时间对应的交易时段
    ///
    /// 交易日开盘后以当天为时段，否则回退到最近一个已开盘的交易日
    pub fn trading_session<T: TimeZone>(&self, now: &DateTime<T>) -> TradingSession {
        let local = now.with_timezone(&Kolkata);
        let today = local.date_naive();
        let session_date = if self.is_trading_day(today) && local.time() >= market_open_time() {
            today
        } else {
            self.previous_trading_day(today)
        };

        TradingSession {
            session_date,
            previous_date: self.previous_trading_day(session_date),
        }
    }
}

/// 将 IST 本地时间转换为 UTC
pub fn ist_to_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    // IST 没有夏令时，本地时间总是唯一的
    Kolkata
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&(date.and_time(time) - Duration::minutes(330))))
}

/// K线时间戳所在的 IST 日期
pub fn ist_date(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Kolkata).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_market_status_examples() {
        let calendar = MarketCalendar::default();
        assert_eq!(calendar.status(&ist(2024, 1, 15, 10, 0)), MarketStatus::Open);
        assert_eq!(calendar.status(&ist(2024, 1, 15, 16, 0)), MarketStatus::Closed);
        // 周六
        assert_eq!(calendar.status(&ist(2024, 1, 13, 10, 0)), MarketStatus::Closed);
    }

    #[test]
    fn test_market_status_boundaries() {
        let calendar = MarketCalendar::default();
        assert_eq!(calendar.status(&ist(2024, 1, 15, 9, 14)), MarketStatus::Closed);
        assert_eq!(calendar.status(&ist(2024, 1, 15, 9, 15)), MarketStatus::Open);
        assert_eq!(calendar.status(&ist(2024, 1, 15, 15, 30)), MarketStatus::Open);
        assert_eq!(calendar.status(&ist(2024, 1, 15, 15, 31)), MarketStatus::Closed);
    }

    #[test]
    fn test_market_status_accepts_utc() {
        let calendar = MarketCalendar::default();
        // 04:30 UTC = 10:00 IST
        let utc = Utc.with_ymd_and_hms(2024, 1, 15, 4, 30, 0).unwrap();
        assert_eq!(calendar.status(&utc), MarketStatus::Open);
    }

    #[test]
    fn test_holiday_closed() {
        let calendar = MarketCalendar::new([date(2024, 1, 26)]);
        assert_eq!(calendar.status(&ist(2024, 1, 26, 11, 0)), MarketStatus::Closed);
        assert!(!calendar.is_trading_day(date(2024, 1, 26)));
    }

    #[test]
    fn test_previous_trading_day_skips_weekend_and_holiday() {
        let calendar = MarketCalendar::new([date(2024, 1, 12)]);
        // 周一 -> 周五是假日 -> 周四
        assert_eq!(calendar.previous_trading_day(date(2024, 1, 15)), date(2024, 1, 11));
        assert_eq!(
            MarketCalendar::default().previous_trading_day(date(2024, 1, 15)),
            date(2024, 1, 12)
        );
    }

    #[test]
    fn test_trading_session() {
        let calendar = MarketCalendar::default();

        let session = calendar.trading_session(&ist(2024, 1, 15, 10, 0));
        assert_eq!(session.session_date, date(2024, 1, 15));
        assert_eq!(session.previous_date, date(2024, 1, 12));

        // 开盘前使用上一个交易日
        let session = calendar.trading_session(&ist(2024, 1, 16, 8, 0));
        assert_eq!(session.session_date, date(2024, 1, 15));
        assert_eq!(session.previous_date, date(2024, 1, 12));

        // 周末
        let session = calendar.trading_session(&ist(2024, 1, 13, 10, 0));
        assert_eq!(session.session_date, date(2024, 1, 12));
        assert_eq!(session.previous_date, date(2024, 1, 11));
    }

    #[test]
    fn test_ist_to_utc() {
        let open = ist_to_utc(date(2024, 1, 15), market_open_time());
        assert_eq!(open, Utc.with_ymd_and_hms(2024, 1, 15, 3, 45, 0).unwrap());
        assert_eq!(ist_date(&open), date(2024, 1, 15));
    }

    #[test]
    fn test_now_ist_offset() {
        assert!(now_ist().to_rfc3339().ends_with("+05:30"));
    }
}
