//! 网页看板
//!
//! 服务端直接渲染 HTML，通过 meta refresh 按刷新间隔自动重新加载

use actix_web::{
    http::header::{self, ContentType},
    web, HttpResponse, Result,
};
use chrono::Utc;
use chrono_tz::Asia::Kolkata;
use std::fmt::Write;

use crate::models::{CycleReport, MarketStatus, ScreenRow};
use crate::services::scheduler::DashboardState;
use crate::services::screener::CRORE;

pub async fn index(state: web::Data<DashboardState>) -> Result<HttpResponse> {
    let now = Utc::now();
    let report = state.latest().await;
    let page = render_page(
        report.as_ref(),
        state.market_status(&now),
        &now.with_timezone(&Kolkata).format("%Y-%m-%d %H:%M:%S").to_string(),
        state.refresh_interval().as_secs(),
    );
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(page))
}

/// 页面上的 "Refresh Now" 按钮，刷新后跳回看板
pub async fn refresh_and_redirect(state: web::Data<DashboardState>) -> Result<HttpResponse> {
    if state.refresh(Utc::now()).await.is_none() {
        log::info!("刷新正在进行中，忽略页面刷新请求");
    }
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/refresh", web::post().to(refresh_and_redirect));
}

/// 市值显示（单位 crore），1000 以上显示为 K
pub fn format_market_cap(market_cap: f64) -> String {
    let crore = market_cap / CRORE;
    if crore >= 1000.0 {
        format!("{:.2}K", crore / 1000.0)
    } else {
        format!("{:.2}", crore)
    }
}

/// 千分位分隔
pub fn format_volume(volume: u64) -> String {
    let digits = volume.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_row(out: &mut String, row: &ScreenRow) {
    let _ = write!(
        out,
        "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
         <td class=\"num\">{:.2}x</td><td class=\"num\">{}</td></tr>",
        escape_html(&row.symbol),
        escape_html(&row.name),
        format_volume(row.current_volume),
        format_volume(row.baseline_volume.round() as u64),
        row.spike_ratio,
        format_market_cap(row.market_cap),
    );
}

/// 渲染看板页面
pub fn render_page(
    report: Option<&CycleReport>,
    status: MarketStatus,
    now_ist: &str,
    refresh_secs: u64,
) -> String {
    let mut body = String::new();

    let _ = write!(
        body,
        "<p>Current time (IST): {} &nbsp; Market Status: <span class=\"status {}\">{}</span></p>",
        now_ist,
        status.as_str().to_lowercase(),
        status
    );

    match report {
        None => body.push_str("<p class=\"info\">Loading data, the first refresh is in progress.</p>"),
        Some(report) => {
            if let Some(error) = &report.error {
                let _ = write!(body, "<p class=\"error\">{}</p>", escape_html(error));
            }

            let _ = write!(
                body,
                "<p>Last updated: {} IST &nbsp; Scanned {} symbols ({} fetched, {} failed), \
                 baseline day {}</p>",
                escape_html(&report.updated_at),
                report.symbols_total,
                report.symbols_fetched,
                report.symbols_failed,
                escape_html(&report.baseline_date),
            );

            if report.rows.is_empty() {
                if report.error.is_none() {
                    body.push_str(
                        "<p class=\"info\">No stocks currently meet the filtering criteria. \
                         Try refreshing later.</p>",
                    );
                }
            } else {
                body.push_str(
                    "<h2>Top Stocks with Volume Spikes</h2><table><thead><tr>\
                     <th>Symbol</th><th>Company Name</th><th>Current 5-Minute Volume</th>\
                     <th>Avg Volume (Prev Day, 10x5min)</th><th>Volume Spike Ratio</th>\
                     <th>Market Cap (&#8377; Cr)</th></tr></thead><tbody>",
                );
                for row in &report.rows {
                    render_row(&mut body, row);
                }
                body.push_str("</tbody></table>");
            }
        }
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"{refresh}\">\
         <title>Indian Stock Volume Screener</title>\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:4px 8px}}.num{{text-align:right}}\
         .error{{color:#b00}}.open{{color:#080}}.closed{{color:#b00}}</style></head><body>\
         <h1>Indian Stock Volume Screener</h1>{body}\
         <form method=\"post\" action=\"/refresh\"><button>Refresh Now</button></form>\
         <h2>Screening Criteria</h2><ul>\
         <li>Volume Spike: current 5-minute volume is at least 10 times the average of the \
         previous day's first 10 five-minute candles</li>\
         <li>Market Cap: greater than &#8377;1000 crore</li>\
         <li>Sorting: top 10 stocks with highest current 5-minute volume</li></ul>\
         <hr><small>NSE and BSE market hours are 9:15 AM to 3:30 PM IST, Monday to Friday.</small>\
         </body></html>",
        refresh = refresh_secs,
        body = body,
    )
}
