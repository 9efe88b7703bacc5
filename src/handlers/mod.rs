pub mod dashboard;
pub mod health;
pub mod market;
pub mod screener;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(market::config)
            .configure(screener::config),
    )
    .configure(dashboard::config);
}
