pub mod market;
pub mod response;
pub mod stock;

pub use market::*;
pub use response::*;
pub use stock::*;
