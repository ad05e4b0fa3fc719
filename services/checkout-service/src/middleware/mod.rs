// /mp-checkout/services/checkout-service/src/middleware/mod.rs

pub mod admission;
pub mod rate_limit;
pub mod security;
