// /mp-checkout/services/checkout-service/src/api/mod.rs

pub mod handlers;
pub mod routes;
