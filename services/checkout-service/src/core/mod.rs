// /mp-checkout/services/checkout-service/src/core/mod.rs

pub mod cart;
pub mod checkout;
pub mod mercadopago;

// Re-export untuk kemudahan akses
pub mod services {
    pub use super::cart::CartClient;
    pub use super::checkout::CheckoutService;
    pub use super::mercadopago::MercadoPagoClient;
}
