pub mod checkout;
pub mod core_api;
pub mod free_tier;
pub mod notification;
pub mod provisioning;
pub mod stripe;
