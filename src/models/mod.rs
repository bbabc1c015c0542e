pub mod checkout_intent;
pub mod plan;
pub mod signup;
pub mod tenant;
pub mod webhook_event;
