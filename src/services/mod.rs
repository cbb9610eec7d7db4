// Services module - Outbound clients and tenancy

pub mod backend;
pub mod encryption;
pub mod oauth;
pub mod tenancy;
