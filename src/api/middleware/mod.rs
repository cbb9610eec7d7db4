// Request extractors, session wiring and response middleware

pub mod auth;
pub mod session;
pub mod site;
