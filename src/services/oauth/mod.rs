// OAuth2/OIDC provider integration and the cross-host token handoff

pub mod cognito;
pub mod handoff;
