use reqwest::Method;
use serde::Serialize;

use super::{ApiBase, ApiError, BackendClient, CallContext};
use crate::models::{Permissions, UserInfo};

#[derive(Serialize)]
struct PermissionsRequest<'a> {
    room_slug: Option<&'a str>,
}

impl BackendClient {
    #[tracing::instrument(skip(self, id_token))]
    pub async fn user_me(&self, id_token: &str) -> Result<UserInfo, ApiError> {
        self.get_json(ApiBase::Core, "/user/me", CallContext::bearer(id_token))
            .await
    }

    /// Permissions of the caller, scoped to `room_slug` when given.
    #[tracing::instrument(skip(self, id_token))]
    pub async fn my_permissions(
        &self,
        id_token: &str,
        room_slug: Option<&str>,
    ) -> Result<Permissions, ApiError> {
        self.send_json(
            Method::POST,
            ApiBase::Core,
            "/user/web/mypermissions",
            CallContext::bearer(id_token),
            &PermissionsRequest { room_slug },
        )
        .await
    }
}
