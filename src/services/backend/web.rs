use reqwest::Method;
use serde::Deserialize;

use super::{segment, ApiBase, ApiError, BackendClient, CallContext};
use crate::models::fees::{RoomFeeSchedule, RoomFeeScheduleInput, RoomFeesResponse};
use crate::models::{WebFaq, WebPublicContent};

#[derive(Deserialize)]
struct RoomSlugResponse {
    #[serde(default)]
    slug: Option<String>,
}

impl BackendClient {
    /// Resolves the room slug served at `club_host`; `None` when the host is
    /// not a known tenant.
    #[tracing::instrument(skip(self))]
    pub async fn room_slug(&self, club_host: &str) -> Result<Option<String>, ApiError> {
        let response: RoomSlugResponse = self
            .get_json(
                ApiBase::Core,
                "/web/room_slug",
                CallContext::public().with_club_host(club_host),
            )
            .await?;
        Ok(response.slug.filter(|s| !s.is_empty()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn public_content(&self, club_host: &str) -> Result<WebPublicContent, ApiError> {
        self.get_json(
            ApiBase::Core,
            "/web/public_content",
            CallContext::public().with_club_host(club_host),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn faq(&self, club_host: &str) -> Result<WebFaq, ApiError> {
        let faq: WebFaq = self
            .get_json(
                ApiBase::Core,
                "/web/faq",
                CallContext::public().with_club_host(club_host),
            )
            .await?;
        Ok(faq.sorted())
    }

    #[tracing::instrument(skip(self, id_token, faq))]
    pub async fn save_faq(&self, id_token: &str, slug: &str, faq: &WebFaq) -> Result<(), ApiError> {
        self.send_empty(
            Method::PUT,
            ApiBase::Core,
            &format!("/web/admin/faq/{}", segment(slug)?),
            CallContext::bearer(id_token).with_api_key(),
            Some(faq),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn room_fees(
        &self,
        id_token: &str,
        slug: &str,
    ) -> Result<Vec<RoomFeeSchedule>, ApiError> {
        let response: RoomFeesResponse = self
            .get_json(
                ApiBase::Core,
                &format!("/web/admin/room-fees/{}", segment(slug)?),
                CallContext::bearer(id_token).with_api_key(),
            )
            .await?;
        Ok(response.fees)
    }

    #[tracing::instrument(skip(self, id_token, fees), fields(bands = fees.len()))]
    pub async fn save_room_fees(
        &self,
        id_token: &str,
        slug: &str,
        fees: &[RoomFeeScheduleInput],
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::PUT,
            ApiBase::Core,
            &format!("/web/admin/room-fees/{}", segment(slug)?),
            CallContext::bearer(id_token).with_api_key(),
            Some(fees),
        )
        .await
    }
}
