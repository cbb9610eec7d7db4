use reqwest::Method;
use serde_json::json;

use super::{segment, ApiBase, ApiError, BackendClient, CallContext};
use crate::models::activity::DoorEvent;
use crate::models::room::{RoomInput, RoomIpInput};
use crate::models::{Room, RoomIp, RoomSummary, Table, TableInput};

impl BackendClient {
    /// Every room the caller may see.
    #[tracing::instrument(skip(self, id_token))]
    pub async fn list_rooms(&self, id_token: &str) -> Result<Vec<RoomSummary>, ApiError> {
        self.send_json(
            Method::POST,
            ApiBase::Core,
            "/room",
            CallContext::bearer(id_token),
            &json!({}),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn room(&self, id_token: &str, slug: &str) -> Result<Room, ApiError> {
        self.get_json(
            ApiBase::Core,
            &format!("/room/admin/{}", segment(slug)?),
            CallContext::bearer(id_token),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token, room))]
    pub async fn update_room(
        &self,
        id_token: &str,
        slug: &str,
        room: &RoomInput,
    ) -> Result<Room, ApiError> {
        self.send_json(
            Method::PUT,
            ApiBase::Core,
            &format!("/room/admin/{}", segment(slug)?),
            CallContext::bearer(id_token),
            room,
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token, room), fields(slug = %room.slug))]
    pub async fn create_room(&self, id_token: &str, room: &RoomInput) -> Result<Room, ApiError> {
        self.send_json(
            Method::POST,
            ApiBase::Core,
            "/room/admin/create",
            CallContext::bearer(id_token),
            room,
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn add_ip(
        &self,
        id_token: &str,
        slug: &str,
        ip: &RoomIpInput,
    ) -> Result<RoomIp, ApiError> {
        self.send_json(
            Method::POST,
            ApiBase::Core,
            &format!("/room/admin/{}/ip", segment(slug)?),
            CallContext::bearer(id_token),
            ip,
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn update_ip(
        &self,
        id_token: &str,
        slug: &str,
        id: i64,
        ip: &RoomIpInput,
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::PUT,
            ApiBase::Core,
            &format!("/room/admin/{}/ip/{}", segment(slug)?, id),
            CallContext::bearer(id_token),
            Some(ip),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn delete_ip(&self, id_token: &str, slug: &str, id: i64) -> Result<(), ApiError> {
        self.send_empty::<()>(
            Method::DELETE,
            ApiBase::Core,
            &format!("/room/admin/{}/ip/{}", segment(slug)?, id),
            CallContext::bearer(id_token),
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn tables(&self, id_token: &str, slug: &str) -> Result<Vec<Table>, ApiError> {
        self.get_json(
            ApiBase::Core,
            &format!("/room/admin/{}/table", segment(slug)?),
            CallContext::bearer(id_token),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token, table))]
    pub async fn create_table(
        &self,
        id_token: &str,
        slug: &str,
        table: &TableInput,
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::POST,
            ApiBase::Core,
            &format!("/room/admin/{}/table", segment(slug)?),
            CallContext::bearer(id_token),
            Some(table),
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token, table))]
    pub async fn update_table(
        &self,
        id_token: &str,
        slug: &str,
        id: i64,
        table: &TableInput,
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::PUT,
            ApiBase::Core,
            &format!("/room/admin/{}/table/{}", segment(slug)?, id),
            CallContext::bearer(id_token),
            Some(table),
        )
        .await
    }

    /// Takes the table out of service; the backend keeps the row.
    #[tracing::instrument(skip(self, id_token))]
    pub async fn delete_table(&self, id_token: &str, slug: &str, id: i64) -> Result<(), ApiError> {
        self.send_empty::<()>(
            Method::DELETE,
            ApiBase::Core,
            &format!("/room/admin/{}/table/{}", segment(slug)?, id),
            CallContext::bearer(id_token),
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn door_events(
        &self,
        id_token: &str,
        slug: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DoorEvent>, ApiError> {
        self.get_json(
            ApiBase::Core,
            &format!(
                "/room/admin/{}/activity?limit={}&offset={}",
                segment(slug)?,
                limit,
                offset
            ),
            CallContext::bearer(id_token),
        )
        .await
    }
}
