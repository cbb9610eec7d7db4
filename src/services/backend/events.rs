use super::{segment, ApiBase, ApiError, BackendClient, CallContext};
use crate::models::league::LeagueDetail;
use crate::models::{League, MatchReport, Standing};

impl BackendClient {
    #[tracing::instrument(skip(self))]
    pub async fn leagues(&self, room_slug: &str) -> Result<Vec<League>, ApiError> {
        self.get_json(
            ApiBase::Core,
            &format!("/event/{}/leagues", segment(room_slug)?),
            CallContext::public().with_api_key(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn match_reports(&self, league: &str) -> Result<Vec<MatchReport>, ApiError> {
        self.get_json(
            ApiBase::Core,
            &format!("/event/{}/match_reports", segment(league)?),
            CallContext::public().with_api_key(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn league_standings(
        &self,
        room_slug: &str,
        league: &str,
    ) -> Result<Vec<Standing>, ApiError> {
        let detail: LeagueDetail = self
            .get_json(
                ApiBase::Core,
                &format!(
                    "/event/{}/league/{}",
                    segment(room_slug)?,
                    segment(league)?
                ),
                CallContext::public().with_api_key(),
            )
            .await?;
        Ok(detail.event.players)
    }
}
