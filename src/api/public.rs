use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::api::auth::unknown_auth_route;
use crate::api::layout::{inline_error, Layout, MessageTemplate};
use crate::api::middleware::auth::{load_profile, AuthContext};
use crate::api::middleware::session::AppState;
use crate::api::middleware::site::Site;
use crate::error::{AppError, Result};
use crate::models::content::{fallback_hero_url, fallback_logo_url};
use crate::models::league::{self, ScheduleDay};
use crate::models::{League, MatchReport, Permissions, Standing, UserInfo, WebFaq, WebPublicContent};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/faq", get(faq_page))
        .route("/leagues", get(leagues_page))
        .route("/account", get(account_page))
        .route("/privacy", get(privacy_page))
}

// Templates
#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    layout: Layout,
    content: Option<WebPublicContent>,
    logo_url: String,
    fallback_logo_url: String,
    hero_url: String,
    fallback_hero_url: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "platform_landing.html")]
struct PlatformLandingTemplate {
    layout: Layout,
}

#[derive(Template)]
#[template(path = "faq.html")]
struct FaqTemplate {
    layout: Layout,
    faq: WebFaq,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "leagues.html")]
struct LeaguesTemplate {
    layout: Layout,
    leagues: Vec<League>,
    selected: Option<String>,
    tab: LeagueTab,
    results: Vec<MatchReport>,
    schedule: Vec<ScheduleDay>,
    standings: Vec<Standing>,
    tz: Tz,
    error: Option<String>,
}

impl LeaguesTemplate {
    fn is_selected(&self, slug: &str) -> bool {
        self.selected.as_deref() == Some(slug)
    }

    fn tab_href(&self, tab: &str) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(league) = &self.selected {
            query.append_pair("league", league);
        }
        query.append_pair("tab", tab);
        format!("/leagues?{}", query.finish())
    }
}

#[derive(Template)]
#[template(path = "account.html")]
struct AccountTemplate {
    layout: Layout,
    email: String,
    info: Option<UserInfo>,
    permissions: Option<Permissions>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "privacy.html")]
struct PrivacyTemplate {
    layout: Layout,
}

/// Club landing page, or the platform landing on platform hosts.
async fn landing(State(state): State<AppState>, site: Site, auth: AuthContext) -> Result<Response> {
    if site.is_auth() {
        return Ok(unknown_auth_route());
    }

    if site.is_platform() {
        let layout = Layout::new(&site, &auth, "Arenamatic");
        return Ok(PlatformLandingTemplate { layout }.into_response());
    }

    let host = site.club_host().unwrap_or_default();
    let asset_base = &state.config.asset_base;

    let (content, error) = match state.backend.public_content(host).await {
        Ok(content) => (Some(content), None),
        Err(e) => (None, Some(inline_error(e, "club content")?)),
    };

    let title = content
        .as_ref()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Club".to_string());

    Ok(LandingTemplate {
        layout: Layout::new(&site, &auth, title),
        logo_url: content
            .as_ref()
            .map(|c| c.logo_url(asset_base))
            .unwrap_or_else(|| fallback_logo_url(asset_base)),
        hero_url: content
            .as_ref()
            .map(|c| c.hero_url(asset_base))
            .unwrap_or_else(|| fallback_hero_url(asset_base)),
        fallback_hero_url: fallback_hero_url(asset_base),
        fallback_logo_url: fallback_logo_url(asset_base),
        content,
        error,
    }
    .into_response())
}

async fn faq_page(State(state): State<AppState>, site: Site, auth: AuthContext) -> Result<Response> {
    let Some(host) = site.club_host() else {
        return Err(AppError::NotFound("Page not found".to_string()));
    };

    let (faq, error) = match state.backend.faq(host).await {
        Ok(faq) => (faq, None),
        Err(e) => (WebFaq::default(), Some(inline_error(e, "FAQ")?)),
    };

    Ok(FaqTemplate {
        layout: Layout::new(&site, &auth, "FAQ"),
        faq,
        error,
    }
    .into_response())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeagueTab {
    #[default]
    Results,
    Schedule,
    Standings,
}

impl LeagueTab {
    pub const ALL: [LeagueTab; 3] = [LeagueTab::Results, LeagueTab::Schedule, LeagueTab::Standings];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueTab::Results => "results",
            LeagueTab::Schedule => "schedule",
            LeagueTab::Standings => "standings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeagueTab::Results => "Results",
            LeagueTab::Schedule => "Schedule",
            LeagueTab::Standings => "Standings",
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeagueQuery {
    league: Option<String>,
    #[serde(default)]
    tab: LeagueTab,
}

/// League viewer: pick a league, then see results, schedule or standings.
async fn leagues_page(
    State(state): State<AppState>,
    site: Site,
    auth: AuthContext,
    Query(params): Query<LeagueQuery>,
) -> Result<Response> {
    let layout = Layout::new(&site, &auth, "League Viewer");

    let Some(room_slug) = site.room_slug(&state).await else {
        return Ok(MessageTemplate::new(
            layout,
            "League Viewer",
            "No club is registered for this site.",
        )
        .into_response());
    };

    let mut page = LeaguesTemplate {
        layout,
        leagues: Vec::new(),
        selected: params.league.filter(|l| !l.is_empty()),
        tab: params.tab,
        results: Vec::new(),
        schedule: Vec::new(),
        standings: Vec::new(),
        tz: state.config.timezone,
        error: None,
    };

    match state.backend.leagues(&room_slug).await {
        Ok(leagues) => page.leagues = leagues,
        Err(e) => page.error = Some(inline_error(e, "leagues")?),
    }

    // Only leagues this room actually lists are looked up
    if let Some(league_slug) = page.selected.as_deref() {
        if !page.leagues.iter().any(|l| l.slug == league_slug) {
            tracing::warn!(room_slug = %room_slug, league = %league_slug, "Unknown league requested");
            page.selected = None;
        }
    }

    if let Some(league_slug) = page.selected.as_deref() {
        let (matches, standings) = tokio::join!(
            state.backend.match_reports(league_slug),
            state.backend.league_standings(&room_slug, league_slug),
        );

        match matches {
            Ok(matches) => {
                page.results = league::results(&matches);
                page.schedule = league::schedule(&matches, page.tz);
            }
            Err(e) => page.error = Some(inline_error(e, "matches")?),
        }
        match standings {
            Ok(standings) => page.standings = standings,
            Err(e) => page.error = Some(inline_error(e, "standings")?),
        }
    }

    Ok(page.into_response())
}

/// The signed-in user's profile and permissions.
async fn account_page(
    State(state): State<AppState>,
    site: Site,
    auth: AuthContext,
) -> Result<Response> {
    let layout = Layout::new(&site, &auth, "Account");
    let Some(user) = auth.into_user() else {
        return Ok(MessageTemplate::new(layout, "Account", "Not logged in.").into_response());
    };

    let room_slug = site.room_slug(&state).await;
    let email = user
        .claims
        .email
        .clone()
        .unwrap_or_else(|| user.claims.sub.clone());

    let page = match load_profile(&state, &user, room_slug.as_deref()).await {
        Ok((info, permissions)) => AccountTemplate {
            layout,
            email,
            info: Some(info),
            permissions: Some(permissions),
            error: None,
        },
        Err(AppError::Backend(e)) => AccountTemplate {
            layout,
            email,
            info: None,
            permissions: None,
            error: Some(inline_error(e, "profile")?),
        },
        Err(e) => return Err(e),
    };

    Ok(page.into_response())
}

async fn privacy_page(site: Site, auth: AuthContext) -> PrivacyTemplate {
    PrivacyTemplate {
        layout: Layout::new(&site, &auth, "Privacy Policy"),
    }
}
