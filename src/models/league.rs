use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::format;

/// Match status the backend uses for fixtures not yet played.
pub const STATUS_FUTURE: &str = "Future";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LeagueEvent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Entry of `/event/{room_slug}/leagues`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct League {
    pub slug: String,
    #[serde(default)]
    pub event: LeagueEvent,
}

impl League {
    pub fn label(&self) -> &str {
        [&self.event.name, &self.event.description]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or(self.slug.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameScore(pub i64, pub i64);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Highlight {
    #[serde(default, deserialize_with = "super::opt_string_or_number")]
    pub start: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
}

impl Highlight {
    pub fn time_label(&self, tz: Tz) -> String {
        self.start
            .as_deref()
            .map(|raw| format::time_of_day(raw, tz))
            .unwrap_or_default()
    }

    pub fn title_label(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Shot")
    }
}

/// Entry of `/event/{league}/match_reports`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchReport {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub p1_name: String,
    #[serde(default)]
    pub p2_name: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub p1_games: Option<i64>,
    #[serde(default)]
    pub p2_games: Option<i64>,
    #[serde(default)]
    pub gamescores: Vec<FrameScore>,
    /// `None` when the backend did not capture highlights at all, as opposed
    /// to an empty list.
    #[serde(default)]
    pub match_highlights: Option<Vec<Highlight>>,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "super::opt_string_or_number")]
    pub start: Option<String>,
}

impl MatchReport {
    pub fn is_future(&self) -> bool {
        self.status == STATUS_FUTURE
    }

    pub fn table_label(&self) -> &str {
        self.table_name
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Table TBA")
    }

    pub fn score_label(&self) -> String {
        format!(
            "{} - {}",
            self.p1_games.unwrap_or(0),
            self.p2_games.unwrap_or(0)
        )
    }

    /// Start on the room's wall clock. The backend sends either ISO strings
    /// or epoch milliseconds.
    pub fn start_time(&self, tz: Tz) -> Option<NaiveDateTime> {
        self.start
            .as_deref()
            .and_then(|raw| format::parse_timestamp(raw, tz))
    }

    pub fn time_label(&self, tz: Tz) -> String {
        self.start_time(tz)
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StandingPlayer {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Entry of `event.players` in `/event/{room_slug}/league/{league}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    #[serde(default)]
    pub player: StandingPlayer,
    #[serde(default)]
    pub matches_won: i64,
    #[serde(default)]
    pub matches_lost: i64,
    #[serde(default)]
    pub frames_won: i64,
    #[serde(default)]
    pub frames_lost: i64,
}

impl Standing {
    pub fn name(&self) -> String {
        match self.player.display_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{} {}",
                self.player.first_name.as_deref().unwrap_or_default(),
                self.player.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LeagueDetail {
    #[serde(default)]
    pub event: LeagueDetailEvent,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LeagueDetailEvent {
    #[serde(default)]
    pub players: Vec<Standing>,
}

/// Future fixtures sharing a calendar date.
#[derive(Debug, Clone)]
pub struct ScheduleDay {
    pub date: Option<NaiveDate>,
    pub matches: Vec<MatchReport>,
}

impl ScheduleDay {
    pub fn label(&self) -> String {
        self.date
            .map(format::long_date)
            .unwrap_or_else(|| "Date TBA".to_string())
    }
}

/// Played matches, in backend order.
pub fn results(matches: &[MatchReport]) -> Vec<MatchReport> {
    matches.iter().filter(|m| !m.is_future()).cloned().collect()
}

/// Future matches grouped by date, each day ordered by start then table.
/// Days follow the wall clock of `tz`. Undated fixtures come last.
pub fn schedule(matches: &[MatchReport], tz: Tz) -> Vec<ScheduleDay> {
    let mut days: BTreeMap<Option<NaiveDate>, Vec<MatchReport>> = BTreeMap::new();
    for m in matches.iter().filter(|m| m.is_future()) {
        days.entry(m.start_time(tz).map(|dt| dt.date()))
            .or_default()
            .push(m.clone());
    }

    let mut out: Vec<ScheduleDay> = days
        .into_iter()
        .map(|(date, mut matches)| {
            matches.sort_by(|a, b| {
                a.start_time(tz)
                    .cmp(&b.start_time(tz))
                    .then_with(|| a.table_label().cmp(b.table_label()))
            });
            ScheduleDay { date, matches }
        })
        .collect();

    // BTreeMap orders None first
    if out.first().is_some_and(|d| d.date.is_none()) {
        out.rotate_left(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TORONTO: Tz = chrono_tz::America::Toronto;

    fn report(id: &str, status: &str, start: &str, table: Option<&str>) -> MatchReport {
        MatchReport {
            id: id.to_string(),
            p1_name: "A".to_string(),
            p2_name: "B".to_string(),
            table_name: table.map(str::to_string),
            p1_games: None,
            p2_games: None,
            gamescores: vec![],
            match_highlights: None,
            status: status.to_string(),
            start: Some(start.to_string()),
        }
    }

    #[test]
    fn test_results_exclude_future() {
        let matches = vec![
            report("1", "Complete", "2024-05-01T19:00:00", None),
            report("2", STATUS_FUTURE, "2024-05-20T19:00:00", None),
            report("3", "InProgress", "2024-05-02T19:00:00", None),
        ];
        let ids: Vec<_> = results(&matches).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_schedule_grouping_and_order() {
        let matches = vec![
            report("1", STATUS_FUTURE, "2024-05-21T19:00:00", Some("Table 2")),
            report("2", STATUS_FUTURE, "2024-05-20T20:00:00", Some("Table 1")),
            report("3", STATUS_FUTURE, "2024-05-20T19:00:00", Some("Table 3")),
            report("4", STATUS_FUTURE, "2024-05-20T19:00:00", Some("Table 1")),
            report("5", "Complete", "2024-05-20T18:00:00", Some("Table 1")),
        ];
        let days = schedule(&matches, TORONTO);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].label(), "Monday, May 20");
        let ids: Vec<_> = days[0].matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3", "2"]);
        assert_eq!(days[1].matches[0].id, "1");
    }

    #[test]
    fn test_schedule_undated_last() {
        let mut undated = report("1", STATUS_FUTURE, "", None);
        undated.start = None;
        let matches = vec![undated, report("2", STATUS_FUTURE, "2024-05-20T19:00:00", None)];
        let days = schedule(&matches, TORONTO);

        assert_eq!(days[0].matches[0].id, "2");
        assert_eq!(days[1].label(), "Date TBA");
    }

    #[test]
    fn test_epoch_start() {
        let m: MatchReport = serde_json::from_str(
            r#"{"id": 9, "status": "Future", "start": 1716231600000, "gamescores": [[72, 10], [0, 64]]}"#,
        )
        .unwrap();
        assert_eq!(m.id, "9");
        // 2024-05-20T19:00:00Z
        assert_eq!(m.time_label(TORONTO), "15:00");
        assert_eq!(m.gamescores[1], FrameScore(0, 64));
        assert_eq!(m.table_label(), "Table TBA");
    }

    #[test]
    fn test_late_epoch_start_groups_on_local_day() {
        // 01:00 UTC on the 21st is still the 20th in Toronto
        let late = report("1", STATUS_FUTURE, "1716253200000", Some("Table 1"));
        let offset = report("2", STATUS_FUTURE, "2024-05-21T00:30:00+00:00", Some("Table 2"));
        let days = schedule(&[late, offset], TORONTO);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].label(), "Monday, May 20");
        let labels: Vec<_> = days[0].matches.iter().map(|m| m.time_label(TORONTO)).collect();
        assert_eq!(labels, vec!["20:30", "21:00"]);

        let highlight = Highlight {
            start: Some("1716253200000".to_string()),
            title: None,
            url: "https://video.test/1".to_string(),
        };
        assert_eq!(highlight.time_label(TORONTO), "21:00");
    }

    #[test]
    fn test_standing_name_fallback() {
        let s: Standing = serde_json::from_str(
            r#"{"player": {"display_name": "", "first_name": "Ronnie", "last_name": "O'Sullivan"}, "matches_won": 3}"#,
        )
        .unwrap();
        assert_eq!(s.name(), "Ronnie O'Sullivan");
        assert_eq!(s.frames_lost, 0);
    }

    #[test]
    fn test_league_label() {
        let league: League =
            serde_json::from_str(r#"{"slug": "spring", "event": {"name": null, "description": "Spring League"}}"#)
                .unwrap();
        assert_eq!(league.label(), "Spring League");

        let bare: League = serde_json::from_str(r#"{"slug": "spring"}"#).unwrap();
        assert_eq!(bare.label(), "spring");
    }
}
