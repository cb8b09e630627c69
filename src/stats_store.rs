use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::types::Team;

const STORE_VERSION: u8 = 1;

/// Statement identifiers understood by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    SelectPvpStatsMaxId,
    InsertPvpStatsBattleground,
    InsertPvpStatsPlayer,
    InsertDeserterTrack,
}

/// Faction code persisted for a match winner.
pub fn pvp_team_code(winner: Option<Team>) -> u8 {
    match winner {
        Some(Team::Horde) => 0,
        Some(Team::Alliance) => 1,
        None => 2,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatsRow {
    #[serde(rename = "participantId")]
    pub participant_id: String,
    pub name: String,
    pub winner: bool,
    #[serde(rename = "killingBlows")]
    pub killing_blows: u32,
    pub deaths: u32,
    #[serde(rename = "honorableKills")]
    pub honorable_kills: u32,
    #[serde(rename = "bonusHonor")]
    pub bonus_honor: u32,
    #[serde(rename = "damageDone")]
    pub damage_done: u32,
    #[serde(rename = "healingDone")]
    pub healing_done: u32,
    pub attrs: [u32; 5],
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub winner: Option<Team>,
    pub bracket_id: u8,
    pub type_id: u8,
    pub players: Vec<PlayerStatsRow>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesertionType {
    Offline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeserterRecord {
    pub participant_id: String,
    pub name: String,
    pub desertion_type: DesertionType,
}

/// Pending write produced by a match.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreRecord {
    Match(MatchRecord),
    Deserter(DeserterRecord),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredBattleground {
    id: u64,
    #[serde(rename = "winnerFaction")]
    winner_faction: u8,
    #[serde(rename = "bracketId")]
    bracket_id: u8,
    #[serde(rename = "typeId")]
    type_id: u8,
    date: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredPlayer {
    #[serde(rename = "battlegroundId")]
    battleground_id: u64,
    #[serde(flatten)]
    row: PlayerStatsRow,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredDeserter {
    #[serde(rename = "participantId")]
    participant_id: String,
    name: String,
    #[serde(rename = "type")]
    desertion_type: DesertionType,
    date: String,
}

#[derive(Debug, Serialize)]
struct StoreFile<'a> {
    version: u8,
    battlegrounds: &'a [StoredBattleground],
    players: &'a [StoredPlayer],
    deserters: &'a [StoredDeserter],
}

#[derive(Debug, Deserialize)]
struct StoreFileRaw {
    version: u8,
    #[serde(default)]
    battlegrounds: Vec<serde_json::Value>,
    #[serde(default)]
    players: Vec<serde_json::Value>,
    #[serde(default)]
    deserters: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecentMatch {
    pub id: u64,
    pub winner: Option<Team>,
    #[serde(rename = "bracketId")]
    pub bracket_id: u8,
    #[serde(rename = "typeId")]
    pub type_id: u8,
    pub date: String,
    pub participants: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerAggregate {
    pub name: String,
    pub matches: u64,
    pub wins: u64,
    #[serde(rename = "killingBlows")]
    pub killing_blows: u64,
    #[serde(rename = "honorableKills")]
    pub honorable_kills: u64,
    #[serde(rename = "bonusHonor")]
    pub bonus_honor: u64,
    pub deserts: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PvpStatsResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub matches: Vec<RecentMatch>,
    pub players: Vec<PlayerAggregate>,
}

/// JSON-file-backed store for match statistics and deserter tracking.
pub struct PvpStatsStore {
    file_path: PathBuf,
    battlegrounds: Vec<StoredBattleground>,
    players: Vec<StoredPlayer>,
    deserters: Vec<StoredDeserter>,
}

impl PvpStatsStore {
    pub fn new(file_path: PathBuf) -> Self {
        let mut store = Self {
            file_path,
            battlegrounds: Vec::new(),
            players: Vec::new(),
            deserters: Vec::new(),
        };
        store.load();
        store
    }

    pub fn select_max_id(&self) -> u64 {
        debug!(statement = ?Statement::SelectPvpStatsMaxId, "store query");
        self.battlegrounds.iter().map(|row| row.id).max().unwrap_or(0)
    }

    /// Executes the statements behind `record` and persists the file.
    /// Returns the id assigned to a match row.
    pub fn apply(&mut self, record: StoreRecord) -> Result<Option<u64>, StoreError> {
        let date = now_iso();
        let assigned = match record {
            StoreRecord::Match(record) => {
                let id = self.select_max_id() + 1;
                debug!(statement = ?Statement::InsertPvpStatsBattleground, id, "store insert");
                self.battlegrounds.push(StoredBattleground {
                    id,
                    winner_faction: pvp_team_code(record.winner),
                    bracket_id: record.bracket_id,
                    type_id: record.type_id,
                    date,
                });
                for row in record.players {
                    debug!(statement = ?Statement::InsertPvpStatsPlayer, id, participant = %row.participant_id, "store insert");
                    self.players.push(StoredPlayer {
                        battleground_id: id,
                        row,
                    });
                }
                Some(id)
            }
            StoreRecord::Deserter(record) => {
                debug!(statement = ?Statement::InsertDeserterTrack, participant = %record.participant_id, "store insert");
                self.deserters.push(StoredDeserter {
                    participant_id: record.participant_id,
                    name: record.name,
                    desertion_type: record.desertion_type,
                    date,
                });
                None
            }
        };
        self.save()?;
        Ok(assigned)
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> PvpStatsResponse {
        let limit = requested_limit.unwrap_or(10).clamp(1, 100);
        PvpStatsResponse {
            generated_at_iso: now_iso(),
            matches: self.recent_matches(limit),
            players: self.top_players(limit),
        }
    }

    fn recent_matches(&self, limit: usize) -> Vec<RecentMatch> {
        let mut participants = HashMap::<u64, usize>::new();
        for player in &self.players {
            *participants.entry(player.battleground_id).or_insert(0) += 1;
        }
        let mut matches: Vec<RecentMatch> = self
            .battlegrounds
            .iter()
            .map(|row| RecentMatch {
                id: row.id,
                winner: team_from_code(row.winner_faction),
                bracket_id: row.bracket_id,
                type_id: row.type_id,
                date: row.date.clone(),
                participants: participants.get(&row.id).copied().unwrap_or(0),
            })
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));
        matches.truncate(limit);
        matches
    }

    fn top_players(&self, limit: usize) -> Vec<PlayerAggregate> {
        let mut aggregates = HashMap::<String, PlayerAggregate>::new();
        for player in &self.players {
            let key = player_key(&player.row.name);
            if key.is_empty() {
                continue;
            }
            let entry = aggregates
                .entry(key)
                .or_insert_with(|| empty_aggregate(&player.row.name));
            entry.matches += 1;
            if player.row.winner {
                entry.wins += 1;
            }
            entry.killing_blows += player.row.killing_blows as u64;
            entry.honorable_kills += player.row.honorable_kills as u64;
            entry.bonus_honor += player.row.bonus_honor as u64;
        }
        for deserter in &self.deserters {
            let key = player_key(&deserter.name);
            if key.is_empty() {
                continue;
            }
            aggregates
                .entry(key)
                .or_insert_with(|| empty_aggregate(&deserter.name))
                .deserts += 1;
        }

        let mut entries: Vec<PlayerAggregate> = aggregates.into_values().collect();
        entries.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then_with(|| b.honorable_kills.cmp(&a.honorable_kills))
                .then_with(|| a.deserts.cmp(&b.deserts))
                .then_with(|| cmp_name(&a.name, &b.name))
        });
        entries.truncate(limit);
        entries
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = StoreFile {
            version: STORE_VERSION,
            battlegrounds: &self.battlegrounds,
            players: &self.players,
            deserters: &self.deserters,
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text)?;
        Ok(())
    }

    fn load(&mut self) {
        let path = self.file_path.clone();
        let Some(raw) = read_raw(&path) else {
            return;
        };
        self.battlegrounds = parse_rows(raw.battlegrounds, "battleground", &path);
        self.players = parse_rows(raw.players, "player", &path);
        self.deserters = parse_rows(raw.deserters, "deserter", &path);
    }
}

fn read_raw(path: &Path) -> Option<StoreFileRaw> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read stats store");
            }
            return None;
        }
    };
    match serde_json::from_str::<StoreFileRaw>(&text) {
        Ok(raw) if raw.version == STORE_VERSION => Some(raw),
        Ok(raw) => {
            warn!(path = %path.display(), version = raw.version, "unsupported stats store version");
            None
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse stats store");
            None
        }
    }
}

fn parse_rows<T: DeserializeOwned>(values: Vec<serde_json::Value>, label: &str, path: &Path) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(row) => Some(row),
            Err(error) => {
                warn!(path = %path.display(), label, index, %error, "skipping malformed row");
                None
            }
        })
        .collect()
}

fn team_from_code(code: u8) -> Option<Team> {
    match code {
        0 => Some(Team::Horde),
        1 => Some(Team::Alliance),
        _ => None,
    }
}

fn empty_aggregate(name: &str) -> PlayerAggregate {
    PlayerAggregate {
        name: name.trim().to_string(),
        matches: 0,
        wins: 0,
        killing_blows: 0,
        honorable_kills: 0,
        bonus_honor: 0,
        deserts: 0,
    }
}

fn player_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn cmp_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(id: &str, name: &str, winner: bool, kills: u32) -> PlayerStatsRow {
        PlayerStatsRow {
            participant_id: id.to_string(),
            name: name.to_string(),
            winner,
            killing_blows: kills,
            deaths: 1,
            honorable_kills: kills * 2,
            bonus_honor: 100,
            damage_done: 0,
            healing_done: 0,
            attrs: [1, 0, 0, 0, 0],
        }
    }

    fn make_match(winner: Option<Team>, players: Vec<PlayerStatsRow>) -> StoreRecord {
        StoreRecord::Match(MatchRecord {
            winner,
            bracket_id: 8,
            type_id: 2,
            players,
        })
    }

    #[test]
    fn match_rows_get_sequential_ids() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut store = PvpStatsStore::new(dir.path().join("stats.json"));
        assert_eq!(store.select_max_id(), 0);

        let first = store
            .apply(make_match(Some(Team::Alliance), vec![make_row("p1", "Alice", true, 3)]))
            .expect("apply first");
        let second = store
            .apply(make_match(None, vec![make_row("p1", "Alice", false, 1)]))
            .expect("apply second");
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(store.select_max_id(), 2);
    }

    #[test]
    fn records_survive_reload() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("stats.json");
        {
            let mut store = PvpStatsStore::new(path.clone());
            store
                .apply(make_match(
                    Some(Team::Horde),
                    vec![
                        make_row("p1", "Alice", false, 2),
                        make_row("p2", "Bob", true, 5),
                    ],
                ))
                .expect("apply match");
            store
                .apply(StoreRecord::Deserter(DeserterRecord {
                    participant_id: "p3".to_string(),
                    name: "Carol".to_string(),
                    desertion_type: DesertionType::Offline,
                }))
                .expect("apply deserter");
        }

        let store = PvpStatsStore::new(path);
        let response = store.build_response(None);
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].winner, Some(Team::Horde));
        assert_eq!(response.matches[0].participants, 2);
        assert_eq!(response.players[0].name, "Bob");
        assert_eq!(response.players[0].wins, 1);
        let carol = response
            .players
            .iter()
            .find(|entry| entry.name == "Carol")
            .expect("carol aggregated");
        assert_eq!(carol.deserts, 1);
        assert_eq!(carol.matches, 0);
    }

    #[test]
    fn aggregates_merge_case_insensitive_names() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut store = PvpStatsStore::new(dir.path().join("stats.json"));
        store
            .apply(make_match(Some(Team::Alliance), vec![make_row("p1", "Alice", true, 1)]))
            .expect("apply");
        store
            .apply(make_match(Some(Team::Alliance), vec![make_row("p9", " alice ", true, 1)]))
            .expect("apply");
        let response = store.build_response(Some(10));
        assert_eq!(response.players.len(), 1);
        assert_eq!(response.players[0].matches, 2);
        assert_eq!(response.players[0].honorable_kills, 4);
    }

    #[test]
    fn load_skips_malformed_rows() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("stats.json");
        let raw = r#"{
  "version": 1,
  "battlegrounds": [
    { "id": 4, "winnerFaction": 1, "bracketId": 8, "typeId": 7, "date": "2024-01-01T00:00:00.000Z" },
    { "id": "broken" }
  ],
  "players": [],
  "deserters": [ { "participantId": "x" } ]
}"#;
        fs::write(&path, raw).expect("write file");

        let store = PvpStatsStore::new(path);
        assert_eq!(store.select_max_id(), 4);
        let response = store.build_response(Some(10));
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].type_id, 7);
        assert!(response.players.is_empty());
    }

    #[test]
    fn unsupported_version_starts_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("stats.json");
        fs::write(&path, r#"{ "version": 9, "battlegrounds": [] }"#).expect("write file");
        let store = PvpStatsStore::new(path);
        assert_eq!(store.select_max_id(), 0);
    }

    #[test]
    fn response_limit_is_clamped() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut store = PvpStatsStore::new(dir.path().join("stats.json"));
        for idx in 0..3 {
            store
                .apply(make_match(
                    Some(Team::Alliance),
                    vec![make_row(&format!("p{idx}"), &format!("P{idx}"), true, idx)],
                ))
                .expect("apply");
        }
        assert_eq!(store.build_response(Some(0)).matches.len(), 1);
        assert_eq!(store.build_response(Some(2)).players.len(), 2);
        let all = store.build_response(Some(999));
        assert_eq!(all.matches.len(), 3);
        assert_eq!(all.matches[0].id, 3);
    }

    #[test]
    fn winner_codes_follow_faction_order() {
        assert_eq!(pvp_team_code(Some(Team::Horde)), 0);
        assert_eq!(pvp_team_code(Some(Team::Alliance)), 1);
        assert_eq!(pvp_team_code(None), 2);
        assert_eq!(team_from_code(2), None);
    }
}
