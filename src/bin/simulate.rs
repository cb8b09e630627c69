use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use battleground_server::battleground::{Battleground, BattlegroundOptions};
use battleground_server::bot::BotDirector;
use battleground_server::config::LoggingSettings;
use battleground_server::constants::{eye, warsong, TICK_MS};
use battleground_server::logging::setup_logging;
use battleground_server::participant::JoinRequest;
use battleground_server::rng::Rng;
use battleground_server::server_utils::bot_name;
use battleground_server::types::{
    BattlegroundKind, MatchEvent, MatchSnapshot, ObjectiveView, ScoreboardEntry, Team,
};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

const SAFETY_LIMIT_MESSAGE: &str = "tick safety limit exceeded";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// `ws`, `ey`, or omit for one scenario of each.
    #[arg(long)]
    kind: Option<String>,
    #[arg(long)]
    bots: Option<i32>,
    #[arg(long)]
    minutes: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    kind: BattlegroundKind,
    #[serde(rename = "botsPerTeam")]
    bots_per_team: usize,
    /// Safety limit on match time.
    minutes: i32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    kind: BattlegroundKind,
    seed: u32,
    #[serde(rename = "botsPerTeam")]
    bots_per_team: usize,
    winner: Option<Team>,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "allianceScore")]
    alliance_score: u32,
    #[serde(rename = "hordeScore")]
    horde_score: u32,
    #[serde(rename = "flagCaptures")]
    flag_captures: u32,
    #[serde(rename = "flagReturns")]
    flag_returns: u32,
    kills: u32,
    #[serde(rename = "spiritHeals")]
    spirit_heals: u32,
    #[serde(rename = "honorAwarded")]
    honor_awarded: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

/// Every anomaly occurrence by tick, plus each distinct message once.
#[derive(Debug, Default)]
struct AnomalyLog {
    records: Vec<AnomalyRecord>,
    distinct: Vec<String>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn record(&mut self, tick: u64, message: impl Into<String>) {
        let message = message.into();
        if self.seen.insert(message.clone()) {
            self.distinct.push(message.clone());
        }
        self.records.push(AnomalyRecord { tick, message });
    }
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "winnerCounts")]
    winner_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

impl RunSummary {
    fn collect(
        match_id: String,
        started_at_ms: u64,
        finished_at_ms: u64,
        runs: Vec<ScenarioRunResult>,
    ) -> Self {
        let mut winner_counts = BTreeMap::new();
        let mut total_duration_ms = 0u64;
        let mut anomaly_count = 0usize;
        let mut scenarios = Vec::with_capacity(runs.len());
        for run in runs {
            *winner_counts.entry(winner_key(run.result.winner)).or_insert(0) += 1;
            total_duration_ms += run.result.duration_ms;
            anomaly_count += run.anomaly_records.len();
            scenarios.push(run.result);
        }
        let average_duration_ms = match scenarios.len() {
            0 => 0,
            count => total_duration_ms / count as u64,
        };
        Self {
            match_id,
            started_at_ms,
            finished_at_ms,
            scenario_count: scenarios.len(),
            anomaly_count,
            average_duration_ms,
            winner_counts,
            scenarios,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&LoggingSettings::default(), cli.json_logs);

    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(&scenarios, run_started_at_ms));
    let mut runs = Vec::with_capacity(scenarios.len());

    for scenario in &scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            kind = ?scenario.kind,
            bots_per_team = scenario.bots_per_team,
            "scenario started"
        );
        let run = run_scenario(scenario);
        for anomaly in &run.anomaly_records {
            warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            tick = run.finished_tick,
            winner = ?run.result.winner,
            duration_ms = run.result.duration_ms,
            "scenario finished"
        );
        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(%err, "failed to encode scenario result"),
        }
        runs.push(run);
    }

    let has_anomaly = runs.iter().any(|run| !run.result.anomalies.is_empty());
    let summary = RunSummary::collect(match_id.clone(), run_started_at_ms, now_ms(), runs);

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), %err, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_duration_ms = summary.average_duration_ms,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let options = BattlegroundOptions {
        min_players_per_team: 1,
        max_players_per_team: scenario.bots_per_team as u32 + 1,
        ..BattlegroundOptions::default()
    };
    let mut battleground = Battleground::new(scenario.kind, 1, options);
    let mut director = BotDirector::new(Rng::for_match(scenario.kind, 1, scenario.seed));
    let mut anomalies = AnomalyLog::default();

    if let Err(err) = battleground.start() {
        anomalies.record(0, format!("start refused: {err}"));
    }
    for team in Team::ALL {
        // idle humans keep the match from closing as bots-only
        let anchor = format!("anchor_{team:?}").to_lowercase();
        let mut joins = vec![JoinRequest::player(&anchor, "Anchor", team)];
        for index in 0..scenario.bots_per_team {
            let id = format!("bot_{}_{}", team.index(), index + 1);
            joins.push(JoinRequest::bot(id, bot_name(team, index), team));
        }
        for join in joins {
            if let Err(err) = battleground.add_participant(join) {
                anomalies.record(0, format!("join refused: {err}"));
            }
        }
    }

    let mut spirit_heals = 0;
    let mut honor_awarded = 0;
    let mut last_tick = 0u64;
    let tick_limit = (scenario.minutes as u64 * 60_000 + 120_000) / TICK_MS;

    for step in 0.. {
        if battleground.is_ended() {
            break;
        }
        if step >= tick_limit {
            anomalies.record(last_tick, SAFETY_LIMIT_MESSAGE);
            break;
        }
        director.update(&mut battleground, TICK_MS);
        battleground.update(TICK_MS);
        let snapshot = battleground.snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&snapshot) {
            anomalies.record(snapshot.tick, message);
        }
        for notification in &snapshot.notifications {
            match notification.event {
                MatchEvent::SpiritHeal { .. } => spirit_heals += 1,
                MatchEvent::HonorAwarded { amount, .. } => honor_awarded += amount,
                _ => {}
            }
        }
    }
    // rewards paid while ending the match are still buffered
    for notification in battleground.drain_notifications() {
        if let MatchEvent::HonorAwarded { amount, .. } = notification.event {
            honor_awarded += amount;
        }
    }

    let summary = battleground.summary();
    let total = |column: fn(&ScoreboardEntry) -> u32| {
        summary.scoreboard.iter().map(column).sum::<u32>()
    };

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            kind: scenario.kind,
            seed: scenario.seed,
            bots_per_team: scenario.bots_per_team,
            winner: summary.winner,
            duration_ms: summary.duration_ms,
            alliance_score: summary.team_scores.alliance,
            horde_score: summary.team_scores.horde,
            flag_captures: total(|entry| entry.flag_captures),
            flag_returns: total(|entry| entry.flag_returns),
            kills: total(|entry| entry.killing_blows),
            spirit_heals,
            honor_awarded,
            anomalies: anomalies.distinct,
        },
        anomaly_records: anomalies.records,
        finished_tick: last_tick,
    }
}

fn collect_snapshot_anomalies(snapshot: &MatchSnapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    let max_score = match snapshot.kind {
        BattlegroundKind::WarsongGulch => warsong::MAX_TEAM_SCORE,
        BattlegroundKind::EyeOfTheStorm => eye::MAX_TEAM_SCORE,
    };
    for team in Team::ALL {
        let score = snapshot.team_scores.get(team);
        if score > max_score {
            anomalies.push(format!("{team:?} score above maximum: {score}"));
        }
    }

    let known = |id: &str| snapshot.participants.iter().any(|participant| participant.id == id);
    let flags = match &snapshot.objective {
        ObjectiveView::CaptureTheFlag { flags, .. } => flags.clone(),
        ObjectiveView::TerritoryControl { flag, points } => {
            for point in points {
                if !(0..=100).contains(&point.bar) {
                    anomalies.push(format!("{} bar out of range: {}", point.name, point.bar));
                }
            }
            vec![flag.clone()]
        }
    };
    for flag in &flags {
        if let Some(carrier) = flag.carrier.as_deref() {
            if !known(carrier) {
                anomalies.push(format!("flag carried by unknown participant: {carrier}"));
            }
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(now_ms) as u32;
    let bots_per_team = cli.bots.unwrap_or(4).clamp(1, 10) as usize;
    let minutes = cli.minutes.unwrap_or(40).clamp(1, 120);
    let scenario = |kind: BattlegroundKind, seed: u32| Scenario {
        name: format!("{}-bots{bots_per_team}", kind_key(kind)),
        kind,
        bots_per_team,
        minutes,
        seed,
    };

    match cli.kind.as_deref().and_then(BattlegroundKind::parse) {
        Some(kind) => vec![scenario(kind, seed)],
        None => vec![
            scenario(BattlegroundKind::WarsongGulch, seed),
            scenario(BattlegroundKind::EyeOfTheStorm, seed.wrapping_add(1)),
        ],
    }
}

fn kind_key(kind: BattlegroundKind) -> &'static str {
    match kind {
        BattlegroundKind::WarsongGulch => "ws",
        BattlegroundKind::EyeOfTheStorm => "ey",
    }
}

/// `sim-<kinds>-<first seed>-<timestamp>`, e.g. `sim-ws-ey-7-1700000000000`.
fn default_match_id(scenarios: &[Scenario], timestamp_ms: u64) -> String {
    let kinds: Vec<&str> = scenarios
        .iter()
        .map(|scenario| kind_key(scenario.kind))
        .collect();
    let seed = scenarios.first().map_or(0, |scenario| scenario.seed);
    format!("sim-{}-{seed}-{timestamp_ms}", kinds.join("-"))
}

fn winner_key(winner: Option<Team>) -> String {
    match winner {
        Some(Team::Alliance) => "alliance",
        Some(Team::Horde) => "horde",
        None => "none",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario(kind: BattlegroundKind, minutes: i32) -> Scenario {
        Scenario {
            name: format!("{}-bots2", kind_key(kind)),
            kind,
            bots_per_team: 2,
            minutes,
            seed: 9,
        }
    }

    fn make_run(
        kind: BattlegroundKind,
        winner: Option<Team>,
        duration_ms: u64,
        anomalies: &[(u64, &str)],
    ) -> ScenarioRunResult {
        let mut log = AnomalyLog::default();
        for (tick, message) in anomalies {
            log.record(*tick, *message);
        }
        let (alliance_score, horde_score) = match (kind, winner) {
            (BattlegroundKind::WarsongGulch, Some(Team::Alliance)) => (3, 1),
            (BattlegroundKind::WarsongGulch, Some(Team::Horde)) => (0, 3),
            (BattlegroundKind::EyeOfTheStorm, Some(Team::Alliance)) => (1600, 1210),
            (BattlegroundKind::EyeOfTheStorm, Some(Team::Horde)) => (870, 1600),
            (_, None) => (0, 0),
        };
        ScenarioRunResult {
            result: ScenarioResultLine {
                scenario: format!("{}-bots2", kind_key(kind)),
                kind,
                seed: 9,
                bots_per_team: 2,
                winner,
                duration_ms,
                alliance_score,
                horde_score,
                flag_captures: alliance_score.min(3) + horde_score.min(3),
                flag_returns: 1,
                kills: 4,
                spirit_heals: 2,
                honor_awarded: 310,
                anomalies: log.distinct,
            },
            anomaly_records: log.records,
            finished_tick: duration_ms / TICK_MS,
        }
    }

    #[test]
    fn default_match_id_names_kinds_and_first_seed() {
        let scenarios = vec![
            make_scenario(BattlegroundKind::WarsongGulch, 40),
            make_scenario(BattlegroundKind::EyeOfTheStorm, 40),
        ];
        assert_eq!(
            default_match_id(&scenarios, 1_700_000_000_000),
            "sim-ws-ey-9-1700000000000"
        );
        assert_eq!(default_match_id(&[], 5), "sim--0-5");
    }

    #[test]
    fn summary_counts_winners_and_anomalies() {
        let runs = vec![
            // warsong decided by the clock, eye won on resources
            make_run(
                BattlegroundKind::WarsongGulch,
                None,
                warsong::FORCED_END_MS,
                &[(32_400, SAFETY_LIMIT_MESSAGE)],
            ),
            make_run(BattlegroundKind::EyeOfTheStorm, Some(Team::Horde), 900_000, &[]),
        ];
        let summary = RunSummary::collect("sim-ws-ey-9-1".to_string(), 1, 2, runs);

        assert_eq!(summary.scenario_count, 2);
        assert_eq!(summary.anomaly_count, 1);
        assert_eq!(
            summary.average_duration_ms,
            (warsong::FORCED_END_MS + 900_000) / 2
        );
        assert_eq!(summary.winner_counts.get("none"), Some(&1));
        assert_eq!(summary.winner_counts.get("horde"), Some(&1));
        assert_eq!(summary.winner_counts.get("alliance"), None);
        assert_eq!(summary.scenarios[1].horde_score, eye::MAX_TEAM_SCORE);
    }

    #[test]
    fn empty_run_summary_has_zero_average() {
        let summary = RunSummary::collect("sim--0-1".to_string(), 1, 1, Vec::new());
        assert_eq!(summary.average_duration_ms, 0);
        assert!(summary.winner_counts.is_empty());
    }

    #[test]
    fn write_summary_fails_without_parent_directory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let target = dir.path().join("runs").join("summary.json");
        let summary = RunSummary::collect(
            "sim-ey-9-1".to_string(),
            1,
            2,
            vec![make_run(BattlegroundKind::EyeOfTheStorm, Some(Team::Alliance), 780_000, &[])],
        );
        assert!(write_summary(&target, &summary).is_err());

        let target = dir.path().join("summary.json");
        write_summary(&target, &summary).expect("write summary");
        let written = std::fs::read_to_string(&target).expect("read summary");
        let value: serde_json::Value = serde_json::from_str(&written).expect("summary json");
        assert_eq!(value["scenarios"][0]["allianceScore"], 1600);
        assert_eq!(value["winnerCounts"]["alliance"], 1);
    }

    #[test]
    fn anomaly_log_keeps_every_tick_but_each_message_once() {
        let mut log = AnomalyLog::default();
        log.record(120, "Alliance score above maximum: 4");
        log.record(121, "Alliance score above maximum: 4");
        log.record(121, "fel_reaver bar out of range: 101");

        assert_eq!(
            log.distinct,
            vec![
                "Alliance score above maximum: 4".to_string(),
                "fel_reaver bar out of range: 101".to_string(),
            ]
        );
        assert_eq!(log.records.len(), 3);
        assert_eq!(log.records[1].tick, 121);
    }

    #[test]
    fn kind_flag_selects_a_single_scenario() {
        let cli = Cli::parse_from(["simulate", "--kind", "ey", "--bots", "30", "--seed", "7"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].kind, BattlegroundKind::EyeOfTheStorm);
        assert_eq!(scenarios[0].bots_per_team, 10);
        assert_eq!(scenarios[0].seed, 7);
        assert_eq!(scenarios[0].name, "ey-bots10");

        let cli = Cli::parse_from(["simulate", "--seed", "7"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].seed, 8);
    }

    #[test]
    fn short_warsong_run_stops_at_the_safety_limit() {
        let run = run_scenario(&make_scenario(BattlegroundKind::WarsongGulch, 1));
        assert_eq!(run.result.winner, None);
        assert_eq!(run.result.anomalies, vec![SAFETY_LIMIT_MESSAGE.to_string()]);
        assert!(run.finished_tick > 0);
    }

    #[test]
    fn warsong_run_always_finishes_by_the_time_limit() {
        let run = run_scenario(&make_scenario(BattlegroundKind::WarsongGulch, 40));
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.duration_ms <= warsong::FORCED_END_MS + 180_000);
    }
}
