use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use battleground_server::battleground::Battleground;
use battleground_server::bot::BotDirector;
use battleground_server::config::AppConfig;
use battleground_server::error::BattlegroundError;
use battleground_server::logging::setup_logging;
use battleground_server::participant::JoinRequest;
use battleground_server::rng::Rng;
use battleground_server::server_protocol::{
    error_message, match_over_message, notification_message, parse_client_message, pong_message,
    state_message, welcome_message, ParsedClientMessage,
};
use battleground_server::server_utils::{bot_name, choose_team, parse_stats_limit, sanitize_name};
use battleground_server::stats_store::PvpStatsStore;
use battleground_server::types::Team;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Parser, Debug)]
#[command(name = "battleground-server")]
struct Cli {
    #[arg(long, default_value = "battleground.toml")]
    config: PathBuf,
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Clone, Debug)]
struct Member {
    id: String,
    name: String,
    team: Team,
    connected: bool,
    reconnect_token: String,
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    participant_id: Option<String>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    config: AppConfig,
    clients: HashMap<String, ClientContext>,
    members: HashMap<String, Member>,
    active_client_by_participant: HashMap<String, String>,
    battleground: Battleground,
    director: BotDirector,
    bots_filled: bool,
    summary_sent: bool,
    instance_id: u32,
    stats_store: PvpStatsStore,
}

impl ServerState {
    fn new(config: AppConfig, stats_store: PvpStatsStore) -> Self {
        let (battleground, director) = new_match(&config, 1);
        Self {
            config,
            clients: HashMap::new(),
            members: HashMap::new(),
            active_client_by_participant: HashMap::new(),
            battleground,
            director,
            bots_filled: false,
            summary_sent: false,
            instance_id: 1,
            stats_store,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_result = AppConfig::load_from_file(&cli.config);
    let mut config = match config_result {
        Ok(config) => config,
        Err(err) => {
            setup_logging(&AppConfig::default().logging, cli.json_logs);
            error!(path = %cli.config.display(), %err, "failed to load configuration");
            return;
        }
    };
    config.apply_env_overrides();
    setup_logging(&config.logging, cli.json_logs);

    let stats_store = PvpStatsStore::new(PathBuf::from(&config.storage.stats_path));
    let static_dir = resolve_static_dir(config.server.static_dir.as_deref());
    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let tick_ms = config.server.tick_interval_ms.max(1);

    let state = Arc::new(Mutex::new(ServerState::new(config, stats_store)));
    start_tick_loop(state.clone(), tick_ms);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/pvpstats", get(pvpstats_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = static_dir {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found, serving the API only");
        app
    };

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%bind_addr, %err, "failed to bind server socket");
            return;
        }
    };

    info!(%bind_addr, tick_ms, "listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!(%err, "server runtime failed");
    }
}

fn resolve_static_dir(configured: Option<&str>) -> Option<PathBuf> {
    let from_env = std::env::var("STATIC_DIR").ok();
    configured
        .map(str::to_string)
        .into_iter()
        .chain(from_env)
        .map(PathBuf::from)
        .chain([PathBuf::from("dist/client")])
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn pvpstats_handler(
    State(state): State<SharedState>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .stats_store
            .build_response(parse_stats_limit(query.limit.as_deref())),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                participant_id: None,
            },
        );
    }
    debug!(client = %client_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    let state = &mut *guard;
    let message = match message {
        ParsedClientMessage::Hello {
            name,
            team,
            reconnect_token,
        } => {
            handle_hello(state, client_id, name, team, reconnect_token);
            return;
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(state, client_id, &pong_message(t), QueuePolicy::DisconnectOnFull);
            return;
        }
        other => other,
    };

    let Some(participant_id) = state
        .clients
        .get(client_id)
        .and_then(|ctx| ctx.participant_id.clone())
    else {
        send_to_client(
            state,
            client_id,
            &error_message("send hello first"),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    };

    let battleground = &mut state.battleground;
    let result = match message {
        ParsedClientMessage::Move { position } => {
            battleground.move_participant(&participant_id, position)
        }
        ParsedClientMessage::ClickFlag { flag } => battleground.click_flag(&participant_id, flag),
        ParsedClientMessage::AreaTrigger { trigger } => {
            battleground.handle_area_trigger(&participant_id, trigger)
        }
        ParsedClientMessage::ReleaseSpirit => {
            battleground.release_spirit(&participant_id).map(|_| ())
        }
        ParsedClientMessage::ReportKill { victim } => {
            battleground.handle_kill(&victim, Some(&participant_id))
        }
        ParsedClientMessage::Logout => {
            let result = battleground.participant_logged_out(&participant_id);
            if let Some(member) = state.members.get_mut(&participant_id) {
                member.connected = false;
            }
            result
        }
        ParsedClientMessage::Hello { .. } | ParsedClientMessage::Ping { .. } => Ok(()),
    };
    if let Err(err) = result {
        debug!(participant = %participant_id, %err, "request refused");
        send_to_client(
            state,
            client_id,
            &error_message(&err.to_string()),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

fn handle_hello(
    state: &mut ServerState,
    client_id: &str,
    requested_name: String,
    requested_team: Option<Team>,
    reconnect_token: Option<String>,
) {
    let resumed = reconnect_token
        .as_deref()
        .and_then(|token| find_participant_by_token(state, token));

    let member = match resumed.and_then(|id| state.members.get(&id).cloned()) {
        Some(member) => member,
        None => {
            let free_alliance = state.battleground.free_slots_for_team(Team::Alliance);
            let free_horde = state.battleground.free_slots_for_team(Team::Horde);
            let Some(team) = choose_team(requested_team, free_alliance, free_horde) else {
                send_to_client(
                    state,
                    client_id,
                    &error_message("battleground is full"),
                    QueuePolicy::DisconnectOnFull,
                );
                return;
            };
            Member {
                id: make_id("p"),
                name: sanitize_name(&requested_name),
                team,
                connected: true,
                reconnect_token: make_reconnect_token(),
            }
        }
    };

    if let Err(err) = enter_battleground(state, &member) {
        send_to_client(
            state,
            client_id,
            &error_message(&err.to_string()),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }
    let member = Member {
        connected: true,
        ..member
    };
    state.members.insert(member.id.clone(), member.clone());
    bind_client_to_participant(state, client_id, &member.id);
    info!(participant = %member.id, name = %member.name, team = ?member.team, "participant joined");

    let world_states = state.battleground.initial_world_states();
    let welcome = welcome_message(
        &member.id,
        &member.reconnect_token,
        member.team,
        state.battleground.kind(),
        &world_states,
    );
    send_to_client(state, client_id, &welcome, QueuePolicy::DisconnectOnFull);
    let snapshot = state.battleground.snapshot(false);
    send_to_client(
        state,
        client_id,
        &state_message(&snapshot),
        QueuePolicy::DisconnectOnFull,
    );
}

/// Known participants come back online; new ones take an invitation first.
fn enter_battleground(
    state: &mut ServerState,
    member: &Member,
) -> Result<(), BattlegroundError> {
    let join = JoinRequest::player(&member.id, &member.name, member.team);
    if state.battleground.participant(&member.id).is_none() {
        state.battleground.invite(member.team)?;
    }
    state.battleground.add_participant(join)?;
    fill_bots(state);
    Ok(())
}

fn fill_bots(state: &mut ServerState) {
    if state.bots_filled {
        return;
    }
    state.bots_filled = true;
    for team in Team::ALL {
        for index in 0..state.config.server.bot_fill {
            let id = make_id("bot");
            let join = JoinRequest::bot(&id, bot_name(team, index), team);
            if let Err(err) = state.battleground.add_participant(join) {
                warn!(bot = %id, %err, "failed to add bot");
            }
        }
    }
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    let Some(context) = state.clients.remove(client_id) else {
        return;
    };
    let Some(participant_id) = context.participant_id else {
        return;
    };
    if state
        .active_client_by_participant
        .get(&participant_id)
        .map(|active| active != client_id)
        .unwrap_or(true)
    {
        return;
    }
    state.active_client_by_participant.remove(&participant_id);

    if let Some(member) = state.members.get_mut(&participant_id) {
        member.connected = false;
    }
    if state.battleground.participant(&participant_id).is_some() {
        if let Err(err) = state.battleground.participant_logged_out(&participant_id) {
            warn!(participant = %participant_id, %err, "logout on disconnect failed");
        }
    }
    debug!(client = %client_id, participant = %participant_id, "client disconnected");
}

fn bind_client_to_participant(state: &mut ServerState, client_id: &str, participant_id: &str) {
    if let Some(old_client_id) = state
        .active_client_by_participant
        .get(participant_id)
        .cloned()
    {
        if old_client_id != client_id {
            if let Some(old_client) = state.clients.get_mut(&old_client_id) {
                old_client.participant_id = None;
                let _ = old_client.tx.try_send(OutboundMessage::Close {
                    code: 4001,
                    reason: "superseded by new connection".to_string(),
                });
            }
        }
    }

    if let Some(ctx) = state.clients.get_mut(client_id) {
        ctx.participant_id = Some(participant_id.to_string());
    }
    state
        .active_client_by_participant
        .insert(participant_id.to_string(), client_id.to_string());
}

fn start_tick_loop(state: SharedState, tick_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_match(&mut guard, tick_ms);
        }
    });
}

fn tick_match(state: &mut ServerState, tick_ms: u64) {
    state.director.update(&mut state.battleground, tick_ms);
    state.battleground.update(tick_ms);

    for record in state.battleground.take_records() {
        if let Err(err) = state.stats_store.apply(record) {
            error!(%err, "failed to persist battleground record");
        }
    }

    for notification in state.battleground.drain_notifications() {
        let message = notification_message(&notification);
        let recipients: Vec<String> = state
            .active_client_by_participant
            .iter()
            .filter(|(participant_id, _)| {
                state
                    .members
                    .get(*participant_id)
                    .is_some_and(|member| notification.audience.includes(&member.id, member.team))
            })
            .map(|(_, client_id)| client_id.clone())
            .collect();
        for client_id in recipients {
            send_to_client(state, &client_id, &message, QueuePolicy::DropOnFull);
        }
    }

    let snapshot = state.battleground.snapshot(false);
    broadcast(state, &state_message(&snapshot), QueuePolicy::DropOnFull);

    if state.battleground.is_ended() && !state.summary_sent {
        state.summary_sent = true;
        let summary = state.battleground.summary();
        broadcast(state, &match_over_message(&summary), QueuePolicy::DisconnectOnFull);
    }

    if state.summary_sent && state.battleground.should_delete() {
        restart_match(state);
    }
}

/// Replaces a finished match and brings connected members into the new one.
fn restart_match(state: &mut ServerState) {
    state.instance_id += 1;
    let (battleground, director) = new_match(&state.config, state.instance_id);
    state.battleground = battleground;
    state.director = director;
    state.bots_filled = false;
    state.summary_sent = false;
    info!(instance = state.instance_id, "new battleground ready");

    let connected: Vec<Member> = state
        .members
        .values()
        .filter(|member| member.connected)
        .cloned()
        .collect();
    state.members.retain(|_, member| member.connected);
    for member in connected {
        if let Err(err) = enter_battleground(state, &member) {
            warn!(participant = %member.id, %err, "could not rejoin new battleground");
            continue;
        }
        if let Some(client_id) = state.active_client_by_participant.get(&member.id).cloned() {
            let world_states = state.battleground.initial_world_states();
            let welcome = welcome_message(
                &member.id,
                &member.reconnect_token,
                member.team,
                state.battleground.kind(),
                &world_states,
            );
            send_to_client(state, &client_id, &welcome, QueuePolicy::DisconnectOnFull);
        }
    }
}

fn new_match(config: &AppConfig, instance_id: u32) -> (Battleground, BotDirector) {
    let settings = &config.battleground;
    let mut battleground = Battleground::new(settings.kind, instance_id, settings.to_options());
    if let Err(err) = battleground.start() {
        error!(instance = instance_id, %err, "failed to start battleground");
    }
    let seed = rand::rng().random::<u32>();
    let director = BotDirector::new(Rng::for_match(settings.kind, instance_id, seed));
    (battleground, director)
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if !can_receive_broadcast(state, client_id, client) {
            continue;
        }
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client_internal(state, &client_id);
    }
}

fn can_receive_broadcast(state: &ServerState, client_id: &str, client: &ClientContext) -> bool {
    let Some(participant_id) = client.participant_id.as_ref() else {
        return false;
    };
    state
        .active_client_by_participant
        .get(participant_id)
        .map(|id| id.as_str())
        == Some(client_id)
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &error_message(message),
        QueuePolicy::DisconnectOnFull,
    );
}

fn find_participant_by_token(state: &ServerState, token: &str) -> Option<String> {
    state
        .members
        .values()
        .find(|member| member.reconnect_token == token)
        .map(|member| member.id.clone())
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn make_reconnect_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
