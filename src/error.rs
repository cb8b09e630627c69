/// Refusals returned by match operations the caller has to handle.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BattlegroundError {
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("participant already in match: {0}")]
    AlreadyPresent(String),

    #[error("no free slot for team {0:?}")]
    MatchFull(crate::types::Team),

    #[error("operation not allowed while {0:?}")]
    WrongStatus(crate::types::MatchStatus),

    #[error("unknown area trigger: {0}")]
    UnknownTrigger(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
