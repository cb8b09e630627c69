use crate::types::Team;

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

pub fn parse_stats_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
}

/// Honors the requested team while it has room, otherwise the team with
/// more free slots; Alliance wins ties.
pub fn choose_team(requested: Option<Team>, free_alliance: u32, free_horde: u32) -> Option<Team> {
    let free = |team: Team| match team {
        Team::Alliance => free_alliance,
        Team::Horde => free_horde,
    };
    if let Some(team) = requested.filter(|team| free(*team) > 0) {
        return Some(team);
    }
    if free_alliance == 0 && free_horde == 0 {
        return None;
    }
    if free_horde > free_alliance {
        Some(Team::Horde)
    } else {
        Some(Team::Alliance)
    }
}

pub fn bot_name(team: Team, index: usize) -> String {
    let prefix = match team {
        Team::Alliance => "Sentinel",
        Team::Horde => "Outrider",
    };
    format!("{prefix} {}", index + 1)
}

pub fn participant_order_key(participant_id: &str) -> u64 {
    participant_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}
