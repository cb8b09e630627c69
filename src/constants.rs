use crate::types::Team;

pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const START_DELAY_TWO_MINUTES_MS: i64 = 120_000;
pub const START_DELAY_ONE_MINUTE_MS: i64 = 60_000;
pub const START_DELAY_HALF_MINUTE_MS: i64 = 30_000;
pub const START_DELAY_NONE_MS: i64 = 0;

pub const RESURRECTION_INTERVAL_MS: u64 = 30_000;
pub const RESURRECT_DELAY_MS: u64 = 500;
pub const TIME_TO_AUTOREMOVE_MS: i64 = 120_000;
pub const MAX_OFFLINE_TIME_MS: u64 = 300_000;
pub const DEFAULT_PREMATURE_FINISH_MS: u64 = 300_000;

/// Teammates closer than this to a victim share the honorable kill.
pub const GROUP_REWARD_DISTANCE: f32 = 74.0;
pub const MAX_PLAYER_LEVEL: u32 = 80;

pub const STARTING_EVENT_1: u8 = 0x01;
pub const STARTING_EVENT_2: u8 = 0x02;
pub const STARTING_EVENT_3: u8 = 0x04;
pub const STARTING_EVENT_4: u8 = 0x08;

pub const TEXT_START_TWO_MINUTES: u32 = 18193;
pub const TEXT_START_ONE_MINUTE: u32 = 18194;
pub const TEXT_START_HALF_MINUTE: u32 = 18195;
pub const TEXT_BATTLE_HAS_BEGUN: u32 = 18196;
pub const TEXT_ALLIANCE_WINS: u32 = 10633;
pub const TEXT_HORDE_WINS: u32 = 10634;

pub const SOUND_HORDE_WINS: u32 = 8454;
pub const SOUND_ALLIANCE_WINS: u32 = 8455;
pub const SOUND_BG_START: u32 = 3439;

pub const HONOR_KILLS_WINNER_FIRST: u32 = 30;
pub const HONOR_KILLS_WINNER_LAST: u32 = 15;
pub const HONOR_KILLS_LOSER_FIRST: u32 = 5;
pub const HONOR_KILLS_LOSER_LAST: u32 = 5;

pub mod warsong {
    pub const MAX_TEAM_SCORE: u32 = 3;
    pub const FLAG_RESPAWN_MS: i64 = 23_000;
    pub const FLAG_DROP_MS: i64 = 10_000;
    pub const TIME_LIMIT_MINUTES: u32 = 25;
    /// Start time (including warmup) after which the match is forced to end.
    pub const FORCED_END_MS: u64 = 27 * 60_000;
    pub const FOCUSED_ASSAULT_MS: u64 = 10 * 60_000;
    pub const BRUTAL_ASSAULT_MS: u64 = 15 * 60_000;
    pub const FLAG_CLICK_RANGE: f32 = 10.0;
    pub const CAPTURE_TRIGGER_RADIUS: f32 = 6.0;

    pub const REPUTATION_CAPTURE: u32 = 35;
    pub const REPUTATION_CAPTURE_WEEKEND: u32 = 45;
    pub const HONOR_WIN_KILLS: u32 = 1;
    pub const HONOR_WIN_KILLS_WEEKEND: u32 = 3;
    pub const HONOR_END_KILLS: u32 = 2;
    pub const HONOR_END_KILLS_WEEKEND: u32 = 4;

    pub const HONOR_REWARD_WIN: usize = 0;
    /// Raw honor indexed by honor mode, then by win, capture and map-complete slot.
    pub const HONOR_TABLE: [[u32; 3]; 2] = [[20, 40, 40], [60, 40, 80]];

    pub const FACTION_ALLIANCE: u32 = 890;
    pub const FACTION_HORDE: u32 = 889;

    pub const WS_FLAG_UNK_ALLIANCE: u32 = 1545;
    pub const WS_FLAG_UNK_HORDE: u32 = 1546;
    pub const WS_FLAG_CAPTURES_ALLIANCE: u32 = 1581;
    pub const WS_FLAG_CAPTURES_HORDE: u32 = 1582;
    pub const WS_FLAG_CAPTURES_MAX: u32 = 1601;
    pub const WS_FLAG_STATE_HORDE: u32 = 2338;
    pub const WS_FLAG_STATE_ALLIANCE: u32 = 2339;
    pub const WS_STATE_TIMER: u32 = 4248;
    pub const WS_STATE_TIMER_ACTIVE: u32 = 4247;

    pub const SOUND_FLAG_CAPTURED_ALLIANCE: u32 = 8173;
    pub const SOUND_FLAG_CAPTURED_HORDE: u32 = 8213;
    pub const SOUND_FLAG_RETURNED: u32 = 8192;
    pub const SOUND_HORDE_FLAG_PICKED_UP: u32 = 8212;
    pub const SOUND_ALLIANCE_FLAG_PICKED_UP: u32 = 8174;
    pub const SOUND_FLAGS_RESPAWNED: u32 = 8232;

    pub const SPELL_WARSONG_FLAG: u32 = 23333;
    pub const SPELL_SILVERWING_FLAG: u32 = 23335;
    pub const SPELL_FOCUSED_ASSAULT: u32 = 46392;
    pub const SPELL_BRUTAL_ASSAULT: u32 = 46393;

    pub const TEXT_START_ONE_MINUTE: u32 = 10015;
    pub const TEXT_START_HALF_MINUTE: u32 = 10016;
    pub const TEXT_BATTLE_HAS_BEGUN: u32 = 10014;
    pub const TEXT_CAPTURED_HORDE_FLAG: u32 = 9801;
    pub const TEXT_CAPTURED_ALLIANCE_FLAG: u32 = 9802;
    pub const TEXT_FLAGS_PLACED: u32 = 9803;
    pub const TEXT_ALLIANCE_FLAG_PICKED_UP: u32 = 9804;
    pub const TEXT_ALLIANCE_FLAG_DROPPED: u32 = 9805;
    pub const TEXT_HORDE_FLAG_DROPPED: u32 = 9806;
    pub const TEXT_HORDE_FLAG_PICKED_UP: u32 = 9807;
    pub const TEXT_ALLIANCE_FLAG_RETURNED: u32 = 9808;
    pub const TEXT_HORDE_FLAG_RETURNED: u32 = 9809;

    pub const GRAVEYARD_FLAGROOM_ALLIANCE: u32 = 769;
    pub const GRAVEYARD_FLAGROOM_HORDE: u32 = 770;
    pub const GRAVEYARD_MAIN_ALLIANCE: u32 = 771;
    pub const GRAVEYARD_MAIN_HORDE: u32 = 772;

    pub const TRIGGER_ALLIANCE_FLAG_ROOM: u32 = 3646;
    pub const TRIGGER_HORDE_FLAG_ROOM: u32 = 3647;
}

pub mod eye {
    pub const TICK_POINTS: [u32; 4] = [1, 2, 5, 10];
    pub const FLAG_POINTS: [u32; 4] = [75, 85, 100, 500];
    pub const MAX_TEAM_SCORE: u32 = 1600;
    pub const FLAG_RESPAWN_MS: i64 = 8_000;
    pub const POINTS_TICK_MS: i64 = 2_000;
    pub const HONOR_TICK_NORMAL: u32 = 260;
    pub const HONOR_TICK_WEEKEND: u32 = 160;

    pub const POINT_RADIUS: f32 = 70.0;
    pub const MAX_CAPTURERS: i32 = 5;
    pub const PROGRESS_BAR_START: i32 = 50;
    pub const PROGRESS_BAR_HORDE_CONTROLLED: i32 = 30;
    pub const PROGRESS_BAR_ALLIANCE_CONTROLLED: i32 = 70;
    pub const PROGRESS_BAR_PERCENT_GREY: i32 = 40;
    pub const CAPTURE_TRIGGER_RADIUS: f32 = 5.0;
    pub const FLAG_CLICK_RANGE: f32 = 10.0;

    pub const POINTS_MAX: usize = 4;
    pub const FEL_REAVER: usize = 0;
    pub const BLOOD_ELF: usize = 1;
    pub const DRAENEI_RUINS: usize = 2;
    pub const MAGE_TOWER: usize = 3;

    pub const WS_ALLIANCE_RESOURCES: u32 = 2749;
    pub const WS_HORDE_RESOURCES: u32 = 2750;
    pub const WS_ALLIANCE_BASE: u32 = 2752;
    pub const WS_HORDE_BASE: u32 = 2753;
    pub const WS_DRAENEI_RUINS_HORDE_CONTROL: u32 = 2733;
    pub const WS_DRAENEI_RUINS_ALLIANCE_CONTROL: u32 = 2732;
    pub const WS_DRAENEI_RUINS_UNCONTROL: u32 = 2731;
    pub const WS_MAGE_TOWER_ALLIANCE_CONTROL: u32 = 2730;
    pub const WS_MAGE_TOWER_HORDE_CONTROL: u32 = 2729;
    pub const WS_MAGE_TOWER_UNCONTROL: u32 = 2728;
    pub const WS_FEL_REAVER_HORDE_CONTROL: u32 = 2727;
    pub const WS_FEL_REAVER_ALLIANCE_CONTROL: u32 = 2726;
    pub const WS_FEL_REAVER_UNCONTROL: u32 = 2725;
    pub const WS_BLOOD_ELF_HORDE_CONTROL: u32 = 2724;
    pub const WS_BLOOD_ELF_ALLIANCE_CONTROL: u32 = 2723;
    pub const WS_BLOOD_ELF_UNCONTROL: u32 = 2722;
    pub const WS_PROGRESS_BAR_PERCENT_GREY: u32 = 2720;
    pub const WS_PROGRESS_BAR_STATUS: u32 = 2719;
    pub const WS_PROGRESS_BAR_SHOW: u32 = 2718;
    pub const WS_NETHERSTORM_FLAG: u32 = 2757;
    pub const WS_NETHERSTORM_FLAG_STATE_ALLIANCE: u32 = 2769;
    pub const WS_NETHERSTORM_FLAG_STATE_HORDE: u32 = 2770;

    pub const SOUND_FLAG_PICKED_UP_ALLIANCE: u32 = 8212;
    pub const SOUND_FLAG_CAPTURED_HORDE: u32 = 8213;
    pub const SOUND_FLAG_PICKED_UP_HORDE: u32 = 8174;
    pub const SOUND_FLAG_CAPTURED_ALLIANCE: u32 = 8173;
    pub const SOUND_FLAG_RESET: u32 = 8192;

    pub const TEXT_FLAG_TAKEN: u32 = 18359;
    pub const TEXT_FLAG_DROPPED: u32 = 18361;
    pub const TEXT_FLAG_RESET: u32 = 18364;
    pub const TEXT_ALLIANCE_CAPTURED_FLAG: u32 = 18375;
    pub const TEXT_HORDE_CAPTURED_FLAG: u32 = 18384;

    pub const SPELL_NETHERSTORM_FLAG: u32 = 34976;
    pub const SPELL_PLAYER_DROPPED_FLAG: u32 = 34991;

    pub const TRIGGER_BLOOD_ELF_POINT: u32 = 4476;
    pub const TRIGGER_FEL_REAVER_POINT: u32 = 4514;
    pub const TRIGGER_MAGE_TOWER_POINT: u32 = 4516;
    pub const TRIGGER_DRAENEI_RUINS_POINT: u32 = 4518;

    pub const GRAVEYARD_MAIN_ALLIANCE: u32 = 1103;
    pub const GRAVEYARD_MAIN_HORDE: u32 = 1104;
    pub const GRAVEYARD_FEL_REAVER: u32 = 1105;
    pub const GRAVEYARD_BLOOD_ELF: u32 = 1106;
    pub const GRAVEYARD_DRAENEI_RUINS: u32 = 1107;
    pub const GRAVEYARD_MAGE_TOWER: u32 = 1108;

    /// Static per-point data: name, world-state icons, texts, trigger and graveyard.
    #[derive(Clone, Copy, Debug)]
    pub struct PointInfo {
        pub name: &'static str,
        pub ws_uncontrol: u32,
        pub ws_alliance_control: u32,
        pub ws_horde_control: u32,
        pub text_alliance_taken: u32,
        pub text_horde_taken: u32,
        pub text_alliance_lost: u32,
        pub text_horde_lost: u32,
        pub trigger: u32,
        pub graveyard: u32,
    }

    pub const POINTS: [PointInfo; POINTS_MAX] = [
        PointInfo {
            name: "fel_reaver",
            ws_uncontrol: WS_FEL_REAVER_UNCONTROL,
            ws_alliance_control: WS_FEL_REAVER_ALLIANCE_CONTROL,
            ws_horde_control: WS_FEL_REAVER_HORDE_CONTROL,
            text_alliance_taken: 17828,
            text_horde_taken: 17829,
            text_alliance_lost: 17835,
            text_horde_lost: 17836,
            trigger: TRIGGER_FEL_REAVER_POINT,
            graveyard: GRAVEYARD_FEL_REAVER,
        },
        PointInfo {
            name: "blood_elf",
            ws_uncontrol: WS_BLOOD_ELF_UNCONTROL,
            ws_alliance_control: WS_BLOOD_ELF_ALLIANCE_CONTROL,
            ws_horde_control: WS_BLOOD_ELF_HORDE_CONTROL,
            text_alliance_taken: 17819,
            text_horde_taken: 17823,
            text_alliance_lost: 17831,
            text_horde_lost: 17832,
            trigger: TRIGGER_BLOOD_ELF_POINT,
            graveyard: GRAVEYARD_BLOOD_ELF,
        },
        PointInfo {
            name: "draenei_ruins",
            ws_uncontrol: WS_DRAENEI_RUINS_UNCONTROL,
            ws_alliance_control: WS_DRAENEI_RUINS_ALLIANCE_CONTROL,
            ws_horde_control: WS_DRAENEI_RUINS_HORDE_CONTROL,
            text_alliance_taken: 17827,
            text_horde_taken: 17826,
            text_alliance_lost: 17833,
            text_horde_lost: 17834,
            trigger: TRIGGER_DRAENEI_RUINS_POINT,
            graveyard: GRAVEYARD_DRAENEI_RUINS,
        },
        PointInfo {
            name: "mage_tower",
            ws_uncontrol: WS_MAGE_TOWER_UNCONTROL,
            ws_alliance_control: WS_MAGE_TOWER_ALLIANCE_CONTROL,
            ws_horde_control: WS_MAGE_TOWER_HORDE_CONTROL,
            text_alliance_taken: 17824,
            text_horde_taken: 17825,
            text_alliance_lost: 17837,
            text_horde_lost: 17838,
            trigger: TRIGGER_MAGE_TOWER_POINT,
            graveyard: GRAVEYARD_MAGE_TOWER,
        },
    ];

    pub fn point_by_trigger(trigger: u32) -> Option<usize> {
        POINTS.iter().position(|point| point.trigger == trigger)
    }
}

pub fn text_team_wins(team: Team) -> u32 {
    match team {
        Team::Alliance => TEXT_ALLIANCE_WINS,
        Team::Horde => TEXT_HORDE_WINS,
    }
}

pub fn sound_team_wins(team: Team) -> u32 {
    match team {
        Team::Alliance => SOUND_ALLIANCE_WINS,
        Team::Horde => SOUND_HORDE_WINS,
    }
}

/// Honor granted for `kills` honorable kills at `level`.
pub fn hk_honor_at_level(level: u32, kills: u32) -> u32 {
    let per_kill = -0.53177_f64 + 0.59357_f64 * ((level as f64 + 23.54042) / 26.07859).exp();
    (kills as f64 * per_kill).ceil().max(0.0) as u32
}

pub fn bonus_honor_from_kills(max_level: u32, kills: u32) -> u32 {
    hk_honor_at_level(max_level.min(MAX_PLAYER_LEVEL), kills)
}
