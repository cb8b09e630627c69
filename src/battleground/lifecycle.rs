use tracing::{debug, info};

use super::*;
use crate::constants::{
    RESURRECTION_INTERVAL_MS, RESURRECT_DELAY_MS, SOUND_BG_START, START_DELAY_HALF_MINUTE_MS,
    START_DELAY_NONE_MS, START_DELAY_ONE_MINUTE_MS, START_DELAY_TWO_MINUTES_MS,
    STARTING_EVENT_1, STARTING_EVENT_2, STARTING_EVENT_3, STARTING_EVENT_4,
};
use crate::stats_store::{DeserterRecord, DesertionType};
use crate::types::ChatChannel;

const MINUTE_MS: u64 = 60_000;
const PREMATURE_SECONDS_STEP_MS: u64 = 15_000;

impl Battleground {
    /// Starting countdown; fires at most one starting event per update.
    pub(super) fn process_join(&mut self, diff_ms: u64) {
        self.state.start_delay_ms -= diff_ms as i64;
        let messages = self.rules.start_message_ids();
        let events = self.state.events;

        if events & STARTING_EVENT_1 == 0 {
            self.state.events |= STARTING_EVENT_1;
            self.rules.close_doors(&mut self.state);
            self.state.start_delay_ms = START_DELAY_TWO_MINUTES_MS;
            self.announce(messages[0]);
        } else if self.state.start_delay_ms <= START_DELAY_ONE_MINUTE_MS
            && events & STARTING_EVENT_2 == 0
        {
            self.state.events |= STARTING_EVENT_2;
            self.announce(messages[1]);
        } else if self.state.start_delay_ms <= START_DELAY_HALF_MINUTE_MS
            && events & STARTING_EVENT_3 == 0
        {
            self.state.events |= STARTING_EVENT_3;
            self.announce(messages[2]);
        } else if self.state.start_delay_ms <= START_DELAY_NONE_MS
            && events & STARTING_EVENT_4 == 0
        {
            self.state.events |= STARTING_EVENT_4;
            self.rules.open_doors(&mut self.state);
            self.announce(messages[3]);
            self.state.set_status(MatchStatus::Running);
            self.state.start_delay_ms = START_DELAY_NONE_MS;
            self.state.notifier.sound_to_all(SOUND_BG_START);
            self.state.label("battle has begun");
            info!(instance = self.state.instance_id, "battle has begun");
        }
    }

    fn announce(&mut self, text_id: Option<u32>) {
        if let Some(text_id) = text_id {
            self.state
                .notifier
                .broadcast_text(text_id, ChatChannel::Neutral, None);
        }
    }

    /// Only the queue head is checked per update.
    pub(super) fn process_offline_queue(&mut self) {
        let Some(head) = self.state.offline_queue.front().cloned() else {
            return;
        };
        let Some(participant) = self.state.participants.get(&head) else {
            self.state.offline_queue.pop_front();
            return;
        };
        if participant.offline_remove_at_ms > self.state.clock_ms {
            return;
        }

        if self.state.options.track_deserters
            && matches!(self.state.status, MatchStatus::Running | MatchStatus::Warmup)
        {
            self.state.records.push(StoreRecord::Deserter(DeserterRecord {
                participant_id: participant.id.clone(),
                name: participant.name.clone(),
                desertion_type: DesertionType::Offline,
            }));
        }
        debug!(instance = self.state.instance_id, participant = %head, "offline grace expired");
        if self.remove_participant(&head).is_err() {
            self.state.offline_queue.pop_front();
        }
    }

    /// Resurrection waves: queued spirits move to the resurrect list every
    /// interval and come back shortly after.
    pub(super) fn process_resurrect(&mut self, diff_ms: u64) {
        self.state.last_resurrect_ms += diff_ms;
        if self.state.last_resurrect_ms >= RESURRECTION_INTERVAL_MS {
            let queue = std::mem::take(&mut self.state.revive_queue);
            for (graveyard_id, ids) in queue {
                self.state
                    .notifier
                    .to_all(MatchEvent::SpiritHeal { graveyard_id });
                for id in ids {
                    self.state.resurrect_list.push((id, graveyard_id));
                }
            }
            self.state.last_resurrect_ms = 0;
        } else if self.state.last_resurrect_ms > RESURRECT_DELAY_MS {
            let ready = std::mem::take(&mut self.state.resurrect_list);
            for (id, graveyard_id) in ready {
                let position = self
                    .state
                    .layout
                    .graveyard(graveyard_id)
                    .map(|graveyard| graveyard.position);
                if let (Some(position), Some(participant)) =
                    (position, self.state.participants.get_mut(&id))
                {
                    participant.avatar_mut().set_position(position);
                }
                self.state.revive(&id);
            }
        }
    }

    /// Premature finish countdown while a team is under strength.
    pub(super) fn process_progress(&mut self, diff_ms: u64) {
        let Some(remaining) = self.state.premature_remaining_ms else {
            self.state.premature_remaining_ms = Some(self.state.options.premature_finish_ms);
            return;
        };
        if remaining < diff_ms {
            let winner = self.rules.premature_winner(&self.state);
            self.state.label("premature finish");
            self.end_battleground(winner);
            self.state.premature_remaining_ms = None;
            return;
        }
        if self.state.options.testing {
            return;
        }

        let next = remaining - diff_ms;
        if next > MINUTE_MS {
            if next / MINUTE_MS != remaining / MINUTE_MS {
                self.state.notifier.to_all(MatchEvent::PrematureWarningMinutes {
                    minutes: (remaining / MINUTE_MS) as u32,
                });
            }
        } else if next / PREMATURE_SECONDS_STEP_MS != remaining / PREMATURE_SECONDS_STEP_MS {
            self.state.notifier.to_all(MatchEvent::PrematureWarningSeconds {
                seconds: (remaining / 1000) as u32,
            });
        }
        self.state.premature_remaining_ms = Some(next);
    }

    /// Leave countdown after the match ended; everyone is removed at zero.
    pub(super) fn process_leave(&mut self, diff_ms: u64) {
        self.state.end_time_ms -= diff_ms as i64;
        if self.state.end_time_ms > 0 {
            return;
        }
        self.state.end_time_ms = 0;
        let ids: Vec<String> = self.state.participants.keys().cloned().collect();
        for id in ids {
            if let Err(err) = self.remove_participant(&id) {
                debug!(
                    instance = self.state.instance_id,
                    participant = %id,
                    %err,
                    "leave countdown removal failed"
                );
            }
        }
    }
}
