use serde::Serialize;
use tracing::debug;

use crate::types::{ChatChannel, MatchEvent, Team};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Audience {
    All,
    Team(Team),
    Participant(String),
}

impl Audience {
    pub fn includes(&self, participant_id: &str, team: Team) -> bool {
        match self {
            Self::All => true,
            Self::Team(target) => *target == team,
            Self::Participant(target) => target == participant_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub audience: Audience,
    pub event: MatchEvent,
}

/// Outgoing notification buffer owned by a match; drained by the host.
#[derive(Debug, Default)]
pub struct Notifier {
    pending: Vec<Notification>,
}

impl Notifier {
    pub fn push(&mut self, audience: Audience, event: MatchEvent) {
        self.pending.push(Notification { audience, event });
    }

    pub fn to_all(&mut self, event: MatchEvent) {
        self.push(Audience::All, event);
    }

    pub fn to_team(&mut self, team: Team, event: MatchEvent) {
        self.push(Audience::Team(team), event);
    }

    pub fn to_participant(&mut self, participant_id: &str, event: MatchEvent) {
        self.push(Audience::Participant(participant_id.to_string()), event);
    }

    pub fn world_state(&mut self, id: u32, value: i32) {
        self.to_all(MatchEvent::WorldState { id, value });
    }

    pub fn participant_world_state(&mut self, participant_id: &str, id: u32, value: i32) {
        self.to_participant(participant_id, MatchEvent::WorldState { id, value });
    }

    pub fn broadcast_text(&mut self, text_id: u32, channel: ChatChannel, source: Option<&str>) {
        self.to_all(MatchEvent::BroadcastText {
            text_id,
            channel,
            source: source.map(str::to_string),
        });
    }

    pub fn sound_to_all(&mut self, sound_id: u32) {
        self.to_all(MatchEvent::Sound { sound_id });
    }

    pub fn sound_to_team(&mut self, sound_id: u32, team: Team) {
        self.to_team(team, MatchEvent::Sound { sound_id });
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

pub trait NotificationSink {
    fn deliver(&mut self, notification: &Notification);
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub delivered: Vec<Notification>,
}

impl NotificationSink for RecordingSink {
    fn deliver(&mut self, notification: &Notification) {
        self.delivered.push(notification.clone());
    }
}

#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&mut self, notification: &Notification) {
        debug!(audience = ?notification.audience, event = ?notification.event, "notification");
    }
}

pub fn dispatch(notifications: &[Notification], sink: &mut dyn NotificationSink) -> usize {
    for notification in notifications {
        sink.deliver(notification);
    }
    notifications.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_filters_by_team_and_id() {
        assert!(Audience::All.includes("a", Team::Horde));
        assert!(Audience::Team(Team::Horde).includes("a", Team::Horde));
        assert!(!Audience::Team(Team::Horde).includes("a", Team::Alliance));
        assert!(Audience::Participant("a".to_string()).includes("a", Team::Alliance));
        assert!(!Audience::Participant("a".to_string()).includes("b", Team::Alliance));
    }

    #[test]
    fn helpers_buffer_until_drained() {
        let mut notifier = Notifier::default();
        notifier.world_state(1581, 2);
        notifier.sound_to_team(8173, Team::Alliance);
        notifier.broadcast_text(9802, ChatChannel::Alliance, Some("Alice"));
        assert_eq!(notifier.pending().len(), 3);
        assert_eq!(
            notifier.pending()[1].audience,
            Audience::Team(Team::Alliance)
        );

        let drained = notifier.drain();
        assert_eq!(drained.len(), 3);
        assert!(notifier.pending().is_empty());
    }

    #[test]
    fn dispatch_delivers_in_order() {
        let mut notifier = Notifier::default();
        notifier.sound_to_all(3439);
        notifier.participant_world_state("p1", 2718, 1);
        let mut sink = RecordingSink::default();
        let delivered = dispatch(&notifier.drain(), &mut sink);
        assert_eq!(delivered, 2);
        assert_eq!(sink.delivered[0].event, MatchEvent::Sound { sound_id: 3439 });
        assert_eq!(
            sink.delivered[1].audience,
            Audience::Participant("p1".to_string())
        );
    }

    #[test]
    fn notification_serializes_audience_and_event() {
        let notification = Notification {
            audience: Audience::Team(Team::Horde),
            event: MatchEvent::Sound { sound_id: 8213 },
        };
        let value = serde_json::to_value(&notification).expect("serialize notification");
        assert_eq!(value["audience"]["kind"], "team");
        assert_eq!(value["audience"]["target"], "horde");
        assert_eq!(value["event"]["type"], "sound");
    }
}
