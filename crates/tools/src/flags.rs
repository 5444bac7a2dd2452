//! Bitset decoding for the external APIs' packed attribute fields.
//!
//! The upstream services encode several flags per record as integer
//! bitsets; these decoders turn them into named booleans so tool handlers
//! and widget data never leak raw bit positions.

use serde::Serialize;

/// Email message `state` bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageState {
    pub unread: bool,
    pub starred: bool,
    pub draft: bool,
    pub has_attachment: bool,
    pub tracked: bool,
}

impl MessageState {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            unread: bits & (1 << 0) != 0,
            starred: bits & (1 << 1) != 0,
            draft: bits & (1 << 2) != 0,
            has_attachment: bits & (1 << 3) != 0,
            tracked: bits & (1 << 4) != 0,
        }
    }
}

/// Calendar-list attribute bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarListAttrs {
    pub hidden: bool,
    pub selected: bool,
}

impl CalendarListAttrs {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            hidden: bits & (1 << 0) != 0,
            selected: bits & (1 << 1) != 0,
        }
    }
}

/// Calendar attribute bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarAttrs {
    pub deleted: bool,
    pub primary: bool,
    pub ical: bool,
}

impl CalendarAttrs {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            deleted: bits & (1 << 0) != 0,
            primary: bits & (1 << 1) != 0,
            ical: bits & (1 << 2) != 0,
        }
    }
}

/// Event attribute bits. Note the gaps: bits 6, 7, 11, and 12 are unused
/// by the upstream API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventAttrs {
    pub recurring: bool,
    pub all_day: bool,
    pub guests_may_modify: bool,
    pub guests_may_invite: bool,
    pub guests_may_see_list: bool,
    pub deleted: bool,
    pub external: bool,
    pub parent_is_secondary: bool,
    pub parent_event: bool,
    pub ical: bool,
    pub appointment: bool,
}

impl EventAttrs {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            recurring: bits & (1 << 0) != 0,
            all_day: bits & (1 << 1) != 0,
            guests_may_modify: bits & (1 << 2) != 0,
            guests_may_invite: bits & (1 << 3) != 0,
            guests_may_see_list: bits & (1 << 4) != 0,
            deleted: bits & (1 << 5) != 0,
            external: bits & (1 << 8) != 0,
            parent_is_secondary: bits & (1 << 9) != 0,
            parent_event: bits & (1 << 10) != 0,
            ical: bits & (1 << 13) != 0,
            appointment: bits & (1 << 14) != 0,
        }
    }
}

/// Attendee attribute bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendeeAttrs {
    pub optional: bool,
    pub organizer: bool,
}

impl AttendeeAttrs {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            optional: bits & (1 << 0) != 0,
            organizer: bits & (1 << 1) != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_state_bits() {
        let state = MessageState::from_bits(0b1_1011);
        assert!(state.unread);
        assert!(state.starred);
        assert!(!state.draft);
        assert!(state.has_attachment);
        assert!(state.tracked);

        assert_eq!(MessageState::from_bits(0), MessageState::default());
    }

    #[test]
    fn calendar_list_bits() {
        let attrs = CalendarListAttrs::from_bits(0b10);
        assert!(!attrs.hidden);
        assert!(attrs.selected);
    }

    #[test]
    fn calendar_bits() {
        let attrs = CalendarAttrs::from_bits(0b110);
        assert!(!attrs.deleted);
        assert!(attrs.primary);
        assert!(attrs.ical);
    }

    #[test]
    fn event_bits_with_gaps() {
        // recurring (0), all-day (1), external (8), ical (13), appointment (14)
        let bits = 1 | (1 << 1) | (1 << 8) | (1 << 13) | (1 << 14);
        let attrs = EventAttrs::from_bits(bits);
        assert!(attrs.recurring);
        assert!(attrs.all_day);
        assert!(attrs.external);
        assert!(attrs.ical);
        assert!(attrs.appointment);
        assert!(!attrs.deleted);
        assert!(!attrs.parent_event);

        // Unused bits decode to nothing
        let noise = EventAttrs::from_bits((1 << 6) | (1 << 7) | (1 << 11) | (1 << 12));
        assert_eq!(noise, EventAttrs::default());
    }

    #[test]
    fn attendee_bits() {
        let attrs = AttendeeAttrs::from_bits(0b11);
        assert!(attrs.optional);
        assert!(attrs.organizer);
    }

    #[test]
    fn decoded_flags_serialize_as_named_booleans() {
        let json = serde_json::to_value(MessageState::from_bits(1)).unwrap();
        assert_eq!(json["unread"], true);
        assert_eq!(json["starred"], false);
    }
}
