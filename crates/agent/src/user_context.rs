//! User-context block — current time, identity, and a light activity
//! snapshot rendered as prose for the system prompt.
//!
//! The block is optional; absence is legal. The activity snapshot comes
//! from an [`ActivitySource`] and tolerates failure silently.

use chrono::{DateTime, FixedOffset, Utc};

use attache_core::activity::ActivitySnapshot;

/// Builds the optional user-context prompt block.
#[derive(Debug, Clone)]
pub struct UserContextBuilder {
    email: Option<String>,
    display_name: Option<String>,
    timezone: String,
    tz_abbrev: String,
    offset: FixedOffset,
}

impl UserContextBuilder {
    pub fn new(
        email: Option<String>,
        display_name: Option<String>,
        timezone: impl Into<String>,
        tz_abbrev: impl Into<String>,
        utc_offset_minutes: i32,
    ) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Self {
            email,
            display_name,
            timezone: timezone.into(),
            tz_abbrev: tz_abbrev.into(),
            offset,
        }
    }

    /// Render the block for the given instant.
    pub fn build(&self, now: DateTime<Utc>, activity: Option<ActivitySnapshot>) -> String {
        let local = now.with_timezone(&self.offset);
        let formatted = local.format("%A, %B %-d, %Y at %-I:%M %p");

        let mut lines = vec![format!(
            "The current date and time is {formatted} ({}).",
            self.tz_abbrev
        )];
        lines.push(format!("The user's timezone is {}.", self.timezone));

        match (&self.display_name, &self.email) {
            (Some(name), Some(email)) => {
                lines.push(format!("The user is {name} ({email})."));
            }
            (None, Some(email)) => lines.push(format!("The user's email is {email}.")),
            (Some(name), None) => lines.push(format!("The user is {name}.")),
            (None, None) => {}
        }

        if let Some(snapshot) = activity {
            if let Some(unread) = snapshot.unread_messages {
                lines.push(format!(
                    "The user currently has {unread} unread email{}.",
                    if unread == 1 { "" } else { "s" }
                ));
            }
        }

        lines.join("\n")
    }
}
