use crate::model::{
    Id,
    user::UserMarker,
    vote::{VoteAction, VoteState, VoteTally},
};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// One feed item, named the way the backend names it on the wire.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Post {
    #[serde(rename = "incident_id")]
    pub id: Id<PostMarker>,
    pub content: String,
    pub created_at: String,
    #[serde(rename = "name")]
    pub author_name: String,
    #[serde(rename = "username", default, skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id<UserMarker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub total_upvotes: u32,
    #[serde(default)]
    pub total_downvotes: u32,
    #[serde(default)]
    pub total_comments: u32,
    #[serde(default)]
    pub is_upvoted: bool,
    #[serde(default)]
    pub is_downvoted: bool,
    /// Older duplicates of the totals some endpoints still send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downvotes: Option<u32>,
}

impl Post {
    #[must_use]
    pub fn vote_state(&self) -> VoteState {
        VoteState::from_flags(self.is_upvoted, self.is_downvoted)
    }

    #[must_use]
    pub fn tally(&self) -> VoteTally {
        VoteTally {
            upvotes: self.total_upvotes,
            downvotes: self.total_downvotes,
        }
    }

    /// Returns a copy with `action` applied to the viewer flags and counts.
    #[must_use]
    pub fn with_vote(&self, action: VoteAction) -> Self {
        let current = self.vote_state();
        let next = current.after(action);
        let tally = self.tally().transfer(current, next);

        Self {
            total_upvotes: tally.upvotes,
            total_downvotes: tally.downvotes,
            upvotes: self.upvotes.map(|_| tally.upvotes),
            downvotes: self.downvotes.map(|_| tally.downvotes),
            is_upvoted: next.is_upvoted(),
            is_downvoted: next.is_downvoted(),
            ..self.clone()
        }
    }

    /// Collapses contradictory viewer flags coming from the backend.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let state = self.vote_state();
        self.is_upvoted = state.is_upvoted();
        self.is_downvoted = state.is_downvoted();
        self
    }

    /// Parses `created_at`. Timestamps without an offset are taken as UTC.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<UtcDateTime> {
        let raw = self.created_at.trim();

        if let Ok(date_time) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(date_time.to_utc());
        }

        PrimitiveDateTime::parse(
            raw,
            format_description!(
                "[year]-[month]-[day][first [T][ ]][hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )
        .ok()
        .map(|date_time| date_time.assume_utc().to_utc())
    }
}
