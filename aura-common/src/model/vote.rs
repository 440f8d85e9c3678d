use crate::model::{Id, post::PostMarker};
use serde::{Deserialize, Serialize};

/// The viewer's vote on a single post.
///
/// A post is never upvoted and downvoted at the same time, so the two
/// backend flags collapse into one of three states.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum VoteState {
    #[default]
    Neutral,
    Upvoted,
    Downvoted,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum VoteAction {
    Upvote,
    Downvote,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
}

/// A single button press, consumed once by the vote engine.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct VoteIntent {
    pub post_id: Id<PostMarker>,
    pub want_upvote: bool,
    pub want_downvote: bool,
}

/// Body of `POST /vote/`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct VoteRequest {
    pub incident_id: Id<PostMarker>,
    pub is_upvoted: bool,
    pub is_downvoted: bool,
}

impl VoteState {
    /// Upvote wins if the backend ever reports both flags.
    #[must_use]
    pub fn from_flags(is_upvoted: bool, is_downvoted: bool) -> Self {
        match (is_upvoted, is_downvoted) {
            (true, _) => VoteState::Upvoted,
            (false, true) => VoteState::Downvoted,
            (false, false) => VoteState::Neutral,
        }
    }

    #[must_use]
    pub fn is_upvoted(self) -> bool {
        self == VoteState::Upvoted
    }

    #[must_use]
    pub fn is_downvoted(self) -> bool {
        self == VoteState::Downvoted
    }

    /// Pressing the button of the current state clears it, any other press
    /// switches to that state.
    #[must_use]
    pub fn after(self, action: VoteAction) -> Self {
        match (self, action) {
            (VoteState::Upvoted, VoteAction::Upvote)
            | (VoteState::Downvoted, VoteAction::Downvote) => VoteState::Neutral,
            (_, VoteAction::Upvote) => VoteState::Upvoted,
            (_, VoteAction::Downvote) => VoteState::Downvoted,
        }
    }
}

impl VoteTally {
    /// Moves the viewer's contribution from `from` to `to`. Counts never go
    /// below zero even if they were out of sync with the flags.
    #[must_use]
    pub fn transfer(self, from: VoteState, to: VoteState) -> Self {
        let mut next = self;

        if from.is_upvoted() && !to.is_upvoted() {
            next.upvotes = next.upvotes.saturating_sub(1);
        } else if !from.is_upvoted() && to.is_upvoted() {
            next.upvotes = next.upvotes.saturating_add(1);
        }

        if from.is_downvoted() && !to.is_downvoted() {
            next.downvotes = next.downvotes.saturating_sub(1);
        } else if !from.is_downvoted() && to.is_downvoted() {
            next.downvotes = next.downvotes.saturating_add(1);
        }

        next
    }
}

impl VoteIntent {
    #[must_use]
    pub fn upvote(post_id: Id<PostMarker>) -> Self {
        Self {
            post_id,
            want_upvote: true,
            want_downvote: false,
        }
    }

    #[must_use]
    pub fn downvote(post_id: Id<PostMarker>) -> Self {
        Self {
            post_id,
            want_upvote: false,
            want_downvote: true,
        }
    }

    /// At most one action is honored per press; upvote is checked first.
    #[must_use]
    pub fn action(self) -> Option<VoteAction> {
        if self.want_upvote {
            Some(VoteAction::Upvote)
        } else if self.want_downvote {
            Some(VoteAction::Downvote)
        } else {
            None
        }
    }
}

impl VoteRequest {
    #[must_use]
    pub fn new(incident_id: Id<PostMarker>, state: VoteState) -> Self {
        Self {
            incident_id,
            is_upvoted: state.is_upvoted(),
            is_downvoted: state.is_downvoted(),
        }
    }
}
