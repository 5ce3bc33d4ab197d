//! Signal message types.

use common::types::ParticipantId;
use serde::{Deserialize, Serialize};

/// Remote mute request direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuteAction {
    /// Ask the target to disable its microphone
    Mute,
    /// Ask the target to re-enable its microphone
    Unmute,
}

impl MuteAction {
    /// Wire name of the action
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MuteAction::Mute => "mute",
            MuteAction::Unmute => "unmute",
        }
    }

    /// The action a mute control offers for a target whose audio is in the
    /// given state.
    #[must_use]
    pub const fn for_target_state(target_muted: bool) -> Self {
        if target_muted {
            MuteAction::Unmute
        } else {
            MuteAction::Mute
        }
    }
}

/// A message exchanged on the side channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SignalMessage {
    /// A transient reaction from the sender
    Reaction {
        /// Reaction symbol; receivers drop symbols outside their vocabulary
        reaction: String,
    },
    /// Ask `participant_sid` to mute its microphone
    Mute {
        /// Target participant
        #[serde(rename = "participantSid")]
        participant_sid: ParticipantId,
    },
    /// Ask `participant_sid` to unmute its microphone
    Unmute {
        /// Target participant
        #[serde(rename = "participantSid")]
        participant_sid: ParticipantId,
    },
}

impl SignalMessage {
    /// Build a mute or unmute request for `target`
    #[must_use]
    pub fn mute_request(action: MuteAction, target: ParticipantId) -> Self {
        match action {
            MuteAction::Mute => SignalMessage::Mute {
                participant_sid: target,
            },
            MuteAction::Unmute => SignalMessage::Unmute {
                participant_sid: target,
            },
        }
    }

    /// Wire name of the message's action
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            SignalMessage::Reaction { .. } => "reaction",
            SignalMessage::Mute { .. } => MuteAction::Mute.as_str(),
            SignalMessage::Unmute { .. } => MuteAction::Unmute.as_str(),
        }
    }
}
