//! Record categories and payload identity checks.

use std::fmt;

use serde_json::Value;

/// Upstream match-history partition. Discovery walks every category; match
/// artifacts are persisted per player+category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchCategory {
    Ranked,
    Casual,
    Arena,
}

impl MatchCategory {
    /// All categories, in the order discovery walks them.
    pub const ALL: [MatchCategory; 3] = [
        MatchCategory::Ranked,
        MatchCategory::Casual,
        MatchCategory::Arena,
    ];

    /// Returns the string label used in URLs, logs, and artifact paths.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MatchCategory::Ranked => "ranked",
            MatchCategory::Casual => "casual",
            MatchCategory::Arena => "arena",
        }
    }
}

impl fmt::Display for MatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a fetched payload actually belongs to the target player.
///
/// The upstream lists every participant id under `metadata.participants`
/// (matches and timelines share this envelope). A payload that does not
/// name the player is stale or misrouted data and must never be persisted
/// under the player's name, regardless of the id it was fetched by.
pub fn payload_mentions_player(payload: &Value, player_id: &str) -> bool {
    payload
        .get("metadata")
        .and_then(|metadata| metadata.get("participants"))
        .and_then(Value::as_array)
        .is_some_and(|participants| {
            participants
                .iter()
                .any(|participant| participant.as_str() == Some(player_id))
        })
}
