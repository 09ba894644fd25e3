/// Host-side instance used by the E2E tests: a small game session with a
/// handful of synchronized fields of different shapes

use serde::{Deserialize, Serialize};
use synk_shared::{InstanceKey, Property, Synk, SynkError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Playing { round: u8 },
    Finished,
}

pub struct TestGame {
    pub key: InstanceKey,
    pub score: Property<u32>,
    pub players: Property<Vec<String>>,
    pub phase: Property<Phase>,
    pub winner: Property<Option<String>>,
}

impl TestGame {
    /// Declare the same fields on either side; the role of `synk` decides
    /// whether they broadcast or apply
    pub fn new(synk: &Synk, key: InstanceKey) -> Self {
        Self {
            key,
            score: synk.declare(key, "score", 0),
            players: synk.declare(key, "players", Vec::new()),
            phase: synk.declare(key, "phase", Phase::Lobby),
            winner: synk.declare(key, "winner", None),
        }
    }

    pub fn add_player(&self, name: &str) -> Result<bool, SynkError> {
        let mut players = self.players.get();
        if players.iter().any(|player| player == name) {
            return Ok(false);
        }
        players.push(name.to_string());
        self.players.set(players)
    }

    /// Whether every field on `other` holds the same value as on `self`
    pub fn mirrors(&self, other: &TestGame) -> bool {
        self.score.get() == other.score.get()
            && self.players.get() == other.players.get()
            && self.phase.get() == other.phase.get()
            && self.winner.get() == other.winner.get()
    }
}
