//! Move resolution: applies every queued intent in a room for one tick.
//!
//! Each player is resolved on their own. A move is the current position
//! stepped once in the queued direction and clamped to the grid; a move
//! onto an obstacle is discarded. Either way the intent is consumed.
//! Players never block each other.
//!
//! Landing on the goal is worth [`GOAL_POINTS`]. What happens next depends
//! on the room's [`TerminationMode`]:
//!
//! Everyone who lands on the goal in the same tick scores. Then:
//!
//! - `Endless`: the goal jumps once to a random free cell and play continues.
//! - `FirstToGoal`: the goal stays put and the room finishes, with the first
//!   arrival in name order recorded as the winner.

use gridchase_protocol::{PlayerToken, TerminationMode};
use rand::Rng;

use crate::Room;
use crate::config::GOAL_POINTS;

/// What happened in one room during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Players whose position changed.
    pub moved: usize,
    /// Intents discarded because the target was an obstacle.
    pub blocked: usize,
    /// Names of players who reached the goal, in resolution order.
    pub goals: Vec<String>,
}

impl TickOutcome {
    /// Whether anything a viewer can see changed.
    pub fn changed(&self) -> bool {
        self.moved > 0 || !self.goals.is_empty()
    }
}

/// Resolves one tick for `room`.
///
/// Every player is judged against the goal as it stood when the tick began,
/// so the order players are visited in never changes who scores. The goal
/// moves (or the room finishes) only after all players have been resolved.
///
/// Finished rooms only advance the tick counter and discard queued intents.
pub fn resolve<R: Rng>(room: &mut Room, rng: &mut R) -> TickOutcome {
    room.tick += 1;
    let mut outcome = TickOutcome::default();
    if room.is_finished() {
        for player in room.players.values_mut() {
            player.pending_intent = None;
        }
        return outcome;
    }

    let goal = room.goal;

    // Name order keeps `goals` and the RNG draw order deterministic.
    let mut queued: Vec<(String, PlayerToken)> = room
        .players
        .values()
        .filter(|p| p.pending_intent.is_some())
        .map(|p| (p.name.clone(), p.token.clone()))
        .collect();
    queued.sort();

    for (name, token) in queued {
        let Some(player) = room.players.get_mut(&token) else {
            continue;
        };
        let Some(dir) = player.pending_intent.take() else {
            continue;
        };

        let target = player.position.step(dir, room.grid_size);
        if room.obstacles.contains(&target) {
            outcome.blocked += 1;
            tracing::trace!(room = %room.code, player = %name, %dir, "move blocked by wall");
            continue;
        }
        if target != player.position {
            player.position = target;
            outcome.moved += 1;
        }
        if target != goal {
            continue;
        }

        *room.scores.entry(token).or_insert(0) += GOAL_POINTS;
        tracing::info!(room = %room.code, player = %name, %goal, "goal reached");
        outcome.goals.push(name);
    }

    let Some(first) = outcome.goals.first() else {
        return outcome;
    };
    match room.termination {
        TerminationMode::Endless => {
            // `None` only when the old goal is the sole free cell; it stays.
            if let Some(next) = room.pick_free_cell(Some(goal), rng) {
                room.goal = next;
            }
            debug_assert!(!room.obstacles.contains(&room.goal));
        }
        TerminationMode::FirstToGoal => {
            tracing::info!(room = %room.code, winner = %first, tick = room.tick, "room finished");
            room.winner = Some(first.clone());
        }
    }

    outcome
}
