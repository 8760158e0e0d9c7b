//! Player tokens and room codes.

use gridchase_protocol::{PlayerToken, RoomCode};
use rand::Rng;

/// How many distinct room codes exist (`1000..=9999`).
pub const ROOM_CODE_SPACE: usize = (RoomCode::MAX - RoomCode::MIN + 1) as usize;

/// Generates a player token: 16 random bytes as 32 lowercase hex chars.
///
/// With 128 bits of entropy a collision within one process is not a
/// practical concern, so no uniqueness check is made.
pub fn new_player_token<R: Rng>(rng: &mut R) -> PlayerToken {
    let bytes: [u8; 16] = rng.random();
    PlayerToken::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

/// Samples 4-digit codes until one is not taken.
///
/// Never returns if every code is taken; the caller checks
/// [`ROOM_CODE_SPACE`] first, while holding exclusive access to the set
/// `is_taken` looks at.
pub fn new_room_code<R: Rng>(rng: &mut R, is_taken: impl Fn(&RoomCode) -> bool) -> RoomCode {
    loop {
        let code = RoomCode::from_number(rng.random_range(RoomCode::MIN..=RoomCode::MAX));
        if !is_taken(&code) {
            return code;
        }
    }
}
