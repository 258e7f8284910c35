//! Level derivation

/// XP needed per level
pub const XP_PER_LEVEL: u64 = 50;

/// `floor(xp / 50) + 1`
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}
