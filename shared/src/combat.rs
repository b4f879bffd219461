//! Damage arithmetic shared by the battle engine and its tests.
//!
//! All quantities are integers. The roll is uniform in `[1, MAX_ROLL]`; the
//! raw damage is `attack * (roll + POWER_SCALE * power) - defense` divided
//! by [`DAMAGE_DIVISOR`] with truncation. The subtraction is allowed to go
//! negative; the result is floored to [`MIN_DAMAGE`] afterwards, and a roll
//! of [`CRIT_ROLL`] or above doubles the already-floored value.

/// Upper bound (inclusive) of the damage roll.
pub const MAX_ROLL: i32 = 100;

/// Rolls at or above this value double the damage.
pub const CRIT_ROLL: i32 = 90;

/// Multiplier applied to attack power before it joins the roll.
pub const POWER_SCALE: i32 = 10;

/// Divisor scaling the raw damage product down to hit points.
pub const DAMAGE_DIVISOR: i32 = 200;

/// No hit ever deals less than this.
pub const MIN_DAMAGE: i32 = 1;

/// Computes the damage one attack deals.
///
/// `attack_stat` belongs to the attacker, `defense` to the target, `power`
/// to the attack definition, and `roll` must already be in `[1, MAX_ROLL]`.
pub fn compute_damage(attack_stat: i32, defense: i32, power: i32, roll: i32) -> i32 {
    let mut damage = (attack_stat * (roll + power * POWER_SCALE) - defense) / DAMAGE_DIVISOR;
    if damage < MIN_DAMAGE {
        damage = MIN_DAMAGE;
    }
    if roll >= CRIT_ROLL {
        damage *= 2;
    }
    damage
}
