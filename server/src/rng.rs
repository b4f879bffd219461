//! Damage roll sources.
//!
//! The battle engine never calls the RNG directly; it goes through
//! [`DamageRoll`] so a test can replay a scripted sequence and get the exact
//! damage numbers back.

use rand::Rng;
use shared::combat::MAX_ROLL;

/// Source of uniform damage rolls in `[1, MAX_ROLL]`.
pub trait DamageRoll: Send + Sync {
    fn roll(&mut self) -> i32;
}

/// Production roll source backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRoll;

impl DamageRoll for ThreadRoll {
    fn roll(&mut self) -> i32 {
        rand::thread_rng().gen_range(1..=MAX_ROLL)
    }
}

/// Replays a fixed sequence of rolls, cycling when exhausted.
#[derive(Debug)]
pub struct ScriptedRoll {
    rolls: Vec<i32>,
    next: usize,
}

impl ScriptedRoll {
    pub fn new(rolls: Vec<i32>) -> Self {
        Self { rolls, next: 0 }
    }
}

impl DamageRoll for ScriptedRoll {
    fn roll(&mut self) -> i32 {
        if self.rolls.is_empty() {
            return MAX_ROLL / 2;
        }
        let roll = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_roll_stays_in_range() {
        let mut dice = ThreadRoll;
        for _ in 0..1000 {
            let roll = dice.roll();
            assert!((1..=MAX_ROLL).contains(&roll));
        }
    }

    #[test]
    fn test_scripted_roll_replays_and_cycles() {
        let mut dice = ScriptedRoll::new(vec![50, 95]);
        assert_eq!(dice.roll(), 50);
        assert_eq!(dice.roll(), 95);
        assert_eq!(dice.roll(), 50);
    }

    #[test]
    fn test_scripted_roll_empty_script() {
        let mut dice = ScriptedRoll::new(vec![]);
        assert!((1..=MAX_ROLL).contains(&dice.roll()));
    }
}
