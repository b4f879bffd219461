//! Battle participants: the mutable per-battle overlay on a stat block.
//!
//! A [`Participant`] pairs the immutable catalogue entry with everything a
//! battle may change: current HP, the alive flag, and the remaining PP per
//! attack. The stat block itself is never mutated after join.

use shared::protocol::{AttackStatus, TyrantStatus};
use shared::{Attack, Tyrant};
use std::collections::HashMap;

/// Per-battle PP budget for one attack. `full` is seeded from the attack
/// definition and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpBudget {
    pub full: i32,
    pub current: i32,
}

/// A tyrant currently present on the scene.
#[derive(Debug, Clone)]
pub struct Participant {
    pub tyrant: Tyrant,
    pub enemy: bool,
    pub full_hp: i32,
    pub current_hp: i32,
    pub alive: bool,
    pub attack_pp: HashMap<String, PpBudget>,
}

impl Participant {
    pub fn new(tyrant: Tyrant, enemy: bool) -> Self {
        let attack_pp = tyrant
            .attacks
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    PpBudget {
                        full: a.pp,
                        current: a.pp,
                    },
                )
            })
            .collect();
        let hp = tyrant.hp;
        Participant {
            tyrant,
            enemy,
            full_hp: hp,
            current_hp: hp,
            alive: hp > 0,
            attack_pp,
        }
    }

    /// Restores HP, the alive flag, and every attack's PP to full.
    pub fn reset(&mut self) {
        self.current_hp = self.full_hp;
        self.alive = self.full_hp > 0;
        for pp in self.attack_pp.values_mut() {
            pp.current = pp.full;
        }
    }

    /// Looks up an attack definition on the underlying stat block.
    pub fn find_attack(&self, name: &str) -> Option<&Attack> {
        self.tyrant.find_attack(name)
    }

    /// Remaining PP for `attack`, zero when the attack is unknown.
    pub fn remaining_pp(&self, attack: &str) -> i32 {
        self.attack_pp.get(attack).map(|pp| pp.current).unwrap_or(0)
    }

    /// Consumes one PP of `attack` if any remains.
    pub fn spend_pp(&mut self, attack: &str) {
        if let Some(pp) = self.attack_pp.get_mut(attack) {
            if pp.current > 0 {
                pp.current -= 1;
            }
        }
    }

    /// Subtracts `damage` from current HP, clamping at zero and clearing
    /// the alive flag when the participant goes down.
    pub fn apply_damage(&mut self, damage: i32) {
        self.current_hp = (self.current_hp - damage).max(0);
        if self.current_hp == 0 {
            self.alive = false;
        }
    }

    /// Snapshot slice for this participant. Attacks are reported in the
    /// definition order of the stat block.
    pub fn status(&self) -> TyrantStatus {
        let attacks = self
            .tyrant
            .attacks
            .iter()
            .filter_map(|def| {
                self.attack_pp.get(&def.name).map(|pp| AttackStatus {
                    name: def.name.clone(),
                    full_pp: pp.full,
                    current_pp: pp.current,
                })
            })
            .collect();
        TyrantStatus {
            id: self.tyrant.id.clone(),
            full_hp: self.full_hp,
            current_hp: self.current_hp,
            asset: self.tyrant.asset.clone(),
            enemy: self.enemy,
            attacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> Tyrant {
        Tyrant {
            id: "HERO".to_string(),
            asset: "hero.png".to_string(),
            nickname: None,
            evolutions: vec![],
            attacks: vec![
                Attack {
                    name: "slash".to_string(),
                    power: 5,
                    pp: 2,
                    attributes: vec![],
                },
                Attack {
                    name: "guard".to_string(),
                    power: 0,
                    pp: 1,
                    attributes: vec!["defensive".to_string()],
                },
            ],
            hp: 100,
            attack: 50,
            magic_attack: 0,
            defense: 20,
            speed: 30,
        }
    }

    #[test]
    fn test_new_seeds_pp_from_definitions() {
        let p = Participant::new(hero(), false);
        assert_eq!(p.full_hp, 100);
        assert_eq!(p.current_hp, 100);
        assert!(p.alive);
        assert_eq!(p.remaining_pp("slash"), 2);
        assert_eq!(p.remaining_pp("guard"), 1);
        assert_eq!(p.remaining_pp("unknown"), 0);
    }

    #[test]
    fn test_spend_pp_stops_at_zero() {
        let mut p = Participant::new(hero(), false);
        p.spend_pp("guard");
        assert_eq!(p.remaining_pp("guard"), 0);
        p.spend_pp("guard");
        assert_eq!(p.remaining_pp("guard"), 0);
    }

    #[test]
    fn test_apply_damage_clamps_and_kills() {
        let mut p = Participant::new(hero(), false);
        p.apply_damage(60);
        assert_eq!(p.current_hp, 40);
        assert!(p.alive);

        p.apply_damage(999);
        assert_eq!(p.current_hp, 0);
        assert!(!p.alive);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut p = Participant::new(hero(), false);
        p.apply_damage(999);
        p.spend_pp("slash");
        p.reset();

        assert_eq!(p.current_hp, 100);
        assert!(p.alive);
        assert_eq!(p.remaining_pp("slash"), 2);
    }

    #[test]
    fn test_status_reports_definition_order() {
        let mut p = Participant::new(hero(), true);
        p.spend_pp("slash");
        let status = p.status();

        assert_eq!(status.id, "HERO");
        assert!(status.enemy);
        assert_eq!(status.attacks.len(), 2);
        assert_eq!(status.attacks[0].name, "slash");
        assert_eq!(status.attacks[0].current_pp, 1);
        assert_eq!(status.attacks[1].name, "guard");
    }
}
