//! Stat-block types served by the tyrant catalogue.
//!
//! A [`Tyrant`] is immutable for the lifetime of a battle participant; all
//! per-battle state (remaining HP, remaining PP) lives in the server's
//! participant overlay, never here.

use serde::{Deserialize, Serialize};

/// A named action owned by a tyrant.
///
/// `power` feeds the damage formula, `pp` is the per-battle usage budget
/// seeded into the participant overlay on join, and `attributes` are free-form
/// tag strings carried through for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    pub power: i32,
    pub pp: i32,
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// A monster definition, the unit of combat.
///
/// `id` is also the tyrant's canonical name. `nickname` and `evolutions` are
/// catalogue metadata; battle arithmetic never reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tyrant {
    pub id: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub evolutions: Vec<String>,
    #[serde(default)]
    pub attacks: Vec<Attack>,
    pub hp: i32,
    pub attack: i32,
    #[serde(default, rename = "magicAttack")]
    pub magic_attack: i32,
    pub defense: i32,
    pub speed: i32,
}

impl Tyrant {
    /// Looks up an attack definition by name.
    pub fn find_attack(&self, name: &str) -> Option<&Attack> {
        self.attacks.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_attack() {
        let tyrant = Tyrant {
            id: "HERO".to_string(),
            asset: "hero.png".to_string(),
            nickname: None,
            evolutions: vec![],
            attacks: vec![Attack {
                name: "slash".to_string(),
                power: 5,
                pp: 2,
                attributes: vec![],
            }],
            hp: 100,
            attack: 50,
            magic_attack: 0,
            defense: 20,
            speed: 30,
        };

        assert!(tyrant.find_attack("slash").is_some());
        assert!(tyrant.find_attack("bash").is_none());
    }

    #[test]
    fn test_deserialize_minimal_stat_block() {
        let json = r#"{
            "id": "OGRE",
            "asset": "ogre.png",
            "hp": 80,
            "attack": 40,
            "defense": 10,
            "speed": 10,
            "attacks": [{"name": "bash", "power": 4, "pp": 2}]
        }"#;

        let tyrant: Tyrant = serde_json::from_str(json).unwrap();
        assert_eq!(tyrant.id, "OGRE");
        assert_eq!(tyrant.magic_attack, 0);
        assert!(tyrant.nickname.is_none());
        assert!(tyrant.evolutions.is_empty());
        assert_eq!(tyrant.attacks[0].pp, 2);
        assert!(tyrant.attacks[0].attributes.is_empty());
    }
}
