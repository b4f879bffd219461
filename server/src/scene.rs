//! The shared battle scene: participant table, turn scheduler, battle and
//! vote state machines, and attack resolution.
//!
//! [`Scene`] is a synchronous state machine with no I/O of its own. Every
//! operation mutates state and returns a [`Delivery`] describing the single
//! frame to emit: either a broadcast to all live sessions or a sender-only
//! error. The hub owns the lock around it and performs the actual sends
//! after the lock is released, so nothing here can ever block on a socket.
//!
//! ## Turn scheduling
//!
//! `turn_order` is the participant ids sorted by descending speed, with a
//! lexicographic tie-break on id so the order is deterministic for any
//! input set. `turn_index` names the next candidate to evaluate; advancing
//! scans forward cyclically past dead participants. The preview sent with
//! every state-changing frame starts at the current actor and lists the
//! alive participants in acting order.
//!
//! ## Phases
//!
//! The scene is `Idle`, `Voting`, or `InBattle`. A battle request resets
//! every participant and either opens a vote (ballot box created, battle
//! snapshot withheld) or starts the battle outright. Votes resolve on
//! unanimity of response; attacks are only valid in battle; `clean` forces
//! everything back to `Idle`.

use crate::participant::Participant;
use crate::rng::DamageRoll;
use crate::session::SessionId;
use log::{debug, info};
use shared::combat;
use shared::protocol::{
    AttackCommand, BattleOutcome, ServerEvent, TurnEntry, TyrantStatus, Verdict, VoteChoice,
    VoteTally,
};
use shared::Tyrant;
use std::collections::HashMap;

/// Battle lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Voting,
    InBattle,
}

/// Where one outbound frame goes.
#[derive(Debug)]
pub enum Delivery {
    /// Every live session.
    Broadcast(ServerEvent),
    /// Exactly one session; used only for error frames.
    Direct(SessionId, ServerEvent),
}

/// Ballot box for one battle-start vote. Tallies and ballots always move
/// together so a change of mind can never leave them disagreeing.
#[derive(Debug, Default)]
struct VoteState {
    tally: VoteTally,
    ballots: HashMap<String, VoteChoice>,
    total_allies: usize,
}

impl VoteState {
    fn cast(&mut self, voter: &str, choice: VoteChoice) {
        self.retract(voter);
        match choice {
            VoteChoice::UntilDeath => self.tally.until_death += 1,
            VoteChoice::ToParty => self.tally.to_party += 1,
        }
        self.ballots.insert(voter.to_string(), choice);
    }

    fn retract(&mut self, voter: &str) {
        if let Some(prev) = self.ballots.remove(voter) {
            match prev {
                VoteChoice::UntilDeath => {
                    self.tally.until_death = self.tally.until_death.saturating_sub(1)
                }
                VoteChoice::ToParty => self.tally.to_party = self.tally.to_party.saturating_sub(1),
            }
        }
    }

    /// Every ally has responded.
    fn is_settled(&self) -> bool {
        self.ballots.len() >= self.total_allies
    }

    /// Winning label; a tie resolves to `TO_PARTY`.
    fn result(&self) -> VoteChoice {
        if self.tally.until_death > self.tally.to_party {
            VoteChoice::UntilDeath
        } else {
            VoteChoice::ToParty
        }
    }
}

/// The single shared battlefield.
pub struct Scene {
    participants: HashMap<String, Participant>,
    tyrant_owner: HashMap<String, SessionId>,
    turn_order: Vec<String>,
    turn_index: usize,
    current_actor: Option<String>,
    phase: Phase,
    battle_anchor: String,
    vote: Option<VoteState>,
    dice: Box<dyn DamageRoll>,
}

impl Scene {
    pub fn new(dice: Box<dyn DamageRoll>) -> Self {
        Scene {
            participants: HashMap::new(),
            tyrant_owner: HashMap::new(),
            turn_order: Vec::new(),
            turn_index: 0,
            current_actor: None,
            phase: Phase::Idle,
            battle_anchor: String::new(),
            vote: None,
            dice,
        }
    }

    /// Enrols `tyrant` into the scene. Joining an id that is already present
    /// leaves the participant untouched but points the owner mapping at the
    /// current session.
    pub fn join(&mut self, session: SessionId, tyrant: Tyrant, enemy: bool) -> Delivery {
        let id = tyrant.id.clone();
        if !self.participants.contains_key(&id) {
            info!("{} joined the scene (enemy: {})", id, enemy);
            self.participants
                .insert(id.clone(), Participant::new(tyrant, enemy));
        }
        self.tyrant_owner.insert(id.clone(), session);
        self.recompute_turn_order();

        // The stored team bit wins on rejoin.
        let enemy = self.participants[&id].enemy;
        Delivery::Broadcast(ServerEvent::Joined {
            joined: id,
            enemy,
            turns: self.turn_preview(),
        })
    }

    /// Starts a battle anchored on `anchor`, either directly or behind a
    /// vote. Always resets every participant and rebuilds the schedule; a
    /// battle requested mid-vote silently replaces the pending vote.
    pub fn battle(&mut self, anchor: String, vote_enabled: bool) -> Delivery {
        info!("battle requested starting with {} (vote: {})", anchor, vote_enabled);
        for p in self.participants.values_mut() {
            p.reset();
        }
        self.battle_anchor = anchor;
        self.recompute_turn_order();
        self.turn_index = self
            .turn_order
            .iter()
            .position(|id| *id == self.battle_anchor)
            .unwrap_or(0);
        self.current_actor = self.next_alive();

        if vote_enabled {
            let total_allies = self.participants.values().filter(|p| !p.enemy).count();
            if total_allies == 0 {
                // Nobody to ask: the vote settles on entry.
                return self.settle_vote(VoteTally::default());
            }
            self.phase = Phase::Voting;
            self.vote = Some(VoteState {
                total_allies,
                ..VoteState::default()
            });
            return Delivery::Broadcast(ServerEvent::Voting {
                voting: VoteTally::default(),
            });
        }

        self.phase = Phase::InBattle;
        self.vote = None;
        Delivery::Broadcast(ServerEvent::BattleStarted {
            battle: self.battle_anchor.clone(),
            turns: self.turn_preview(),
            voting: None,
            tyrants: self.snapshot(),
        })
    }

    /// Records one ballot. The voter is the explicit `user` field when
    /// given, otherwise the caller's own tyrant.
    pub fn vote(&mut self, session: SessionId, user: Option<String>, choice: &str) -> Delivery {
        if self.phase != Phase::Voting {
            return Delivery::Direct(session, ServerEvent::error("voting not active"));
        }
        let voter = match user.or_else(|| self.session_tyrant(session)) {
            Some(id) if self.participants.get(&id).map_or(false, |p| !p.enemy) => id,
            _ => return Delivery::Direct(session, ServerEvent::error("only allies can vote")),
        };
        let Some(choice) = VoteChoice::parse(choice) else {
            return Delivery::Direct(session, ServerEvent::error("invalid vote"));
        };
        let Some(mut vote) = self.vote.take() else {
            return Delivery::Direct(session, ServerEvent::error("voting not active"));
        };

        vote.cast(&voter, choice);
        debug!("{} voted {:?}", voter, choice);
        let tally = vote.tally;
        if vote.is_settled() {
            info!("vote settled as {:?}", vote.result());
            return self.settle_vote(tally);
        }
        self.vote = Some(vote);
        Delivery::Broadcast(ServerEvent::Voting { voting: tally })
    }

    /// Resolves one attack. Validation failures reply to the attacker's
    /// owner (falling back to the caller) and leave the scene untouched.
    pub fn attack(&mut self, session: SessionId, cmd: &AttackCommand) -> Delivery {
        if self.phase != Phase::InBattle {
            return self.reject(session, &cmd.user, "not in battle", None);
        }

        let attacker_alive = self
            .participants
            .get(&cmd.user)
            .map_or(false, |p| p.alive);
        let target = self.participants.get(&cmd.target);
        let target_missing = target.is_none();
        let target_alive = target.map_or(false, |p| p.alive);
        if !attacker_alive || !target_alive {
            let message = if target_missing {
                "target not found"
            } else {
                "invalid attacker or target"
            };
            return self.reject(session, &cmd.user, message, None);
        }

        if let Some(actor) = self.current_actor.clone() {
            if actor != cmd.user {
                return self.reject(session, &cmd.user, "not your turn", Some(actor));
            }
        }

        let attacker = &self.participants[&cmd.user];
        let (atk_stat, power) = match attacker.find_attack(&cmd.attack) {
            Some(def) => (attacker.tyrant.attack, def.power),
            None => return self.reject(session, &cmd.user, "unknown attack", None),
        };
        if attacker.remaining_pp(&cmd.attack) <= 0 {
            return self.reject(session, &cmd.user, "no PP left for attack", None);
        }

        if let Some(attacker) = self.participants.get_mut(&cmd.user) {
            attacker.spend_pp(&cmd.attack);
        }
        let roll = self.dice.roll();
        let defense = self.participants[&cmd.target].tyrant.defense;
        let damage = combat::compute_damage(atk_stat, defense, power, roll);
        if let Some(target) = self.participants.get_mut(&cmd.target) {
            target.apply_damage(damage);
        }
        debug!(
            "{} hit {} with {} for {} (roll {})",
            cmd.user, cmd.target, cmd.attack, damage, roll
        );

        let enemies_standing = self.participants.values().any(|p| p.enemy && p.alive);
        let allies_standing = self.participants.values().any(|p| !p.enemy && p.alive);
        let outcome = if !enemies_standing {
            info!("battle won");
            self.finish_battle();
            BattleOutcome::Ended(Verdict::Win)
        } else if !allies_standing {
            info!("battle lost");
            self.finish_battle();
            BattleOutcome::Ended(Verdict::Defeat)
        } else {
            self.current_actor = self.next_alive();
            BattleOutcome::Update {
                tyrants: self.snapshot(),
            }
        };

        Delivery::Broadcast(ServerEvent::TurnResolved {
            update_state: outcome,
            turns: self.turn_preview(),
        })
    }

    /// Unconditional reset: back to idle, enemies cleared, allies restored.
    pub fn clean(&mut self) -> Delivery {
        info!("scene cleaned");
        self.phase = Phase::Idle;
        self.current_actor = None;
        self.vote = None;
        self.remove_enemies();
        for p in self.participants.values_mut() {
            p.reset();
        }
        self.recompute_turn_order();
        Delivery::Broadcast(ServerEvent::Cleaned {
            clean: true,
            turns: self.turn_preview(),
        })
    }

    /// Removes one ally. The id comes from the explicit `leave` field when
    /// non-empty, then the `user` field, then the caller's own tyrant.
    pub fn leave(
        &mut self,
        session: SessionId,
        explicit: Option<String>,
        user: Option<String>,
    ) -> Delivery {
        let ally = explicit
            .filter(|id| !id.is_empty())
            .or(user)
            .or_else(|| self.session_tyrant(session));
        let ally = match ally {
            Some(id) if self.participants.get(&id).map_or(false, |p| !p.enemy) => id,
            _ => return Delivery::Direct(session, ServerEvent::error("ally not found")),
        };

        info!("{} left the scene", ally);
        self.participants.remove(&ally);
        self.tyrant_owner.remove(&ally);
        self.recompute_turn_order();
        if self.current_actor.as_deref() == Some(ally.as_str()) {
            self.current_actor = self.next_alive();
        }

        if let Some(mut vote) = self.vote.take() {
            vote.retract(&ally);
            vote.total_allies = self.participants.values().filter(|p| !p.enemy).count();
            if vote.is_settled() {
                info!("vote settled as {:?} after {} left", vote.result(), ally);
                return self.settle_vote(vote.tally);
            }
            self.vote = Some(vote);
        }

        Delivery::Broadcast(ServerEvent::Left {
            left: ally,
            turns: self.turn_preview(),
        })
    }

    /// Forgets every owner mapping held by a closed session. Participants
    /// stay; only an explicit leave or battle-end removes them.
    pub fn drop_session(&mut self, session: SessionId) {
        self.tyrant_owner.retain(|_, sid| *sid != session);
    }

    fn settle_vote(&mut self, tally: VoteTally) -> Delivery {
        self.phase = Phase::InBattle;
        self.vote = None;
        Delivery::Broadcast(ServerEvent::BattleStarted {
            battle: self.battle_anchor.clone(),
            turns: self.turn_preview(),
            voting: Some(tally),
            tyrants: self.snapshot(),
        })
    }

    /// Battle over: back to idle, enemies leave the scene, allies keep
    /// whatever HP and PP they ended with.
    fn finish_battle(&mut self) {
        self.phase = Phase::Idle;
        self.current_actor = None;
        self.remove_enemies();
        self.recompute_turn_order();
    }

    fn remove_enemies(&mut self) {
        let enemies: Vec<String> = self
            .participants
            .iter()
            .filter(|(_, p)| p.enemy)
            .map(|(id, _)| id.clone())
            .collect();
        for id in enemies {
            self.participants.remove(&id);
            self.tyrant_owner.remove(&id);
        }
    }

    /// Rebuilds the schedule: speed descending, then id ascending so equal
    /// speeds order the same way every time.
    fn recompute_turn_order(&mut self) {
        let mut order: Vec<String> = self.participants.keys().cloned().collect();
        order.sort_by(|a, b| {
            let speed_a = self.participants[a].tyrant.speed;
            let speed_b = self.participants[b].tyrant.speed;
            speed_b.cmp(&speed_a).then_with(|| a.cmp(b))
        });
        self.turn_order = order;
        if self.turn_index >= self.turn_order.len() {
            self.turn_index = 0;
        }
    }

    /// Advances to the next alive participant, cyclically, leaving
    /// `turn_index` one position past the returned actor. `None` when the
    /// scene is empty or everyone is down.
    fn next_alive(&mut self) -> Option<String> {
        if self.turn_order.is_empty() {
            return None;
        }
        let n = self.turn_order.len();
        for _ in 0..n {
            let id = self.turn_order[self.turn_index].clone();
            self.turn_index = (self.turn_index + 1) % n;
            if self.participants.get(&id).map_or(false, |p| p.alive) {
                return Some(id);
            }
        }
        None
    }

    /// Upcoming turns: alive participants in acting order, starting at the
    /// current actor (or the schedule cursor when no battle is running).
    fn turn_preview(&self) -> Vec<TurnEntry> {
        if self.turn_order.is_empty() {
            return Vec::new();
        }
        let n = self.turn_order.len();
        let start = self
            .current_actor
            .as_ref()
            .and_then(|actor| self.turn_order.iter().position(|id| id == actor))
            .unwrap_or(self.turn_index % n);
        (0..n)
            .filter_map(|offset| {
                let id = &self.turn_order[(start + offset) % n];
                let p = self.participants.get(id)?;
                if !p.alive {
                    return None;
                }
                Some(TurnEntry {
                    id: id.clone(),
                    asset: p.tyrant.asset.clone(),
                    enemy: p.enemy,
                })
            })
            .collect()
    }

    /// Full per-participant snapshot in schedule order.
    fn snapshot(&self) -> Vec<TyrantStatus> {
        self.turn_order
            .iter()
            .filter_map(|id| self.participants.get(id).map(Participant::status))
            .collect()
    }

    /// The caller's own tyrant, when it has one. Smallest id wins so the
    /// lookup is deterministic when one session owns several tyrants.
    fn session_tyrant(&self, session: SessionId) -> Option<String> {
        self.tyrant_owner
            .iter()
            .filter(|(_, sid)| **sid == session)
            .map(|(id, _)| id.clone())
            .min()
    }

    /// Sender-only error, routed to the owner of `user` when that tyrant is
    /// mapped, otherwise back to the caller.
    fn reject(
        &self,
        caller: SessionId,
        user: &str,
        message: &str,
        expected: Option<String>,
    ) -> Delivery {
        let session = self.tyrant_owner.get(user).copied().unwrap_or(caller);
        Delivery::Direct(
            session,
            ServerEvent::Error {
                error: message.to_string(),
                expected,
            },
        )
    }
}
