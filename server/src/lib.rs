//! # Scene Server Library
//!
//! This library implements the authoritative server for the turn-based
//! tyrant battles. Clients connect over a websocket, enrol their tyrants
//! into one shared scene, and fight cooperatively; the server owns the
//! battle state, validates every action against the turn schedule and PP
//! budget, computes damage, and broadcasts the resulting snapshots to all
//! connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Battle State
//! All game decisions are made here. Clients only ever see the server's
//! snapshots; a client that disagrees with the server is wrong by
//! definition. Invalid actions (acting out of turn, spending exhausted PP,
//! attacking the dead) are answered with a sender-only error frame and
//! never touch shared state.
//!
//! ### Session Management
//! Each connection gets an independent read task and a dedicated writer
//! task. Sessions end on peer close or the first read error; their
//! tyrant-ownership bindings are forgotten on teardown, while their
//! participants stay on the scene until an explicit leave or battle end.
//!
//! ### State Broadcasting
//! Every state-changing event fans one frame out to all live sessions:
//! joins, battle starts, vote tallies, attack resolutions, cleans, and
//! leaves, each carrying the upcoming-turn preview.
//!
//! ## Architecture Design
//!
//! ### Single Lock, No I/O Under It
//! One readers-writer lock guards the session registry and the scene.
//! Handlers mutate under the write lock, capture the outbound frames and
//! their target channels, release, and then send. Socket writes happen on
//! per-session writer tasks, never under the lock.
//!
//! ### Injected Randomness
//! The damage roll is a trait object. Production uses the thread-local
//! RNG; tests script the roll sequence and assert exact damage numbers.
//!
//! ## Module Organization
//!
//! - [`catalog`]: the stat-block lookup contract and the in-memory
//!   implementation seeded from JSON
//! - [`participant`]: the mutable per-battle overlay (HP, alive, PP) over
//!   an immutable stat block
//! - [`scene`]: the turn scheduler, the battle and vote state machines,
//!   and attack resolution, all as a pure state machine with no I/O
//! - [`hub`]: the shared state, frame dispatch, and broadcast fan-out
//! - [`session`]: websocket upgrade, read loop, and serialized writes
//! - [`rng`]: damage roll sources

pub mod catalog;
pub mod hub;
pub mod participant;
pub mod rng;
pub mod scene;
pub mod session;
