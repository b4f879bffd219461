//! # Shared Battle Library
//!
//! This crate contains the data structures, wire protocol, and combat
//! arithmetic shared between the scene server and anything that speaks to
//! it (test harnesses, bots, future clients). It is the single source of
//! truth for everything both ends of the websocket must agree on.
//!
//! ## Core Components
//!
//! ### Data Model (`models`)
//! The immutable tyrant stat block as served by the catalogue:
//! - **Tyrant**: identifier, display asset, base HP, attack stats, defense,
//!   speed, and the ordered attack list
//! - **Attack**: a named action with a power value, a PP budget, and
//!   free-form tag strings
//!
//! ### Wire Protocol (`protocol`)
//! The complete JSON frame grammar for the scene websocket:
//! - **Inbound**: one all-optional `ClientFrame` shape covering every client
//!   command (`image`, `join`, `battle`, `attack`, `clean`, `leave`, `vote`)
//! - **Outbound**: `ServerEvent` variants keyed by event name, including the
//!   turn preview, the per-tyrant snapshot, vote tallies, and the
//!   sender-only error frame
//!
//! ### Combat Arithmetic (`combat`)
//! The damage formula with its named constants (roll range, crit threshold,
//! power scaling, minimum damage). Kept here so the server and every test
//! compute identical numbers from identical inputs.
//!
//! ## Design Philosophy
//!
//! ### Exact Wire Compatibility
//! Frame keys like `voteEnabled`, `fullPP`, and `updateState` are pinned
//! with explicit serde renames. A renamed Rust field can never silently
//! change the protocol.
//!
//! ### Deterministic Arithmetic
//! All battle math is integer math. Given the same roll, the same stat
//! block, and the same attack, every participant in the system derives the
//! same damage, which is what makes scripted-roll testing possible.

pub mod combat;
pub mod models;
pub mod protocol;

pub use models::{Attack, Tyrant};
