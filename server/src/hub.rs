//! The scene hub: one shared state, one lock, fan-out to every session.
//!
//! All session registration and every scene mutation happen under a single
//! readers-writer lock. A handler acquires the lock, mutates, resolves the
//! resulting [`Delivery`] into `(sender, frame)` pairs captured from the
//! registry, releases the lock, and only then pushes the frames; channel
//! sends are non-blocking, and the actual socket writes happen on each
//! session's writer task. The lock is never held across I/O.

use crate::catalog::TyrantCatalog;
use crate::rng::DamageRoll;
use crate::scene::{Delivery, Scene};
use crate::session::{self, SessionId};
use log::{debug, error, warn};
use shared::protocol::{ClientFrame, ServerEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;

/// Everything guarded by the hub lock: the live session registry and the
/// scene itself.
struct HubState {
    sessions: HashMap<SessionId, UnboundedSender<Message>>,
    next_session_id: SessionId,
    scene: Scene,
}

impl HubState {
    /// Resolves a delivery into concrete `(sender, frame)` pairs. Called
    /// under the lock so the session set and the state transition that
    /// produced the frame are observed atomically.
    fn route(&self, delivery: Delivery) -> Vec<(UnboundedSender<Message>, Message)> {
        match delivery {
            Delivery::Broadcast(event) => match encode(&event) {
                Some(frame) => self
                    .sessions
                    .values()
                    .map(|tx| (tx.clone(), frame.clone()))
                    .collect(),
                None => Vec::new(),
            },
            Delivery::Direct(session, event) => match (self.sessions.get(&session), encode(&event))
            {
                (Some(tx), Some(frame)) => vec![(tx.clone(), frame)],
                _ => Vec::new(),
            },
        }
    }
}

fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            error!("failed to encode outbound frame: {}", e);
            None
        }
    }
}

/// The authoritative scene server.
pub struct Hub {
    catalog: Arc<dyn TyrantCatalog>,
    state: RwLock<HubState>,
}

impl Hub {
    pub fn new(catalog: Arc<dyn TyrantCatalog>, dice: Box<dyn DamageRoll>) -> Self {
        Hub {
            catalog,
            state: RwLock::new(HubState {
                sessions: HashMap::new(),
                next_session_id: 1,
                scene: Scene::new(dice),
            }),
        }
    }

    /// Accept loop: one spawned session task per inbound connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = Arc::clone(&self);
                    tokio::spawn(async move {
                        session::run(hub, stream, addr).await;
                    });
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    }

    /// Registers a session's outbound channel and hands back its id.
    pub async fn register(&self, tx: UnboundedSender<Message>) -> SessionId {
        let mut state = self.state.write().await;
        let id = state.next_session_id;
        state.next_session_id += 1;
        state.sessions.insert(id, tx);
        debug!("session {} registered ({} live)", id, state.sessions.len());
        id
    }

    /// Tears a session out of the registry and forgets its tyrant-owner
    /// bindings. Its participants stay on the scene.
    pub async fn unregister(&self, session: SessionId) {
        let mut state = self.state.write().await;
        state.sessions.remove(&session);
        state.scene.drop_session(session);
        debug!("session {} removed ({} live)", session, state.sessions.len());
    }

    /// Acts on one inbound frame. Dispatches on the first recognized field
    /// in priority order: image, join, battle, attack, clean, leave, vote.
    pub async fn dispatch(&self, session: SessionId, frame: ClientFrame) {
        if let Some(image) = frame.image {
            self.broadcast(ServerEvent::Image {
                image,
                fill: frame.fill,
            })
            .await;
        } else if let Some(id) = frame.join {
            self.handle_join(session, id, frame.enemy.unwrap_or(false))
                .await;
        } else if let Some(anchor) = frame.battle {
            let vote_enabled = frame.vote_enabled.unwrap_or(false);
            self.apply(session, move |scene, _| scene.battle(anchor, vote_enabled))
                .await;
        } else if let Some(cmd) = frame.attack {
            self.apply(session, move |scene, caller| scene.attack(caller, &cmd))
                .await;
        } else if frame.clean.unwrap_or(false) {
            self.apply(session, |scene, _| scene.clean()).await;
        } else if let Some(ally) = frame.leave {
            let user = frame.user;
            self.apply(session, move |scene, caller| {
                scene.leave(caller, Some(ally), user)
            })
            .await;
        } else if let Some(choice) = frame.vote {
            let user = frame.user;
            self.apply(session, move |scene, caller| {
                scene.vote(caller, user, &choice)
            })
            .await;
        } else {
            debug!("session {}: frame carried no recognized field", session);
        }
    }

    async fn handle_join(&self, session: SessionId, id: String, enemy: bool) {
        // The catalogue is consulted before the scene lock is taken.
        match self.catalog.get_tyrant(&id) {
            Some(tyrant) => {
                self.apply(session, move |scene, caller| {
                    scene.join(caller, tyrant, enemy)
                })
                .await;
            }
            None => {
                warn!("session {}: join for unknown tyrant '{}'", session, id);
                self.direct(session, ServerEvent::error("tyrant not found"))
                    .await;
            }
        }
    }

    /// Runs one scene mutation under the write lock, then delivers the
    /// resulting frame after the lock is gone.
    async fn apply<F>(&self, session: SessionId, op: F)
    where
        F: FnOnce(&mut Scene, SessionId) -> Delivery,
    {
        let outbound = {
            let mut state = self.state.write().await;
            let delivery = op(&mut state.scene, session);
            state.route(delivery)
        };
        deliver(outbound);
    }

    /// Stateless broadcast; only the session registry is read.
    async fn broadcast(&self, event: ServerEvent) {
        let outbound = {
            let state = self.state.read().await;
            state.route(Delivery::Broadcast(event))
        };
        deliver(outbound);
    }

    /// Frame for one specific session.
    async fn direct(&self, session: SessionId, event: ServerEvent) {
        let outbound = {
            let state = self.state.read().await;
            state.route(Delivery::Direct(session, event))
        };
        deliver(outbound);
    }
}

fn deliver(outbound: Vec<(UnboundedSender<Message>, Message)>) {
    for (tx, frame) in outbound {
        // A closed receiver just means the session is tearing down.
        if tx.send(frame).is_err() {
            debug!("dropped a frame for a closing session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::rng::ScriptedRoll;
    use serde_json::{json, Value};
    use shared::{Attack, Tyrant};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn hero() -> Tyrant {
        Tyrant {
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
        }
    }

    fn hub() -> Hub {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(hero());
        Hub::new(
            Arc::new(catalog),
            Box::new(ScriptedRoll::new(vec![50])),
        )
    }

    async fn connect(hub: &Hub) -> (SessionId, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (hub.register(tx).await, rx)
    }

    fn next_frame(rx: &mut UnboundedReceiver<Message>) -> Value {
        let msg = rx.try_recv().expect("expected a frame");
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    fn frame(raw: Value) -> ClientFrame {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn test_image_frames_reach_every_session() {
        let hub = hub();
        let (a, mut rx_a) = connect(&hub).await;
        let (_b, mut rx_b) = connect(&hub).await;

        hub.dispatch(a, frame(json!({"image": "cave", "fill": true})))
            .await;

        let expected = json!({"image": "cave", "fill": true});
        assert_eq!(next_frame(&mut rx_a), expected);
        assert_eq!(next_frame(&mut rx_b), expected);
    }

    #[tokio::test]
    async fn test_unknown_tyrant_error_is_sender_only() {
        let hub = hub();
        let (a, mut rx_a) = connect(&hub).await;
        let (_b, mut rx_b) = connect(&hub).await;

        hub.dispatch(a, frame(json!({"join": "GHOST"}))).await;

        assert_eq!(next_frame(&mut rx_a), json!({"error": "tyrant not found"}));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_broadcast_reaches_every_session() {
        let hub = hub();
        let (a, mut rx_a) = connect(&hub).await;
        let (_b, mut rx_b) = connect(&hub).await;

        hub.dispatch(a, frame(json!({"join": "HERO"}))).await;

        let event = next_frame(&mut rx_a);
        assert_eq!(event["joined"], "HERO");
        assert_eq!(event["enemy"], false);
        assert_eq!(event["turns"][0]["id"], "HERO");
        assert_eq!(next_frame(&mut rx_b), event);
    }

    #[tokio::test]
    async fn test_empty_frame_is_ignored() {
        let hub = hub();
        let (a, mut rx_a) = connect(&hub).await;

        hub.dispatch(a, frame(json!({}))).await;
        hub.dispatch(a, frame(json!({"clean": false}))).await;

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_stops_fanout_but_keeps_participants() {
        let hub = hub();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;

        hub.dispatch(a, frame(json!({"join": "HERO"}))).await;
        next_frame(&mut rx_a);
        next_frame(&mut rx_b);

        hub.unregister(b).await;
        hub.dispatch(a, frame(json!({"image": "cave"}))).await;
        assert_eq!(next_frame(&mut rx_a), json!({"image": "cave"}));
        assert!(rx_b.try_recv().is_err());

        // The participant outlives its session; a new session can still
        // fight with it.
        hub.dispatch(a, frame(json!({"battle": "HERO"}))).await;
        let event = next_frame(&mut rx_a);
        assert_eq!(event["battle"], "HERO");
        assert_eq!(event["tyrants"][0]["id"], "HERO");
    }
}
