use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::config::ParticipantConfig;
use crate::environment::GameHandle;

use super::token::mint_token;

/// Engine handle of a session, shared with whichever connection owns it.
pub type SessionGame = Arc<Mutex<GameHandle>>;

struct Attached {
    generation: u64,
    game: SessionGame,
}

struct Bound {
    token: String,
    owner: u64,
    game: Option<Attached>,
}

/// Participant credentials and the one live session per participant.
///
/// One registry belongs to one server instance and is shared by `Arc`
/// between its connections. A session is owned by exactly one connection:
/// logging in again replaces the token, and a relogin moves the existing
/// token to the connection that presented it. Either way the previous owner
/// loses the session. The session's engine handle lives here too, so it
/// travels with the token.
#[derive(Default)]
pub struct SessionRegistry {
    participants: HashMap<String, String>,
    bound: DashMap<String, Bound>,
    next_owner: AtomicU64,
}

impl SessionRegistry {
    pub fn new<I, U, P>(participants: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            participants: participants
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
            bound: DashMap::new(),
            next_owner: AtomicU64::new(1),
        }
    }

    pub fn from_config(participants: &[ParticipantConfig]) -> Self {
        Self::new(
            participants
                .iter()
                .map(|p| (p.user.clone(), p.passphrase.clone())),
        )
    }

    /// Identity for a new connection.
    pub fn next_owner(&self) -> u64 {
        self.next_owner.fetch_add(1, Ordering::Relaxed)
    }

    pub fn authenticate(&self, user: &str, passphrase: &str) -> bool {
        self.participants
            .get(user)
            .is_some_and(|expected| expected == passphrase)
    }

    /// Mint a token for `user` owned by `owner`, replacing any previous binding.
    pub fn bind(&self, user: &str, owner: u64) -> String {
        let token = mint_token();
        self.bound.insert(
            user.to_string(),
            Bound {
                token: token.clone(),
                owner,
                game: None,
            },
        );
        token
    }

    /// Move the session holding `token` to `owner`. Returns its participant.
    pub fn rebind(&self, token: &str, owner: u64) -> Option<String> {
        self.bound.iter_mut().find(|e| e.value().token == token).map(|mut e| {
            e.value_mut().owner = owner;
            e.key().clone()
        })
    }

    pub fn is_current(&self, user: &str, token: &str, owner: u64) -> bool {
        self.bound
            .get(user)
            .is_some_and(|b| b.token == token && b.owner == owner)
    }

    /// Remove the binding only if it is still `token` held by `owner`.
    pub fn unbind(&self, user: &str, token: &str, owner: u64) -> bool {
        self.bound
            .remove_if(user, |_, b| b.token == token && b.owner == owner)
            .is_some()
    }

    /// Engine handle of the session, if one was attached under `generation`.
    pub fn game(&self, user: &str, token: &str, generation: u64) -> Option<SessionGame> {
        let bound = self.bound.get(user)?;
        match &bound.game {
            Some(attached) if bound.token == token && attached.generation == generation => {
                Some(Arc::clone(&attached.game))
            }
            _ => None,
        }
    }

    /// Store the engine handle of a session; ignored once `token` is superseded.
    pub fn set_game(&self, user: &str, token: &str, generation: u64, game: SessionGame) {
        if let Some(mut bound) = self.bound.get_mut(user) {
            if bound.token == token {
                bound.game = Some(Attached { generation, game });
            }
        }
    }

    pub fn clear_game(&self, user: &str, token: &str) {
        if let Some(mut bound) = self.bound.get_mut(user) {
            if bound.token == token {
                bound.game = None;
            }
        }
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }
}
