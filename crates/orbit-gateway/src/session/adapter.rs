//! Server-side Session Adapter.
//!
//! One adapter per connection. It authenticates the participant, holds the
//! connection's token binding, and forwards gameplay to a lazily attached
//! engine handle kept on the session in the registry. Every gameplay request
//! passes through [`SessionAdapter::ensure_game`] before it reaches the
//! engine; the adapter itself contains no game logic.

use std::sync::{Arc, Mutex, PoisonError};

use orbit_core::types::Welcome;
use orbit_core::{Caller, ControlRequest, Message, Reply, Request, RpcError, RpcResult};

use crate::dispatch::CallTarget;
use crate::environment::{Environment, EnvironmentStatus};

use super::registry::{SessionGame, SessionRegistry};

#[derive(Debug, Clone)]
struct Binding {
    participant: String,
    token: String,
}

pub struct SessionAdapter {
    registry: Arc<SessionRegistry>,
    environment: Arc<dyn Environment>,
    protocol_version: String,
    owner: u64,
    binding: Option<Binding>,
}

impl SessionAdapter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        environment: Arc<dyn Environment>,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            owner: registry.next_owner(),
            registry,
            environment,
            protocol_version: protocol_version.into(),
            binding: None,
        }
    }

    pub fn participant(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.participant.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.token.as_str())
    }

    /// Version is compared before credentials; neither failure mints a token.
    pub fn login(
        &mut self,
        user: &str,
        passphrase: &str,
        protocol_version: &str,
    ) -> RpcResult<Welcome> {
        if protocol_version != self.protocol_version {
            tracing::warn!(user, client = protocol_version, server = %self.protocol_version, "login rejected: version");
            return Err(RpcError::version(protocol_version, &self.protocol_version));
        }
        if !self.registry.authenticate(user, passphrase) {
            tracing::warn!(user, "login rejected: credentials");
            return Err(RpcError::user(user));
        }

        self.release_other(user);
        let token = self.registry.bind(user, self.owner);
        self.binding = Some(Binding {
            participant: user.to_string(),
            token: token.clone(),
        });
        tracing::info!(user, "login");
        Ok(Welcome { session_id: token })
    }

    /// Take over the session holding `token`. Never mints; the connection
    /// that held it before falls back to SESSION_INVALID.
    pub fn relogin(&mut self, token: &str) -> RpcResult<()> {
        let Some(participant) = self.registry.rebind(token, self.owner) else {
            tracing::warn!("relogin rejected: unknown or superseded token");
            return Err(RpcError::session_invalid());
        };

        self.release_other(&participant);
        tracing::info!(user = %participant, "relogin");
        self.binding = Some(Binding {
            participant,
            token: token.to_string(),
        });
        Ok(())
    }

    pub fn leave(&mut self) -> RpcResult<()> {
        self.ensure_login()?;
        if let Some(binding) = self.binding.take() {
            self.registry
                .unbind(&binding.participant, &binding.token, self.owner);
            tracing::info!(user = %binding.participant, "leave");
        }
        Ok(())
    }

    /// Drop this connection's hold on a participant other than `keep`.
    fn release_other(&self, keep: &str) {
        let Some(binding) = self.binding.as_ref().filter(|b| b.participant != keep) else {
            return;
        };
        if self
            .registry
            .unbind(&binding.participant, &binding.token, self.owner)
        {
            tracing::info!(user = %binding.participant, "released on switch");
        }
    }

    /// Participant of a live binding.
    pub fn ensure_login(&self) -> RpcResult<&str> {
        let binding = self.binding.as_ref().ok_or_else(RpcError::not_logged_in)?;
        if !self
            .registry
            .is_current(&binding.participant, &binding.token, self.owner)
        {
            return Err(RpcError::session_invalid());
        }
        Ok(&binding.participant)
    }

    /// Engine handle for this session, attached on first use and reused
    /// until the session ends or the game instance changes.
    pub fn ensure_game(&mut self) -> RpcResult<SessionGame> {
        let participant = self.ensure_login()?.to_string();
        let token = self.token().unwrap_or_default().to_string();

        let generation = self.environment.generation();
        let unavailable = match self.environment.status() {
            EnvironmentStatus::Loading => Some(RpcError::not_ready()),
            EnvironmentStatus::Idle => Some(RpcError::no_game_running()),
            EnvironmentStatus::Running => None,
        };
        if let Some(err) = unavailable {
            self.registry.clear_game(&participant, &token);
            return Err(err);
        }

        if let Some(game) = self.registry.game(&participant, &token, generation) {
            return Ok(game);
        }
        tracing::debug!(user = %participant, generation, "attaching game handle");
        let game = match self.environment.attach(&participant) {
            Ok(handle) => Arc::new(Mutex::new(handle)),
            Err(err) => {
                self.registry.clear_game(&participant, &token);
                return Err(err);
            }
        };
        self.registry
            .set_game(&participant, &token, generation, Arc::clone(&game));
        Ok(game)
    }
}

impl CallTarget for SessionAdapter {
    fn execute(&mut self, request: Request) -> RpcResult<Message> {
        let name = request.op().response_name();
        match request {
            Request::Control(control) => match control {
                ControlRequest::Ping {} => Ok(().into_reply(name)),
                ControlRequest::Login {
                    user,
                    passphrase,
                    protocol_version,
                } => self
                    .login(&user, &passphrase, &protocol_version)
                    .map(|welcome| welcome.into_reply(name)),
                ControlRequest::Relogin { session } => {
                    self.relogin(&session).map(|()| ().into_reply(name))
                }
                ControlRequest::Leave {} => self.leave().map(|()| ().into_reply(name)),
            },
            Request::Gameplay(gameplay) => {
                let game = self.ensure_game()?;
                let mut engine = game.lock().unwrap_or_else(PoisonError::into_inner);
                gameplay.execute(&mut **engine)
            }
        }
    }
}

impl Caller for SessionAdapter {
    fn call<R: Reply>(&mut self, request: Request) -> RpcResult<R> {
        let name = request.op().response_name();
        let reply = self.execute(request)?;
        R::from_reply(reply, name)
    }
}
