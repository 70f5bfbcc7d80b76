//! Worker lifecycle state machine.
//!
//! `installing -> installed -> activating -> active -> superseded`, plus
//! `registered` before the first install and `redundant` after a failed
//! one. [`transition`] is pure: it decides which step an event calls for,
//! and the worker loop runs that step before committing the next state.

use std::str::FromStr;

use fixie_core::Error;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Registered,
    Installing,
    Installed,
    Activating,
    Active,
    Superseded,
    Redundant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install,
    Activate,
    /// Take over now instead of waiting; from the page or from install itself.
    SkipWaiting,
    /// A newer generation has taken control.
    Supersede,
}

/// Work the loop must perform for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Install,
    Activate,
    /// Record the request; install will activate straight away when it completes.
    DeferSkipWaiting,
    Retire,
    Ignore,
}

/// Messages a controlled page may post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    SkipWaiting,
}

impl FromStr for ClientMessage {
    type Err = Error;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "SKIP_WAITING" => Ok(ClientMessage::SkipWaiting),
            other => Err(Error::InvalidInput(format!("unknown message type: {other}"))),
        }
    }
}

impl From<ClientMessage> for LifecycleEvent {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::SkipWaiting => LifecycleEvent::SkipWaiting,
        }
    }
}

/// Decide what `event` means in `state`.
pub fn transition(state: LifecycleState, event: LifecycleEvent) -> Result<Step, Error> {
    use LifecycleEvent as E;
    use LifecycleState as S;

    match (state, event) {
        (S::Installing | S::Activating, _) => {
            Err(Error::InvalidState(format!("{event:?} received while {state:?}")))
        }
        (S::Superseded, E::Supersede) => Ok(Step::Ignore),
        (S::Superseded, _) => Err(Error::InvalidState("worker has been superseded".into())),
        (_, E::Supersede) => Ok(Step::Retire),

        (S::Registered | S::Redundant, E::Install) => Ok(Step::Install),
        (S::Registered | S::Redundant, E::SkipWaiting) => Ok(Step::DeferSkipWaiting),
        (S::Registered | S::Redundant, E::Activate) => {
            Err(Error::InvalidState(format!("cannot activate from {state:?}; install first")))
        }

        (S::Installed, E::Activate | E::SkipWaiting) => Ok(Step::Activate),
        (S::Installed | S::Active, E::Install) => Ok(Step::Ignore),
        (S::Active, E::Activate | E::SkipWaiting) => Ok(Step::Ignore),
    }
}

/// Current lifecycle position plus the flags that steer it.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    skip_waiting: bool,
    controls_clients: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { state: LifecycleState::Registered, skip_waiting: false, controls_clients: false }
    }
}

impl Lifecycle {
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    /// Whether fetches from pages go through the router.
    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    pub fn step(&self, event: LifecycleEvent) -> Result<Step, Error> {
        transition(self.state, event)
    }

    pub fn request_skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub fn enter(&mut self, state: LifecycleState) {
        tracing::info!(from = ?self.state, to = ?state, "lifecycle transition");
        self.state = state;
        if !matches!(state, LifecycleState::Active) {
            self.controls_clients = false;
        }
    }

    /// Take control of every open page.
    pub fn claim(&mut self) {
        self.enter(LifecycleState::Active);
        self.controls_clients = true;
        self.skip_waiting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent as E;
    use LifecycleState as S;

    #[test]
    fn test_happy_path() {
        assert_eq!(transition(S::Registered, E::Install).unwrap(), Step::Install);
        assert_eq!(transition(S::Installed, E::Activate).unwrap(), Step::Activate);
        assert_eq!(transition(S::Active, E::Supersede).unwrap(), Step::Retire);
    }

    #[test]
    fn test_skip_waiting_activates_installed_worker() {
        assert_eq!(transition(S::Installed, E::SkipWaiting).unwrap(), Step::Activate);
    }

    #[test]
    fn test_skip_waiting_before_install_is_deferred() {
        assert_eq!(transition(S::Registered, E::SkipWaiting).unwrap(), Step::DeferSkipWaiting);
    }

    #[test]
    fn test_activate_before_install_rejected() {
        assert!(matches!(transition(S::Registered, E::Activate), Err(Error::InvalidState(_))));
        assert!(matches!(transition(S::Redundant, E::Activate), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_failed_install_can_retry() {
        assert_eq!(transition(S::Redundant, E::Install).unwrap(), Step::Install);
    }

    #[test]
    fn test_repeated_events_are_ignored() {
        assert_eq!(transition(S::Active, E::Install).unwrap(), Step::Ignore);
        assert_eq!(transition(S::Active, E::Activate).unwrap(), Step::Ignore);
        assert_eq!(transition(S::Active, E::SkipWaiting).unwrap(), Step::Ignore);
        assert_eq!(transition(S::Installed, E::Install).unwrap(), Step::Ignore);
    }

    #[test]
    fn test_superseded_is_terminal() {
        assert!(matches!(transition(S::Superseded, E::Install), Err(Error::InvalidState(_))));
        assert_eq!(transition(S::Superseded, E::Supersede).unwrap(), Step::Ignore);
    }

    #[test]
    fn test_busy_states_reject_events() {
        assert!(transition(S::Installing, E::Activate).is_err());
        assert!(transition(S::Activating, E::Install).is_err());
    }

    #[test]
    fn test_claim_controls_clients_until_superseded() {
        let mut lifecycle = Lifecycle::default();
        assert!(!lifecycle.controls_clients());

        lifecycle.claim();
        assert_eq!(lifecycle.state(), S::Active);
        assert!(lifecycle.controls_clients());

        lifecycle.enter(S::Superseded);
        assert!(!lifecycle.controls_clients());
    }

    #[test]
    fn test_client_message_parsing() {
        assert_eq!("SKIP_WAITING".parse::<ClientMessage>().unwrap(), ClientMessage::SkipWaiting);
        assert!("skip_waiting".parse::<ClientMessage>().is_err());
        assert_eq!(LifecycleEvent::from(ClientMessage::SkipWaiting), LifecycleEvent::SkipWaiting);
    }
}
