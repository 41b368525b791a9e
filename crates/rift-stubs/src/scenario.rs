//! Scenario state machine.
//!
//! A scenario is a named string state shared by every stub that references it.
//! Stubs hold the scenario name only; the live state is owned by [`Scenarios`]
//! and resolved each time a stub is evaluated.

use crate::config::ScenarioConfig;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// State every scenario starts in
pub const STARTED: &str = "Started";

/// Read/write access to scenario states as seen by stub gating and transitions.
pub trait ScenarioStates {
    /// Current state of `name`, or `None` if the scenario is unknown
    fn current_state(&self, name: &str) -> Option<&str>;

    /// Overwrite the state of `name`. Any string is a legal state.
    fn transition(&mut self, name: &str, new_state: &str);
}

impl ScenarioStates for HashMap<String, String> {
    fn current_state(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn transition(&mut self, name: &str, new_state: &str) {
        match self.get_mut(name) {
            Some(state) => {
                if state != new_state {
                    debug!("Scenario '{}': '{}' -> '{}'", name, state, new_state);
                    *state = new_state.to_string();
                }
            }
            None => {
                debug!("Scenario '{}' created in state '{}'", name, new_state);
                self.insert(name.to_string(), new_state.to_string());
            }
        }
    }
}

/// Point-in-time view of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    pub state: String,
    /// States mentioned by registered stubs (required or new)
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub possible_states: BTreeSet<String>,
}

/// Registry of live scenario states
#[derive(Debug, Default)]
pub struct Scenarios {
    states: Mutex<HashMap<String, String>>,
    /// Configured starting states; scenarios not listed start at [`STARTED`]
    initial: HashMap<String, String>,
}

/// Exclusive view over all scenario states.
///
/// Holding the table keeps gating reads and transition writes of one served
/// request atomic with respect to other requests.
pub struct ScenarioTable<'a> {
    states: MutexGuard<'a, HashMap<String, String>>,
}

impl ScenarioStates for ScenarioTable<'_> {
    fn current_state(&self, name: &str) -> Option<&str> {
        self.states.current_state(name)
    }

    fn transition(&mut self, name: &str, new_state: &str) {
        self.states.transition(name, new_state)
    }
}

impl Scenarios {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scenarios with configured starting states. Listed scenarios exist
    /// immediately.
    pub fn from_config(config: &ScenarioConfig) -> Self {
        let initial: HashMap<String, String> = config
            .initial
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect();
        Self {
            states: Mutex::new(initial.clone()),
            initial,
        }
    }

    pub fn lock(&self) -> ScenarioTable<'_> {
        ScenarioTable {
            states: self.states.lock(),
        }
    }

    pub fn get_state(&self, name: &str) -> Option<String> {
        self.states.lock().get(name).cloned()
    }

    /// Unconditionally overwrite the state, creating the scenario if needed.
    pub fn set_state(&self, name: &str, state: &str) {
        self.states.lock().transition(name, state);
    }

    /// Create the scenario in its starting state if it does not exist yet.
    pub fn ensure(&self, name: &str) {
        let mut states = self.states.lock();
        if !states.contains_key(name) {
            let start = self.starting_state(name).to_string();
            debug!("Scenario '{}' registered in state '{}'", name, start);
            states.insert(name.to_string(), start);
        }
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.states.lock().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.lock().contains_key(name)
    }

    /// Return every scenario to its starting state.
    pub fn reset_all(&self) {
        let mut states = self.states.lock();
        for (name, state) in states.iter_mut() {
            *state = self.starting_state(name).to_string();
        }
        info!("Reset {} scenario(s)", states.len());
    }

    /// Drop every scenario. Configured scenarios are recreated in their
    /// initial state.
    pub fn clear(&self) {
        *self.states.lock() = self.initial.clone();
    }

    /// Whether `name` has a configured starting state
    pub fn is_configured(&self, name: &str) -> bool {
        self.initial.contains_key(name)
    }

    /// Snapshot sorted by scenario name
    pub fn snapshot(&self) -> Vec<Scenario> {
        let states = self.states.lock();
        let mut scenarios: Vec<Scenario> = states
            .iter()
            .map(|(name, state)| Scenario {
                name: name.clone(),
                state: state.clone(),
                possible_states: BTreeSet::new(),
            })
            .collect();
        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        scenarios
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn starting_state(&self, name: &str) -> &str {
        self.initial.get(name).map(String::as_str).unwrap_or(STARTED)
    }
}
