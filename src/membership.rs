//! Membership screen state
//!
//! Storage calls run as spawned tasks and report back over a channel. Each
//! screen instance gets a generation number; completions tagged with an older
//! generation (or arriving after `leave`) are dropped without touching state.

use tokio::sync::mpsc::UnboundedSender;

use crate::prefs::{PrefError, PreferenceStore, USER_NAME_KEY};

/// Completion of a storage call started by the membership screen
#[derive(Debug)]
pub enum PrefEvent {
    Loaded {
        generation: u64,
        result: Result<String, PrefError>,
    },
    Saved {
        generation: u64,
        value: String,
        result: Result<(), PrefError>,
    },
}

/// What applying a completion did, so the shell can show feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Loaded,
    Saved(String),
    Failed(String),
    /// Belonged to a torn-down screen instance
    Stale,
}

pub struct MembershipScreen {
    store: PreferenceStore,
    events: UnboundedSender<PrefEvent>,

    generation: u64,
    active: bool,

    // Text field
    input: String,
    input_edited: bool,

    // Last value confirmed by storage
    displayed_name: String,
    loading: bool,
    saves_in_flight: usize,
    // Set once a save lands; an older load must not replace it
    saved_since_enter: bool,
    last_error: Option<String>,
}

impl MembershipScreen {
    pub fn new(store: PreferenceStore, events: UnboundedSender<PrefEvent>) -> Self {
        Self {
            store,
            events,
            generation: 0,
            active: false,
            input: String::new(),
            input_edited: false,
            displayed_name: String::new(),
            loading: false,
            saves_in_flight: 0,
            saved_since_enter: false,
            last_error: None,
        }
    }

    /// Start a new screen instance and kick off the initial load
    pub fn enter(&mut self) {
        self.generation += 1;
        self.active = true;
        self.input.clear();
        self.input_edited = false;
        self.displayed_name.clear();
        self.saves_in_flight = 0;
        self.saved_since_enter = false;
        self.last_error = None;
        self.loading = true;

        let store = self.store.clone();
        let events = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = store.load(USER_NAME_KEY).await;
            // Receiver gone means the app is shutting down
            let _ = events.send(PrefEvent::Loaded { generation, result });
        });
    }

    /// Tear the instance down. Anything still in flight is discarded on arrival.
    pub fn leave(&mut self) {
        if !self.active {
            return;
        }
        if self.loading || self.saves_in_flight > 0 {
            tracing::debug!(
                "Leaving membership screen with work in flight (loading: {}, saves: {})",
                self.loading,
                self.saves_in_flight
            );
        }
        self.active = false;
        self.generation += 1;
        self.loading = false;
        self.saves_in_flight = 0;
    }

    /// Save the current input. The displayed name only changes on completion.
    pub fn submit(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let generation = self.generation;
        let value = self.input.clone();
        self.saves_in_flight += 1;

        tokio::spawn(async move {
            let result = store.save(USER_NAME_KEY, &value).await;
            let _ = events.send(PrefEvent::Saved {
                generation,
                value,
                result,
            });
        });
        true
    }

    pub fn apply(&mut self, event: PrefEvent) -> ApplyOutcome {
        let generation = match &event {
            PrefEvent::Loaded { generation, .. } | PrefEvent::Saved { generation, .. } => *generation,
        };
        if !self.active || generation != self.generation {
            tracing::debug!("Dropping stale preference completion (generation {})", generation);
            return ApplyOutcome::Stale;
        }

        match event {
            PrefEvent::Loaded { result, .. } => {
                self.loading = false;
                match result {
                    Ok(name) => {
                        // The read may predate a save issued since; storage order wins
                        if self.saves_in_flight > 0 || self.saved_since_enter {
                            tracing::debug!("Ignoring load that raced a save");
                            return ApplyOutcome::Loaded;
                        }
                        if !self.input_edited {
                            self.input = name.clone();
                        }
                        self.displayed_name = name;
                        self.last_error = None;
                        ApplyOutcome::Loaded
                    }
                    Err(e) => self.record_failure(e),
                }
            }
            PrefEvent::Saved { value, result, .. } => {
                self.saves_in_flight = self.saves_in_flight.saturating_sub(1);
                match result {
                    Ok(()) => {
                        self.saved_since_enter = true;
                        self.displayed_name = value.clone();
                        self.last_error = None;
                        ApplyOutcome::Saved(value)
                    }
                    Err(e) => self.record_failure(e),
                }
            }
        }
    }

    fn record_failure(&mut self, e: PrefError) -> ApplyOutcome {
        tracing::warn!("Membership preference operation failed: {}", e);
        let message = e.to_string();
        self.last_error = Some(message.clone());
        ApplyOutcome::Failed(message)
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
        self.input_edited = true;
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.input_edited = true;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Confirmed name, if any. Empty means nothing to show.
    pub fn displayed_name(&self) -> Option<&str> {
        if self.displayed_name.is_empty() {
            None
        } else {
            Some(&self.displayed_name)
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saves_in_flight > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
