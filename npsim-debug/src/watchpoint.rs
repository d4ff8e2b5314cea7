//! Watchpoints: monitors on a single counter's value changes.

/// Watchpoint identifier.
pub type WatchpointId = i32;

/// Fires on every value change of one counter unless disabled.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct Watchpoint {
    id: WatchpointId,
    counter: String,
    pub disabled: bool,
}

impl Watchpoint {
    pub fn new(id: WatchpointId, counter: impl Into<String>) -> Self {
        Self {
            id,
            counter: counter.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn id(&self) -> WatchpointId {
        self.id
    }

    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// Whether an update of `counter` should pause the simulation.
    pub fn fires_on(&self, counter: &str) -> bool {
        !self.disabled && self.counter == counter
    }
}
