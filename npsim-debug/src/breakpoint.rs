//! Breakpoints: sets of AND'ed stop conditions evaluated against packet accesses.

use crate::packet::PacketId;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Breakpoint identifier.
pub type BreakpointId = i32;

/// Identifier shared by every stealth breakpoint.
pub const STEALTH_ID: BreakpointId = -1;

/// Monotonic id source for breakpoints, watchpoints and traces.
///
/// Each [`DebugState`](crate::state::DebugState) owns its own allocators, so two
/// sessions (or two tests) never share an id sequence.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicI32,
}

impl IdAllocator {
    /// Allocator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id is `first`.
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }

    /// Hand out the next id.
    pub fn next_id(&self) -> i32 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Peek at the id the next call to [`next_id`](Self::next_id) returns.
    pub fn peek(&self) -> i32 {
        self.next.load(Ordering::SeqCst)
    }

    /// Restart the sequence at `first`.
    pub fn reset(&self, first: i32) {
        self.next.store(first, Ordering::SeqCst);
    }
}

/// What a condition inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, bitcode::Encode, bitcode::Decode)]
pub enum ConditionKind {
    /// A packet is read by the named module.
    ModuleRead,
    /// A packet is written by the named module.
    ModuleWrite,
    /// Simulation time reached the stored threshold (ns).
    AtTime,
    /// The accessed packet has the stored id.
    PacketId,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionKind::ModuleRead => "module_read",
            ConditionKind::ModuleWrite => "module_write",
            ConditionKind::AtTime => "at_time",
            ConditionKind::PacketId => "packet_id",
        };
        f.write_str(name)
    }
}

/// A single stop condition. The value is kept in the textual form the client sent.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct Condition {
    pub kind: ConditionKind,
    pub value: String,
}

impl Condition {
    pub fn new(kind: ConditionKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn module_read(module: impl Into<String>) -> Self {
        Self::new(ConditionKind::ModuleRead, module)
    }

    pub fn module_write(module: impl Into<String>) -> Self {
        Self::new(ConditionKind::ModuleWrite, module)
    }

    pub fn at_time(time_ns: f64) -> Self {
        Self::new(ConditionKind::AtTime, time_ns.to_string())
    }

    pub fn packet_id(id: PacketId) -> Self {
        Self::new(ConditionKind::PacketId, id.to_string())
    }

    /// Whether this condition holds for `access`.
    ///
    /// `now` is the store's simulation clock, which may be ahead of the
    /// access's own timestamp.
    pub fn holds(&self, access: &PacketAccess<'_>, now: f64) -> bool {
        match self.kind {
            ConditionKind::ModuleRead => access.read && self.value == access.module,
            ConditionKind::ModuleWrite => !access.read && self.value == access.module,
            ConditionKind::PacketId => self.value == access.packet_id.to_string(),
            ConditionKind::AtTime => match self.value.trim().parse::<f64>() {
                Ok(threshold) => threshold <= now,
                Err(_) => {
                    tracing::warn!("Ignoring unparsable at-time condition {:?}", self.value);
                    false
                }
            },
        }
    }
}

/// A packet read or write as seen by breakpoint evaluation.
#[derive(Clone, Copy, Debug)]
pub struct PacketAccess<'a> {
    pub module: &'a str,
    pub packet_id: PacketId,
    pub time: f64,
    pub read: bool,
}

/// A named set of stop conditions.
///
/// All conditions must hold for the breakpoint to match; a kind may appear
/// more than once.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct Breakpoint {
    id: BreakpointId,
    conditions: Vec<Condition>,
    /// Removed from the store after its first hit.
    pub temporary: bool,
    /// Skipped during evaluation but kept so it can be re-enabled.
    pub disabled: bool,
}

impl Breakpoint {
    /// User-visible breakpoint with the given id.
    pub fn new(id: BreakpointId) -> Self {
        Self {
            id,
            conditions: Vec::new(),
            temporary: false,
            disabled: false,
        }
    }

    /// Internal breakpoint, never listed to the client.
    pub fn stealth() -> Self {
        Self::new(STEALTH_ID)
    }

    pub fn id(&self) -> BreakpointId {
        self.id
    }

    pub fn is_stealth(&self) -> bool {
        self.id == STEALTH_ID
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.add_condition(condition);
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn has_condition(&self, kind: ConditionKind) -> bool {
        self.conditions.iter().any(|c| c.kind == kind)
    }

    /// Duplicate check used when adding breakpoints.
    ///
    /// True when every condition of `self` appears with an equal value in
    /// `existing`. The check is one-directional: a breakpoint whose conditions
    /// are a subset of `existing`'s is reported as equivalent.
    pub fn is_equivalent(&self, existing: &Breakpoint) -> bool {
        self.conditions
            .iter()
            .all(|cond| existing.conditions.iter().any(|other| other == cond))
    }

    /// Whether every condition holds for `access`. Ignores `disabled`.
    pub fn matches(&self, access: &PacketAccess<'_>, now: f64) -> bool {
        self.conditions.iter().all(|cond| cond.holds(access, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(module: &str, packet_id: PacketId) -> PacketAccess<'_> {
        PacketAccess {
            module,
            packet_id,
            time: 10.0,
            read: true,
        }
    }

    fn write(module: &str, packet_id: PacketId) -> PacketAccess<'_> {
        PacketAccess {
            module,
            packet_id,
            time: 10.0,
            read: false,
        }
    }

    #[test]
    fn test_id_allocator() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.peek(), 2);

        ids.reset(10);
        assert_eq!(ids.next_id(), 10);

        let seeded = IdAllocator::starting_at(5);
        assert_eq!(seeded.next_id(), 5);
    }

    #[test]
    fn test_module_read_condition() {
        let cond = Condition::module_read("parser");
        assert!(cond.holds(&read("parser", 1), 0.0));
        assert!(!cond.holds(&write("parser", 1), 0.0));
        assert!(!cond.holds(&read("deparser", 1), 0.0));
    }

    #[test]
    fn test_module_write_condition() {
        let cond = Condition::module_write("queue");
        assert!(cond.holds(&write("queue", 1), 0.0));
        assert!(!cond.holds(&read("queue", 1), 0.0));
    }

    #[test]
    fn test_packet_id_condition() {
        let cond = Condition::packet_id(42);
        assert!(cond.holds(&read("any", 42), 0.0));
        assert!(!cond.holds(&read("any", 43), 0.0));

        // Compared as text, so a padded value never matches
        let padded = Condition::new(ConditionKind::PacketId, "042");
        assert!(!padded.holds(&read("any", 42), 0.0));
    }

    #[test]
    fn test_at_time_condition() {
        let cond = Condition::at_time(1500.0);
        assert!(!cond.holds(&read("m", 1), 1499.9));
        assert!(cond.holds(&read("m", 1), 1500.0));
        assert!(cond.holds(&read("m", 1), 2000.0));

        let legacy = Condition::new(ConditionKind::AtTime, "1500.000000");
        assert!(legacy.holds(&read("m", 1), 1500.0));

        let garbage = Condition::new(ConditionKind::AtTime, "soon");
        assert!(!garbage.holds(&read("m", 1), f64::MAX));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let bp = Breakpoint::new(0)
            .with_condition(Condition::module_read("parser"))
            .with_condition(Condition::packet_id(7));

        assert!(bp.matches(&read("parser", 7), 0.0));
        assert!(!bp.matches(&read("parser", 8), 0.0));
        assert!(!bp.matches(&write("parser", 7), 0.0));
    }

    #[test]
    fn test_duplicate_kinds_are_anded() {
        let bp = Breakpoint::new(0)
            .with_condition(Condition::module_read("a"))
            .with_condition(Condition::module_read("b"));

        assert!(!bp.matches(&read("a", 1), 0.0));
        assert!(!bp.matches(&read("b", 1), 0.0));
    }

    #[test]
    fn test_equivalence_is_one_directional() {
        let narrow = Breakpoint::new(0).with_condition(Condition::module_read("parser"));
        let wide = Breakpoint::new(1)
            .with_condition(Condition::module_read("parser"))
            .with_condition(Condition::packet_id(3));

        assert!(narrow.is_equivalent(&wide));
        assert!(!wide.is_equivalent(&narrow));
        assert!(narrow.is_equivalent(&narrow.clone()));
    }

    #[test]
    fn test_stealth() {
        let bp = Breakpoint::stealth();
        assert!(bp.is_stealth());
        assert_eq!(bp.id(), STEALTH_ID);
        assert!(!Breakpoint::new(0).is_stealth());
    }
}
