//! Packet tracking: what the debugger knows about packets moving through the simulation.

use std::fmt;
use std::sync::Arc;

/// Simulation-assigned packet id. Unique while the packet is live.
pub type PacketId = u64;

/// Capability a simulated payload exposes to the debugger.
///
/// Payloads that are not debuggable are ignored entirely by the observer.
pub trait Payload: Send + Sync {
    /// Packet id, unique among live debuggable payloads.
    fn id(&self) -> PacketId;

    /// Human readable payload type, used in logs only.
    fn data_type(&self) -> &str {
        "payload"
    }

    fn is_debuggable(&self) -> bool {
        false
    }

    /// Read-only view into the parsed packet, if the payload offers one.
    fn debug_info(&self) -> Option<Arc<dyn DebugInfo>> {
        None
    }
}

/// Read-only view into a live packet's parsed representation.
///
/// The simulator invalidates the view once the underlying packet is gone.
pub trait DebugInfo: Send + Sync {
    fn is_valid(&self) -> bool;

    /// Parsed headers in packet order.
    fn headers(&self) -> Vec<Header>;
}

/// A parsed packet header.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct Header {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Header {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// A header field rendered as text.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// One visit of a packet to a module.
///
/// `read_time` is missing when the packet left a module it was never seen
/// entering; `write_time` is missing while the packet is still inside.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct PacketLocation {
    pub module: String,
    pub read_time: Option<f64>,
    pub write_time: Option<f64>,
}

/// Debugger-side record of a live packet.
#[derive(Clone)]
pub struct TrackedPacket {
    id: PacketId,
    location: String,
    last_update: f64,
    debug_info: Option<Arc<dyn DebugInfo>>,
    trace: Vec<PacketLocation>,
}

impl TrackedPacket {
    pub fn new(id: PacketId, location: impl Into<String>, time: f64) -> Self {
        Self {
            id,
            location: location.into(),
            last_update: time,
            debug_info: None,
            trace: Vec::new(),
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Module the packet was last read by.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    pub fn trace(&self) -> &[PacketLocation] {
        &self.trace
    }

    /// The debug-info snapshot, unless the simulator invalidated it.
    pub fn debug_info(&self) -> Option<&Arc<dyn DebugInfo>> {
        self.debug_info.as_ref().filter(|info| info.is_valid())
    }

    pub fn set_debug_info(&mut self, debug_info: Option<Arc<dyn DebugInfo>>) {
        self.debug_info = debug_info;
    }

    /// Record the packet entering `module`.
    pub fn enter(&mut self, module: &str, time: f64) {
        self.location = module.to_string();
        self.last_update = time;
        self.trace.push(PacketLocation {
            module: module.to_string(),
            read_time: Some(time),
            write_time: None,
        });
    }

    /// Record the packet leaving `module`.
    ///
    /// Closes the most recent open visit to `module`; opens a write-only
    /// visit if there is none.
    pub fn leave(&mut self, module: &str, time: f64) {
        let open = self
            .trace
            .iter_mut()
            .rev()
            .find(|loc| loc.module == module && loc.write_time.is_none());

        match open {
            Some(loc) => loc.write_time = Some(time),
            None => self.trace.push(PacketLocation {
                module: module.to_string(),
                read_time: None,
                write_time: Some(time),
            }),
        }
    }

    pub fn summary(&self) -> PacketSummary {
        PacketSummary {
            id: self.id,
            location: self.location.clone(),
            time: self.last_update,
        }
    }
}

impl fmt::Debug for TrackedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedPacket")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("last_update", &self.last_update)
            .field("has_debug_info", &self.debug_info.is_some())
            .field("trace", &self.trace)
            .finish()
    }
}

/// Packet list entry sent to the client.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct PacketSummary {
    pub id: PacketId,
    pub location: String,
    pub time: f64,
}

/// Entry of the dropped-packet log.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct DroppedPacket {
    pub id: PacketId,
    pub module: String,
    pub reason: String,
}
