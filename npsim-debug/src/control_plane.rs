//! Shadow of the control plane's table entries.
//!
//! The control-plane module owns the real tables. It reports each insert,
//! modify and delete here twice: once when it issues the request and once when
//! the data plane confirms it. Entries carry a status so the debugger can show
//! requests that are still in flight.

use std::collections::BTreeMap;

/// Handle assigned to a table entry by the data plane.
pub type EntryHandle = u64;

/// Lifecycle of a shadowed entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub enum TableEntryStatus {
    Ok,
    Inserting,
    Deleting,
    Modifying,
}

/// A shadowed table entry.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct TableEntry {
    pub table_name: String,
    pub match_key: String,
    pub action_name: String,
    pub action_data: Vec<String>,
    /// Unknown until the insert is confirmed.
    pub handle: Option<EntryHandle>,
    pub status: TableEntryStatus,
}

/// Control-plane endpoint the command server forwards raw commands to.
pub trait ControlPlane: Send + Sync {
    fn do_command(&self, command: &str);
}

/// Entries grouped by table, then by action, in insertion order.
#[derive(Debug, Default)]
pub struct TableShadow {
    tables: BTreeMap<String, BTreeMap<String, Vec<TableEntry>>>,
}

impl TableShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an insert request. The entry starts as [`TableEntryStatus::Inserting`].
    pub fn add_entry(
        &mut self,
        table_name: &str,
        match_key: &str,
        action_name: &str,
        action_data: Vec<String>,
        handle: Option<EntryHandle>,
    ) {
        let entry = TableEntry {
            table_name: table_name.to_string(),
            match_key: match_key.to_string(),
            action_name: action_name.to_string(),
            action_data,
            handle,
            status: TableEntryStatus::Inserting,
        };

        self.tables
            .entry(table_name.to_string())
            .or_default()
            .entry(action_name.to_string())
            .or_default()
            .push(entry);
    }

    /// Confirm an insert: attach the handle and mark the entry OK.
    pub fn update_handle(
        &mut self,
        table_name: &str,
        match_key: &str,
        action_name: &str,
        handle: EntryHandle,
    ) {
        let entry = self
            .tables
            .get_mut(table_name)
            .and_then(|actions| actions.get_mut(action_name))
            .and_then(|entries| entries.iter_mut().find(|e| e.match_key == match_key));

        match entry {
            Some(entry) => {
                entry.handle = Some(handle);
                entry.status = TableEntryStatus::Ok;
            }
            None => tracing::debug!(
                "No shadow entry {}/{}/{} to attach handle {} to",
                table_name,
                action_name,
                match_key,
                handle
            ),
        }
    }

    /// Record a modify request for the entry with `handle`.
    ///
    /// The entry moves to `action_name` if the action changed.
    pub fn update_entry(
        &mut self,
        table_name: &str,
        handle: EntryHandle,
        action_name: &str,
        action_data: Vec<String>,
    ) {
        let Some(actions) = self.tables.get_mut(table_name) else {
            return;
        };

        let Some((old_action, index)) = find_handle(actions, handle) else {
            return;
        };

        if old_action == action_name {
            if let Some(entry) = actions
                .get_mut(&old_action)
                .and_then(|entries| entries.get_mut(index))
            {
                entry.action_data = action_data;
                entry.status = TableEntryStatus::Modifying;
            }
            return;
        }

        let Some(mut entry) = take_entry(actions, &old_action, index) else {
            return;
        };
        entry.action_name = action_name.to_string();
        entry.action_data = action_data;
        entry.status = TableEntryStatus::Modifying;
        actions
            .entry(action_name.to_string())
            .or_default()
            .push(entry);
    }

    /// Record a delete request. The entry stays visible as
    /// [`TableEntryStatus::Deleting`] until [`confirm_delete`](Self::confirm_delete).
    pub fn delete_entry(&mut self, table_name: &str, handle: EntryHandle) {
        self.set_status(table_name, handle, TableEntryStatus::Deleting);
    }

    /// Confirm an insert or modify.
    pub fn confirm_update(&mut self, table_name: &str, handle: EntryHandle) {
        self.set_status(table_name, handle, TableEntryStatus::Ok);
    }

    /// Confirm a delete: the entry is removed.
    pub fn confirm_delete(&mut self, table_name: &str, handle: EntryHandle) {
        let Some(actions) = self.tables.get_mut(table_name) else {
            return;
        };

        if let Some((action, index)) = find_handle(actions, handle) {
            take_entry(actions, &action, index);
        }

        if actions.is_empty() {
            self.tables.remove(table_name);
        }
    }

    /// Every entry, ordered by table then action name.
    pub fn entries(&self) -> Vec<TableEntry> {
        self.tables
            .values()
            .flat_map(|actions| actions.values())
            .flat_map(|entries| entries.iter().cloned())
            .collect()
    }

    fn set_status(&mut self, table_name: &str, handle: EntryHandle, status: TableEntryStatus) {
        let entry = self
            .tables
            .get_mut(table_name)
            .into_iter()
            .flat_map(|actions| actions.values_mut())
            .flat_map(|entries| entries.iter_mut())
            .find(|e| e.handle == Some(handle));

        if let Some(entry) = entry {
            entry.status = status;
        }
    }
}

fn find_handle(
    actions: &BTreeMap<String, Vec<TableEntry>>,
    handle: EntryHandle,
) -> Option<(String, usize)> {
    actions.iter().find_map(|(action, entries)| {
        entries
            .iter()
            .position(|e| e.handle == Some(handle))
            .map(|index| (action.clone(), index))
    })
}

fn take_entry(
    actions: &mut BTreeMap<String, Vec<TableEntry>>,
    action: &str,
    index: usize,
) -> Option<TableEntry> {
    let entries = actions.get_mut(action)?;
    let entry = entries.remove(index);
    if entries.is_empty() {
        actions.remove(action);
    }
    Some(entry)
}
