//! Process-wide command registry, shortcut store, and recent-parse cache.
//!
//! All shared mutable state lives behind one mutex. A default instance
//! serves the ergonomic `Command::parse` path; embedders may carry their
//! own `Registry` and pass it explicitly.

use crate::command::{Command, Namespace};
use crate::lru::LruCache;
use crate::result::ParseResult;
use crate::shortcut::{ShortcutEntry, ShortcutStore};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_RECORD_CAPACITY: usize = 100;

struct Inner {
    commands: HashMap<String, Arc<Command>>,
    shortcuts: HashMap<u64, ShortcutStore>,
    records: LruCache<(u64, u64), ParseResult>,
    namespaces: HashMap<String, Namespace>,
}

/// Registry of commands and their shared parse-time state.
pub struct Registry {
    inner: Mutex<Inner>,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_record_capacity(DEFAULT_RECORD_CAPACITY)
    }

    /// Bound the recent-parse cache to `capacity` entries.
    pub fn with_record_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                commands: HashMap::new(),
                shortcuts: HashMap::new(),
                records: LruCache::new(capacity),
                namespaces: HashMap::new(),
            }),
        }
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register(&self, command: Arc<Command>) {
        let mut inner = self.lock();
        tracing::debug!(name = command.name(), "command registered");
        inner.commands.insert(command.name().to_string(), command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.lock().commands.get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.lock();
        match inner.commands.remove(name) {
            Some(command) => {
                let id = command.id();
                inner.shortcuts.remove(&id);
                inner.records.clear();
                true
            }
            None => false,
        }
    }

    /// Commands registered under a namespace.
    pub fn in_namespace(&self, namespace: &str) -> Vec<Arc<Command>> {
        self.lock()
            .commands
            .values()
            .filter(|c| c.config().namespace == namespace)
            .cloned()
            .collect()
    }

    pub fn set_namespace(&self, ns: Namespace) {
        self.lock().namespaces.insert(ns.name.clone(), ns);
    }

    pub fn namespace(&self, name: &str) -> Option<Namespace> {
        self.lock().namespaces.get(name).cloned()
    }

    pub fn add_shortcut(&self, command_id: u64, entry: ShortcutEntry) {
        let mut inner = self.lock();
        tracing::debug!(key = entry.key.as_str(), "shortcut registered");
        inner.shortcuts.entry(command_id).or_default().add(entry);
    }

    pub fn remove_shortcut(&self, command_id: u64, key: &str) -> bool {
        let mut inner = self.lock();
        inner
            .shortcuts
            .get_mut(&command_id)
            .map(|store| store.remove(key))
            .unwrap_or(false)
    }

    pub fn shortcuts(&self, command_id: u64) -> Vec<ShortcutEntry> {
        self.lock()
            .shortcuts
            .get(&command_id)
            .map(|store| store.entries().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn find_shortcut(&self, command_id: u64, first_token: &str) -> Option<ShortcutEntry> {
        self.lock()
            .shortcuts
            .get(&command_id)?
            .find(first_token)
            .cloned()
    }

    pub(crate) fn recall(&self, command_id: u64, input_hash: u64) -> Option<ParseResult> {
        self.lock().records.get(&(command_id, input_hash)).cloned()
    }

    pub(crate) fn record(&self, command_id: u64, input_hash: u64, result: ParseResult) {
        self.lock().records.insert((command_id, input_hash), result);
    }

    /// Drop everything: commands, shortcuts, records, namespaces.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.commands.clear();
        inner.shortcuts.clear();
        inner.records.clear();
        inner.namespaces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    fn cmd(name: &str) -> Arc<Command> {
        Arc::new(Command::new(name).build().unwrap())
    }

    #[test]
    fn register_get_unregister() {
        let registry = Registry::new();
        registry.register(cmd("/a"));
        assert!(registry.get("/a").is_some());
        assert!(registry.unregister("/a"));
        assert!(registry.get("/a").is_none());
        assert!(!registry.unregister("/a"));
    }

    #[test]
    fn shortcuts_are_per_command() {
        let registry = Registry::new();
        let a = cmd("/a");
        let b = cmd("/b");
        registry.add_shortcut(a.id(), ShortcutEntry::new("x", "/a one"));
        assert!(registry.find_shortcut(a.id(), "x").is_some());
        assert!(registry.find_shortcut(b.id(), "x").is_none());
        assert!(registry.remove_shortcut(a.id(), "x"));
        assert!(registry.find_shortcut(a.id(), "x").is_none());
    }

    #[test]
    fn records_round_trip() {
        let registry = Registry::with_record_capacity(2);
        let result = ParseResult {
            matched: true,
            ..ParseResult::default()
        };
        registry.record(1, 10, result.clone());
        assert!(registry.recall(1, 10).is_some_and(|r| r.matched));
        assert!(registry.recall(1, 11).is_none());
        assert!(registry.recall(2, 10).is_none());
    }

    #[test]
    fn record_capacity_is_bounded() {
        let registry = Registry::with_record_capacity(2);
        for i in 0..5u64 {
            registry.record(1, i, ParseResult::default());
        }
        let hits = (0..5u64).filter(|i| registry.recall(1, *i).is_some()).count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn namespaces_stored_and_listed() {
        let registry = Registry::new();
        registry.set_namespace(Namespace {
            name: "bots".into(),
            ..Namespace::default()
        });
        assert!(registry.namespace("bots").is_some());
        let command = Arc::new(
            Command::new("/a")
                .in_namespace(&registry.namespace("bots").unwrap())
                .build()
                .unwrap(),
        );
        registry.register(command);
        assert_eq!(registry.in_namespace("bots").len(), 1);
        assert!(registry.in_namespace("other").is_empty());
    }

    #[test]
    fn clear_terminates_all_state() {
        let registry = Registry::new();
        let a = cmd("/a");
        registry.register(a.clone());
        registry.add_shortcut(a.id(), ShortcutEntry::new("x", "/a"));
        registry.record(a.id(), 1, ParseResult::default());
        registry.clear();
        assert!(registry.get("/a").is_none());
        assert!(registry.shortcuts(a.id()).is_empty());
        assert!(registry.recall(a.id(), 1).is_none());
    }
}
