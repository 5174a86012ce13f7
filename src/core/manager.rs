//! Process-wide logger registry
//!
//! The manager maps dot-separated names to loggers, created lazily on first
//! request. Requesting `"a.b.c"` before `"a.b"` exists records a placeholder
//! for `"a.b"`; when `"a.b"` is later requested explicitly, the placeholder
//! is promoted in place and every child that was parented above it is
//! re-parented onto the new logger. Parent links are name strings resolved
//! through the registry, never ownership edges, so promotion cannot dangle.

use super::level::Level;
use super::logger::Logger;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

enum Node {
    Logger(Arc<Logger>),
    /// Stands in for a not-yet-created ancestor; tracks the names of the
    /// descendants that will need re-parenting when it is promoted.
    Placeholder(HashSet<String>),
}

pub struct Manager {
    nodes: RwLock<HashMap<String, Node>>,
    root: Arc<Logger>,
    /// Bumped on any level or structure change; effective-level caches
    /// compare against it lazily at read time.
    generation: AtomicU64,
    /// Global disable floor: records at or below this level value are
    /// suppressed everywhere. Zero means no floor.
    disable_floor: AtomicU8,
}

static MANAGER: Lazy<Manager> = Lazy::new(Manager::new);

/// The process-wide manager. First access constructs the root logger and
/// the registry; there is no teardown beyond process exit.
pub fn manager() -> &'static Manager {
    &MANAGER
}

/// Fetch (or create) the logger with the given dot-separated name.
pub fn get_logger(name: &str) -> Arc<Logger> {
    manager().get_logger(name)
}

/// The root logger: the unique node with the empty name.
pub fn root() -> Arc<Logger> {
    manager().root()
}

impl Manager {
    fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            root: Arc::new(Logger::new_root(Level::Warning)),
            generation: AtomicU64::new(1),
            disable_floor: AtomicU8::new(0),
        }
    }

    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if name.is_empty() {
            return self.root();
        }

        let mut nodes = self.nodes.write();
        if let Some(Node::Logger(logger)) = nodes.get(name) {
            return Arc::clone(logger);
        }

        let logger = Arc::new(Logger::new(name));
        let previous = nodes.insert(name.to_string(), Node::Logger(Arc::clone(&logger)));
        if let Some(Node::Placeholder(children)) = previous {
            Self::fixup_children(&nodes, name, &children);
        }
        Self::fixup_parents(&mut nodes, &logger);
        self.bump_generation();
        logger
    }

    /// Look up an already-created logger; placeholders don't count.
    pub(crate) fn existing(&self, name: &str) -> Option<Arc<Logger>> {
        if name.is_empty() {
            return Some(self.root());
        }
        match self.nodes.read().get(name) {
            Some(Node::Logger(logger)) => Some(Arc::clone(logger)),
            _ => None,
        }
    }

    /// Resolve a parent link; a stale name falls back to root.
    pub(crate) fn logger_or_root(&self, name: &str) -> Arc<Logger> {
        self.existing(name).unwrap_or_else(|| self.root())
    }

    /// Re-parent former placeholder children onto the newly created logger.
    /// A child whose parent is already at or below `name` is left alone.
    fn fixup_children(nodes: &HashMap<String, Node>, name: &str, children: &HashSet<String>) {
        for child_name in children {
            if let Some(Node::Logger(child)) = nodes.get(child_name) {
                let keep = child
                    .parent_name()
                    .is_some_and(|parent| is_prefix_of(name, &parent));
                if !keep {
                    child.set_parent(Some(name.to_string()));
                }
            }
        }
    }

    /// Link the new logger to its nearest real ancestor, registering it with
    /// every placeholder passed on the way up.
    fn fixup_parents(nodes: &mut HashMap<String, Node>, logger: &Arc<Logger>) {
        let name = logger.name().to_string();
        let mut prefix_end = name.rfind('.');

        while let Some(end) = prefix_end {
            let prefix = &name[..end];
            match nodes.get_mut(prefix) {
                Some(Node::Logger(_)) => {
                    logger.set_parent(Some(prefix.to_string()));
                    return;
                }
                Some(Node::Placeholder(children)) => {
                    children.insert(name.clone());
                }
                None => {
                    let mut children = HashSet::new();
                    children.insert(name.clone());
                    nodes.insert(prefix.to_string(), Node::Placeholder(children));
                }
            }
            prefix_end = prefix.rfind('.');
        }

        // No real ancestor found: parent is root.
        logger.set_parent(Some(String::new()));
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Suppress all records at or below `level`, process-wide.
    pub fn disable(&self, level: Level) {
        self.disable_floor.store(level.value(), Ordering::Release);
    }

    /// Remove the global disable floor.
    pub fn enable_all(&self) {
        self.disable_floor.store(0, Ordering::Release);
    }

    pub(crate) fn disable_floor(&self) -> Option<Level> {
        Level::from_value(self.disable_floor.load(Ordering::Acquire))
    }
}

/// `true` when `prefix` equals `name` or is a proper dot-prefix of it.
fn is_prefix_of(prefix: &str, name: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_returns_same_logger() {
        let a = get_logger("mgr_unit.same");
        let b = get_logger("mgr_unit.same");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_root_is_empty_name() {
        let root = get_logger("");
        assert_eq!(root.name(), "");
        assert!(Arc::ptr_eq(&root, &manager().root()));
    }

    #[test]
    fn test_parent_is_root_without_intermediates() {
        let leaf = get_logger("mgr_unit.orphan.deep.leaf");
        // "mgr_unit.orphan.deep" and above are placeholders, so the nearest
        // real ancestor is root.
        assert_eq!(leaf.parent_name().as_deref(), Some(""));
    }

    #[test]
    fn test_placeholder_promotion_reparents_child() {
        let child = get_logger("mgr_unit.promo.mid.child");
        assert_eq!(child.parent_name().as_deref(), Some(""));

        let mid = get_logger("mgr_unit.promo.mid");
        assert_eq!(child.parent_name().as_deref(), Some("mgr_unit.promo.mid"));
        assert_eq!(mid.parent_name().as_deref(), Some(""));

        let promo = get_logger("mgr_unit.promo");
        assert_eq!(mid.parent_name().as_deref(), Some("mgr_unit.promo"));
        // The grandchild stays under "mid", which is below "promo".
        assert_eq!(child.parent_name().as_deref(), Some("mgr_unit.promo.mid"));
        assert_eq!(promo.parent_name().as_deref(), Some(""));
    }

    #[test]
    fn test_existing_ignores_placeholders() {
        let _ = get_logger("mgr_unit.ph_only.leaf");
        assert!(manager().existing("mgr_unit.ph_only").is_none());
        assert!(manager().existing("mgr_unit.ph_only.leaf").is_some());
    }

    #[test]
    fn test_is_prefix_of() {
        assert!(is_prefix_of("a.b", "a.b"));
        assert!(is_prefix_of("a.b", "a.b.c"));
        assert!(!is_prefix_of("a.b", "a.bc"));
        assert!(!is_prefix_of("a.b", "a"));
    }

    #[test]
    fn test_disable_floor_round_trip() {
        // Use Debug so concurrently running tests that assert on Info and
        // above are unaffected.
        manager().disable(Level::Debug);
        assert_eq!(manager().disable_floor(), Some(Level::Debug));
        manager().enable_all();
        assert_eq!(manager().disable_floor(), None);
    }
}
