//! Watch tree
//!
//! Watches mirror gdb's variable-object hierarchy. Nodes live in an arena
//! and are addressed by generation-checked handles, so a stale handle held
//! across a removal can never reach a recycled slot.

/// Label shown on an expandable node whose children are not fetched yet
pub const PLACEHOLDER_LABEL: &str = "updating...";

/// Stable reference to a watch node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle {
    index: usize,
    generation: u32,
}

/// One node of the watch tree
#[derive(Debug, Clone, Default)]
pub struct WatchNode {
    /// Variable-object name assigned by gdb (`var3`, `var3.public.x`);
    /// empty for placeholders and roots not yet created
    pub id: String,
    /// Display label: the watched expression, or a child's `exp`
    pub symbol: String,
    pub value: String,
    pub type_name: String,
    /// Tooltip watches are transient and report through a separate channel
    pub for_tooltip: bool,
    pub has_been_expanded: bool,
    /// Children fetched eagerly (dynamic varobjs) are cheap to refetch and
    /// are dropped from gdb when the node collapses
    pub delete_on_collapse: bool,
    /// Update range requested from a dynamic varobj
    pub range: Option<(i64, i64)>,
    /// Reconciliation mark: still true at sweep time means "disappeared"
    pub marked_removed: bool,
    pub changed: bool,
    pub children: Vec<WatchHandle>,
}

impl WatchNode {
    pub fn root(symbol: impl Into<String>, for_tooltip: bool) -> Self {
        Self {
            symbol: symbol.into(),
            for_tooltip,
            delete_on_collapse: true,
            ..Default::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty() && self.symbol == PLACEHOLDER_LABEL
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<WatchNode>,
}

/// Arena of watch nodes plus the ordered list of roots
#[derive(Debug, Default)]
pub struct WatchArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    roots: Vec<WatchHandle>,
}

impl WatchArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: WatchNode) -> WatchHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            WatchHandle {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            WatchHandle {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    fn free_slot(&mut self, handle: WatchHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index) {
            if slot.generation == handle.generation && slot.node.is_some() {
                slot.node = None;
                slot.generation += 1;
                self.free.push(handle.index);
            }
        }
    }

    pub fn get(&self, handle: WatchHandle) -> Option<&WatchNode> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, handle: WatchHandle) -> Option<&mut WatchNode> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn roots(&self) -> &[WatchHandle] {
        &self.roots
    }

    pub fn add_root(&mut self, node: WatchNode) -> WatchHandle {
        let handle = self.alloc(node);
        self.roots.push(handle);
        handle
    }

    /// Attach a new child under `parent`
    pub fn add_child_node(&mut self, parent: WatchHandle, node: WatchNode) -> Option<WatchHandle> {
        self.get(parent)?;
        let child = self.alloc(node);
        self.get_mut(parent)
            .expect("parent checked above")
            .children
            .push(child);
        Some(child)
    }

    pub fn children(&self, handle: WatchHandle) -> Vec<WatchHandle> {
        self.get(handle).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// Remove a node and its whole subtree
    pub fn remove(&mut self, handle: WatchHandle) {
        self.remove_children(handle);
        self.roots.retain(|&r| r != handle);
        for slot in self.slots.iter_mut() {
            if let Some(node) = slot.node.as_mut() {
                node.children.retain(|&c| c != handle);
            }
        }
        self.free_slot(handle);
    }

    /// Remove every descendant of `handle`, keeping the node itself
    pub fn remove_children(&mut self, handle: WatchHandle) {
        let children = match self.get_mut(handle) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.remove_children(child);
            self.free_slot(child);
        }
    }

    /// Look a node up by its gdb variable-object name. Child names extend
    /// the parent's with a dot, so the search walks down from the matching
    /// root by prefix.
    pub fn find(&self, varobj_id: &str) -> Option<WatchHandle> {
        for &root in &self.roots {
            if let Some(found) = self.find_under(root, varobj_id) {
                return Some(found);
            }
        }
        None
    }

    fn find_under(&self, handle: WatchHandle, varobj_id: &str) -> Option<WatchHandle> {
        let node = self.get(handle)?;
        if node.id == varobj_id {
            return Some(handle);
        }
        if node.id.is_empty() || !varobj_id.starts_with(&format!("{}.", node.id)) {
            return None;
        }
        for &child in &node.children {
            if let Some(found) = self.find_under(child, varobj_id) {
                return Some(found);
            }
        }
        None
    }

    /// The root whose subtree contains `handle`
    pub fn root_of(&self, handle: WatchHandle) -> Option<WatchHandle> {
        for &root in &self.roots {
            if root == handle || self.contains(root, handle) {
                return Some(root);
            }
        }
        None
    }

    fn contains(&self, ancestor: WatchHandle, target: WatchHandle) -> bool {
        let Some(node) = self.get(ancestor) else {
            return false;
        };
        node.children
            .iter()
            .any(|&c| c == target || self.contains(c, target))
    }

    /// Flag every direct child for the remove-unless-seen sweep
    pub fn mark_children_removed(&mut self, handle: WatchHandle) {
        for child in self.children(handle) {
            if let Some(node) = self.get_mut(child) {
                node.marked_removed = true;
            }
        }
    }

    /// Drop direct children still flagged after reconciliation
    pub fn remove_marked_children(&mut self, handle: WatchHandle) {
        let marked: Vec<WatchHandle> = self
            .children(handle)
            .into_iter()
            .filter(|&c| self.get(c).is_some_and(|n| n.marked_removed))
            .collect();
        for child in &marked {
            self.remove_children(*child);
            self.free_slot(*child);
        }
        if let Some(node) = self.get_mut(handle) {
            node.children.retain(|c| !marked.contains(c));
        }
    }

    /// Add an expander stub under a node whose children are not loaded
    pub fn append_placeholder(&mut self, parent: WatchHandle) -> Option<WatchHandle> {
        let for_tooltip = self.get(parent)?.for_tooltip;
        self.add_child_node(
            parent,
            WatchNode {
                symbol: PLACEHOLDER_LABEL.to_string(),
                for_tooltip,
                ..Default::default()
            },
        )
    }

    pub fn mark_changed_recursive(&mut self, handle: WatchHandle, changed: bool) {
        if let Some(node) = self.get_mut(handle) {
            node.changed = changed;
        }
        for child in self.children(handle) {
            self.mark_changed_recursive(child, changed);
        }
    }

    /// Forget session state (ids, values, children) while keeping the
    /// watched expressions, so a new session can recreate every root
    pub fn reset_root(&mut self, root: WatchHandle) {
        self.remove_children(root);
        if let Some(node) = self.get_mut(root) {
            node.id.clear();
            node.value.clear();
            node.type_name.clear();
            node.has_been_expanded = false;
            node.range = None;
            node.marked_removed = false;
            node.changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, symbol: &str) -> WatchNode {
        WatchNode {
            id: id.to_string(),
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn stale_handles_never_resolve() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(node("var1", "x"));
        arena.remove(root);
        assert!(arena.get(root).is_none());

        // The slot is recycled with a new generation.
        let reused = arena.add_root(node("var2", "y"));
        assert!(arena.get(root).is_none());
        assert_eq!(arena.get(reused).unwrap().id, "var2");
    }

    #[test]
    fn find_walks_the_id_spine() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(node("var1", "s"));
        let child = arena.add_child_node(root, node("var1.a", "a")).unwrap();
        let grand = arena.add_child_node(child, node("var1.a.b", "b")).unwrap();
        arena.add_root(node("var2", "t"));

        assert_eq!(arena.find("var1.a.b"), Some(grand));
        assert_eq!(arena.find("var2"), Some(arena.roots()[1]));
        assert_eq!(arena.find("var9"), None);
    }

    #[test]
    fn root_of_resolves_deep_nodes() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(node("var1", "s"));
        let child = arena.add_child_node(root, node("var1.a", "a")).unwrap();
        let grand = arena.add_child_node(child, node("var1.a.b", "b")).unwrap();

        assert_eq!(arena.root_of(grand), Some(root));
        assert_eq!(arena.root_of(root), Some(root));
    }

    #[test]
    fn mark_and_sweep_removes_vanished_children() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(node("var1", "v"));
        let keep = arena.add_child_node(root, node("var1.x", "x")).unwrap();
        let drop = arena.add_child_node(root, node("var1.y", "y")).unwrap();

        arena.mark_children_removed(root);
        arena.get_mut(keep).unwrap().marked_removed = false;
        arena.remove_marked_children(root);

        assert_eq!(arena.children(root), vec![keep]);
        assert!(arena.get(drop).is_none());
    }

    #[test]
    fn placeholder_inherits_tooltip_flag() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(WatchNode::root("p", true));
        let placeholder = arena.append_placeholder(root).unwrap();
        let node = arena.get(placeholder).unwrap();
        assert!(node.is_placeholder());
        assert!(node.for_tooltip);
    }

    #[test]
    fn reset_root_keeps_the_expression() {
        let mut arena = WatchArena::new();
        let root = arena.add_root(node("var1", "counter"));
        arena.get_mut(root).unwrap().value = "3".to_string();
        arena.add_child_node(root, node("var1.a", "a"));

        arena.reset_root(root);
        let reset = arena.get(root).unwrap();
        assert_eq!(reset.symbol, "counter");
        assert!(reset.id.is_empty());
        assert!(reset.value.is_empty());
        assert!(reset.children.is_empty());
    }
}
