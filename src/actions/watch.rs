//! Watch subsystem actions
//!
//! Variable objects are created, listed, updated, and collapsed through
//! four actions sharing one child-listing driver. The driver keeps a map
//! from in-flight `-var-list-children` commands to the tree node the
//! answers attach to, and reconciles each answer into the arena without
//! disturbing siblings that did not change.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{InScope, Record, ResultClass, ResultValue, UpdatedVariable};
use crate::model::{WatchArena, WatchHandle, WatchNode};

/// Shown instead of a value when gdb rejects the watched expression
pub const EVAL_ERROR_LABEL: &str = "The expression can't be evaluated";
/// Scope sentinels written by the update pass
pub const NOT_IN_SCOPE_LABEL: &str = "-- not in scope --";
pub const INVALID_LABEL: &str = "-- invalid --";

fn escape_expression(symbol: &str) -> String {
    symbol.replace('"', "\\\"")
}

/// `numchild`/`dynamic`/`has_more` triple of a varobj tuple; a missing
/// `numchild` parses as -1, which callers treat as a protocol error
fn parse_watch_info(value: &ResultValue) -> (i32, bool, bool) {
    let children = value.int_of("numchild").map(|n| n as i32).unwrap_or(-1);
    (children, value.bool_flag("dynamic"), value.bool_flag("has_more"))
}

/// Copy `name`/`value`/`type` fields onto a node, keeping absent ones
fn parse_watch_identity(node: &mut WatchNode, value: &ResultValue) {
    if let Some(id) = value.string_of("name") {
        node.id = id.to_string();
    }
    if let Some(v) = value.string_of("value") {
        node.value = v.to_string();
    }
    if let Some(t) = value.string_of("type") {
        node.type_name = t.to_string();
    }
}

/// Merge one listed child into the tree: refresh it when the varobj is
/// already known anywhere in the arena, create it under `parent` otherwise.
/// Either way the child survives the removed-mark sweep.
fn add_or_refresh_child(
    arena: &mut WatchArena,
    parent: WatchHandle,
    child_value: &ResultValue,
    symbol: &str,
) -> Option<WatchHandle> {
    let id = child_value.string_of("name")?;

    let handle = match arena.find(id) {
        Some(existing) => {
            let node = arena.get_mut(existing)?;
            if let Some(v) = child_value.string_of("value") {
                node.value = v.to_string();
            }
            if let Some(t) = child_value.string_of("type") {
                node.type_name = t.to_string();
            }
            existing
        }
        None => {
            let for_tooltip = arena.get(parent)?.for_tooltip;
            let mut node = WatchNode {
                symbol: symbol.to_string(),
                for_tooltip,
                delete_on_collapse: true,
                ..Default::default()
            };
            parse_watch_identity(&mut node, child_value);
            arena.add_child_node(parent, node)?
        }
    };
    if let Some(node) = arena.get_mut(handle) {
        node.marked_removed = false;
    }
    Some(handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayHint {
    None,
    Array,
    Map,
}

impl DisplayHint {
    fn parse(value: &ResultValue) -> Self {
        match value.string_of("displayhint") {
            Some("map") => Self::Map,
            Some("array") => Self::Array,
            _ => Self::None,
        }
    }
}

/// Shared machinery for everything that issues `-var-list-children`
#[derive(Default)]
struct ListChildrenDriver {
    /// Tree node each in-flight list command attaches its answer to
    parent_map: HashMap<CommandId, WatchHandle>,
    sub_commands_left: i32,
}

impl ListChildrenDriver {
    /// Account for a command whose answer is handled outside the driver
    /// (`-var-create`, `-var-update`, `-var-set-update-range`)
    fn begin_command(&mut self) {
        self.sub_commands_left += 1;
    }

    fn command_done(&mut self) {
        self.sub_commands_left -= 1;
    }

    fn remaining(&self) -> i32 {
        self.sub_commands_left
    }

    fn execute_raw(
        &mut self,
        core: &mut ActionCore,
        varobj: &str,
        range: Option<(i64, i64)>,
        parent: WatchHandle,
    ) {
        let command = match range {
            Some((start, end)) => format!("-var-list-children 2 \"{varobj}\" {start} {end}"),
            None => format!("-var-list-children 2 \"{varobj}\""),
        };
        let id = core.execute(command);
        self.parent_map.insert(id, parent);
        self.sub_commands_left += 1;
    }

    /// List a node's own children, range-qualified when it has a window
    fn execute_list(&mut self, core: &mut ActionCore, arena: &WatchArena, watch: WatchHandle) {
        let Some(node) = arena.get(watch) else { return };
        let (varobj, range) = (node.id.clone(), node.range);
        self.execute_raw(core, &varobj, range, watch);
    }

    /// List children of `varobj` but attach them under `parent`, using the
    /// parent's range window
    fn execute_list_under(
        &mut self,
        core: &mut ActionCore,
        arena: &WatchArena,
        varobj: &str,
        parent: WatchHandle,
    ) {
        let Some(node) = arena.get(parent) else {
            debug!(varobj, "list-children parent is gone, skipping");
            return;
        };
        let range = node.range;
        self.execute_raw(core, varobj, range, parent);
    }

    /// Reconcile one `-var-list-children` answer into the arena.
    /// Returns false on a protocol error (a child without `numchild`).
    fn parse_list_command(
        &mut self,
        core: &mut ActionCore,
        arena: &mut WatchArena,
        id: CommandId,
        value: &ResultValue,
    ) -> bool {
        let Some(&parent) = self.parent_map.get(&id) else {
            debug!(%id, "list-children answer with no registered parent");
            return false;
        };
        if arena.get(parent).is_none() {
            debug!(%id, "list-children parent was removed, dropping answer");
            return false;
        }

        let hint = DisplayHint::parse(value);
        let mut error = false;
        let mut map_key: Option<String> = None;

        let Some(children) = value.find("children") else {
            return true;
        };

        for (index, child_value) in children.children().iter().enumerate() {
            if child_value.name != "child" {
                debug!(
                    entry = %child_value.make_debug_string(),
                    "unexpected entry in children list"
                );
                continue;
            }

            let symbol = child_value.string_of("exp").unwrap_or("--unknown--").to_string();
            let (children_count, dynamic, has_more) = parse_watch_info(child_value);

            let mut display_symbol = symbol;
            if hint == DisplayHint::Map {
                if index % 2 == 0 {
                    // Even entries carry the key for the next entry.
                    map_key = child_value.string_of("value").map(str::to_string);
                    continue;
                }
                if let Some(key) = map_key.take() {
                    display_symbol = key;
                }
            }

            if dynamic && has_more {
                // Another lazy layer: fetch its children now and hang them
                // off the same parent.
                if let Some(id) = child_value.string_of("name") {
                    let id = id.to_string();
                    self.execute_raw(core, &id, None, parent);
                }
                continue;
            }

            match children_count {
                -1 => error = true,
                0 => {
                    if !arena.get(parent).is_some_and(|n| n.has_been_expanded) {
                        if let Some(node) = arena.get_mut(parent) {
                            node.has_been_expanded = true;
                        }
                        arena.remove_children(parent);
                    }
                    let child = add_or_refresh_child(arena, parent, child_value, &display_symbol);
                    if dynamic {
                        if let Some(child) = child {
                            if let Some(node) = arena.get_mut(child) {
                                node.delete_on_collapse = false;
                            }
                            if let Some(id) = child_value.string_of("name") {
                                let id = id.to_string();
                                self.execute_list_under(core, arena, &id, child);
                            }
                        }
                    }
                }
                _ => {
                    if child_value.find("type").is_some() {
                        // Expandable on demand: show the node with a stub,
                        // defer the real listing until the user opens it.
                        if !arena.get(parent).is_some_and(|n| n.has_been_expanded) {
                            if let Some(node) = arena.get_mut(parent) {
                                node.has_been_expanded = true;
                            }
                            arena.remove_children(parent);
                        }
                        if let Some(child) =
                            add_or_refresh_child(arena, parent, child_value, &display_symbol)
                        {
                            arena.append_placeholder(child);
                        }
                    } else if let Some(id) = child_value.string_of("name") {
                        // Typeless wrapper (e.g. an access specifier level):
                        // splice its children directly under the parent.
                        let id = id.to_string();
                        self.execute_list_under(core, arena, &id, parent);
                    }
                }
            }
        }

        if map_key.is_some() {
            warn!("map children list ended on an unpaired key, dropping it");
        }

        arena.remove_marked_children(parent);
        !error
    }
}

/// Steps of a watch creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateStep {
    Create,
    ListChildren,
    SetRange,
}

/// Create a variable object for a watched expression and fetch its first
/// level of children
pub struct WatchCreateAction {
    core: ActionCore,
    arena: Rc<RefCell<WatchArena>>,
    watch: WatchHandle,
    driver: ListChildrenDriver,
    step: CreateStep,
    /// Child window requested from dynamic varobjs
    update_range: i64,
    on_notify: Box<dyn FnMut()>,
}

impl WatchCreateAction {
    pub fn new(
        arena: Rc<RefCell<WatchArena>>,
        watch: WatchHandle,
        update_range: i64,
        on_notify: impl FnMut() + 'static,
    ) -> Self {
        Self {
            core: ActionCore::new(),
            arena,
            watch,
            driver: ListChildrenDriver::default(),
            step: CreateStep::Create,
            update_range,
            on_notify: Box::new(on_notify),
        }
    }

    fn handle_create_done(&mut self, value: &ResultValue) {
        let mut arena = self.arena.borrow_mut();
        let (children, dynamic, has_more) = parse_watch_info(value);
        if let Some(node) = arena.get_mut(self.watch) {
            parse_watch_identity(node, value);
        }

        if dynamic && has_more {
            self.step = CreateStep::SetRange;
            let varobj = arena.get(self.watch).map(|n| n.id.clone()).unwrap_or_default();
            if let Some(node) = arena.get_mut(self.watch) {
                node.range = Some((0, self.update_range));
            }
            self.driver.begin_command();
            self.core.execute(format!(
                "-var-set-update-range \"{varobj}\" 0 {}",
                self.update_range
            ));
            arena.append_placeholder(self.watch);
        } else if children > 0 {
            if children > 1 {
                if let Some(node) = arena.get_mut(self.watch) {
                    node.range = Some((0, children as i64));
                }
            }
            self.step = CreateStep::ListChildren;
            arena.append_placeholder(self.watch);
            self.driver.execute_list(&mut self.core, &arena, self.watch);
        }
        // A leaf finishes through the remaining-commands check below.
    }
}

impl Action for WatchCreateAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        let symbol = self
            .arena
            .borrow()
            .get(self.watch)
            .map(|n| n.symbol.clone())
            .unwrap_or_default();
        self.driver.begin_command();
        self.core
            .execute(format!("-var-create - @ \"{}\"", escape_expression(&symbol)));
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        self.driver.command_done();
        let mut error = false;

        match record.class {
            ResultClass::Done => match self.step {
                CreateStep::Create => self.handle_create_done(&record.value),
                CreateStep::ListChildren => {
                    let mut arena = self.arena.borrow_mut();
                    error = !self.driver.parse_list_command(
                        &mut self.core,
                        &mut arena,
                        id,
                        &record.value,
                    );
                }
                CreateStep::SetRange => {}
            },
            ResultClass::Error => {
                if let Some(node) = self.arena.borrow_mut().get_mut(self.watch) {
                    node.value = EVAL_ERROR_LABEL.to_string();
                }
                error = true;
            }
            _ => error = true,
        }

        if error || self.driver.remaining() == 0 {
            (self.on_notify)();
            self.core.finish();
        }
    }
}

/// Refresh every watch after a stop (`-var-update 1 *`)
pub struct WatchesUpdateAction {
    core: ActionCore,
    arena: Rc<RefCell<WatchArena>>,
    driver: ListChildrenDriver,
    update_cmd: CommandId,
    on_notify: Box<dyn FnMut()>,
}

impl WatchesUpdateAction {
    pub fn new(arena: Rc<RefCell<WatchArena>>, on_notify: impl FnMut() + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            arena,
            driver: ListChildrenDriver::default(),
            update_cmd: CommandId::NONE,
            on_notify: Box::new(on_notify),
        }
    }

    /// Apply one changelist. Returns false on an error-class response.
    fn parse_update(&mut self, record: &Record) -> bool {
        if record.class == ResultClass::Error {
            return false;
        }
        let Some(changelist) = record.value.find("changelist") else {
            return true;
        };

        let mut arena = self.arena.borrow_mut();
        for entry in changelist.children() {
            let Some(updated) = UpdatedVariable::parse(entry) else {
                debug!(entry = %entry.make_debug_string(), "changelist entry without a name");
                continue;
            };
            let Some(watch) = arena.find(&updated.name) else {
                debug!(varobj = %updated.name, "changelist names an unknown watch");
                continue;
            };

            match updated.in_scope {
                InScope::No => {
                    arena.remove_children(watch);
                    if let Some(node) = arena.get_mut(watch) {
                        node.has_been_expanded = false;
                        node.value = NOT_IN_SCOPE_LABEL.to_string();
                    }
                }
                InScope::Invalid => {
                    arena.remove_children(watch);
                    if let Some(node) = arena.get_mut(watch) {
                        node.has_been_expanded = false;
                        node.value = INVALID_LABEL.to_string();
                    }
                }
                InScope::Yes if updated.dynamic => {
                    if let Some(new_count) = updated.new_num_children {
                        arena.remove_children(watch);
                        if new_count > 0 {
                            self.driver.execute_list(&mut self.core, &arena, watch);
                        }
                    } else if updated.has_more {
                        arena.mark_children_removed(watch);
                        self.driver.execute_list(&mut self.core, &arena, watch);
                    } else if let Some(value) = &updated.value {
                        if let Some(node) = arena.get_mut(watch) {
                            node.value = value.clone();
                            node.changed = true;
                        }
                    } else {
                        debug!(varobj = %updated.name, "dynamic changelist entry with nothing to apply");
                    }
                }
                InScope::Yes => {
                    if let Some(new_count) = updated.new_num_children {
                        arena.remove_children(watch);
                        if new_count > 0 {
                            self.driver.execute_list(&mut self.core, &arena, watch);
                        }
                    }
                    if let Some(value) = &updated.value {
                        if let Some(node) = arena.get_mut(watch) {
                            node.value = value.clone();
                            node.changed = true;
                        }
                    } else if let Some(node) = arena.get_mut(watch) {
                        node.value.clear();
                    }
                }
            }
        }
        true
    }
}

impl Action for WatchesUpdateAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.driver.begin_command();
        self.update_cmd = self.core.execute("-var-update 1 *");
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        self.driver.command_done();

        if id == self.update_cmd {
            {
                let mut arena = self.arena.borrow_mut();
                let roots: Vec<WatchHandle> = arena.roots().to_vec();
                for root in roots {
                    arena.mark_changed_recursive(root, false);
                }
            }
            if !self.parse_update(record) {
                self.core.finish();
                return;
            }
        } else {
            let ok = {
                let mut arena = self.arena.borrow_mut();
                self.driver
                    .parse_list_command(&mut self.core, &mut arena, id, &record.value)
            };
            if !ok {
                debug!(%id, "child listing failed during watch update");
                self.core.finish();
                return;
            }
        }

        if self.driver.remaining() == 0 {
            (self.on_notify)();
            self.core.finish();
        }
    }
}

/// Fetch the children of a node the user just expanded. The root varobj is
/// refreshed first so gdb's lazy children are current before listing.
pub struct WatchExpandedAction {
    core: ActionCore,
    arena: Rc<RefCell<WatchArena>>,
    root_varobj: String,
    expanded: WatchHandle,
    driver: ListChildrenDriver,
    update_cmd: CommandId,
    on_notify: Box<dyn FnMut()>,
}

impl WatchExpandedAction {
    pub fn new(
        arena: Rc<RefCell<WatchArena>>,
        root_varobj: impl Into<String>,
        expanded: WatchHandle,
        on_notify: impl FnMut() + 'static,
    ) -> Self {
        Self {
            core: ActionCore::new(),
            arena,
            root_varobj: root_varobj.into(),
            expanded,
            driver: ListChildrenDriver::default(),
            update_cmd: CommandId::NONE,
            on_notify: Box::new(on_notify),
        }
    }
}

impl Action for WatchExpandedAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.update_cmd = self.core.execute(format!("-var-update {}", self.root_varobj));
        let arena = self.arena.borrow();
        self.driver.execute_list(&mut self.core, &arena, self.expanded);
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        if id == self.update_cmd {
            // The refresh result carries nothing the listing won't.
            return;
        }
        self.driver.command_done();

        let ok = {
            let mut arena = self.arena.borrow_mut();
            self.driver
                .parse_list_command(&mut self.core, &mut arena, id, &record.value)
        };
        if !ok || self.driver.remaining() == 0 {
            // Notify even on failure so partial data shows up.
            (self.on_notify)();
            self.core.finish();
        }
    }
}

/// Drop a collapsed node's gdb-side children and reinstate the expander
/// stub so a later expand re-fetches fresh data
pub struct WatchCollapseAction {
    core: ActionCore,
    arena: Rc<RefCell<WatchArena>>,
    collapsed: WatchHandle,
    varobj: String,
    on_notify: Box<dyn FnMut()>,
}

impl WatchCollapseAction {
    pub fn new(
        arena: Rc<RefCell<WatchArena>>,
        collapsed: WatchHandle,
        varobj: impl Into<String>,
        on_notify: impl FnMut() + 'static,
    ) -> Self {
        Self {
            core: ActionCore::new(),
            arena,
            collapsed,
            varobj: varobj.into(),
            on_notify: Box::new(on_notify),
        }
    }
}

impl Action for WatchCollapseAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.core.execute(format!("-var-delete -c {}", self.varobj));
    }

    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        if record.class == ResultClass::Done {
            let mut arena = self.arena.borrow_mut();
            arena.remove_children(self.collapsed);
            if let Some(node) = arena.get_mut(self.collapsed) {
                node.has_been_expanded = false;
            }
            arena.append_placeholder(self.collapsed);
            drop(arena);
            (self.on_notify)();
        }
        self.core.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ActionsMap, GdbExecutor};
    use crate::transport::MockTransport;

    fn pump(actions: &mut ActionsMap, executor: &mut GdbExecutor) {
        for _ in 0..16 {
            actions.run(executor);
            executor.poll_transport();
            actions.dispatch(executor, |_| {});
            if actions.is_empty() {
                break;
            }
        }
    }

    fn split(cmd: &str) -> (&str, &str) {
        let digits = cmd.bytes().take_while(|b| b.is_ascii_digit()).count();
        cmd.split_at(digits)
    }

    #[test]
    fn create_leaf_takes_one_round_trip() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            assert_eq!(text, "-var-create - @ \"x\"");
            vec![format!(
                "{token}^done,name=\"var1\",numchild=\"0\",value=\"42\",type=\"int\""
            )]
        });
        let written = mock.written();
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("x", false));

        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        assert_eq!(written.borrow().len(), 1);
        let arena = arena.borrow();
        let node = arena.get(watch).unwrap();
        assert_eq!(node.id, "var1");
        assert_eq!(node.value, "42");
        assert_eq!(node.type_name, "int");
        assert!(node.children.is_empty());
    }

    #[test]
    fn create_escapes_quotes_in_the_expression() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            assert_eq!(text, "-var-create - @ \"lookup(\\\"key\\\")\"");
            vec![format!("{token}^done,name=\"var1\",numchild=\"0\",value=\"0\"")]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena
            .borrow_mut()
            .add_root(WatchNode::root("lookup(\"key\")", false));
        actions.add(Box::new(WatchCreateAction::new(arena, watch, 100, || {})));
        pump(&mut actions, &mut executor);
        assert!(actions.is_empty());
    }

    #[test]
    fn create_error_sets_the_sentinel_value() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, _) = split(cmd);
            vec![format!(
                "{token}^error,msg=\"No symbol \\\"nope\\\" in current context.\""
            )]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("nope", false));
        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        assert_eq!(arena.borrow().get(watch).unwrap().value, EVAL_ERROR_LABEL);
    }

    #[test]
    fn create_struct_lists_children() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-create") {
                vec![format!(
                    "{token}^done,name=\"var1\",numchild=\"2\",value=\"{{...}}\",type=\"point\""
                )]
            } else if text.starts_with("-var-list-children") {
                assert_eq!(text, "-var-list-children 2 \"var1\" 0 2");
                vec![format!(
                    "{token}^done,numchild=\"2\",children=[child={{name=\"var1.x\",exp=\"x\",numchild=\"0\",value=\"1\",type=\"int\"}},child={{name=\"var1.y\",exp=\"y\",numchild=\"0\",value=\"2\",type=\"int\"}}]"
                )]
            } else {
                vec![]
            }
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("p", false));
        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let children = arena.children(watch);
        // The placeholder was swept away by the real children.
        assert_eq!(children.len(), 2);
        assert_eq!(arena.get(children[0]).unwrap().symbol, "x");
        assert_eq!(arena.get(children[0]).unwrap().value, "1");
        assert_eq!(arena.get(children[1]).unwrap().id, "var1.y");
        assert!(arena.get(watch).unwrap().has_been_expanded);
    }

    #[test]
    fn create_dynamic_sets_update_range_and_placeholder() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-create") {
                vec![format!(
                    "{token}^done,name=\"var1\",numchild=\"0\",value=\"std::vector of length 1000\",type=\"std::vector<int>\",dynamic=\"1\",has_more=\"1\""
                )]
            } else if text.starts_with("-var-set-update-range") {
                assert_eq!(text, "-var-set-update-range \"var1\" 0 100");
                vec![format!("{token}^done")]
            } else {
                vec![]
            }
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("v", false));
        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        assert_eq!(arena.get(watch).unwrap().range, Some((0, 100)));
        let children = arena.children(watch);
        assert_eq!(children.len(), 1);
        assert!(arena.get(children[0]).unwrap().is_placeholder());
    }

    #[test]
    fn map_displayhint_pairs_keys_with_values() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-create") {
                vec![format!(
                    "{token}^done,name=\"var1\",numchild=\"4\",value=\"std::map with 2 elements\",type=\"std::map<int,int>\""
                )]
            } else if text.starts_with("-var-list-children") {
                vec![format!(
                    "{token}^done,displayhint=\"map\",children=[child={{name=\"var1.0\",exp=\"[0]\",numchild=\"0\",value=\"\\\"alpha\\\"\"}},child={{name=\"var1.1\",exp=\"[1]\",numchild=\"0\",value=\"10\"}},child={{name=\"var1.2\",exp=\"[2]\",numchild=\"0\",value=\"\\\"beta\\\"\"}},child={{name=\"var1.3\",exp=\"[3]\",numchild=\"0\",value=\"20\"}}]"
                )]
            } else {
                vec![]
            }
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("m", false));
        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let children = arena.children(watch);
        assert_eq!(children.len(), 2);
        // Odd entries are inserted under the key supplied by the even ones.
        assert_eq!(arena.get(children[0]).unwrap().symbol, "\"alpha\"");
        assert_eq!(arena.get(children[0]).unwrap().value, "10");
        assert_eq!(arena.get(children[1]).unwrap().symbol, "\"beta\"");
        assert_eq!(arena.get(children[1]).unwrap().value, "20");
    }

    #[test]
    fn odd_map_listing_drops_the_trailing_key() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-create") {
                vec![format!(
                    "{token}^done,name=\"var1\",numchild=\"3\",value=\"std::map with 2 elements\",type=\"std::map<int,int>\""
                )]
            } else if text.starts_with("-var-list-children") {
                // Truncated listing: the last key has no value partner.
                vec![format!(
                    "{token}^done,displayhint=\"map\",children=[child={{name=\"var1.0\",exp=\"[0]\",numchild=\"0\",value=\"\\\"alpha\\\"\"}},child={{name=\"var1.1\",exp=\"[1]\",numchild=\"0\",value=\"10\"}},child={{name=\"var1.2\",exp=\"[2]\",numchild=\"0\",value=\"\\\"orphan\\\"\"}}]"
                )]
            } else {
                vec![]
            }
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = arena.borrow_mut().add_root(WatchNode::root("m", false));
        actions.add(Box::new(WatchCreateAction::new(arena.clone(), watch, 100, || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let children = arena.children(watch);
        assert_eq!(children.len(), 1);
        assert_eq!(arena.get(children[0]).unwrap().symbol, "\"alpha\"");
        assert_eq!(arena.get(children[0]).unwrap().value, "10");
    }

    #[test]
    fn update_marks_changed_values() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            assert_eq!(text, "-var-update 1 *");
            vec![format!(
                "{token}^done,changelist=[{{name=\"var1\",value=\"43\",in_scope=\"true\",type_changed=\"false\"}}]"
            )]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = {
            let mut a = arena.borrow_mut();
            let w = a.add_root(WatchNode::root("x", false));
            let node = a.get_mut(w).unwrap();
            node.id = "var1".to_string();
            node.value = "42".to_string();
            node.changed = true;
            w
        };

        actions.add(Box::new(WatchesUpdateAction::new(arena.clone(), || {})));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let node = arena.get(watch).unwrap();
        assert_eq!(node.value, "43");
        assert!(node.changed);
    }

    #[test]
    fn update_out_of_scope_collapses_with_sentinel() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, _) = split(cmd);
            vec![format!(
                "{token}^done,changelist=[{{name=\"var1\",in_scope=\"false\"}}]"
            )]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = {
            let mut a = arena.borrow_mut();
            let w = a.add_root(WatchNode::root("local", false));
            a.get_mut(w).unwrap().id = "var1".to_string();
            a.get_mut(w).unwrap().has_been_expanded = true;
            a.add_child_node(
                w,
                WatchNode {
                    id: "var1.a".to_string(),
                    symbol: "a".to_string(),
                    ..Default::default()
                },
            );
            w
        };

        actions.add(Box::new(WatchesUpdateAction::new(arena.clone(), || {})));
        pump(&mut actions, &mut executor);

        let arena = arena.borrow();
        let node = arena.get(watch).unwrap();
        assert_eq!(node.value, NOT_IN_SCOPE_LABEL);
        assert!(!node.has_been_expanded);
        assert!(node.children.is_empty());
    }

    #[test]
    fn update_is_idempotent_when_nothing_changed() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, _) = split(cmd);
            vec![format!("{token}^done,changelist=[]")]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let watch = {
            let mut a = arena.borrow_mut();
            let w = a.add_root(WatchNode::root("x", false));
            a.get_mut(w).unwrap().id = "var1".to_string();
            a.get_mut(w).unwrap().value = "42".to_string();
            w
        };

        for _ in 0..2 {
            let mut actions = ActionsMap::new();
            actions.add(Box::new(WatchesUpdateAction::new(arena.clone(), || {})));
            pump(&mut actions, &mut executor);
        }

        let arena = arena.borrow();
        let node = arena.get(watch).unwrap();
        assert_eq!(node.value, "42");
        assert!(!node.changed);
        assert!(node.children.is_empty());
    }

    #[test]
    fn expand_fetches_children_of_the_expanded_node() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-update") {
                assert_eq!(text, "-var-update var1");
                vec![format!("{token}^done,changelist=[]")]
            } else if text.starts_with("-var-list-children") {
                assert_eq!(text, "-var-list-children 2 \"var1.inner\"");
                vec![format!(
                    "{token}^done,numchild=\"1\",children=[child={{name=\"var1.inner.n\",exp=\"n\",numchild=\"0\",value=\"5\",type=\"int\"}}]"
                )]
            } else {
                vec![]
            }
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let inner = {
            let mut a = arena.borrow_mut();
            let root = a.add_root(WatchNode::root("s", false));
            a.get_mut(root).unwrap().id = "var1".to_string();
            let inner = a
                .add_child_node(
                    root,
                    WatchNode {
                        id: "var1.inner".to_string(),
                        symbol: "inner".to_string(),
                        ..Default::default()
                    },
                )
                .unwrap();
            a.append_placeholder(inner);
            inner
        };

        actions.add(Box::new(WatchExpandedAction::new(
            arena.clone(),
            "var1",
            inner,
            || {},
        )));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let children = arena.children(inner);
        assert_eq!(children.len(), 1);
        assert_eq!(arena.get(children[0]).unwrap().symbol, "n");
        assert!(arena.get(inner).unwrap().has_been_expanded);
    }

    #[test]
    fn relisting_identical_children_changes_nothing() {
        let responder = |cmd: &str| {
            let (token, text) = split(cmd);
            if text.starts_with("-var-update") {
                vec![format!("{token}^done,changelist=[]")]
            } else if text.starts_with("-var-list-children") {
                vec![format!(
                    "{token}^done,numchild=\"2\",children=[child={{name=\"var1.x\",exp=\"x\",numchild=\"0\",value=\"1\",type=\"int\"}},child={{name=\"var1.y\",exp=\"y\",numchild=\"0\",value=\"2\",type=\"int\"}}]"
                )]
            } else {
                vec![]
            }
        };
        let mut executor = GdbExecutor::new(Box::new(MockTransport::new().with_responder(responder)));

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let root = {
            let mut a = arena.borrow_mut();
            let root = a.add_root(WatchNode::root("p", false));
            a.get_mut(root).unwrap().id = "var1".to_string();
            a.append_placeholder(root);
            root
        };

        for _ in 0..2 {
            let mut actions = ActionsMap::new();
            actions.add(Box::new(WatchExpandedAction::new(
                arena.clone(),
                "var1",
                root,
                || {},
            )));
            pump(&mut actions, &mut executor);
        }

        let arena = arena.borrow();
        let children = arena.children(root);
        assert_eq!(children.len(), 2);
        assert_eq!(arena.get(children[0]).unwrap().id, "var1.x");
        assert_eq!(arena.get(children[1]).unwrap().id, "var1.y");
        assert!(!arena.get(children[0]).unwrap().marked_removed);
        assert!(arena.get(root).unwrap().has_been_expanded);
    }

    #[test]
    fn collapse_reinstates_the_placeholder() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let (token, text) = split(cmd);
            assert_eq!(text, "-var-delete -c var1.inner");
            vec![format!("{token}^done")]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let arena = Rc::new(RefCell::new(WatchArena::new()));
        let inner = {
            let mut a = arena.borrow_mut();
            let root = a.add_root(WatchNode::root("s", false));
            a.get_mut(root).unwrap().id = "var1".to_string();
            let inner = a
                .add_child_node(
                    root,
                    WatchNode {
                        id: "var1.inner".to_string(),
                        symbol: "inner".to_string(),
                        has_been_expanded: true,
                        ..Default::default()
                    },
                )
                .unwrap();
            a.add_child_node(
                inner,
                WatchNode {
                    id: "var1.inner.n".to_string(),
                    symbol: "n".to_string(),
                    ..Default::default()
                },
            );
            inner
        };

        actions.add(Box::new(WatchCollapseAction::new(
            arena.clone(),
            inner,
            "var1.inner",
            || {},
        )));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        let arena = arena.borrow();
        let node = arena.get(inner).unwrap();
        assert!(!node.has_been_expanded);
        let children = arena.children(inner);
        assert_eq!(children.len(), 1);
        assert!(arena.get(children[0]).unwrap().is_placeholder());
    }
}
