//! Arena-backed plist document and the mutation API.
//!
//! A [`Plist`] owns every node of one property list in an arena and hands out
//! [`NodeId`] handles. Mutations name their target child by handle, so two
//! structurally equal siblings can never be confused: `replace_entry` and
//! `delete_entry` touch exactly the node passed in.
//!
//! Replacing or deleting a child releases its whole subtree and returns its
//! slots to a free list. Every slot carries a generation that is bumped on
//! release, so a stale handle never resolves to the node that later reuses its
//! slot.
//!
//! The document also records the external [`Format`] it was read from, so a
//! save can write back in the same encoding.

use crate::error::{PlistError, Result};
use crate::format::Format;
use crate::types::{item_count, Entry, Value, ValueType};
use std::fmt;
use std::slice;
use tracing::debug;

/// Base name for generated dictionary keys.
pub const NEW_ITEM_NAME: &str = "New Item";

/// Label of the single synthetic entry listed under the root container.
pub const ROOT_ENTRY_NAME: &str = "<plist>";

/// Handle to a node inside one [`Plist`]: a slot index plus the generation
/// the slot had when the node was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.generation > 0 {
            write!(f, "@{}", self.generation)?;
        }
        Ok(())
    }
}

/// The parent side of a mutation: either the single-slot document root or an
/// aggregate node.
///
/// The root holds exactly one value. It only supports `replace_entry` of that
/// value; every other structural edit on it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Root,
    Node(NodeId),
}

impl From<NodeId> for Container {
    fn from(id: NodeId) -> Self {
        Container::Node(id)
    }
}

/// Arena node. Primitives keep their [`Value`]; aggregates keep child handles.
#[derive(Debug, Clone)]
enum Node {
    Array(Vec<NodeId>),
    Dictionary(Vec<(String, NodeId)>),
    Leaf(Value),
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

/// One arena position. `slot` is `None` while the position sits on the free
/// list.
#[derive(Debug, Clone)]
struct Cell {
    generation: u32,
    slot: Option<Slot>,
}

/// A property-list document: exactly one root value plus its storage format.
#[derive(Debug, Clone)]
pub struct Plist {
    cells: Vec<Cell>,
    free: Vec<usize>,
    root: NodeId,
    format: Format,
}

impl Plist {
    /// Build a document from an owned value, tagged as XML.
    pub fn new(root: Value) -> Self {
        Self::with_format(root, Format::Xml)
    }

    pub fn with_format(root: Value, format: Format) -> Self {
        let mut plist = Plist {
            cells: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            format,
        };
        plist.root = plist.alloc(root, None);
        plist
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The encoding this document was last read from or should be written to.
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Owned snapshot of the whole tree.
    pub fn root_value(&self) -> Value {
        self.to_value(self.root).unwrap_or_else(|| ValueType::Dictionary.default_value())
    }

    /// Type of the root value; the root container reports it as its own.
    pub fn value_type_of_root(&self) -> ValueType {
        self.value_type(self.root).unwrap_or(ValueType::Dictionary)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    /// Number of arena slots, live or free. Released slots are reused, so this
    /// tracks the largest the document has been, not its edit history.
    pub fn slot_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    /// Where `id` hangs: the root container, its parent aggregate, or `None`
    /// for a stale handle.
    pub fn container_of(&self, id: NodeId) -> Option<Container> {
        let slot = self.slot(id)?;
        match slot.parent {
            Some(parent) => Some(Container::Node(parent)),
            None => Some(Container::Root),
        }
    }

    pub fn value_type(&self, id: NodeId) -> Option<ValueType> {
        Some(match &self.slot(id)?.node {
            Node::Array(_) => ValueType::Array,
            Node::Dictionary(_) => ValueType::Dictionary,
            Node::Leaf(value) => value.value_type(),
        })
    }

    /// The primitive value stored at `id`; `None` for aggregates.
    pub fn primitive(&self, id: NodeId) -> Option<&Value> {
        match &self.slot(id)?.node {
            Node::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Number of direct children of an aggregate.
    pub fn len(&self, id: NodeId) -> Option<usize> {
        match &self.slot(id)?.node {
            Node::Array(items) => Some(items.len()),
            Node::Dictionary(entries) => Some(entries.len()),
            Node::Leaf(_) => None,
        }
    }

    /// Owned snapshot of the subtree at `id`.
    pub fn to_value(&self, id: NodeId) -> Option<Value> {
        let mut frames: Vec<Frame<'_>> = Vec::new();
        let mut completed: Option<Value> = None;
        let mut visit = Some(id);
        loop {
            if let Some(id) = visit.take() {
                match &self.slot(id)?.node {
                    Node::Leaf(value) => completed = Some(value.clone()),
                    Node::Array(items) => frames.push(Frame::Array {
                        pending: items.iter(),
                        done: Vec::with_capacity(items.len()),
                    }),
                    Node::Dictionary(entries) => frames.push(Frame::Dictionary {
                        pending: entries.iter(),
                        done: Vec::with_capacity(entries.len()),
                        key: String::new(),
                    }),
                }
            }
            let Some(frame) = frames.last_mut() else {
                return completed;
            };
            if let Some(value) = completed.take() {
                frame.accept(value);
            }
            match frame.next_child() {
                Some(child) => visit = Some(child),
                None => completed = frames.pop().map(Frame::finish),
            }
        }
    }

    /// Editing text of a node (see [`Value::as_string`]).
    pub fn as_string(&self, id: NodeId) -> Option<String> {
        Some(match &self.slot(id)?.node {
            Node::Leaf(value) => value.as_string(),
            Node::Array(items) => item_count(items.len()),
            Node::Dictionary(entries) => item_count(entries.len()),
        })
    }

    /// Parse `text` into the primitive at `id`, keeping the old content on error.
    pub fn set_from_string(&mut self, id: NodeId, text: &str) -> Result<()> {
        let slot = self.slot_mut(id).ok_or(PlistError::UnknownNode)?;
        match &mut slot.node {
            Node::Leaf(value) => value.set_from_string(text),
            Node::Array(_) => Err(PlistError::NotPrimitive(ValueType::Array)),
            Node::Dictionary(_) => Err(PlistError::NotPrimitive(ValueType::Dictionary)),
        }
    }

    /// Children of `container` as `(name, node)` entries.
    ///
    /// Array children are labelled `"Item <index>"` for display only; those
    /// labels are not stored and cannot be renamed. The root container lists
    /// one entry named `"<plist>"`. Primitives have no elements.
    pub fn elements(&self, container: impl Into<Container>) -> Option<Vec<Entry<NodeId>>> {
        let id = match container.into() {
            Container::Root => return Some(vec![Entry::named(ROOT_ENTRY_NAME, self.root)]),
            Container::Node(id) => id,
        };
        match &self.slot(id)?.node {
            Node::Array(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| Entry::named(format!("Item {index}"), *child))
                    .collect(),
            ),
            Node::Dictionary(entries) => Some(
                entries
                    .iter()
                    .map(|(key, child)| Entry::named(key.clone(), *child))
                    .collect(),
            ),
            Node::Leaf(_) => None,
        }
    }

    /// The `index`-th child of an array or dictionary.
    pub fn child(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        match &self.slot(parent)?.node {
            Node::Array(items) => items.get(index).copied(),
            Node::Dictionary(entries) => entries.get(index).map(|(_, child)| *child),
            Node::Leaf(_) => None,
        }
    }

    /// The dictionary value stored under `key`.
    pub fn get(&self, dict: NodeId, key: &str) -> Option<NodeId> {
        match &self.slot(dict)?.node {
            Node::Dictionary(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, child)| *child),
            _ => None,
        }
    }

    /// Key under which `child` is stored in its parent dictionary.
    pub fn key_of(&self, child: NodeId) -> Option<&str> {
        let parent = self.parent(child)?;
        match &self.slot(parent)?.node {
            Node::Dictionary(entries) => entries
                .iter()
                .find(|(_, id)| *id == child)
                .map(|(key, _)| key.as_str()),
            _ => None,
        }
    }

    /// Resolve a `/`-separated path of dictionary keys and array indices,
    /// e.g. `Installed Extensions/0/Enabled`. The empty path is the root.
    /// Keys containing `/` cannot be addressed this way.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = match &self.slot(current)?.node {
                Node::Array(items) => *items.get(segment.parse::<usize>().ok()?)?,
                Node::Dictionary(_) => self.get(current, segment)?,
                Node::Leaf(_) => return None,
            };
        }
        Some(current)
    }

    // ------------------------------------------------------------------
    // Mutation API
    // ------------------------------------------------------------------

    /// Add `entry` at the end of an aggregate.
    ///
    /// Arrays ignore the entry name. Dictionaries trust the caller for key
    /// uniqueness; an entry without a name gets a generated one. Fails on the
    /// root container and on primitives.
    pub fn append(&mut self, container: impl Into<Container>, entry: Entry) -> Option<NodeId> {
        let Container::Node(parent) = container.into() else {
            return None;
        };
        let (name, value) = entry.into_parts();
        match &self.slot(parent)?.node {
            Node::Array(_) => {
                let child = self.alloc(value, Some(parent));
                if let Some(Node::Array(items)) = self.node_mut(parent) {
                    items.push(child);
                }
                Some(child)
            }
            Node::Dictionary(entries) => {
                let key = match name {
                    Some(name) => name,
                    None => fresh_name(entries),
                };
                let child = self.alloc(value, Some(parent));
                if let Some(Node::Dictionary(entries)) = self.node_mut(parent) {
                    entries.push((key, child));
                }
                Some(child)
            }
            Node::Leaf(_) => None,
        }
    }

    /// Swap the direct child `old` for `new`, keeping its position and, in a
    /// dictionary, its key. On the root container this replaces the whole tree
    /// when `old` is the current root value.
    ///
    /// Returns the new child's handle, or `None` (no change) when `old` is not
    /// a direct child of `container`.
    pub fn replace_entry(
        &mut self,
        container: impl Into<Container>,
        old: NodeId,
        new: Value,
    ) -> Option<NodeId> {
        let parent = match container.into() {
            Container::Root => {
                if old != self.root || !self.contains(old) {
                    return None;
                }
                self.release(old);
                self.root = self.alloc(new, None);
                debug!(root = %self.root, "replaced root value");
                return Some(self.root);
            }
            Container::Node(parent) => parent,
        };
        let position = self.position_of(parent, old)?;
        let child = self.alloc(new, Some(parent));
        match self.node_mut(parent)? {
            Node::Array(items) => items[position] = child,
            Node::Dictionary(entries) => entries[position].1 = child,
            Node::Leaf(_) => return None,
        }
        self.release(old);
        Some(child)
    }

    /// Remove the direct child `old`. Returns `false` (no change) when it is
    /// not a child of `container`; always `false` on the root container.
    pub fn delete_entry(&mut self, container: impl Into<Container>, old: NodeId) -> bool {
        let Container::Node(parent) = container.into() else {
            return false;
        };
        let Some(position) = self.position_of(parent, old) else {
            return false;
        };
        match self.node_mut(parent) {
            Some(Node::Array(items)) => {
                items.remove(position);
            }
            Some(Node::Dictionary(entries)) => {
                entries.remove(position);
            }
            _ => return false,
        }
        self.release(old);
        true
    }

    /// Insert `new` as the first child. Dictionaries name it with a fresh
    /// `"New Item"` key. Fails on the root container and on primitives.
    pub fn insert_first_child(
        &mut self,
        container: impl Into<Container>,
        new: Value,
    ) -> Option<NodeId> {
        let Container::Node(parent) = container.into() else {
            return None;
        };
        self.insert_at(parent, 0, new)
    }

    /// Insert `new` directly after the child `after`. Dictionaries name it
    /// with a fresh `"New Item"` key. `None` (no change) when `after` is not a
    /// direct child of `container`.
    pub fn insert_after_child(
        &mut self,
        container: impl Into<Container>,
        new: Value,
        after: NodeId,
    ) -> Option<NodeId> {
        let Container::Node(parent) = container.into() else {
            return None;
        };
        let position = self.position_of(parent, after)?;
        self.insert_at(parent, position + 1, new)
    }

    /// Rename a dictionary key in place, keeping its position and value.
    ///
    /// Fails without changes when the names are equal, when `new_name` is
    /// already taken, when `old_name` is absent, or when `dict` is not a
    /// dictionary.
    pub fn rename_entry(&mut self, dict: NodeId, old_name: &str, new_name: &str) -> bool {
        if old_name == new_name {
            return false;
        }
        let Some(Node::Dictionary(entries)) = self.node_mut(dict) else {
            return false;
        };
        if entries.iter().any(|(key, _)| key == new_name) {
            return false;
        }
        match entries.iter_mut().find(|(key, _)| key == old_name) {
            Some(entry) => {
                new_name.clone_into(&mut entry.0);
                true
            }
            None => false,
        }
    }

    /// Replace `node` with a default value of another kind, in the same slot.
    pub fn change_type(&mut self, node: NodeId, kind: ValueType) -> Option<NodeId> {
        let container = self.container_of(node)?;
        self.replace_entry(container, node, kind.default_value())
    }

    // ------------------------------------------------------------------
    // Arena internals
    // ------------------------------------------------------------------

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        let cell = self.cells.get(id.index)?;
        if cell.generation != id.generation {
            return None;
        }
        cell.slot.as_ref()
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        let cell = self.cells.get_mut(id.index)?;
        if cell.generation != id.generation {
            return None;
        }
        cell.slot.as_mut()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slot_mut(id).map(|slot| &mut slot.node)
    }

    fn position_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        match &self.slot(parent)?.node {
            Node::Array(items) => items.iter().position(|id| *id == child),
            Node::Dictionary(entries) => entries.iter().position(|(_, id)| *id == child),
            Node::Leaf(_) => None,
        }
    }

    fn insert_at(&mut self, parent: NodeId, position: usize, new: Value) -> Option<NodeId> {
        match &self.slot(parent)?.node {
            Node::Array(_) => {
                let child = self.alloc(new, Some(parent));
                if let Some(Node::Array(items)) = self.node_mut(parent) {
                    items.insert(position, child);
                }
                Some(child)
            }
            Node::Dictionary(entries) => {
                let key = fresh_name(entries);
                let child = self.alloc(new, Some(parent));
                if let Some(Node::Dictionary(entries)) = self.node_mut(parent) {
                    entries.insert(position, (key, child));
                }
                Some(child)
            }
            Node::Leaf(_) => None,
        }
    }

    /// Take a free slot, or grow the arena, and fill it with a placeholder.
    fn reserve(&mut self, parent: Option<NodeId>) -> NodeId {
        let slot = Slot {
            node: Node::Array(Vec::new()),
            parent,
        };
        if let Some(index) = self.free.pop() {
            if let Some(cell) = self.cells.get_mut(index) {
                cell.slot = Some(slot);
                return NodeId {
                    index,
                    generation: cell.generation,
                };
            }
        }
        let index = self.cells.len();
        self.cells.push(Cell {
            generation: 0,
            slot: Some(slot),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Store `value` and all of its descendants, returning the new subtree root.
    fn alloc(&mut self, value: Value, parent: Option<NodeId>) -> NodeId {
        let top = self.reserve(parent);
        let mut pending = vec![(top, value)];
        while let Some((id, value)) = pending.pop() {
            let node = match value {
                Value::Array(items) => {
                    let mut children = Vec::with_capacity(items.len());
                    for item in items {
                        let child = self.reserve(Some(id));
                        children.push(child);
                        pending.push((child, item));
                    }
                    Node::Array(children)
                }
                Value::Dictionary(entries) => {
                    let mut children = Vec::with_capacity(entries.len());
                    for (key, item) in entries {
                        let child = self.reserve(Some(id));
                        children.push((key, child));
                        pending.push((child, item));
                    }
                    Node::Dictionary(children)
                }
                leaf => Node::Leaf(leaf),
            };
            if let Some(slot) = self.slot_mut(id) {
                slot.node = node;
            }
        }
        top
    }

    /// Drop the subtree rooted at `id` and put its slots on the free list.
    ///
    /// Each released slot moves to the next generation. A slot would have to
    /// be reused 2^32 times before an old handle could match it again.
    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(cell) = self.cells.get_mut(id.index) else {
                continue;
            };
            if cell.generation != id.generation {
                continue;
            }
            let Some(slot) = cell.slot.take() else {
                continue;
            };
            cell.generation = cell.generation.wrapping_add(1);
            self.free.push(id.index);
            match slot.node {
                Node::Array(items) => pending.extend(items),
                Node::Dictionary(entries) => pending.extend(entries.into_iter().map(|(_, c)| c)),
                Node::Leaf(_) => {}
            }
        }
    }
}

/// Partly rebuilt aggregate in [`Plist::to_value`].
enum Frame<'a> {
    Array {
        pending: slice::Iter<'a, NodeId>,
        done: Vec<Value>,
    },
    Dictionary {
        pending: slice::Iter<'a, (String, NodeId)>,
        done: Vec<(String, Value)>,
        key: String,
    },
}

impl Frame<'_> {
    fn accept(&mut self, value: Value) {
        match self {
            Frame::Array { done, .. } => done.push(value),
            Frame::Dictionary { done, key, .. } => done.push((std::mem::take(key), value)),
        }
    }

    fn next_child(&mut self) -> Option<NodeId> {
        match self {
            Frame::Array { pending, .. } => pending.next().copied(),
            Frame::Dictionary { pending, key, .. } => {
                let (name, child) = pending.next()?;
                key.clone_from(name);
                Some(*child)
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Frame::Array { done, .. } => Value::Array(done),
            Frame::Dictionary { done, .. } => Value::Dictionary(done),
        }
    }
}

impl From<Value> for Plist {
    fn from(value: Value) -> Self {
        Plist::new(value)
    }
}

/// First of `New Item`, `New Item 2`, `New Item 3`, ... not used as a key.
fn fresh_name(entries: &[(String, NodeId)]) -> String {
    fresh_key(entries.iter().map(|(key, _)| key.as_str()))
}

pub(crate) fn fresh_key<'a>(keys: impl Iterator<Item = &'a str> + Clone) -> String {
    let taken = |name: &str| keys.clone().any(|key| key == name);
    if !taken(NEW_ITEM_NAME) {
        return NEW_ITEM_NAME.to_string();
    }
    (2..)
        .map(|index| format!("{NEW_ITEM_NAME} {index}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| NEW_ITEM_NAME.to_string())
}
