//! Export tree: the hierarchy discovered by one job
//!
//! Only the root level is shared between discovery workers. Each worker reserves
//! its root identifier in [`ExportTree`] with an insert-if-absent, crawls into a
//! [`TreeNode`] it owns outright, and publishes the finished node back into the
//! reserved slot. Nothing below the root is ever touched by two tasks.

use crate::types::Identifier;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One object of the expanded hierarchy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    name: Identifier,
    children: Vec<TreeNode>,
    child_names: HashSet<Identifier>,
    pages: Vec<PathBuf>,
    page_index: HashSet<PathBuf>,
}

impl TreeNode {
    /// Empty node for `name`
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            children: Vec::new(),
            child_names: HashSet::new(),
            pages: Vec::new(),
            page_index: HashSet::new(),
        }
    }

    /// Identifier of this node
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Add a child node; `None` if a child with that identifier exists
    pub fn create_child(&mut self, name: Identifier) -> Option<&mut TreeNode> {
        if !self.child_names.insert(name.clone()) {
            return None;
        }
        self.children.push(TreeNode::new(name));
        self.children.last_mut()
    }

    /// Append a page path unless it is already present; returns whether it was added
    pub fn add_page_path(&mut self, path: PathBuf) -> bool {
        if !self.page_index.insert(path.clone()) {
            return false;
        }
        self.pages.push(path);
        true
    }

    /// Children in creation order
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Page paths held directly by this node, in resolution order
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    /// Whether this node holds neither children nor pages
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.pages.is_empty()
    }

    /// Pages in this node and every descendant
    pub fn total_pages(&self) -> usize {
        self.pages.len() + self.children.iter().map(TreeNode::total_pages).sum::<usize>()
    }

    /// Whether `path` is among this node's direct pages
    pub fn contains_page(&self, path: &Path) -> bool {
        self.page_index.contains(path)
    }
}

#[derive(Debug)]
enum RootSlot {
    Pending,
    Ready(TreeNode),
}

/// Shared root level of a job's tree
#[derive(Debug, Default)]
pub struct ExportTree {
    roots: DashMap<Identifier, (usize, RootSlot)>,
}

impl ExportTree {
    /// Empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the root slot for `name`; `false` if another worker holds it.
    ///
    /// `position` orders the published roots.
    pub fn reserve(&self, position: usize, name: &Identifier) -> bool {
        match self.roots.entry(name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert((position, RootSlot::Pending));
                true
            }
        }
    }

    /// Store a finished root subtree in its reserved slot
    pub fn publish(&self, node: TreeNode) {
        if let Some(mut slot) = self.roots.get_mut(node.name()) {
            slot.1 = RootSlot::Ready(node);
        }
    }

    /// Number of reserved roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether no root was reserved
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Consume the tree, yielding published roots in submission order
    pub fn into_roots(self) -> Vec<TreeNode> {
        let mut ready: Vec<(usize, TreeNode)> = self
            .roots
            .into_iter()
            .filter_map(|(_, (position, slot))| match slot {
                RootSlot::Ready(node) => Some((position, node)),
                RootSlot::Pending => None,
            })
            .collect();
        ready.sort_by_key(|(position, _)| *position);
        ready.into_iter().map(|(_, node)| node).collect()
    }
}

/// Pages resolved so far by every worker of one job
#[derive(Clone, Debug, Default)]
pub struct PageCounter(Arc<AtomicUsize>);

impl PageCounter {
    /// Counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one page, returning the new total
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current total
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
