use std::sync::mpsc::{self, Receiver, Sender};

use serde_json::Value;
use tracing::debug;

use crate::error::ClientResult;

mod model;
mod parse;

pub use model::{Cluster, ClusterKey, ClusterSet, Document};

use self::parse::parse_cluster_contents;

pub const MIN_K: u8 = 2;
pub const MAX_K: u8 = 10;

pub fn clamp_k(input: i64) -> u8 {
    input.clamp(MIN_K as i64, MAX_K as i64) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Recluster,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Self::Load, Self::Recluster, Self::Delete];

    pub fn label(self) -> &'static str {
        match self {
            Self::Load => "Loading clusters",
            Self::Recluster => "Re-clustering",
            Self::Delete => "Deleting document",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Load => 0,
            Self::Recluster => 1,
            Self::Delete => 2,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Idle,
    Pending,
    Failed(String),
}

impl Lifecycle {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Replaced {
        origin: Operation,
        selection_cleared: bool,
    },
    SelectionChanged(Option<ClusterKey>),
    DocumentRemoved {
        key: ClusterKey,
        index: usize,
    },
    Lifecycle(Operation, Lifecycle),
}

/// Canonical client-side cluster state. Every mutation goes through a method here.
pub struct ClusterStore {
    set: ClusterSet,
    selected: Option<ClusterKey>,
    k: u8,
    lifecycles: [Lifecycle; 3],
    needs_refresh: bool,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl ClusterStore {
    pub fn new(initial_k: i64) -> Self {
        Self {
            set: ClusterSet::default(),
            selected: None,
            k: clamp_k(initial_k),
            lifecycles: Default::default(),
            needs_refresh: false,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Replaces the whole snapshot with a parsed `/cluster-contents` payload.
    pub fn load(&mut self, raw: &Value, origin: Operation) -> ClientResult<&ClusterSet> {
        let set = parse_cluster_contents(raw)?;

        let selection_cleared = self
            .selected
            .as_ref()
            .is_some_and(|key| !set.contains(key));
        if selection_cleared {
            debug!(key = ?self.selected, "selected cluster vanished from new snapshot");
            self.selected = None;
        }

        debug!(
            clusters = set.len(),
            documents = set.document_count(),
            "cluster snapshot replaced"
        );
        self.set = set;
        self.needs_refresh = false;
        self.notify(StoreEvent::Replaced {
            origin,
            selection_cleared,
        });
        Ok(&self.set)
    }

    /// Toggles the selection. Unknown keys are ignored.
    pub fn select(&mut self, key: &ClusterKey) {
        let next = if self.selected.as_ref() == Some(key) {
            None
        } else if self.set.contains(key) {
            Some(key.clone())
        } else {
            debug!(%key, "ignoring selection of unknown cluster");
            return;
        };

        self.selected = next.clone();
        self.notify(StoreEvent::SelectionChanged(next));
    }

    /// Removes one document. Callers only pass indices derived from the current snapshot.
    pub fn remove_document(&mut self, key: &ClusterKey, index: usize) -> Document {
        let cluster = self
            .set
            .get_mut(key)
            .unwrap_or_else(|| panic!("remove_document: cluster {key} is not in the store"));
        assert!(
            index < cluster.documents.len(),
            "remove_document: index {index} out of bounds for cluster {key} of length {}",
            cluster.documents.len()
        );

        let removed = cluster.documents.remove(index);
        self.notify(StoreEvent::DocumentRemoved {
            key: key.clone(),
            index,
        });
        removed
    }

    pub fn visible_clusters(&self) -> Vec<&Cluster> {
        match &self.selected {
            None => self.set.clusters().iter().collect(),
            Some(key) => self.set.get(key).into_iter().collect(),
        }
    }

    pub fn clusters(&self) -> &ClusterSet {
        &self.set
    }

    pub fn cluster(&self, key: &ClusterKey) -> Option<&Cluster> {
        self.set.get(key)
    }

    pub fn selected(&self) -> Option<&ClusterKey> {
        self.selected.as_ref()
    }

    pub fn document_count(&self) -> usize {
        self.set.document_count()
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    pub fn set_k(&mut self, input: i64) -> u8 {
        self.k = clamp_k(input);
        self.k
    }

    pub fn lifecycle(&self, operation: Operation) -> &Lifecycle {
        &self.lifecycles[operation.slot()]
    }

    pub(crate) fn set_lifecycle(&mut self, operation: Operation, lifecycle: Lifecycle) {
        if self.lifecycles[operation.slot()] == lifecycle {
            return;
        }
        debug!(?operation, ?lifecycle, "lifecycle changed");
        self.lifecycles[operation.slot()] = lifecycle.clone();
        self.notify(StoreEvent::Lifecycle(operation, lifecycle));
    }

    /// True when the server has applied a change the current snapshot does not show yet.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    pub(crate) fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}
