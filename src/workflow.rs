use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::Backend;
use crate::error::{ClientError, ClientResult};
use crate::store::{ClusterStore, Lifecycle, Operation, clamp_k};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Command,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum InFlight {
    Load,
    Recluster { k: u8, step: Step },
    Delete { doc_id: String, step: Step },
}

impl InFlight {
    fn operation(&self) -> Operation {
        match self {
            Self::Load => Operation::Load,
            Self::Recluster { .. } => Operation::Recluster,
            Self::Delete { .. } => Operation::Delete,
        }
    }
}

enum Outcome {
    Command(ClientResult<()>),
    Contents(ClientResult<Value>),
    /// The worker went away without answering.
    Lost,
}

struct Completion {
    ticket: u64,
    outcome: Outcome,
}

/// Sends exactly one completion per worker, even if the worker unwinds.
struct Reply {
    ticket: u64,
    tx: Sender<Completion>,
    sent: bool,
}

impl Reply {
    fn new(ticket: u64, tx: Sender<Completion>) -> Self {
        Self {
            ticket,
            tx,
            sent: false,
        }
    }

    fn send(mut self, outcome: Outcome) {
        self.sent = true;
        let _ = self.tx.send(Completion {
            ticket: self.ticket,
            outcome,
        });
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(Completion {
                ticket: self.ticket,
                outcome: Outcome::Lost,
            });
        }
    }
}

/// Drives loads, re-clustering and deletion against the backend.
///
/// Network calls run on worker threads; their results are applied to the
/// store only from [`Workflow::poll`], on the caller's thread. Each issued
/// request gets a ticket and only the latest ticket may change state.
pub struct Workflow {
    backend: Arc<dyn Backend>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    issued: u64,
    in_flight: Option<InFlight>,
    partial: Option<Operation>,
}

impl Workflow {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            issued: 0,
            in_flight: None,
            partial: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending(&self) -> Option<Operation> {
        self.in_flight.as_ref().map(InFlight::operation)
    }

    fn next_ticket(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn spawn_fetch(&mut self) {
        let ticket = self.next_ticket();
        let backend = Arc::clone(&self.backend);
        let reply = Reply::new(ticket, self.tx.clone());
        debug!(ticket, "fetching cluster contents");

        thread::spawn(move || {
            let outcome = Outcome::Contents(backend.cluster_contents());
            reply.send(outcome);
        });
    }

    fn spawn_command<F>(&mut self, command: F)
    where
        F: FnOnce(&dyn Backend) -> ClientResult<()> + Send + 'static,
    {
        let ticket = self.next_ticket();
        let backend = Arc::clone(&self.backend);
        let reply = Reply::new(ticket, self.tx.clone());

        thread::spawn(move || {
            let outcome = Outcome::Command(command(&*backend));
            reply.send(outcome);
        });
    }

    fn guard(&self, requested: Operation) -> ClientResult<()> {
        match &self.in_flight {
            None => Ok(()),
            Some(InFlight::Load) if requested == Operation::Load => Ok(()),
            Some(current) => {
                debug!(?requested, pending = ?current.operation(), "rejecting overlapping request");
                Err(ClientError::OperationInProgress)
            }
        }
    }

    /// Fetches cluster contents. A newer refresh supersedes an older one still in flight.
    pub fn refresh(&mut self, store: &mut ClusterStore) -> ClientResult<()> {
        self.guard(Operation::Load)?;
        self.in_flight = Some(InFlight::Load);
        store.set_lifecycle(Operation::Load, Lifecycle::Pending);
        self.spawn_fetch();
        Ok(())
    }

    /// Re-clusters into `k` groups (clamped to the allowed range), then refetches contents.
    pub fn request_recluster(&mut self, store: &mut ClusterStore, k: i64) -> ClientResult<()> {
        let k = clamp_k(k);
        self.guard(Operation::Recluster)?;

        store.set_k(k as i64);
        self.in_flight = Some(InFlight::Recluster {
            k,
            step: Step::Command,
        });
        store.set_lifecycle(Operation::Recluster, Lifecycle::Pending);
        info!(k, "re-clustering requested");
        self.spawn_command(move |backend| backend.recluster(k));
        Ok(())
    }

    /// Deletes a document on the server, then refetches contents. The store is never edited locally.
    pub fn request_delete(&mut self, store: &mut ClusterStore, doc_id: &str) -> ClientResult<()> {
        self.guard(Operation::Delete)?;

        let doc_id = doc_id.to_owned();
        self.in_flight = Some(InFlight::Delete {
            doc_id: doc_id.clone(),
            step: Step::Command,
        });
        store.set_lifecycle(Operation::Delete, Lifecycle::Pending);
        info!(%doc_id, "document deletion requested");
        self.spawn_command(move |backend| backend.delete_document(&doc_id));
        Ok(())
    }

    /// Applies every finished request. Returns true if anything visible changed.
    pub fn poll(&mut self, store: &mut ClusterStore) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion, store);
        }
        changed
    }

    fn apply(&mut self, completion: Completion, store: &mut ClusterStore) -> bool {
        if completion.ticket != self.issued {
            warn!(
                ticket = completion.ticket,
                latest = self.issued,
                "discarding superseded response"
            );
            return false;
        }

        let Some(in_flight) = self.in_flight.take() else {
            warn!(ticket = completion.ticket, "response arrived with nothing in flight");
            return false;
        };

        let outcome = match completion.outcome {
            Outcome::Lost => {
                warn!(ticket = completion.ticket, "background request stopped before answering");
                let error = ClientError::Transport("background request stopped before answering".to_owned());
                match &in_flight {
                    InFlight::Recluster {
                        step: Step::Command,
                        ..
                    }
                    | InFlight::Delete {
                        step: Step::Command,
                        ..
                    } => Outcome::Command(Err(error)),
                    _ => Outcome::Contents(Err(error)),
                }
            }
            outcome => outcome,
        };

        match (in_flight, outcome) {
            (InFlight::Load, Outcome::Contents(result)) => {
                self.finish_refresh(store, Operation::Load, result);
            }
            (InFlight::Recluster { k, step: Step::Command }, Outcome::Command(result)) => {
                match result {
                    Ok(()) => {
                        info!(k, "re-clustering applied on server");
                        self.in_flight = Some(InFlight::Recluster {
                            k,
                            step: Step::Refresh,
                        });
                        self.spawn_fetch();
                    }
                    Err(error) => {
                        store.set_lifecycle(Operation::Recluster, Lifecycle::Failed(error.to_string()));
                    }
                }
            }
            (InFlight::Delete { doc_id, step: Step::Command }, Outcome::Command(result)) => {
                match result {
                    Ok(()) => {
                        info!(%doc_id, "document deleted on server");
                        self.in_flight = Some(InFlight::Delete {
                            doc_id,
                            step: Step::Refresh,
                        });
                        self.spawn_fetch();
                    }
                    Err(error) => {
                        store.set_lifecycle(Operation::Delete, Lifecycle::Failed(error.to_string()));
                    }
                }
            }
            (
                InFlight::Recluster { step: Step::Refresh, .. },
                Outcome::Contents(result),
            ) => {
                self.finish_refresh(store, Operation::Recluster, result);
            }
            (InFlight::Delete { step: Step::Refresh, .. }, Outcome::Contents(result)) => {
                self.finish_refresh(store, Operation::Delete, result);
            }
            (in_flight, _) => {
                warn!(?in_flight, "response does not match the pending step");
                self.in_flight = Some(in_flight);
                return false;
            }
        }
        true
    }

    fn finish_refresh(
        &mut self,
        store: &mut ClusterStore,
        origin: Operation,
        result: ClientResult<Value>,
    ) {
        // A refresh that recovers an earlier partial failure completes that operation.
        let replaced_by = match self.partial {
            Some(partial) if origin == Operation::Load => partial,
            _ => origin,
        };
        match result.and_then(|raw| store.load(&raw, replaced_by).map(|set| set.len())) {
            Ok(clusters) => {
                info!(?origin, clusters, "clusters refreshed");
                store.set_lifecycle(origin, Lifecycle::Idle);
                if let Some(partial) = self.partial.take()
                    && partial != origin
                {
                    store.set_lifecycle(partial, Lifecycle::Idle);
                }
            }
            Err(error) if origin == Operation::Load => {
                store.set_lifecycle(origin, Lifecycle::Failed(error.to_string()));
            }
            Err(error) => {
                let message = format!(
                    "{} succeeded on the server, but refreshing clusters failed: {error}",
                    origin.label()
                );
                store.mark_needs_refresh();
                self.partial = Some(origin);
                store.set_lifecycle(origin, Lifecycle::Failed(message));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn settle(&mut self, store: &mut ClusterStore) {
        while self.in_flight.is_some() {
            let completion = self
                .rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("worker answered");
            self.apply(completion, store);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::store::{ClusterKey, StoreEvent};
    use crate::testing::{Call, FakeBackend};

    use super::*;

    fn doc(id: &str) -> Value {
        json!({"doc_id": id, "filename": id, "extracted_text": ""})
    }

    fn setup(contents: Value) -> (Arc<FakeBackend>, Workflow, ClusterStore) {
        let backend = Arc::new(FakeBackend::with_contents(contents));
        let workflow = Workflow::new(backend.clone());
        (backend, workflow, ClusterStore::new(3))
    }

    #[test]
    fn initial_refresh_loads_store() {
        let (backend, mut workflow, mut store) =
            setup(json!({"0": [doc("a"), doc("b")], "1": [doc("c")]}));

        workflow.refresh(&mut store).expect("accepted");
        assert!(store.lifecycle(Operation::Load).is_pending());
        workflow.settle(&mut store);

        assert_eq!(store.lifecycle(Operation::Load), &Lifecycle::Idle);
        assert_eq!(store.clusters().len(), 2);
        assert_eq!(backend.calls(), [Call::ClusterContents]);
    }

    #[test]
    fn recluster_clamps_then_commands_then_refreshes() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")]}));

        workflow.request_recluster(&mut store, 15).expect("accepted");
        assert_eq!(store.k(), 10);
        workflow.settle(&mut store);

        assert_eq!(backend.calls(), [Call::Recluster(10), Call::ClusterContents]);
        assert_eq!(store.lifecycle(Operation::Recluster), &Lifecycle::Idle);
        assert_eq!(store.clusters().len(), 1);
    }

    #[test]
    fn overlapping_recluster_is_rejected_without_a_second_command() {
        let (backend, mut workflow, mut store) = setup(json!({"0": []}));

        workflow.request_recluster(&mut store, 4).expect("accepted");
        assert_eq!(
            workflow.request_recluster(&mut store, 5),
            Err(ClientError::OperationInProgress)
        );
        assert_eq!(
            workflow.request_delete(&mut store, "a"),
            Err(ClientError::OperationInProgress)
        );
        assert_eq!(
            workflow.refresh(&mut store),
            Err(ClientError::OperationInProgress)
        );
        workflow.settle(&mut store);

        let commands = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Recluster(_)))
            .collect::<Vec<_>>();
        assert_eq!(commands, [Call::Recluster(4)]);
        assert_eq!(store.k(), 4);
    }

    #[test]
    fn recluster_is_rejected_while_loading() {
        let (_backend, mut workflow, mut store) = setup(json!({}));
        workflow.refresh(&mut store).expect("accepted");
        assert_eq!(
            workflow.request_recluster(&mut store, 3),
            Err(ClientError::OperationInProgress)
        );
        assert_eq!(workflow.pending(), Some(Operation::Load));
        workflow.settle(&mut store);
        assert!(!workflow.is_busy());
    }

    #[test]
    fn failed_command_leaves_snapshot_and_skips_refresh() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")], "1": [doc("b")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        backend.set_recluster(Err(ClientError::from_status(500, r#"{"error":"clustering failed"}"#)));
        backend.set_contents(Ok(json!({"9": []})));
        workflow.request_recluster(&mut store, 2).expect("accepted");
        workflow.settle(&mut store);

        assert_eq!(
            store.lifecycle(Operation::Recluster).failure(),
            Some("clustering failed")
        );
        assert_eq!(store.clusters().len(), 2);
        assert_eq!(backend.calls().last(), Some(&Call::Recluster(2)));
        assert!(!store.needs_refresh());
    }

    #[test]
    fn refresh_failure_after_command_is_retriable_with_refresh() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        backend.set_contents(Err(ClientError::Transport("connection reset".to_owned())));
        workflow.request_recluster(&mut store, 3).expect("accepted");
        workflow.settle(&mut store);

        let failure = store
            .lifecycle(Operation::Recluster)
            .failure()
            .expect("failed")
            .to_owned();
        assert!(failure.contains("connection reset"));
        assert!(store.needs_refresh());
        assert_eq!(store.clusters().len(), 1);

        backend.set_contents(Ok(json!({"0": [doc("a")], "1": [], "2": []})));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        assert!(!store.needs_refresh());
        assert_eq!(store.lifecycle(Operation::Recluster), &Lifecycle::Idle);
        assert_eq!(store.clusters().len(), 3);
        let reclusters = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Recluster(_)))
            .count();
        assert_eq!(reclusters, 1);
    }

    #[test]
    fn malformed_refresh_counts_as_failure() {
        let (_backend, mut workflow, mut store) = setup(json!(["not", "a", "map"]));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        assert!(
            store
                .lifecycle(Operation::Load)
                .failure()
                .is_some_and(|message| message.starts_with("Invalid response format"))
        );
    }

    #[test]
    fn delete_refreshes_from_server_instead_of_editing_locally() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a"), doc("b")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        backend.set_contents(Ok(json!({"0": [doc("b")]})));
        workflow.request_delete(&mut store, "a").expect("accepted");
        assert_eq!(store.document_count(), 2);
        workflow.settle(&mut store);

        assert_eq!(
            backend.calls(),
            [
                Call::ClusterContents,
                Call::Delete("a".to_owned()),
                Call::ClusterContents
            ]
        );
        assert_eq!(store.document_count(), 1);
        assert_eq!(store.lifecycle(Operation::Delete), &Lifecycle::Idle);
    }

    #[test]
    fn failed_delete_leaves_store_unchanged() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        backend.set_delete(Err(ClientError::from_status(404, r#"{"error":"Document not found"}"#)));
        workflow.request_delete(&mut store, "a").expect("accepted");
        workflow.settle(&mut store);

        assert_eq!(store.document_count(), 1);
        assert_eq!(
            store.lifecycle(Operation::Delete).failure(),
            Some("Document not found")
        );
        assert_eq!(backend.calls().len(), 2);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let (_backend, mut workflow, mut store) = setup(json!({"0": [doc("new")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.refresh(&mut store).expect("newer load supersedes");

        let stale = Completion {
            ticket: 1,
            outcome: Outcome::Contents(Ok(json!({"old": [doc("old")]}))),
        };
        assert!(!workflow.apply(stale, &mut store));
        assert!(store.clusters().is_empty());
        assert!(workflow.is_busy());

        workflow.settle(&mut store);
        assert!(store.cluster(&ClusterKey::from("0")).is_some());
        assert!(store.cluster(&ClusterKey::from("old")).is_none());
    }

    #[test]
    fn recluster_revalidates_selection() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")], "1": [doc("b")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        store.select(&ClusterKey::from("1"));

        backend.set_contents(Ok(json!({"0": [doc("a"), doc("b")]})));
        workflow.request_recluster(&mut store, 2).expect("accepted");
        workflow.settle(&mut store);

        assert_eq!(store.selected(), None);
        assert_eq!(store.visible_clusters().len(), 1);
    }

    #[test]
    fn recovering_refresh_reports_the_interrupted_operation() {
        let (backend, mut workflow, mut store) = setup(json!({"0": [doc("a")]}));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        let events = store.subscribe();

        backend.set_contents(Err(ClientError::Transport("connection reset".to_owned())));
        workflow.request_recluster(&mut store, 2).expect("accepted");
        workflow.settle(&mut store);
        assert!(store.needs_refresh());

        backend.set_contents(Ok(json!({"0": [doc("a")], "1": []})));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        let origins = events
            .try_iter()
            .filter_map(|event| match event {
                StoreEvent::Replaced { origin, .. } => Some(origin),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(origins, [Operation::Recluster]);
        assert_eq!(store.lifecycle(Operation::Load), &Lifecycle::Idle);

        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        let later = events
            .try_iter()
            .filter_map(|event| match event {
                StoreEvent::Replaced { origin, .. } => Some(origin),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(later, [Operation::Load]);
    }

    struct PanickingBackend;

    impl Backend for PanickingBackend {
        fn cluster_contents(&self) -> ClientResult<Value> {
            panic!("cluster worker crashed");
        }

        fn recluster(&self, _k: u8) -> ClientResult<()> {
            panic!("recluster worker crashed");
        }

        fn delete_document(&self, _doc_id: &str) -> ClientResult<()> {
            panic!("delete worker crashed");
        }

        fn projection(&self) -> ClientResult<Value> {
            unreachable!("workflow never fetches the projection")
        }

        fn document(&self, _doc_id: &str) -> ClientResult<crate::client::DocumentContent> {
            unreachable!("workflow never fetches documents")
        }

        fn semantic_search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> ClientResult<Vec<crate::client::SearchHit>> {
            unreachable!("workflow never searches")
        }
    }

    #[test]
    fn crashed_worker_fails_the_operation_instead_of_blocking() {
        let mut workflow = Workflow::new(Arc::new(PanickingBackend));
        let mut store = ClusterStore::new(3);

        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        assert!(!workflow.is_busy());
        assert!(store.lifecycle(Operation::Load).failure().is_some());

        workflow.request_delete(&mut store, "a").expect("accepted after crash");
        workflow.settle(&mut store);
        assert!(!workflow.is_busy());
        assert!(store.lifecycle(Operation::Delete).failure().is_some());
        assert!(!store.needs_refresh());
    }
}
