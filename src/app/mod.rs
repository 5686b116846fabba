use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use eframe::egui::{Context, Rect};
use tracing::{debug, info};

use crate::client::{Backend, DocumentContent, SearchHit};
use crate::config::Config;
use crate::error::ClientError;
use crate::interaction::InteractionController;
use crate::projection::ProjectionFeed;
use crate::store::{ClusterStore, Operation, StoreEvent};
use crate::workflow::Workflow;

mod graph;
mod render_utils;
mod requests;
mod ui;

use self::requests::Latest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Clusters,
    Projection,
    Search,
    Document,
}

struct ProjectionView {
    interaction: InteractionController,
    layout_key: Option<(u64, Rect)>,
}

/// What the app does in reaction to one store event.
#[derive(Debug, Default, PartialEq, Eq)]
struct FollowUp {
    refetch_projection: bool,
    forget_delete: bool,
}

/// The backend recomputes the projection whenever membership changes on the server.
fn follow_up(event: &StoreEvent) -> FollowUp {
    match event {
        StoreEvent::Replaced { origin, .. } => FollowUp {
            refetch_projection: matches!(origin, Operation::Recluster | Operation::Delete),
            forget_delete: *origin == Operation::Delete,
        },
        _ => FollowUp::default(),
    }
}

pub struct ClusterLensApp {
    config: Config,
    backend: Arc<dyn Backend>,
    store: ClusterStore,
    store_events: Receiver<StoreEvent>,
    workflow: Workflow,
    projection: ProjectionFeed,
    projection_view: ProjectionView,
    tab: Tab,
    k_input: i64,
    filter: String,
    search_query: String,
    search: Latest<Vec<SearchHit>>,
    document: Latest<DocumentContent>,
    open_doc_id: Option<String>,
    last_delete: Option<String>,
    notice: Option<String>,
}

impl ClusterLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config, backend: Arc<dyn Backend>) -> Self {
        let mut store = ClusterStore::new(config.initial_k as i64);
        let store_events = store.subscribe();
        let mut workflow = Workflow::new(Arc::clone(&backend));
        let mut projection = ProjectionFeed::new(Arc::clone(&backend));

        if let Err(error) = workflow.refresh(&mut store) {
            debug!(%error, "initial load not started");
        }
        projection.fetch();

        Self {
            k_input: store.k() as i64,
            config,
            backend,
            store,
            store_events,
            workflow,
            projection,
            projection_view: ProjectionView {
                interaction: InteractionController::default(),
                layout_key: None,
            },
            tab: Tab::Clusters,
            filter: String::new(),
            search_query: String::new(),
            search: Latest::new(),
            document: Latest::new(),
            open_doc_id: None,
            last_delete: None,
            notice: None,
        }
    }

    fn handle_store_events(&mut self) {
        while let Ok(event) = self.store_events.try_recv() {
            match &event {
                StoreEvent::Replaced {
                    origin,
                    selection_cleared,
                } => debug!(?origin, selection_cleared, "cluster view replaced"),
                StoreEvent::Lifecycle(operation, lifecycle) => {
                    debug!(?operation, ?lifecycle, "operation state");
                }
                StoreEvent::SelectionChanged(_) | StoreEvent::DocumentRemoved { .. } => {}
            }

            let next = follow_up(&event);
            if next.refetch_projection {
                self.projection.fetch();
            }
            if next.forget_delete {
                self.last_delete = None;
            }
        }
    }

    fn report(&mut self, result: Result<(), ClientError>) {
        match result {
            Ok(()) => self.notice = None,
            Err(error) => self.notice = Some(error.to_string()),
        }
    }

    fn refresh(&mut self) {
        let result = self.workflow.refresh(&mut self.store);
        self.report(result);
    }

    fn request_recluster(&mut self) {
        let result = self.workflow.request_recluster(&mut self.store, self.k_input);
        self.k_input = self.store.k() as i64;
        self.report(result);
    }

    fn request_delete(&mut self, doc_id: String) {
        let result = self.workflow.request_delete(&mut self.store, &doc_id);
        if result.is_ok() {
            self.last_delete = Some(doc_id);
        }
        self.report(result);
    }

    fn open_document(&mut self, doc_id: String) {
        info!(%doc_id, "opening document");
        let backend = Arc::clone(&self.backend);
        let id = doc_id.clone();
        self.document.spawn(move || backend.document(&id));
        self.open_doc_id = Some(doc_id);
        self.tab = Tab::Document;
    }

    fn run_search(&mut self) {
        let backend = Arc::clone(&self.backend);
        let query = self.search_query.clone();
        let top_k = self.config.search_top_k;
        self.search.clear();
        self.search.spawn(move || backend.semantic_search(&query, top_k));
    }

    fn anything_pending(&self) -> bool {
        self.workflow.is_busy()
            || self.projection.lifecycle().is_pending()
            || self.search.lifecycle().is_pending()
            || self.document.lifecycle().is_pending()
    }
}

impl eframe::App for ClusterLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut changed = self.workflow.poll(&mut self.store);
        changed |= self.projection.poll();
        changed |= self.search.poll();
        changed |= self.document.poll();
        self.handle_store_events();

        self.show(ctx);

        if changed {
            ctx.request_repaint();
        } else if self.anything_pending() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::ClientError;
    use crate::store::Lifecycle;
    use crate::testing::FakeBackend;

    use super::*;

    fn replaced(origin: Operation) -> StoreEvent {
        StoreEvent::Replaced {
            origin,
            selection_cleared: false,
        }
    }

    fn doc(id: &str) -> serde_json::Value {
        json!({"doc_id": id, "filename": id, "extracted_text": ""})
    }

    #[test]
    fn membership_changes_refetch_the_projection() {
        assert_eq!(
            follow_up(&replaced(Operation::Recluster)),
            FollowUp {
                refetch_projection: true,
                forget_delete: false
            }
        );
        assert_eq!(
            follow_up(&replaced(Operation::Delete)),
            FollowUp {
                refetch_projection: true,
                forget_delete: true
            }
        );
    }

    #[test]
    fn plain_loads_and_other_events_schedule_nothing() {
        assert_eq!(follow_up(&replaced(Operation::Load)), FollowUp::default());
        assert_eq!(
            follow_up(&StoreEvent::Lifecycle(Operation::Recluster, Lifecycle::Idle)),
            FollowUp::default()
        );
        assert_eq!(follow_up(&StoreEvent::SelectionChanged(None)), FollowUp::default());
    }

    #[test]
    fn recovered_delete_still_refetches_the_projection() {
        let backend = Arc::new(FakeBackend::with_contents(json!({"0": [doc("a"), doc("b")]})));
        let mut workflow = Workflow::new(backend.clone());
        let mut store = ClusterStore::new(3);
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);
        let events = store.subscribe();

        backend.set_contents(Err(ClientError::Transport("connection reset".to_owned())));
        workflow.request_delete(&mut store, "a").expect("accepted");
        workflow.settle(&mut store);
        assert!(store.needs_refresh());

        backend.set_contents(Ok(json!({"0": [doc("b")]})));
        workflow.refresh(&mut store).expect("accepted");
        workflow.settle(&mut store);

        let follow_ups = events.try_iter().map(|event| follow_up(&event)).collect::<Vec<_>>();
        assert!(follow_ups.contains(&FollowUp {
            refetch_projection: true,
            forget_delete: true
        }));
    }
}
