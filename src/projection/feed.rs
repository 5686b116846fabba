use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info, warn};

use crate::client::Backend;
use crate::error::{ClientError, ClientResult};
use crate::store::Lifecycle;

use super::{ProjectionPoint, parse_points};

type Delivery = (u64, ClientResult<Vec<ProjectionPoint>>);

/// Delivers a failure for its generation if the worker unwinds before answering.
struct Reply {
    generation: u64,
    tx: Option<Sender<Delivery>>,
}

impl Reply {
    fn send(mut self, result: ClientResult<Vec<ProjectionPoint>>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send((self.generation, result));
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let lost = ClientError::Transport("projection request stopped before answering".to_owned());
            let _ = tx.send((self.generation, Err(lost)));
        }
    }
}

/// Latest `/tsne` snapshot. A newer fetch supersedes any older one still in flight.
pub struct ProjectionFeed {
    backend: Arc<dyn Backend>,
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
    issued: u64,
    points: Option<Vec<ProjectionPoint>>,
    revision: u64,
    lifecycle: Lifecycle,
}

impl ProjectionFeed {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            issued: 0,
            points: None,
            revision: 0,
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn fetch(&mut self) {
        self.issued += 1;
        let generation = self.issued;
        let backend = Arc::clone(&self.backend);
        let reply = Reply {
            generation,
            tx: Some(self.tx.clone()),
        };
        debug!(generation, "fetching projection");

        thread::spawn(move || {
            let result = backend.projection().and_then(|raw| parse_points(&raw));
            reply.send(result);
        });

        self.lifecycle = Lifecycle::Pending;
    }

    /// Applies finished fetches; returns true when the visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(delivery) = self.rx.try_recv() {
            changed |= self.apply(delivery);
        }
        changed
    }

    fn apply(&mut self, (generation, result): Delivery) -> bool {
        if generation != self.issued {
            warn!(generation, latest = self.issued, "discarding superseded projection");
            return false;
        }

        match result {
            Ok(points) => {
                info!(points = points.len(), "projection loaded");
                self.points = Some(points);
                self.revision = self.revision.wrapping_add(1);
                self.lifecycle = Lifecycle::Idle;
            }
            Err(error) => {
                self.lifecycle = Lifecycle::Failed(error.to_string());
            }
        }
        true
    }

    pub fn points(&self) -> Option<&[ProjectionPoint]> {
        self.points.as_deref()
    }

    /// Bumped on every accepted snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::testing::FakeBackend;

    use super::*;

    fn wait(feed: &mut ProjectionFeed) {
        while feed.lifecycle.is_pending() {
            let delivery = feed
                .rx
                .recv_timeout(Duration::from_secs(5))
                .expect("projection worker answered");
            feed.apply(delivery);
        }
    }

    #[test]
    fn fetch_parses_points() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_projection(Ok(json!([
            {"id": "a", "x": 1.0, "y": 2.0, "cluster": 0},
            {"id": "b", "x": -1.0, "y": 0.5, "cluster": 1}
        ])));
        let mut feed = ProjectionFeed::new(backend);

        feed.fetch();
        wait(&mut feed);

        assert_eq!(feed.points().map(<[_]>::len), Some(2));
        assert_eq!(feed.lifecycle(), &Lifecycle::Idle);
        assert_eq!(feed.revision(), 1);
    }

    #[test]
    fn failure_keeps_previous_points() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_projection(Ok(json!([{"id": "a", "x": 1.0, "y": 2.0, "cluster": 0}])));
        let mut feed = ProjectionFeed::new(backend.clone());
        feed.fetch();
        wait(&mut feed);

        backend.set_projection(Err(ClientError::Transport("refused".to_owned())));
        feed.fetch();
        wait(&mut feed);

        assert_eq!(feed.points().map(<[_]>::len), Some(1));
        assert_eq!(
            feed.lifecycle().failure(),
            Some("Network error: refused")
        );
    }

    #[test]
    fn superseded_delivery_is_discarded() {
        let backend = Arc::new(FakeBackend::default());
        let mut feed = ProjectionFeed::new(backend);
        feed.issued = 2;
        feed.lifecycle = Lifecycle::Pending;

        let stale = vec![ProjectionPoint {
            id: "old".to_owned(),
            x: 0.0,
            y: 0.0,
            cluster: super::super::ClusterLabel::Int(0),
        }];
        assert!(!feed.apply((1, Ok(stale))));
        assert!(feed.points().is_none());
        assert!(feed.lifecycle().is_pending());

        assert!(feed.apply((2, Ok(Vec::new()))));
        assert_eq!(feed.points().map(<[_]>::len), Some(0));
    }

    #[test]
    fn unanswered_fetch_becomes_a_failure() {
        let backend = Arc::new(FakeBackend::default());
        let mut feed = ProjectionFeed::new(backend);
        feed.issued = 1;
        feed.lifecycle = Lifecycle::Pending;

        drop(Reply {
            generation: 1,
            tx: Some(feed.tx.clone()),
        });
        wait(&mut feed);

        assert!(
            feed.lifecycle()
                .failure()
                .is_some_and(|message| message.contains("stopped before answering"))
        );
        assert!(feed.points().is_none());
    }
}
