use std::sync::Mutex;

use serde_json::{Value, json};

use crate::client::{Backend, DocumentContent, SearchHit};
use crate::error::{ClientError, ClientResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ClusterContents,
    Recluster(u8),
    Delete(String),
    Projection,
    Document(String),
    Search(String, usize),
}

struct Replies {
    contents: ClientResult<Value>,
    recluster: ClientResult<()>,
    delete: ClientResult<()>,
    projection: ClientResult<Value>,
    document: ClientResult<DocumentContent>,
    search: ClientResult<Vec<SearchHit>>,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            contents: Ok(json!({})),
            recluster: Ok(()),
            delete: Ok(()),
            projection: Ok(json!([])),
            document: Err(ClientError::from_status(404, r#"{"error":"Document not found"}"#)),
            search: Ok(Vec::new()),
        }
    }
}

/// In-memory backend with sticky scripted replies and a call log.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<Replies>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn with_contents(contents: Value) -> Self {
        let backend = Self::default();
        backend.set_contents(Ok(contents));
        backend
    }

    fn replies(&self) -> std::sync::MutexGuard<'_, Replies> {
        self.replies.lock().expect("replies lock")
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn set_contents(&self, reply: ClientResult<Value>) {
        self.replies().contents = reply;
    }

    pub fn set_recluster(&self, reply: ClientResult<()>) {
        self.replies().recluster = reply;
    }

    pub fn set_delete(&self, reply: ClientResult<()>) {
        self.replies().delete = reply;
    }

    pub fn set_projection(&self, reply: ClientResult<Value>) {
        self.replies().projection = reply;
    }

    pub fn set_document(&self, reply: ClientResult<DocumentContent>) {
        self.replies().document = reply;
    }

    pub fn set_search(&self, reply: ClientResult<Vec<SearchHit>>) {
        self.replies().search = reply;
    }
}

impl Backend for FakeBackend {
    fn cluster_contents(&self) -> ClientResult<Value> {
        self.record(Call::ClusterContents);
        self.replies().contents.clone()
    }

    fn recluster(&self, k: u8) -> ClientResult<()> {
        self.record(Call::Recluster(k));
        self.replies().recluster.clone()
    }

    fn delete_document(&self, doc_id: &str) -> ClientResult<()> {
        self.record(Call::Delete(doc_id.to_owned()));
        self.replies().delete.clone()
    }

    fn projection(&self) -> ClientResult<Value> {
        self.record(Call::Projection);
        self.replies().projection.clone()
    }

    fn document(&self, doc_id: &str) -> ClientResult<DocumentContent> {
        self.record(Call::Document(doc_id.to_owned()));
        self.replies().document.clone()
    }

    fn semantic_search(&self, query: &str, top_k: usize) -> ClientResult<Vec<SearchHit>> {
        self.record(Call::Search(query.to_owned(), top_k));
        self.replies().search.clone()
    }
}
