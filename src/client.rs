use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DocumentContent {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(deserialize_with = "de_id")]
    pub doc_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub similarity: f64,
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    crate::util::id_text(&value).ok_or_else(|| serde::de::Error::custom("doc_id must be a string or number"))
}

/// Everything the explorer needs from the clustering service.
///
/// Cluster contents and projection points come back as raw JSON because their
/// shape is validated by the store and the projection layout respectively.
pub trait Backend: Send + Sync {
    fn cluster_contents(&self) -> ClientResult<Value>;
    fn recluster(&self, k: u8) -> ClientResult<()>;
    fn delete_document(&self, doc_id: &str) -> ClientResult<()>;
    fn projection(&self) -> ClientResult<Value>;
    fn document(&self, doc_id: &str) -> ClientResult<DocumentContent>;
    fn semantic_search(&self, query: &str, top_k: usize) -> ClientResult<Vec<SearchHit>>;
}

pub struct HttpBackend {
    base: Url,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base: Url, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self { base, agent }
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: ureq::Request, body: Option<Value>) -> ClientResult<ureq::Response> {
        debug!(method = request.method(), url = request.url(), "backend request");
        let outcome = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match outcome {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let body = read_error_body(response).unwrap_or_default();
                Err(ClientError::from_status(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => Err(ClientError::Transport(transport.to_string())),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let url = self.endpoint(segments)?;
        let response = self.send(self.agent.get(url.as_str()), None)?;
        decode(response)
    }
}

/// Error bodies only carry a message, so they are read up to this many bytes.
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

fn read_error_body(response: ureq::Response) -> Option<String> {
    let mut body = String::new();
    response
        .into_reader()
        .take(ERROR_BODY_LIMIT)
        .read_to_string(&mut body)
        .ok()?;
    Some(body)
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> ClientResult<T> {
    response
        .into_json::<T>()
        .map_err(|error| ClientError::malformed(error.to_string()))
}

#[derive(Deserialize)]
struct SearchReply {
    results: Option<Vec<SearchHit>>,
}

impl Backend for HttpBackend {
    fn cluster_contents(&self) -> ClientResult<Value> {
        self.get_json(&["cluster-contents"])
    }

    fn recluster(&self, k: u8) -> ClientResult<()> {
        let url = self.endpoint(&["cluster"])?;
        let request = self
            .agent
            .post(url.as_str())
            .query("num_clusters", &k.to_string());
        self.send(request, None).map(|_| ())
    }

    fn delete_document(&self, doc_id: &str) -> ClientResult<()> {
        let url = self.endpoint(&["document", doc_id])?;
        self.send(self.agent.delete(url.as_str()), None).map(|_| ())
    }

    fn projection(&self) -> ClientResult<Value> {
        self.get_json(&["tsne"])
    }

    fn document(&self, doc_id: &str) -> ClientResult<DocumentContent> {
        self.get_json(&["document", doc_id])
    }

    fn semantic_search(&self, query: &str, top_k: usize) -> ClientResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation("Enter a search query first.".to_owned()));
        }

        let url = self.endpoint(&["semantic-search"])?;
        let body = json!({ "query": query, "top_k": top_k });
        let response = self.send(self.agent.post(url.as_str()), Some(body))?;
        decode::<SearchReply>(response)?
            .results
            .ok_or_else(|| ClientError::malformed("missing results list"))
    }
}
