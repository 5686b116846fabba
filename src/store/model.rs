use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub doc_id: String,
    pub filename: String,
    pub extracted_text: String,
}

/// Cluster identifier exactly as the backend spelled it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterKey(String);

impl ClusterKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialOrd for ClusterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClusterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    pub key: ClusterKey,
    pub documents: Vec<Document>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One complete snapshot of the backend's clusters, in backend order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    pub(super) fn from_clusters(clusters: Vec<Cluster>) -> Self {
        Self { clusters }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn get(&self, key: &ClusterKey) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| &cluster.key == key)
    }

    pub(super) fn get_mut(&mut self, key: &ClusterKey) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|cluster| &cluster.key == key)
    }

    pub fn contains(&self, key: &ClusterKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }
}
