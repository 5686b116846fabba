use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::util::id_text;

use super::model::{Cluster, ClusterKey, ClusterSet, Document};

/// Parses a `/cluster-contents` payload. Nothing is produced unless every entry is valid.
pub(super) fn parse_cluster_contents(raw: &Value) -> ClientResult<ClusterSet> {
    let object = raw
        .as_object()
        .ok_or_else(|| ClientError::malformed("cluster contents must be an object"))?;

    let mut clusters = Vec::with_capacity(object.len());
    for (key, members) in object {
        let members = members.as_array().ok_or_else(|| {
            ClientError::malformed(format!("cluster {key} is not a list of documents"))
        })?;

        let documents = members
            .iter()
            .enumerate()
            .map(|(index, member)| {
                parse_document(member).ok_or_else(|| {
                    ClientError::malformed(format!("cluster {key} has an invalid document at {index}"))
                })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        clusters.push(Cluster {
            key: ClusterKey::new(key.clone()),
            documents,
        });
    }

    Ok(ClusterSet::from_clusters(clusters))
}

fn parse_document(value: &Value) -> Option<Document> {
    let object = value.as_object()?;
    let doc_id = object.get("doc_id").and_then(id_text)?;
    let text_field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    let filename = match text_field("filename") {
        name if name.is_empty() => doc_id.clone(),
        name => name,
    };

    Some(Document {
        doc_id,
        filename,
        extracted_text: text_field("extracted_text"),
    })
}
