use serde_json::Value;
use shared::ResultRecord;

use super::firebase_db::{FirebaseDbClient, StoreError};
use crate::auth::models::UserProfile;

const RESULTS_ROOT: &str = "alzheimer_results";
const USERS_ROOT: &str = "users";

/// Per-user persistence of inference outcomes, plus the profile
/// sub-store. Records live under `alzheimer_results/{user_id}` and are
/// only ever reachable through the id of the session that wrote them.
#[derive(Clone)]
pub struct ResultStore {
    db: FirebaseDbClient,
}

impl ResultStore {
    pub fn new(db: FirebaseDbClient) -> Self {
        Self { db }
    }

    pub async fn append(&self, user_id: &str, record: &ResultRecord) -> Result<String, StoreError> {
        let value = serde_json::to_value(record)?;
        self.db
            .push(&format!("{RESULTS_ROOT}/{user_id}"), &value)
            .await
    }

    /// Past records for one user, in insertion order. A user with no
    /// stored node yields `NoHistory`, which callers render as an empty
    /// history rather than a failure.
    pub async fn list_for(&self, user_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        let node = self
            .db
            .get(&format!("{RESULTS_ROOT}/{user_id}"))
            .await?
            .ok_or_else(|| StoreError::NoHistory(user_id.to_string()))?;
        parse_records(node)
    }

    pub async fn put_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(profile)?;
        self.db.set(&format!("{USERS_ROOT}/{user_id}"), &value).await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        match self.db.get(&format!("{USERS_ROOT}/{user_id}")).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

// Pushed children come back as an object keyed by generated ids. The ids
// sort chronologically, and serde_json objects iterate in key order, so
// plain iteration preserves insertion order. Sparse integer-keyed nodes
// come back as arrays with null gaps.
pub(crate) fn parse_records(node: Value) -> Result<Vec<ResultRecord>, StoreError> {
    match node {
        Value::Object(children) => children
            .into_iter()
            .map(|(_key, child)| serde_json::from_value(child).map_err(StoreError::from))
            .collect(),
        Value::Array(children) => children
            .into_iter()
            .filter(|child| !child.is_null())
            .map(|child| serde_json::from_value(child).map_err(StoreError::from))
            .collect(),
        other => Err(StoreError::Provider(format!(
            "unexpected results node shape: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(result: &str, day: &str) -> Value {
        json!({
            "result": result,
            "f1_score": 0.5,
            "accuracy": 90.0,
            "precision": 0.6,
            "recall": 0.4,
            "image_path": "/static/abc.png",
            "created_at": day,
        })
    }

    #[test]
    fn records_come_back_in_insertion_order() {
        // Generated push ids are chronologically ordered.
        let node = json!({
            "-Na000": record("Non Demented", "2026-08-01"),
            "-Nb111": record("Mild Demented", "2026-08-02"),
            "-Nc222": record("Moderate Demented", "2026-08-03"),
        });
        let records = parse_records(node).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].result, "Non Demented");
        assert_eq!(records[1].result, "Mild Demented");
        assert_eq!(records[2].result, "Moderate Demented");
    }

    #[test]
    fn array_shaped_nodes_skip_null_gaps() {
        let node = json!([null, record("Non Demented", "2026-08-01"), null]);
        let records = parse_records(node).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].created_at, "2026-08-01");
    }

    #[test]
    fn scalar_nodes_are_rejected() {
        assert!(matches!(
            parse_records(json!("oops")),
            Err(StoreError::Provider(_))
        ));
    }

    #[test]
    fn malformed_children_surface_as_serialization_errors() {
        let node = json!({ "-Na000": {"result": 17} });
        assert!(matches!(
            parse_records(node),
            Err(StoreError::Serialization(_))
        ));
    }
}
