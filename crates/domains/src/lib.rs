//! forum/crates/domains/src/lib.rs
//!
//! The central domain types and interface definitions for the forum backend.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use serde_json::json;

    #[test]
    fn activity_entry_serialises_original_action_tags() {
        let entry = ActivityLogEntry::new(
            GUEST_USER_ID,
            ActivityAction::RequestReceived,
            json!({ "ip": "127.0.0.1" }),
        );
        let doc = serde_json::to_value(&entry).unwrap();
        assert_eq!(doc["action"], "GET_THREADS_REQUEST");
        assert_eq!(doc["userId"], 0);
        assert_eq!(doc["details"]["ip"], "127.0.0.1");
        assert_eq!(ActivityAction::ThreadCreated.as_str(), "CREATE_THREAD_SUCCESS");
    }

    #[test]
    fn user_serialisation_hides_password_hash() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            created_at: chrono::Utc::now(),
        };
        let doc = serde_json::to_value(&user).unwrap();
        assert!(doc.get("password_hash").is_none());
        assert_eq!(doc["username"], "alice");
    }

    #[test]
    fn summary_expands_relations_as_nested_objects() {
        let summary = ThreadSummary {
            id: 3,
            title: "Hello".to_string(),
            created_at: chrono::Utc::now(),
            categories: Some(CategoryName { name: "General".to_string() }),
            users: None,
        };
        let doc = serde_json::to_value(&summary).unwrap();
        assert_eq!(doc["categories"]["name"], "General");
        assert!(doc["users"].is_null());
    }
}
