use std::future::Future;
use std::time::Duration;

use domains::StoreError;

/// Bounds a store call so a stalled connection surfaces as a failure
/// instead of hanging the request.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(op)),
    }
}

/// Trims a required text field, treating blank input as missing.
pub fn required_text(value: Option<String>, field: &str) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("`{field}` is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_call_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StoreError>(())
        };
        let result = bounded(Duration::from_millis(50), "insert_thread", slow).await;
        assert_eq!(result, Err(StoreError::Timeout("insert_thread")));
    }

    #[test]
    fn blank_text_is_missing() {
        assert!(required_text(Some("   ".into()), "title").is_err());
        assert!(required_text(None, "title").is_err());
        assert_eq!(required_text(Some(" Hi ".into()), "title").unwrap(), "Hi");
    }
}
