//! Shared key generation for storage backends.
//!
//! Key format: `documents/{check_in_request_id}/{document_id}_{file_name}`.

use uuid::Uuid;

/// Generate the blob key for a document.
///
/// Scoping the key by request id keeps one request's evidence together and
/// makes keys unguessable without the document id. All backends must use
/// this format for consistency.
pub fn document_key(check_in_request_id: Uuid, document_id: Uuid, file_name: &str) -> String {
    format!(
        "documents/{}/{}_{}",
        check_in_request_id, document_id, file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_request_scoped_and_unique_per_document() {
        let request_id = Uuid::new_v4();
        let a = document_key(request_id, Uuid::new_v4(), "photo.jpg");
        let b = document_key(request_id, Uuid::new_v4(), "photo.jpg");
        assert!(a.starts_with(&format!("documents/{}/", request_id)));
        assert_ne!(a, b);
    }
}
