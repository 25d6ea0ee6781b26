use crate::model::DocumentReference;

pub trait Client {
    type Error;

    /// PDF documents under `prefix`, in listing order.
    fn list(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<DocumentReference>, Self::Error>> + Send;

    /// Resolve a single object, failing when it does not exist.
    fn fetch(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<DocumentReference, Self::Error>> + Send;
}

/// Whether `key` names a PDF document.
pub fn is_pdf(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_is_pdf() {
        assert!(super::is_pdf("invoices/2024/march.pdf"));
        assert!(super::is_pdf("SCAN.PDF"));
        assert!(!super::is_pdf("invoices/notes.txt"));
        assert!(!super::is_pdf("invoices/pdf"));
    }
}
