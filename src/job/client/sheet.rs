use crate::model::SheetTarget;

pub trait Client {
    type Error;

    /// First row of the tab, empty when the tab has no content.
    fn header(
        &self,
        target: &SheetTarget,
    ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Append `rows` after the last non-empty row of the tab, in order.
    fn append(
        &self,
        target: &SheetTarget,
        rows: &[Vec<String>],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
