pub trait Client {
    type Error;

    fn summarize(&self, text: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
