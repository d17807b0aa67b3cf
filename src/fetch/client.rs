use async_trait::async_trait;
use reqwest::{Request, Response};

/// Minimal transport seam so authentication can be layered on top of a
/// plain client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
