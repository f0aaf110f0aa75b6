mod http_client;
mod retry;
mod services;

pub use http_client::HttpRemoteResourceClient;
pub use retry::{RetryPolicy, RetryingRemoteClient};
pub use services::ServiceClients;
