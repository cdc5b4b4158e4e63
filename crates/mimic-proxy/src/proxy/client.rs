//! HTTP client creation and configuration.
//!
//! One shared client with connection pooling, used for all forwarded
//! requests. The hyper client never follows redirects, which is exactly the
//! proxy contract: a 3xx from upstream is relayed to the client verbatim.

use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Type alias for the HTTP client used for forwarding.
pub type HttpClient = Client<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    Full<Bytes>,
>;

/// Create the shared forwarding client.
pub fn create_http_client() -> HttpClient {
    let mut http_connector = hyper_util::client::legacy::connect::HttpConnector::new();
    http_connector.set_connect_timeout(Some(Duration::from_secs(10)));
    http_connector.set_keepalive(Some(Duration::from_secs(60)));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS upstreams

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("Failed to load native root certificates")
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(https_connector)
}
