// crates/hookgate-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Helpers
// Description: Ephemeral hookgate server with a recording outbound transport.
// Purpose: Exercise the HTTP surface end to end without external services.
// ============================================================================

//! ## Overview
//! [`TestServer::start`] parses a TOML config, assembles the runtime over a
//! [`RecordingTransport`], and serves it on `127.0.0.1:0`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use hookgate_config::HookgateConfig;
use hookgate_core::HttpRequest;
use hookgate_core::HttpResponse;
use hookgate_core::HttpTransport;
use hookgate_core::TransportError;
use hookgate_core::WebhookError;
use hookgate_server::DeploymentHandler;
use hookgate_server::DeploymentNotice;
use hookgate_server::Runtime;
use hookgate_server::ServerError;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Transport answering per URL and recording every request.
#[derive(Default)]
pub struct RecordingTransport {
    /// Status and body per URL; unknown URLs answer `200 {}`.
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    /// Requests in arrival order.
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    /// Sets the response for `url`.
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(url.to_string(), (status, body.as_bytes().to_vec()));
    }

    /// Requests sent to `url`.
    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().iter().filter(|request| request.url == url).cloned().collect()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| (200, b"{}".to_vec()));
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status,
            body,
        })
    }
}

/// Deployment handler recording notices.
#[derive(Default)]
pub struct RecordingDeployments {
    /// Received notices.
    pub notices: Mutex<Vec<DeploymentNotice>>,
}

#[async_trait]
impl DeploymentHandler for RecordingDeployments {
    async fn handle(&self, notice: DeploymentNotice) -> Result<(), WebhookError> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

/// Running server under test.
pub struct TestServer {
    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub base: String,
    /// Outbound transport.
    pub transport: Arc<RecordingTransport>,
    /// Deployment handler.
    pub deployments: Arc<RecordingDeployments>,
    /// HTTP client.
    pub client: reqwest::Client,
    /// Shutdown trigger.
    shutdown: oneshot::Sender<()>,
    /// Serve task.
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Starts a server from TOML with the given secret environment.
    pub async fn start(toml: &str, secrets: &[(&str, &str)]) -> Self {
        Self::start_with(toml, secrets, Arc::new(RecordingTransport::default())).await
    }

    /// Starts a server over a prepared transport.
    pub async fn start_with(
        toml: &str,
        secrets: &[(&str, &str)],
        transport: Arc<RecordingTransport>,
    ) -> Self {
        let config = HookgateConfig::from_toml(toml).unwrap();
        let env: HashMap<String, String> =
            secrets.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
        let deployments = Arc::new(RecordingDeployments::default());
        let runtime = Runtime::from_config_with_transport(
            &config,
            transport.clone(),
            Arc::new(move |name: &str| env.get(name).cloned()),
            deployments.clone(),
        )
        .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(runtime.serve(listener, async move {
            let _ = signal.await;
        }));
        Self {
            base: format!("http://{addr}"),
            transport,
            deployments,
            client: reqwest::Client::new(),
            shutdown,
            task,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Sends a GET and decodes the JSON body.
    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        self.client.get(self.url(path)).send().await.unwrap().json().await.unwrap()
    }

    /// Sends `body` as JSON with a POST.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(body).send().await.unwrap()
    }

    /// Sends `body` as JSON with a PUT.
    pub async fn put_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client.put(self.url(path)).json(body).send().await.unwrap()
    }

    /// Stops the server and waits for it to drain.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.await.unwrap().unwrap();
    }
}
