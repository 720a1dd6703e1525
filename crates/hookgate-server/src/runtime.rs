// crates/hookgate-server/src/runtime.rs
// ============================================================================
// Module: Server Runtime
// Description: Runtime assembly from configuration and the serve loop.
// Purpose: Build every shared component once and run the HTTP service.
// Dependencies: axum, tokio, hookgate-config, hookgate-delivery, hookgate-failover
// ============================================================================

//! ## Overview
//! [`Runtime`] owns the assembled [`AppState`] plus the failover monitor
//! plan. The monitor is spawned when serving starts and shut down after the
//! HTTP server drains, so no probe outlives the service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hookgate_config::HookgateConfig;
use hookgate_config::env_lookup;
use hookgate_core::CircuitRegistry;
use hookgate_core::DeliveryMetrics;
use hookgate_core::HttpTransport;
use hookgate_core::SecretSlot;
use hookgate_core::SignatureVerifier;
use hookgate_delivery::AutomationClient;
use hookgate_delivery::DeliveryClient;
use hookgate_delivery::DestinationSet;
use hookgate_delivery::FanoutDispatcher;
use hookgate_delivery::ReqwestTransport;
use hookgate_failover::DeliveryProbe;
use hookgate_failover::FailoverCoordinator;
use hookgate_failover::HealthMonitor;
use hookgate_failover::HealthProbe;
use tokio::net::TcpListener;

use crate::deploy::AcknowledgeDeployments;
use crate::deploy::DeploymentHandler;
use crate::error::ServerError;
use crate::routes::router;
use crate::state::AppState;

/// Resolves credential references by name.
pub type SecretLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Health monitor inputs, started with the server.
struct MonitorPlan {
    /// Coordinator fed by the monitor.
    coordinator: Arc<FailoverCoordinator>,
    /// Probe implementation.
    probe: Arc<dyn HealthProbe>,
    /// Probe interval.
    interval: Duration,
}

/// Assembled hookgate service.
pub struct Runtime {
    /// Shared handler state.
    state: Arc<AppState>,
    /// Listen address from config.
    bind: SocketAddr,
    /// Failover monitor plan, when configured.
    monitor: Option<MonitorPlan>,
}

impl Runtime {
    /// Builds a runtime with the reqwest transport and process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when a component cannot be built.
    pub fn from_config(config: &HookgateConfig) -> Result<Self, ServerError> {
        let transport = ReqwestTransport::new(
            config.delivery.connect_timeout(),
            config.delivery.max_response_bytes,
        )
        .map_err(|err| ServerError::Init(format!("http client: {err}")))?;
        Self::from_config_with_transport(
            config,
            Arc::new(transport),
            Arc::new(env_lookup),
            Arc::new(AcknowledgeDeployments),
        )
    }

    /// Builds a runtime over an explicit transport, secret source, and deploy handler.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when a component cannot be built.
    pub fn from_config_with_transport(
        config: &HookgateConfig,
        transport: Arc<dyn HttpTransport>,
        secrets: SecretLookup,
        deployments: Arc<dyn DeploymentHandler>,
    ) -> Result<Self, ServerError> {
        let lookup = &*secrets;
        let bind = config.server.bind_addr().map_err(config_error)?;
        let audit = config.audit.build_sink().map_err(config_error)?;
        let metrics = Arc::new(DeliveryMetrics::new(config.observability.metrics_config()));
        let circuits =
            Arc::new(CircuitRegistry::new(config.circuit.circuit_config(), Arc::clone(&audit)));
        let client = Arc::new(DeliveryClient::new(
            transport,
            Arc::clone(&circuits),
            metrics.clone(),
            config.delivery.delivery_config(),
        ));

        let destinations = config.destinations(lookup).map_err(config_error)?;
        let destinations = DestinationSet::new(destinations)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let dispatcher =
            FanoutDispatcher::new(Arc::clone(&client), Arc::new(destinations), Arc::clone(&audit));
        let automation = match &config.automation {
            Some(automation) => Some(AutomationClient::new(
                Arc::clone(&client),
                automation.destination(lookup).map_err(config_error)?,
            )),
            None => None,
        };
        let secret = config.signature.signing_secret(lookup).map_err(config_error)?;
        let verifier = SignatureVerifier::new(Arc::new(SecretSlot::new(secret)));
        let admin_token = config.server.admin_token(lookup).map_err(config_error)?;

        let monitor = match &config.failover {
            Some(failover) => {
                let coordinator = FailoverCoordinator::new(
                    failover.receivers.clone(),
                    failover.thresholds(),
                    failover.failback,
                    Arc::clone(&audit),
                )
                .map_err(|err| ServerError::Config(err.to_string()))?;
                Some(MonitorPlan {
                    coordinator: Arc::new(coordinator),
                    probe: Arc::new(DeliveryProbe::new(
                        Arc::clone(&client),
                        failover.probe_timeout(),
                    )),
                    interval: failover.interval(),
                })
            }
            None => None,
        };

        let state = AppState {
            dispatcher,
            automation,
            verifier,
            deployments,
            failover: monitor.as_ref().map(|plan| Arc::clone(&plan.coordinator)),
            metrics,
            circuits,
            audit,
            admin_token,
            secrets,
            max_body_bytes: config.server.max_body_bytes,
        };
        Ok(Self {
            state: Arc::new(state),
            bind,
            monitor,
        })
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the shared handler state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Returns the failover coordinator, when configured.
    #[must_use]
    pub fn failover(&self) -> Option<&Arc<FailoverCoordinator>> {
        self.monitor.as_ref().map(|plan| &plan.coordinator)
    }

    /// Returns the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state())
    }

    /// Serves on `listener` until `shutdown` resolves, then stops the monitor.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the HTTP server fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let monitor = self.monitor.as_ref().map(|plan| {
            HealthMonitor::spawn(
                Arc::clone(&plan.coordinator),
                Arc::clone(&plan.probe),
                plan.interval,
            )
        });
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")));
        if let Some(monitor) = monitor {
            monitor.shutdown().await;
        }
        result
    }
}

/// Binds the configured address and serves until Ctrl-C.
///
/// # Errors
///
/// Returns [`ServerError`] when assembly, binding, or serving fails.
pub async fn run(config: &HookgateConfig) -> Result<(), ServerError> {
    let runtime = Runtime::from_config(config)?;
    let listener = TcpListener::bind(runtime.bind_addr())
        .await
        .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
    runtime.serve(listener, shutdown_signal()).await
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Maps a config error into a server error.
fn config_error(err: hookgate_config::ConfigError) -> ServerError {
    ServerError::Config(err.to_string())
}
