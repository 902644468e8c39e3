use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use launcher_logging::{launcher_debug, launcher_warn};
use tokio_util::sync::CancellationToken;

use crate::{
    AuthError, AuthenticationResult, CatalogClient, CatalogError, IdentityProvider,
    InteractionPrompt, InteractionSink, LaunchRequest, Launcher, PipelineRecord,
};

pub type RequestId = u64;

/// Collaborators the engine drives.
#[derive(Clone)]
pub struct EngineServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub catalog: Arc<dyn CatalogClient>,
    pub launcher: Arc<dyn Launcher>,
    /// Permissions every token request asks for.
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SilentToken(Result<AuthenticationResult, AuthError>),
    InteractiveToken(Result<AuthenticationResult, AuthError>),
    SignIn(Result<AuthenticationResult, AuthError>),
    SignOut(Result<(), AuthError>),
    Prompt(InteractionPrompt),
    PipelinesFetched {
        request_id: RequestId,
        result: Result<Vec<PipelineRecord>, CatalogError>,
    },
    LaunchFinished {
        pipeline_name: String,
        result: Result<(), String>,
    },
}

enum EngineCommand {
    AcquireSilent {
        account: Option<String>,
        force_refresh: bool,
    },
    AcquireInteractive {
        login_hint: Option<String>,
    },
    SignIn,
    SignOut {
        account: Option<String>,
    },
    FetchPipelines {
        request_id: RequestId,
        access_token: String,
        cancel: CancellationToken,
    },
    Launch(LaunchRequest),
}

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Runs identity, catalog and launch requests on a background tokio runtime.
///
/// Requests never block the caller; outcomes come back as [`EngineEvent`]s.
/// Catalog requests can be cancelled, after which their result is dropped.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Mutex<mpsc::Receiver<EngineEvent>>,
    in_flight: InFlight,
    shutdown: CancellationToken,
}

impl EngineHandle {
    pub fn new(services: EngineServices) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let in_flight: InFlight = Arc::default();
        let shutdown = CancellationToken::new();

        let worker_in_flight = in_flight.clone();
        let worker_shutdown = shutdown.clone();
        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let services = services.clone();
                let event_tx = event_tx.clone();
                let in_flight = worker_in_flight.clone();
                let shutdown = worker_shutdown.clone();
                runtime.spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = handle_command(&services, command, &event_tx, &in_flight) => {}
                    }
                });
            }
        });

        Ok(Self {
            cmd_tx,
            event_rx: Mutex::new(event_rx),
            in_flight,
            shutdown,
        })
    }

    pub fn acquire_token_silent(&self, account: Option<String>, force_refresh: bool) {
        self.send(EngineCommand::AcquireSilent {
            account,
            force_refresh,
        });
    }

    pub fn acquire_token_interactive(&self, login_hint: Option<String>) {
        self.send(EngineCommand::AcquireInteractive { login_hint });
    }

    pub fn sign_in(&self) {
        self.send(EngineCommand::SignIn);
    }

    pub fn sign_out(&self, account: Option<String>) {
        self.send(EngineCommand::SignOut { account });
    }

    /// Starts a catalog fetch with the token the caller just resolved.
    pub fn fetch_pipelines(&self, request_id: RequestId, access_token: impl Into<String>) {
        let cancel = self.shutdown.child_token();
        lock(&self.in_flight).insert(request_id, cancel.clone());
        self.send(EngineCommand::FetchPipelines {
            request_id,
            access_token: access_token.into(),
            cancel,
        });
    }

    /// Cancels a catalog fetch; its result will never be emitted.
    pub fn cancel(&self, request_id: RequestId) {
        if let Some(token) = lock(&self.in_flight).remove(&request_id) {
            launcher_debug!("Cancelling catalog request {}", request_id);
            token.cancel();
        }
    }

    pub fn launch(&self, request: LaunchRequest) {
        self.send(EngineCommand::Launch(request));
    }

    /// Cancels everything in flight. Later results are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        lock(&self.in_flight).clear();
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        lock(&self.event_rx).try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        lock(&self.event_rx).recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            launcher_warn!("Engine worker is gone; dropping command");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ChannelInteractionSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl InteractionSink for ChannelInteractionSink {
    fn prompt(&self, prompt: &InteractionPrompt) {
        let _ = self.tx.send(EngineEvent::Prompt(prompt.clone()));
    }
}

async fn handle_command(
    services: &EngineServices,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
    in_flight: &InFlight,
) {
    let scopes = services.scopes.as_slice();
    let sink = ChannelInteractionSink {
        tx: event_tx.clone(),
    };
    let event = match command {
        EngineCommand::AcquireSilent {
            account,
            force_refresh,
        } => EngineEvent::SilentToken(
            services
                .identity
                .acquire_token_silent(scopes, account.as_deref(), force_refresh)
                .await,
        ),
        EngineCommand::AcquireInteractive { login_hint } => EngineEvent::InteractiveToken(
            services
                .identity
                .acquire_token_interactive(scopes, login_hint.as_deref(), &sink)
                .await,
        ),
        EngineCommand::SignIn => EngineEvent::SignIn(services.identity.login(scopes, &sink).await),
        EngineCommand::SignOut { account } => {
            EngineEvent::SignOut(services.identity.logout(account.as_deref()).await)
        }
        EngineCommand::FetchPipelines {
            request_id,
            access_token,
            cancel,
        } => {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                result = services.catalog.fetch_pipelines(&access_token) => Some(result),
            };
            lock(in_flight).remove(&request_id);
            match outcome {
                Some(result) if !cancel.is_cancelled() => {
                    EngineEvent::PipelinesFetched { request_id, result }
                }
                _ => {
                    launcher_debug!("Dropping result of cancelled catalog request {}", request_id);
                    return;
                }
            }
        }
        EngineCommand::Launch(request) => {
            let launcher = services.launcher.clone();
            let pipeline_name = request.pipeline_name.clone();
            let result = tokio::task::spawn_blocking(move || launcher.launch(&request))
                .await
                .map_err(|err| err.to_string())
                .and_then(|result| result.map_err(|err| err.to_string()));
            EngineEvent::LaunchFinished {
                pipeline_name,
                result,
            }
        }
    };
    let _ = event_tx.send(event);
}
