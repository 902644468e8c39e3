use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use launcher_core::{
    AuthFailure, AuthFailureKind, AuthGrant, Effect, FieldDescriptor, FieldKind, Msg, Pipeline,
};
use launcher_engine::{
    AuthError, AuthErrorKind, AuthenticationResult, EngineEvent, EngineHandle, LaunchRequest,
    PipelineRecord, SessionStore,
};
use launcher_logging::{launcher_debug, launcher_error, launcher_info, launcher_warn, redact_token};

use super::app::ShellEvent;

const PUMP_WAIT: Duration = Duration::from_millis(100);

/// Carries out core effects against the engine and the session store.
pub struct EffectRunner {
    engine: Arc<EngineHandle>,
    store: Arc<SessionStore>,
}

impl EffectRunner {
    pub fn new(engine: Arc<EngineHandle>, store: Arc<SessionStore>) -> Self {
        Self { engine, store }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::AcquireTokenSilent {
                    account,
                    force_refresh,
                } => {
                    launcher_debug!(
                        "AcquireTokenSilent account={:?} force_refresh={}",
                        account,
                        force_refresh
                    );
                    self.engine.acquire_token_silent(account, force_refresh);
                }
                Effect::AcquireTokenInteractive { login_hint } => {
                    launcher_info!("Falling back to interactive sign-in hint={:?}", login_hint);
                    self.engine.acquire_token_interactive(login_hint);
                }
                Effect::SignIn => self.engine.sign_in(),
                Effect::SignOut { account } => self.engine.sign_out(account),
                Effect::PersistSession {
                    access_token,
                    username,
                } => {
                    if let Err(err) = self.store.set_session(&access_token, &username) {
                        launcher_error!("Failed to persist session: {}", err);
                    }
                }
                Effect::ClearAccessToken => {
                    if let Err(err) = self.store.clear_token() {
                        launcher_error!("Failed to clear access token: {}", err);
                    }
                }
                Effect::FetchPipelines {
                    request_id,
                    access_token,
                } => {
                    launcher_debug!(
                        "FetchPipelines request_id={} token={}",
                        request_id,
                        redact_token(&access_token)
                    );
                    self.engine.fetch_pipelines(request_id, access_token);
                }
                Effect::CancelFetch { request_id } => self.engine.cancel(request_id),
                Effect::Launch(request) => self.engine.launch(LaunchRequest {
                    pipeline_name: request.pipeline.name,
                    link: request.link,
                    form_data: request.form_data,
                }),
            }
        }
    }

    /// Forwards engine events as core messages until the receiver is gone.
    pub fn spawn_event_pump(&self, tx: mpsc::Sender<ShellEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.recv_timeout(PUMP_WAIT) {
                if tx.send(ShellEvent::Core(map_event(event))).is_err() {
                    break;
                }
            }
        });
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SilentToken(result) => Msg::SilentTokenAcquired(map_auth(result)),
        EngineEvent::InteractiveToken(result) => Msg::InteractiveTokenAcquired(map_auth(result)),
        EngineEvent::SignIn(result) => Msg::SignInCompleted(map_auth(result)),
        EngineEvent::SignOut(result) => Msg::SignOutCompleted(result.map_err(map_auth_error)),
        EngineEvent::Prompt(prompt) => Msg::InteractionPrompt(prompt.message),
        EngineEvent::PipelinesFetched { request_id, result } => Msg::PipelinesLoaded {
            request_id,
            result: match result {
                Ok(records) => Ok(records.into_iter().map(map_pipeline).collect()),
                Err(err) => {
                    launcher_warn!("Fetching pipelines failed (request {}): {}", request_id, err);
                    Err(err.to_string())
                }
            },
        },
        EngineEvent::LaunchFinished {
            pipeline_name,
            result,
        } => {
            if let Err(err) = &result {
                launcher_warn!("Launching {} failed: {}", pipeline_name, err);
            }
            Msg::LaunchFinished {
                pipeline_name,
                result,
            }
        }
    }
}

fn map_auth(result: Result<AuthenticationResult, AuthError>) -> Result<AuthGrant, AuthFailure> {
    result
        .map(|grant| AuthGrant {
            username: grant.username().map(ToOwned::to_owned),
            access_token: grant.access_token,
        })
        .map_err(map_auth_error)
}

/// Transport failures count as client-side so the interactive step gets its
/// chance; platform and configuration rejections do not.
fn map_auth_error(err: AuthError) -> AuthFailure {
    let kind = match err.kind {
        AuthErrorKind::InteractionRequired => AuthFailureKind::InteractionRequired,
        AuthErrorKind::Client | AuthErrorKind::Network => AuthFailureKind::Client,
        AuthErrorKind::Server { .. } | AuthErrorKind::Configuration => AuthFailureKind::Other,
    };
    AuthFailure::new(kind, err.to_string())
}

fn map_pipeline(record: PipelineRecord) -> Pipeline {
    let input_fields = record.input_field_instructions.map(|instructions| {
        instructions
            .fields
            .into_iter()
            .map(|field| {
                let kind = FieldKind::parse(&field.kind, field.min, field.max);
                if !kind.is_supported() {
                    launcher_warn!(
                        "Pipeline {} declares field {} of unknown type {:?}; it will not be shown",
                        record.name,
                        field.name,
                        field.kind
                    );
                }
                FieldDescriptor {
                    name: field.name,
                    kind,
                }
            })
            .collect()
    });
    Pipeline {
        id: record.id,
        name: record.name,
        description: record.description,
        link: record.link,
        input_fields,
    }
}
