use crate::{AuthFailure, AuthGrant, Pipeline, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Token and username read back from the session store at startup.
    SessionRestored {
        access_token: String,
        username: String,
    },
    /// Ensure a usable access token; the catalog fetch follows on success.
    EnsureTokenRequested,
    /// Result of the silent acquisition step.
    SilentTokenAcquired(Result<AuthGrant, AuthFailure>),
    /// Result of the interactive fallback step.
    InteractiveTokenAcquired(Result<AuthGrant, AuthFailure>),
    /// Instructions the interactive flow wants shown to the user.
    InteractionPrompt(String),
    /// User asked to sign in.
    SignInClicked,
    SignInCompleted(Result<AuthGrant, AuthFailure>),
    /// User asked to sign out.
    SignOutClicked,
    SignOutCompleted(Result<(), AuthFailure>),
    /// User asked for a fresh token and pipeline list.
    RefreshRequested,
    /// Catalog response for a fetch request.
    PipelinesLoaded {
        request_id: RequestId,
        result: Result<Vec<Pipeline>, String>,
    },
    /// User picked a pipeline card (zero-based).
    PipelineSelected(usize),
    /// User edited a field of the open launch dialog.
    FieldChanged { name: String, value: String },
    /// User confirmed the launch dialog.
    LaunchSubmitted,
    /// User dismissed the launch dialog.
    LaunchCancelled,
    /// Launcher collaborator finished.
    LaunchFinished {
        pipeline_name: String,
        result: Result<(), String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
