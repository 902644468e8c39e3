//! Launcher core: pure state machine for session, catalog and launch form.
mod auth;
mod effect;
mod form;
mod msg;
mod pipeline;
mod state;
mod update;
mod view_model;

pub use auth::{AuthFailure, AuthFailureKind, AuthGrant, AuthPhase};
pub use effect::Effect;
pub use form::{
    render_field, select_pipeline, FieldInput, FieldView, FormData, LaunchDialog, LaunchRequest,
    Selection,
};
pub use msg::Msg;
pub use pipeline::{FieldDescriptor, FieldKind, Pipeline};
pub use state::{AppState, RequestId};
pub use update::update;
pub use view_model::{
    AppViewModel, LaunchDialogView, PipelineCardView, NO_DESCRIPTION, NO_PIPELINES,
};
