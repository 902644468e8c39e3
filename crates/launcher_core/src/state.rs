use crate::auth::Session;
use crate::view_model::{AppViewModel, LaunchDialogView, PipelineCardView, NO_DESCRIPTION};
use crate::{AuthPhase, FormData, LaunchDialog, Pipeline};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Catalog {
    pub(crate) pipelines: Vec<Pipeline>,
    pub(crate) loading: bool,
    pub(crate) in_flight: Option<RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) session: Session,
    pub(crate) catalog: Catalog,
    pub(crate) dialog: Option<LaunchDialog>,
    status: Option<String>,
    last_request_id: RequestId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let signed_in = self.session.phase == AuthPhase::Authenticated;
        let username = self.session.account();
        let pipelines: Vec<PipelineCardView> = if signed_in {
            self.catalog
                .pipelines
                .iter()
                .enumerate()
                .map(|(index, pipeline)| PipelineCardView {
                    index,
                    name: pipeline.name.clone(),
                    description: pipeline
                        .description
                        .clone()
                        .filter(|text| !text.is_empty())
                        .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                    launchable: pipeline.launch_link().is_some(),
                    needs_input: pipeline.requires_input(),
                })
                .collect()
        } else {
            Vec::new()
        };

        AppViewModel {
            auth_phase: self.session.phase,
            signed_in,
            greeting: username
                .as_ref()
                .filter(|_| signed_in)
                .map(|name| format!("Hello {name}, logged in!")),
            username,
            interaction_prompt: self.session.prompt.clone(),
            loading: signed_in && self.catalog.loading,
            show_empty_hint: signed_in && !self.catalog.loading && pipelines.is_empty(),
            pipelines,
            dialog: self.dialog.as_ref().map(|dialog| LaunchDialogView {
                pipeline_name: dialog.pipeline().name.clone(),
                fields: dialog.fields(),
            }),
            status: self.status.clone(),
            dirty: self.dirty,
        }
    }

    pub fn auth_phase(&self) -> AuthPhase {
        self.session.phase
    }

    pub fn access_token(&self) -> &str {
        &self.session.access_token
    }

    pub fn username(&self) -> &str {
        &self.session.username
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.catalog.pipelines
    }

    pub fn is_loading(&self) -> bool {
        self.catalog.loading
    }

    pub fn in_flight_request(&self) -> Option<RequestId> {
        self.catalog.in_flight
    }

    pub fn dialog(&self) -> Option<&LaunchDialog> {
        self.dialog.as_ref()
    }

    /// Form data of the open dialog; empty when no dialog is open.
    pub fn form_data(&self) -> FormData {
        self.dialog
            .as_ref()
            .map(|dialog| dialog.form_data().clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns and clears the redraw flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
        self.mark_dirty();
    }

    pub(crate) fn next_request_id(&mut self) -> RequestId {
        self.last_request_id += 1;
        self.last_request_id
    }
}
