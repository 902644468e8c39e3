use crate::{AuthPhase, FieldView};

pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_PIPELINES: &str = "No pipelines found.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub auth_phase: AuthPhase,
    pub signed_in: bool,
    pub username: Option<String>,
    pub greeting: Option<String>,
    pub interaction_prompt: Option<String>,
    pub loading: bool,
    pub pipelines: Vec<PipelineCardView>,
    pub show_empty_hint: bool,
    pub dialog: Option<LaunchDialogView>,
    pub status: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCardView {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub launchable: bool,
    pub needs_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchDialogView {
    pub pipeline_name: String,
    pub fields: Vec<FieldView>,
}
