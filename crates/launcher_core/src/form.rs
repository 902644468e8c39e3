use std::collections::BTreeMap;

use crate::{FieldDescriptor, FieldKind, Pipeline};

/// Raw user input keyed by field name. Values are never coerced.
pub type FormData = BTreeMap<String, String>;

/// What the launcher collaborator receives: the pipeline, its link and the
/// collected form data (empty for direct launches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub pipeline: Pipeline,
    pub link: String,
    pub form_data: FormData,
}

/// Outcome of selecting a pipeline card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The pipeline declares fields; collect them first.
    Dialog(LaunchDialog),
    /// No fields; launch through the link right away.
    Direct(LaunchRequest),
    /// No fields and no link: nothing to launch.
    NoLink(Pipeline),
}

pub fn select_pipeline(pipeline: Pipeline) -> Selection {
    if pipeline.requires_input() {
        return Selection::Dialog(LaunchDialog::open(pipeline));
    }
    match pipeline.launch_link().map(ToOwned::to_owned) {
        Some(link) => Selection::Direct(LaunchRequest {
            pipeline,
            link,
            form_data: FormData::new(),
        }),
        None => Selection::NoLink(pipeline),
    }
}

/// The single open launch dialog and its form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchDialog {
    pipeline: Pipeline,
    form: FormData,
}

impl LaunchDialog {
    pub fn open(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            form: FormData::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn form_data(&self) -> &FormData {
        &self.form
    }

    /// Stores `raw` as-is. Names the pipeline does not declare are refused so
    /// the form keys stay a subset of the declared fields.
    pub fn set_field_value(&mut self, name: &str, raw: impl Into<String>) -> bool {
        if !self.pipeline.declares_field(name) {
            return false;
        }
        self.form.insert(name.to_string(), raw.into());
        true
    }

    pub fn fields(&self) -> Vec<FieldView> {
        self.pipeline
            .fields()
            .iter()
            .filter_map(|descriptor| {
                render_field(descriptor, self.form.get(&descriptor.name).map(String::as_str))
            })
            .collect()
    }

    /// Closes the dialog into a launch request. Hands the pipeline back when it
    /// has no link.
    pub fn submit(self) -> Result<LaunchRequest, Pipeline> {
        match self.pipeline.launch_link().map(ToOwned::to_owned) {
            Some(link) => Ok(LaunchRequest {
                pipeline: self.pipeline,
                link,
                form_data: self.form,
            }),
            None => Err(self.pipeline),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInput {
    Number { min: Option<i64>, max: Option<i64> },
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    pub value: String,
    pub input: FieldInput,
    /// Presentational only: a numeric entry that is not an integer or lies
    /// outside the bounds. Input is never rejected.
    pub invalid: bool,
}

/// Renders one field, or nothing for a kind this client cannot present.
pub fn render_field(descriptor: &FieldDescriptor, value: Option<&str>) -> Option<FieldView> {
    let value = value.unwrap_or_default();
    let (input, invalid) = match descriptor.kind {
        FieldKind::Numeric { min, max } => (
            FieldInput::Number { min, max },
            !value.is_empty() && !numeric_in_bounds(value, min, max),
        ),
        FieldKind::Text => (FieldInput::Text, false),
        FieldKind::Unsupported { .. } => return None,
    };
    Some(FieldView {
        name: descriptor.name.clone(),
        value: value.to_string(),
        input,
        invalid,
    })
}

fn numeric_in_bounds(raw: &str, min: Option<i64>, max: Option<i64>) -> bool {
    match raw.trim().parse::<i64>() {
        Ok(number) => min.is_none_or(|min| number >= min) && max.is_none_or(|max| number <= max),
        Err(_) => false,
    }
}
