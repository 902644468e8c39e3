/// A server-described unit of work that can be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    /// `None` when the server sent no field instructions at all.
    pub input_fields: Option<Vec<FieldDescriptor>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            link: None,
            input_fields: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.input_fields = Some(fields);
        self
    }

    /// The launch link, treating an empty string as absent.
    pub fn launch_link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.trim().is_empty())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        self.input_fields.as_deref().unwrap_or(&[])
    }

    /// True when launching needs a dialog: at least one declared field.
    pub fn requires_input(&self) -> bool {
        !self.fields().is_empty()
    }

    pub fn declares_field(&self, name: &str) -> bool {
        self.fields().iter().any(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn numeric(name: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric { min, max },
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn unsupported(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Unsupported {
                type_name: type_name.into(),
            },
        }
    }
}

/// Closed set of field kinds. Adding a kind forces every `match` to handle it.
///
/// Tags this client does not know stay on the pipeline as `Unsupported`: the
/// field still counts as declared but renders nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Numeric { min: Option<i64>, max: Option<i64> },
    Text,
    Unsupported { type_name: String },
}

impl FieldKind {
    /// Maps a wire `type` tag to a kind. Bounds only apply to numeric fields.
    pub fn parse(type_name: &str, min: Option<i64>, max: Option<i64>) -> Self {
        match type_name {
            "int" => FieldKind::Numeric { min, max },
            "text" => FieldKind::Text,
            other => FieldKind::Unsupported {
                type_name: other.to_string(),
            },
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FieldKind::Unsupported { .. })
    }
}
