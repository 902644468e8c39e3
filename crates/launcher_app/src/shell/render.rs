use launcher_core::{AppViewModel, AuthPhase, FieldInput, FieldView, NO_PIPELINES};

/// Text lines for one screen refresh.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![header(view)];

    if let Some(prompt) = &view.interaction_prompt {
        lines.push(prompt.clone());
    }

    if view.loading {
        lines.push("Loading pipelines...".to_string());
    }

    for card in &view.pipelines {
        let mut line = format!("[{}] {} - {}", card.index + 1, card.name, card.description);
        if card.needs_input {
            line.push_str(" (form)");
        } else if !card.launchable {
            line.push_str(" (no link)");
        }
        lines.push(line);
    }

    if view.show_empty_hint {
        lines.push(NO_PIPELINES.to_string());
    }

    if let Some(dialog) = &view.dialog {
        lines.push(format!("Launch {}:", dialog.pipeline_name));
        lines.extend(dialog.fields.iter().map(format_field));
        lines.push("Use `set <field> <value>`, then `submit` or `cancel`.".to_string());
    }

    if let Some(status) = &view.status {
        lines.push(format!("> {status}"));
    }

    lines
}

fn header(view: &AppViewModel) -> String {
    if let Some(greeting) = &view.greeting {
        return greeting.clone();
    }
    match view.auth_phase {
        AuthPhase::SilentPending => "Signing in...".to_string(),
        AuthPhase::InteractivePending => "Waiting for you to finish signing in...".to_string(),
        AuthPhase::NoToken | AuthPhase::Unauthenticated | AuthPhase::Authenticated => {
            "Not signed in. Type `signin` to sign in.".to_string()
        }
    }
}

fn format_field(field: &FieldView) -> String {
    let value = if field.value.is_empty() {
        "<empty>"
    } else {
        field.value.as_str()
    };
    let marker = if field.invalid { "  (!)" } else { "" };
    format!(
        "  {} [{}]: {}{}",
        field.name,
        describe_input(field.input),
        value,
        marker
    )
}

fn describe_input(input: FieldInput) -> String {
    match input {
        FieldInput::Number {
            min: Some(min),
            max: Some(max),
        } => format!("number {min}..={max}"),
        FieldInput::Number {
            min: Some(min),
            max: None,
        } => format!("number >= {min}"),
        FieldInput::Number {
            min: None,
            max: Some(max),
        } => format!("number <= {max}"),
        FieldInput::Number {
            min: None,
            max: None,
        } => "number".to_string(),
        FieldInput::Text => "text".to_string(),
    }
}
