use crate::{select_pipeline, AppState, AuthGrant, AuthPhase, Effect, Msg, Selection};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionRestored {
            access_token,
            username,
        } => {
            state.session.access_token = access_token;
            state.session.username = username;
            state.mark_dirty();
            Vec::new()
        }
        Msg::EnsureTokenRequested | Msg::RefreshRequested => match state.session.begin_silent() {
            Some(effect) => {
                state.mark_dirty();
                vec![effect]
            }
            None => Vec::new(),
        },
        Msg::SilentTokenAcquired(result) => {
            if state.session.phase != AuthPhase::SilentPending {
                return (state, Vec::new());
            }
            match result {
                Ok(grant) => accept_grant(&mut state, grant),
                Err(failure) => {
                    let effects: Vec<Effect> = state.session.fall_back(&failure).into_iter().collect();
                    if effects.is_empty() {
                        // Not ours to absorb: surface it to the shell.
                        state.set_status(format!("Authentication failed: {}", failure.message));
                    }
                    state.mark_dirty();
                    effects
                }
            }
        }
        Msg::InteractiveTokenAcquired(result) | Msg::SignInCompleted(result) => {
            if state.session.phase != AuthPhase::InteractivePending {
                return (state, Vec::new());
            }
            match result {
                Ok(grant) => accept_grant(&mut state, grant),
                Err(_) => {
                    // Interactive failures are swallowed; the user sees the
                    // sign-in prompt again.
                    state.session.abandon();
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::InteractionPrompt(text) => {
            if state.session.phase == AuthPhase::InteractivePending {
                state.session.prompt = Some(text);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SignInClicked => {
            if state.session.phase.is_pending() || state.session.phase == AuthPhase::Authenticated
            {
                return (state, Vec::new());
            }
            state.session.phase = AuthPhase::InteractivePending;
            state.mark_dirty();
            vec![Effect::SignIn]
        }
        Msg::SignOutClicked => {
            if state.session.phase != AuthPhase::Authenticated {
                return (state, Vec::new());
            }
            vec![Effect::SignOut {
                account: state.session.account(),
            }]
        }
        Msg::SignOutCompleted(Ok(())) => {
            let mut effects = vec![Effect::ClearAccessToken];
            if let Some(request_id) = state.catalog.in_flight.take() {
                effects.push(Effect::CancelFetch { request_id });
            }
            state.session.sign_out();
            state.catalog = Default::default();
            state.dialog = None;
            state.mark_dirty();
            effects
        }
        Msg::SignOutCompleted(Err(failure)) => {
            state.set_status(format!("Sign-out failed: {}", failure.message));
            Vec::new()
        }
        Msg::PipelinesLoaded { request_id, result } => {
            if state.catalog.in_flight != Some(request_id) {
                // Superseded or cancelled.
                return (state, Vec::new());
            }
            state.catalog.in_flight = None;
            state.catalog.loading = false;
            if let Ok(pipelines) = result {
                state.catalog.pipelines = pipelines;
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::PipelineSelected(index) => select(&mut state, index),
        Msg::FieldChanged { name, value } => {
            if let Some(dialog) = state.dialog.as_mut() {
                if dialog.set_field_value(&name, value) {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::LaunchSubmitted => match state.dialog.take() {
            Some(dialog) => {
                state.mark_dirty();
                match dialog.submit() {
                    Ok(request) => vec![Effect::Launch(request)],
                    Err(pipeline) => {
                        state.set_status(format!("{} has no launch link", pipeline.name));
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        },
        Msg::LaunchCancelled => {
            if state.dialog.take().is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::LaunchFinished {
            pipeline_name,
            result,
        } => {
            match result {
                Ok(()) => state.set_status(format!("Launched {pipeline_name}")),
                Err(message) => {
                    state.set_status(format!("Could not launch {pipeline_name}: {message}"))
                }
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Persists every successful grant and, for a valid session, continues with
/// the catalog fetch using the token just resolved.
fn accept_grant(state: &mut AppState, grant: AuthGrant) -> Vec<Effect> {
    let access_token = grant.access_token.clone();
    let valid = state.session.accept(grant);
    state.mark_dirty();

    let mut effects = vec![Effect::PersistSession {
        access_token: access_token.clone(),
        username: state.session.username.clone(),
    }];
    if !valid {
        return effects;
    }

    if let Some(previous) = state.catalog.in_flight.take() {
        effects.push(Effect::CancelFetch {
            request_id: previous,
        });
    }
    let request_id = state.next_request_id();
    state.catalog.in_flight = Some(request_id);
    state.catalog.loading = true;
    effects.push(Effect::FetchPipelines {
        request_id,
        access_token,
    });
    effects
}

fn select(state: &mut AppState, index: usize) -> Vec<Effect> {
    if state.session.phase != AuthPhase::Authenticated {
        return Vec::new();
    }
    let Some(pipeline) = state.catalog.pipelines.get(index).cloned() else {
        state.set_status(format!("No pipeline #{}", index + 1));
        return Vec::new();
    };
    match select_pipeline(pipeline) {
        Selection::Dialog(dialog) => {
            state.dialog = Some(dialog);
            state.mark_dirty();
            Vec::new()
        }
        Selection::Direct(request) => vec![Effect::Launch(request)],
        Selection::NoLink(pipeline) => {
            state.set_status(format!("{} has no launch link", pipeline.name));
            Vec::new()
        }
    }
}
