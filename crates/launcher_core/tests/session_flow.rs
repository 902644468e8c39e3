mod support;

use launcher_core::{
    update, AppState, AuthFailure, AuthFailureKind, AuthGrant, AuthPhase, Effect, Msg,
};
use pretty_assertions::assert_eq;
use support::{init_logging, signed_in};

fn interaction_required() -> AuthFailure {
    AuthFailure::new(AuthFailureKind::InteractionRequired, "interaction_required")
}

#[test]
fn first_ensure_forces_refresh_without_account() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::EnsureTokenRequested);

    assert_eq!(state.auth_phase(), AuthPhase::SilentPending);
    assert_eq!(
        effects,
        vec![Effect::AcquireTokenSilent {
            account: None,
            force_refresh: true,
        }]
    );
}

#[test]
fn restored_username_is_used_as_account() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SessionRestored {
            access_token: "old".to_string(),
            username: "alice".to_string(),
        },
    );
    let (_, effects) = update(state, Msg::EnsureTokenRequested);

    assert_eq!(
        effects,
        vec![Effect::AcquireTokenSilent {
            account: Some("alice".to_string()),
            force_refresh: true,
        }]
    );
}

#[test]
fn interaction_required_falls_back_to_interactive_and_persists() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, effects) = update(state, Msg::SilentTokenAcquired(Err(interaction_required())));

    assert_eq!(state.auth_phase(), AuthPhase::InteractivePending);
    assert_eq!(effects, vec![Effect::AcquireTokenInteractive { login_hint: None }]);

    let (state, effects) = update(
        state,
        Msg::InteractiveTokenAcquired(Ok(AuthGrant::new("T1", "alice"))),
    );

    assert_eq!(state.auth_phase(), AuthPhase::Authenticated);
    assert_eq!(state.access_token(), "T1");
    assert_eq!(state.username(), "alice");
    assert_eq!(
        effects,
        vec![
            Effect::PersistSession {
                access_token: "T1".to_string(),
                username: "alice".to_string(),
            },
            Effect::FetchPipelines {
                request_id: 1,
                access_token: "T1".to_string(),
            },
        ]
    );
}

#[test]
fn client_failure_also_falls_back_with_login_hint() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SessionRestored {
            access_token: String::new(),
            username: "alice".to_string(),
        },
    );
    let (state, _) = update(state, Msg::EnsureTokenRequested);
    let (_, effects) = update(
        state,
        Msg::SilentTokenAcquired(Err(AuthFailure::new(AuthFailureKind::Client, "no_account"))),
    );

    assert_eq!(
        effects,
        vec![Effect::AcquireTokenInteractive {
            login_hint: Some("alice".to_string()),
        }]
    );
}

#[test]
fn interactive_failure_is_swallowed() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, _) = update(state, Msg::SilentTokenAcquired(Err(interaction_required())));
    let (state, effects) = update(
        state,
        Msg::InteractiveTokenAcquired(Err(AuthFailure::new(
            AuthFailureKind::Client,
            "authorization_declined",
        ))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.auth_phase(), AuthPhase::Unauthenticated);
    assert_eq!(state.access_token(), "");
    assert_eq!(state.status(), None);
    assert!(!state.view().signed_in);
}

#[test]
fn other_failures_are_surfaced_not_retried() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, effects) = update(
        state,
        Msg::SilentTokenAcquired(Err(AuthFailure::new(
            AuthFailureKind::Other,
            "invalid_client",
        ))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.auth_phase(), AuthPhase::Unauthenticated);
    assert_eq!(state.status(), Some("Authentication failed: invalid_client"));
}

#[test]
fn force_refresh_is_cleared_after_first_success() {
    init_logging();
    let (state, _) = signed_in("alice", "T1");
    let (_, effects) = update(state, Msg::RefreshRequested);

    assert_eq!(
        effects,
        vec![Effect::AcquireTokenSilent {
            account: Some("alice".to_string()),
            force_refresh: false,
        }]
    );
}

#[test]
fn ensure_is_ignored_while_pending() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, effects) = update(state, Msg::EnsureTokenRequested);

    assert!(effects.is_empty());
    assert_eq!(state.auth_phase(), AuthPhase::SilentPending);
}

#[test]
fn every_success_overwrites_persisted_session() {
    init_logging();
    let (state, _) = signed_in("alice", "T1");
    let (state, _) = update(state, Msg::RefreshRequested);
    let (_, effects) = update(
        state,
        Msg::SilentTokenAcquired(Ok(AuthGrant::new("T1", "alice"))),
    );

    assert!(effects.contains(&Effect::PersistSession {
        access_token: "T1".to_string(),
        username: "alice".to_string(),
    }));
}

#[test]
fn late_silent_result_is_ignored() {
    init_logging();
    let (state, _) = signed_in("alice", "T1");
    let (state, effects) = update(
        state,
        Msg::SilentTokenAcquired(Ok(AuthGrant::new("T9", "mallory"))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.access_token(), "T1");
}

#[test]
fn grant_without_username_persists_but_does_not_fetch() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, effects) = update(
        state,
        Msg::SilentTokenAcquired(Ok(AuthGrant {
            access_token: "T1".to_string(),
            username: None,
        })),
    );

    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            access_token: "T1".to_string(),
            username: String::new(),
        }]
    );
    assert_eq!(state.auth_phase(), AuthPhase::Unauthenticated);
}

#[test]
fn interaction_prompt_shown_only_while_interactive() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::InteractionPrompt("ignored".to_string()));
    assert_eq!(state.view().interaction_prompt, None);

    let (state, _) = update(state, Msg::SignInClicked);
    let (state, _) = update(
        state,
        Msg::InteractionPrompt("Enter code ABC at https://microsoft.com/devicelogin".to_string()),
    );
    assert_eq!(
        state.view().interaction_prompt.as_deref(),
        Some("Enter code ABC at https://microsoft.com/devicelogin")
    );

    let (state, _) = update(state, Msg::SignInCompleted(Ok(AuthGrant::new("T1", "alice"))));
    assert_eq!(state.view().interaction_prompt, None);
    assert_eq!(state.view().greeting.as_deref(), Some("Hello alice, logged in!"));
}

#[test]
fn sign_in_is_ignored_when_already_signed_in() {
    init_logging();
    let (state, _) = signed_in("alice", "T1");
    let (_, effects) = update(state, Msg::SignInClicked);
    assert!(effects.is_empty());
}

#[test]
fn sign_out_clears_token_keeps_username_and_cancels_fetch() {
    init_logging();
    let (state, request_id) = signed_in("alice", "T1");
    let (state, effects) = update(state, Msg::SignOutClicked);
    assert_eq!(
        effects,
        vec![Effect::SignOut {
            account: Some("alice".to_string()),
        }]
    );

    let (state, effects) = update(state, Msg::SignOutCompleted(Ok(())));
    assert_eq!(
        effects,
        vec![
            Effect::ClearAccessToken,
            Effect::CancelFetch { request_id },
        ]
    );
    assert_eq!(state.access_token(), "");
    assert_eq!(state.username(), "alice");
    assert_eq!(state.auth_phase(), AuthPhase::Unauthenticated);
    assert!(!state.is_loading());
}

#[test]
fn failed_sign_out_keeps_session() {
    init_logging();
    let (state, _) = signed_in("alice", "T1");
    let (state, _) = update(state, Msg::SignOutClicked);
    let (state, effects) = update(
        state,
        Msg::SignOutCompleted(Err(AuthFailure::new(AuthFailureKind::Other, "offline"))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.auth_phase(), AuthPhase::Authenticated);
    assert_eq!(state.status(), Some("Sign-out failed: offline"));
}
