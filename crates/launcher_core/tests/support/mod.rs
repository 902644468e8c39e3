#![allow(dead_code)]

use std::sync::Once;

use launcher_core::{update, AppState, AuthGrant, Effect, FieldDescriptor, Msg, Pipeline};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(launcher_logging::initialize_for_tests);
}

/// Drives a fresh state through a successful silent acquisition and returns
/// it together with the fetch request id.
pub fn signed_in(username: &str, token: &str) -> (AppState, u64) {
    let (state, _) = update(AppState::new(), Msg::EnsureTokenRequested);
    let (state, effects) = update(
        state,
        Msg::SilentTokenAcquired(Ok(AuthGrant::new(token, username))),
    );
    let request_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::FetchPipelines { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .expect("fetch effect");
    (state, request_id)
}

/// A signed-in state whose catalog holds `pipelines`.
pub fn with_catalog(pipelines: Vec<Pipeline>) -> AppState {
    let (state, request_id) = signed_in("alice", "T1");
    let (mut state, _) = update(
        state,
        Msg::PipelinesLoaded {
            request_id,
            result: Ok(pipelines),
        },
    );
    state.consume_dirty();
    state
}

pub fn build_pipeline() -> Pipeline {
    Pipeline::new("Build").with_link("https://x/build")
}

pub fn deploy_pipeline() -> Pipeline {
    Pipeline::new("Deploy")
        .with_link("https://x/deploy")
        .with_description("Ships the build")
        .with_fields(vec![
            FieldDescriptor::numeric("count", Some(1), Some(5)),
            FieldDescriptor::text("branch"),
        ])
}
