use crate::{LaunchRequest, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AcquireTokenSilent {
        account: Option<String>,
        force_refresh: bool,
    },
    AcquireTokenInteractive {
        login_hint: Option<String>,
    },
    SignIn,
    SignOut {
        account: Option<String>,
    },
    /// Overwrite the persisted token and username, changed or not.
    PersistSession {
        access_token: String,
        username: String,
    },
    ClearAccessToken,
    /// Always carries the token resolved by the acquisition that triggered it.
    FetchPipelines {
        request_id: RequestId,
        access_token: String,
    },
    CancelFetch {
        request_id: RequestId,
    },
    Launch(LaunchRequest),
}
