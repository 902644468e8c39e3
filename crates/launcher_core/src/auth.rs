use crate::Effect;

/// Where the session manager is in its silent-then-interactive chain.
///
/// `NoToken -> SilentPending -> {Authenticated | InteractivePending}` and
/// `InteractivePending -> {Authenticated | Unauthenticated}`. Neither end
/// state is terminal: a new `EnsureTokenRequested` restarts the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    NoToken,
    SilentPending,
    InteractivePending,
    Authenticated,
    Unauthenticated,
}

impl AuthPhase {
    pub fn is_pending(self) -> bool {
        matches!(self, AuthPhase::SilentPending | AuthPhase::InteractivePending)
    }
}

/// Result of a successful acquisition as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub access_token: String,
    pub username: Option<String>,
}

impl AuthGrant {
    pub fn new(access_token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            username: Some(username.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    /// Silent acquisition cannot complete without the user.
    InteractionRequired,
    /// The local client could not complete the flow (no cached account,
    /// prompt declined or expired).
    Client,
    /// Anything else: server rejections, configuration, transport.
    Other,
}

impl AuthFailureKind {
    pub fn allows_interactive_fallback(self) -> bool {
        match self {
            AuthFailureKind::InteractionRequired | AuthFailureKind::Client => true,
            AuthFailureKind::Other => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub kind: AuthFailureKind,
    pub message: String,
}

impl AuthFailure {
    pub fn new(kind: AuthFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) phase: AuthPhase,
    pub(crate) access_token: String,
    pub(crate) username: String,
    /// Only the first acquisition of a process forces a refresh.
    pub(crate) force_refresh: bool,
    pub(crate) prompt: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            phase: AuthPhase::NoToken,
            access_token: String::new(),
            username: String::new(),
            force_refresh: true,
            prompt: None,
        }
    }
}

impl Session {
    /// A token only counts when paired with a non-empty username.
    pub(crate) fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.username.is_empty()
    }

    pub(crate) fn account(&self) -> Option<String> {
        Some(self.username.clone()).filter(|name| !name.is_empty())
    }

    pub(crate) fn begin_silent(&mut self) -> Option<Effect> {
        if self.phase.is_pending() {
            return None;
        }
        self.phase = AuthPhase::SilentPending;
        Some(Effect::AcquireTokenSilent {
            account: self.account(),
            force_refresh: self.force_refresh,
        })
    }

    /// Moves to the interactive step when the failure allows it.
    pub(crate) fn fall_back(&mut self, failure: &AuthFailure) -> Option<Effect> {
        if !failure.kind.allows_interactive_fallback() {
            self.phase = AuthPhase::Unauthenticated;
            return None;
        }
        self.phase = AuthPhase::InteractivePending;
        Some(Effect::AcquireTokenInteractive {
            login_hint: self.account(),
        })
    }

    /// Stores a grant. Returns true when the result is a valid session.
    pub(crate) fn accept(&mut self, grant: AuthGrant) -> bool {
        if let Some(username) = grant.username.filter(|name| !name.is_empty()) {
            self.username = username;
        }
        self.access_token = grant.access_token;
        self.force_refresh = false;
        self.prompt = None;
        self.phase = if self.is_valid() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        };
        self.phase == AuthPhase::Authenticated
    }

    pub(crate) fn abandon(&mut self) {
        self.phase = AuthPhase::Unauthenticated;
        self.prompt = None;
    }

    pub(crate) fn sign_out(&mut self) {
        self.access_token.clear();
        self.abandon();
    }
}
