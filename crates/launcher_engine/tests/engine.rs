use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use launcher_engine::{
    AccountInfo, AuthError, AuthErrorKind, AuthenticationResult, CatalogClient, CatalogError,
    EngineEvent, EngineHandle, EngineServices, IdentityProvider, InteractionPrompt,
    InteractionSink, LaunchError, LaunchRequest, Launcher, PipelineRecord,
};
use pretty_assertions::assert_eq;

const WAIT: Duration = Duration::from_secs(5);

fn grant(token: &str, username: &str) -> AuthenticationResult {
    AuthenticationResult {
        access_token: token.to_string(),
        account: Some(AccountInfo {
            username: username.to_string(),
        }),
        expires_on: None,
    }
}

#[derive(Default)]
struct FakeIdentity {
    silent_calls: Mutex<Vec<(Option<String>, bool)>>,
    logged_out: Mutex<Vec<Option<String>>>,
}

#[async_trait::async_trait]
impl IdentityProvider for FakeIdentity {
    async fn acquire_token_silent(
        &self,
        _scopes: &[String],
        account: Option<&str>,
        force_refresh: bool,
    ) -> Result<AuthenticationResult, AuthError> {
        self.silent_calls
            .lock()
            .unwrap()
            .push((account.map(ToOwned::to_owned), force_refresh));
        match account {
            Some(name) => Ok(grant("T1", name)),
            None => Err(AuthError::new(AuthErrorKind::Client, "no_account")),
        }
    }

    async fn acquire_token_interactive(
        &self,
        _scopes: &[String],
        login_hint: Option<&str>,
        sink: &dyn InteractionSink,
    ) -> Result<AuthenticationResult, AuthError> {
        sink.prompt(&InteractionPrompt {
            user_code: "ABCD".to_string(),
            verification_uri: "https://microsoft.com/devicelogin".to_string(),
            message: "enter ABCD".to_string(),
            expires_in: Duration::from_secs(900),
            login_hint: login_hint.map(ToOwned::to_owned),
        });
        Ok(grant("T2", login_hint.unwrap_or("carol")))
    }

    async fn logout(&self, account: Option<&str>) -> Result<(), AuthError> {
        self.logged_out
            .lock()
            .unwrap()
            .push(account.map(ToOwned::to_owned));
        Ok(())
    }
}

struct FakeCatalog {
    delay: Duration,
}

#[async_trait::async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_pipelines(
        &self,
        access_token: &str,
    ) -> Result<Vec<PipelineRecord>, CatalogError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![PipelineRecord {
            id: None,
            name: format!("Build for {access_token}"),
            description: None,
            link: Some("https://x/build".to_string()),
            input_field_instructions: None,
        }])
    }
}

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<LaunchRequest>>,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
        if !request.link.starts_with("https://") {
            return Err(LaunchError::InvalidLink {
                link: request.link.clone(),
                reason: "not https".to_string(),
            });
        }
        self.launched.lock().unwrap().push(request.clone());
        Ok(())
    }
}

struct Harness {
    engine: EngineHandle,
    identity: Arc<FakeIdentity>,
    launcher: Arc<RecordingLauncher>,
}

fn harness(catalog_delay: Duration) -> Harness {
    let identity = Arc::new(FakeIdentity::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let engine = EngineHandle::new(EngineServices {
        identity: identity.clone(),
        catalog: Arc::new(FakeCatalog {
            delay: catalog_delay,
        }),
        launcher: launcher.clone(),
        scopes: vec!["api://app/access".to_string()],
    })
    .unwrap();
    Harness {
        engine,
        identity,
        launcher,
    }
}

#[test]
fn silent_request_reports_result() {
    let h = harness(Duration::ZERO);
    h.engine.acquire_token_silent(Some("alice".to_string()), true);

    assert_eq!(
        h.engine.recv_timeout(WAIT),
        Some(EngineEvent::SilentToken(Ok(grant("T1", "alice"))))
    );
    assert_eq!(
        *h.identity.silent_calls.lock().unwrap(),
        vec![(Some("alice".to_string()), true)]
    );
    h.engine.shutdown();
}

#[test]
fn interactive_request_relays_prompt_before_result() {
    let h = harness(Duration::ZERO);
    h.engine.acquire_token_interactive(Some("alice".to_string()));

    match h.engine.recv_timeout(WAIT) {
        Some(EngineEvent::Prompt(prompt)) => {
            assert_eq!(prompt.user_code, "ABCD");
            assert_eq!(prompt.login_hint.as_deref(), Some("alice"));
        }
        other => panic!("expected prompt, got {other:?}"),
    }
    assert_eq!(
        h.engine.recv_timeout(WAIT),
        Some(EngineEvent::InteractiveToken(Ok(grant("T2", "alice"))))
    );
    h.engine.shutdown();
}

#[test]
fn sign_in_and_sign_out_round_trip() {
    let h = harness(Duration::ZERO);
    h.engine.sign_in();
    assert!(matches!(h.engine.recv_timeout(WAIT), Some(EngineEvent::Prompt(_))));
    assert_eq!(
        h.engine.recv_timeout(WAIT),
        Some(EngineEvent::SignIn(Ok(grant("T2", "carol"))))
    );

    h.engine.sign_out(Some("carol".to_string()));
    assert_eq!(h.engine.recv_timeout(WAIT), Some(EngineEvent::SignOut(Ok(()))));
    assert_eq!(
        *h.identity.logged_out.lock().unwrap(),
        vec![Some("carol".to_string())]
    );
    h.engine.shutdown();
}

#[test]
fn fetch_reports_records_with_request_id() {
    let h = harness(Duration::ZERO);
    h.engine.fetch_pipelines(7, "T1");

    match h.engine.recv_timeout(WAIT) {
        Some(EngineEvent::PipelinesFetched { request_id, result }) => {
            assert_eq!(request_id, 7);
            assert_eq!(result.unwrap()[0].name, "Build for T1");
        }
        other => panic!("expected pipelines, got {other:?}"),
    }
    h.engine.shutdown();
}

#[test]
fn cancelled_fetch_never_reports() {
    let h = harness(Duration::from_millis(300));
    h.engine.fetch_pipelines(1, "T1");
    h.engine.cancel(1);
    h.engine.fetch_pipelines(2, "T2");

    match h.engine.recv_timeout(WAIT) {
        Some(EngineEvent::PipelinesFetched { request_id, .. }) => assert_eq!(request_id, 2),
        other => panic!("expected second fetch, got {other:?}"),
    }
    assert_eq!(h.engine.recv_timeout(Duration::from_millis(500)), None);
    h.engine.shutdown();
}

#[test]
fn cancelling_unknown_request_is_harmless() {
    let h = harness(Duration::ZERO);
    h.engine.cancel(42);
    h.engine.fetch_pipelines(3, "T1");
    assert!(matches!(
        h.engine.recv_timeout(WAIT),
        Some(EngineEvent::PipelinesFetched { request_id: 3, .. })
    ));
    h.engine.shutdown();
}

#[test]
fn launch_hands_form_data_to_launcher() {
    let h = harness(Duration::ZERO);
    let form_data = BTreeMap::from([("count".to_string(), "3".to_string())]);
    let request = LaunchRequest {
        pipeline_name: "Deploy".to_string(),
        link: "https://x/deploy".to_string(),
        form_data,
    };
    h.engine.launch(request.clone());

    assert_eq!(
        h.engine.recv_timeout(WAIT),
        Some(EngineEvent::LaunchFinished {
            pipeline_name: "Deploy".to_string(),
            result: Ok(()),
        })
    );
    assert_eq!(*h.launcher.launched.lock().unwrap(), vec![request]);
    h.engine.shutdown();
}

#[test]
fn failed_launch_reports_error_text() {
    let h = harness(Duration::ZERO);
    h.engine.launch(LaunchRequest {
        pipeline_name: "Legacy".to_string(),
        link: "ftp://x/legacy".to_string(),
        form_data: BTreeMap::new(),
    });

    match h.engine.recv_timeout(WAIT) {
        Some(EngineEvent::LaunchFinished {
            pipeline_name,
            result: Err(message),
        }) => {
            assert_eq!(pipeline_name, "Legacy");
            assert!(message.contains("ftp://x/legacy"));
        }
        other => panic!("expected failed launch, got {other:?}"),
    }
    h.engine.shutdown();
}

#[test]
fn shutdown_drops_pending_work() {
    let h = harness(Duration::from_millis(300));
    h.engine.fetch_pipelines(1, "T1");
    h.engine.shutdown();
    assert_eq!(h.engine.recv_timeout(Duration::from_millis(600)), None);
    assert_eq!(h.engine.try_recv(), None);
}
