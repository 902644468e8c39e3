use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use launcher_core::{update, AppState, Msg};
use launcher_engine::{
    ensure_dir, AzureIdentityProvider, AzureSettings, BrowserLauncher, CatalogSettings,
    EngineHandle, EngineServices, FileKeyValueStore, ReqwestCatalogClient, SessionStore,
};
use launcher_logging::{launcher_debug, launcher_info, redact_token};

use super::config::{self, LauncherConfig};
use super::effects::EffectRunner;
use super::input::{self, Command};
use super::{logging, render};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the main loop reacts to, from any thread.
pub enum ShellEvent {
    Core(Msg),
    Command(Command),
    InvalidInput(String),
    InputClosed,
}

pub fn run_app() -> anyhow::Result<()> {
    let config = config::load()?;
    ensure_dir(&config.state_dir)
        .with_context(|| format!("state directory {}", config.state_dir.display()))?;
    logging::initialize(&config.log, &config.state_dir);
    launcher_info!(
        "Pipeline launcher starting: api={} state_dir={:?}",
        config.api_base_url,
        config.state_dir
    );

    let store = Arc::new(SessionStore::new(FileKeyValueStore::open(&config.state_dir)));
    let engine = Arc::new(build_engine(&config)?);
    let runner = EffectRunner::new(engine.clone(), store.clone());

    let (tx, rx) = mpsc::channel::<ShellEvent>();
    let _ = tx.send(ShellEvent::Core(Msg::SessionRestored {
        access_token: store.token(),
        username: store.username(),
    }));
    let _ = tx.send(ShellEvent::Core(Msg::EnsureTokenRequested));

    spawn_store_logger(&store);
    runner.spawn_event_pump(tx.clone());
    spawn_input_reader(tx.clone());
    spawn_ticker(tx);

    let mut state = AppState::new();
    print_screen(&render::render(&state.view()));

    for event in rx {
        let msg = match event {
            ShellEvent::Core(msg) => msg,
            ShellEvent::Command(Command::Quit) | ShellEvent::InputClosed => break,
            ShellEvent::Command(Command::Help) => {
                print_screen(&[input::HELP.to_string()]);
                continue;
            }
            ShellEvent::Command(command) => match command.into_msg() {
                Some(msg) => msg,
                None => continue,
            },
            ShellEvent::InvalidInput(problem) => {
                print_screen(&[format!("{problem} (type `help` for commands)")]);
                continue;
            }
        };

        let (next, effects) = update(state, msg);
        state = next;
        runner.run(effects);
        if state.consume_dirty() {
            print_screen(&render::render(&state.view()));
        }
    }

    launcher_info!("Shutting down");
    engine.shutdown();
    Ok(())
}

fn build_engine(config: &LauncherConfig) -> anyhow::Result<EngineHandle> {
    let identity = AzureIdentityProvider::new(AzureSettings {
        request_timeout: config.request_timeout(),
        poll_interval: config.poll_interval(),
        cache_dir: Some(config.state_dir.clone()),
        ..AzureSettings::new(config.authority.clone(), config.client_id.clone())
    })
    .context("invalid identity settings")?;
    let catalog = ReqwestCatalogClient::new(CatalogSettings {
        request_timeout: config.request_timeout(),
        ..CatalogSettings::new(config.api_base_url.clone())
    })
    .context("invalid catalog settings")?;

    EngineHandle::new(EngineServices {
        identity: Arc::new(identity),
        catalog: Arc::new(catalog),
        launcher: Arc::new(BrowserLauncher),
        scopes: config.scopes.clone(),
    })
    .context("failed to start the engine runtime")
}

fn spawn_store_logger(store: &SessionStore) {
    let changes = store.subscribe();
    thread::spawn(move || {
        for change in changes {
            launcher_debug!(
                "Session store now holds user={:?} token={}",
                change.username,
                redact_token(&change.access_token)
            );
        }
    });
}

fn spawn_input_reader(tx: mpsc::Sender<ShellEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let event = match input::parse_command(&line) {
                Ok(Some(command)) => ShellEvent::Command(command),
                Ok(None) => continue,
                Err(problem) => ShellEvent::InvalidInput(problem),
            };
            if tx.send(event).is_err() {
                return;
            }
        }
        let _ = tx.send(ShellEvent::InputClosed);
    });
}

// Coalesces rendering the same way as any other message.
fn spawn_ticker(tx: mpsc::Sender<ShellEvent>) {
    thread::spawn(move || {
        while tx.send(ShellEvent::Core(Msg::Tick)).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });
}

fn print_screen(lines: &[String]) {
    let mut out = io::stdout().lock();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out);
    let _ = out.flush();
}
