//! Launcher engine: identity, catalog, session storage and launch IO.
mod azure;
mod catalog;
mod engine;
mod identity;
mod launch;
mod persist;
mod store;
mod types;

pub use azure::{AzureIdentityProvider, AzureSettings, DEFAULT_SCOPES};
pub use catalog::{CatalogClient, CatalogSettings, ReqwestCatalogClient};
pub use engine::{EngineEvent, EngineHandle, EngineServices, RequestId};
pub use identity::{
    AccountInfo, AuthError, AuthErrorKind, AuthenticationResult, IdentityProvider,
    InteractionPrompt, InteractionSink,
};
pub use launch::{BrowserLauncher, LaunchError, LaunchRequest, Launcher};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use store::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionChange, SessionStore,
    StoreError, StoredSession, ACCESS_TOKEN_KEY, USERNAME_KEY,
};
pub use types::{
    CatalogError, CatalogFailureKind, FieldRecord, InputFieldInstructions, PipelineRecord,
};
