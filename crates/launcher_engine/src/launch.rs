use std::collections::BTreeMap;

use launcher_logging::launcher_info;
use thiserror::Error;

/// A pipeline launch as handed to a [`Launcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub pipeline_name: String,
    pub link: String,
    /// Raw field values; empty for pipelines without input fields.
    pub form_data: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid launch link {link}: {reason}")]
    InvalidLink { link: String, reason: String },
    #[error("could not open {link}: {source}")]
    Open {
        link: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Launcher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError>;
}

/// Opens the launch link in the system browser.
///
/// Form data is logged but not transmitted: the pipeline API has no agreed
/// transport for it yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserLauncher;

impl Launcher for BrowserLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
        check_link(&request.link)?;
        if !request.form_data.is_empty() {
            launcher_info!(
                "Launching {} with form data {:?}",
                request.pipeline_name,
                request.form_data
            );
        }
        open::that(&request.link).map_err(|source| LaunchError::Open {
            link: request.link.clone(),
            source,
        })
    }
}

/// Only absolute http(s) links are handed to the browser.
pub(crate) fn check_link(link: &str) -> Result<(), LaunchError> {
    let invalid = |reason: String| LaunchError::InvalidLink {
        link: link.to_string(),
        reason,
    };
    let parsed = url::Url::parse(link).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
