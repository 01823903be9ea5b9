//! GERBIL endpoint generation: component selection → execution URL.
//!
//! The selection becomes one path segment, `/gerbil-execute/<c1>, <c2>/`,
//! in the order given. An empty selection yields [`NO_SELECTION`] instead.

use std::fmt;

use qanary_gerbil_shared::{GerbilError, PipelineConfig, Result};
use url::Url;

/// Returned instead of a URL when no component was selected.
pub const NO_SELECTION: &str = "Select components!";

/// First path segment of the benchmark execution route.
pub const EXECUTE_SEGMENT: &str = "gerbil-execute";

/// Separator between component names inside the path segment.
pub const COMPONENT_SEPARATOR: &str = ", ";

/// Outcome of endpoint generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedEndpoint {
    /// Nothing was selected.
    NoSelection,
    /// Execution URL for the selected pipeline.
    Url(Url),
}

impl fmt::Display for GeneratedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSelection => f.write_str(NO_SELECTION),
            Self::Url(url) => f.write_str(url.as_str()),
        }
    }
}

/// Builds execution URLs rooted at the orchestration service's host and port.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    base: Url,
}

impl EndpointBuilder {
    /// `host` is a URL (`http://qanary.example.org`); only its scheme and
    /// host are kept.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let parsed = Url::parse(host)
            .map_err(|e| GerbilError::malformed_endpoint(format!("invalid host '{host}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GerbilError::malformed_endpoint(format!(
                "host '{host}' must use http or https"
            )));
        }
        let host_name = parsed.host_str().ok_or_else(|| {
            GerbilError::malformed_endpoint(format!("host '{host}' has no host name"))
        })?;
        if port == 0 {
            return Err(GerbilError::malformed_endpoint("port must be non-zero"));
        }

        let base = Url::parse(&format!("{}://{host_name}:{port}/", parsed.scheme()))
            .map_err(|e| GerbilError::malformed_endpoint(e.to_string()))?;
        Ok(Self { base })
    }

    /// Builder for the configured orchestration service.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(&config.host, config.port)
    }

    /// Generate the execution URL for `selection`.
    pub fn build<S: AsRef<str>>(&self, selection: &[S]) -> Result<GeneratedEndpoint> {
        if selection.is_empty() {
            return Ok(GeneratedEndpoint::NoSelection);
        }

        let components = join_components(selection)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GerbilError::malformed_endpoint("base URL cannot carry a path"))?
            .clear()
            .push(EXECUTE_SEGMENT)
            .push(&components)
            .push("");

        tracing::debug!(%url, "generated endpoint");
        Ok(GeneratedEndpoint::Url(url))
    }
}

/// Join component names with `", "`, rejecting names no URL should carry.
pub fn join_components<S: AsRef<str>>(selection: &[S]) -> Result<String> {
    for name in selection {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(GerbilError::malformed_endpoint("component name must not be empty"));
        }
        if name.chars().any(char::is_control) {
            return Err(GerbilError::malformed_endpoint(format!(
                "component name {name:?} contains control characters"
            )));
        }
    }

    Ok(selection
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(COMPONENT_SEPARATOR))
}
