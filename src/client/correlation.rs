//! Request tracing headers sent with every store request.

use crate::models::ApiPath;
use crate::traits::Headers;

pub const USER_AGENT: &str = concat!("appconfig-sync/", env!("CARGO_PKG_VERSION"));

pub const CORRELATION_HEADER: &str = "correlation-context";
pub const TRACING_DISABLED_ENV: &str = "AZURE_APP_CONFIGURATION_TRACING_DISABLED";
const FUNCTIONS_ENV: &str = "FUNCTIONS_EXTENSION_VERSION";
const WEB_APP_ENV: &str = "WEBSITE_NODE_DEFAULT_VERSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Startup,
    Watch,
}

impl RequestType {
    /// `/kv` loads are startup traffic, `/revisions` probes are watch traffic.
    pub fn for_api(api: ApiPath) -> Self {
        match api {
            ApiPath::Kv => RequestType::Startup,
            ApiPath::Revisions => RequestType::Watch,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Startup => "Startup",
            RequestType::Watch => "Watch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    AzureFunction,
    AzureWebApp,
    None,
}

impl HostType {
    pub fn detect() -> Self {
        if std::env::var_os(FUNCTIONS_ENV).is_some() {
            HostType::AzureFunction
        } else if std::env::var_os(WEB_APP_ENV).is_some() {
            HostType::AzureWebApp
        } else {
            HostType::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::AzureFunction => "AzureFunction",
            HostType::AzureWebApp => "AzureWebApp",
            HostType::None => "None",
        }
    }
}

fn tracing_disabled() -> bool {
    std::env::var(TRACING_DISABLED_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `RequestType=<..>,Host=<..>`, or `None` when tracing is disabled.
pub fn correlation_context(api: ApiPath) -> Option<String> {
    if tracing_disabled() {
        return None;
    }
    Some(format!(
        "RequestType={},Host={}",
        RequestType::for_api(api).as_str(),
        HostType::detect().as_str()
    ))
}

/// Add the user agent and correlation headers.
pub fn apply_tracing_headers(headers: &mut Headers, api: ApiPath) {
    headers.insert("User-Agent".to_string(), USER_AGENT.to_string());
    if let Some(context) = correlation_context(api) {
        headers.insert(CORRELATION_HEADER.to_string(), context);
    }
}
