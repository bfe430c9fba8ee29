//! Shared User-Agent string for all HTTP traffic.
//!
//! Single source for project URL and UA format so landing-page and
//! document traffic stay consistent and easy to update (good
//! citizenship; RFC 9308).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/paperdl";

/// Default User-Agent identifying the tool.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("paperdl/{version} (academic-research-tool; +{PROJECT_UA_URL})")
}
