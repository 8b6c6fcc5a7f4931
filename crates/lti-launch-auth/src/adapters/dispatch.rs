//! # Launch Dispatch Helpers
//!
//! Pure functions a host HTTP layer uses to decide whether a request is an
//! LTI launch and which tenant it targets. No routing happens here.

use crate::domain::entities::param;

/// Numeric tenant identifier taken from the launch path.
pub type TenantId = u64;

const LAUNCH_PREFIX: &str = "/api/lti/";

/// Whether a parameter list carries the three fields that mark an LTI launch.
pub fn is_lti_launch(params: &[(String, String)]) -> bool {
    param::REQUIRED_LTI
        .iter()
        .all(|required| params.iter().any(|(name, _)| name == required))
}

/// Extract the tenant from `/api/lti/{tenant_id}`.
///
/// The tenant segment must be all digits and be followed by the end of the
/// path or a `/`.
pub fn parse_launch_path(path: &str) -> Option<TenantId> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let rest = path.strip_prefix(LAUNCH_PREFIX)?;
    let segment = rest.split('/').next().unwrap_or_default();

    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
