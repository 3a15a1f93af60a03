//! Navigation boundary
//!
//! Login is an external redirect and a rejected session sends the user back
//! to the home surface. Both are delegated to whatever hosts the client.

/// Path of the login redirect target, relative to the API base URL
pub const LOGIN_PATH: &str = "/auth/github";
/// Path of the logout endpoint
pub const LOGOUT_PATH: &str = "/auth/logout";
/// Where a rejected session is sent
pub const HOME_PATH: &str = "/";

/// Host-side navigation
pub trait Navigator: Send + Sync {
    /// Navigate to `url` (absolute or host-relative)
    fn navigate(&self, url: &str);

    /// The host's current location path
    fn current_path(&self) -> String;
}

/// A navigator that only logs the requested target
#[derive(Debug, Default, Clone)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, url: &str) {
        log::info!("Navigation requested to {}", url);
    }

    fn current_path(&self) -> String {
        HOME_PATH.to_string()
    }
}

/// Whether a public page is being shown (home or any auth callback page)
pub fn is_public_path(path: &str) -> bool {
    path == HOME_PATH || path.is_empty() || path.starts_with("/auth/")
}

/// Whether a 401 on `request_path` should redirect the host home
///
/// Never when already on a public page, and never for the logout call
/// itself, which would otherwise loop while logging out.
pub fn should_redirect_on_unauthorized(current_path: &str, request_path: &str) -> bool {
    request_path != LOGOUT_PATH && !is_public_path(current_path)
}
