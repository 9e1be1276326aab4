//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Stevedore data with system privileges.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/stevedore";

/// Returns the data directory, preferring `$HOME/.stevedore` when a home
/// directory is available and falling back to `/var/lib/stevedore`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".stevedore");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
///
/// The first call creates `$HOME/.stevedore` if it does not exist yet.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Default `PATH` injected into container environments.
///
/// Deliberately empty: the container image decides its own search path.
pub const DEFAULT_PATH_ENV: &str = "";

/// Metadata key under which storage drivers report the writable layer folder.
pub const LAYER_FOLDER_KEY: &str = "dir";

/// Default virtual switch that container interfaces are attached to.
pub const DEFAULT_BRIDGE: &str = "Virtual Switch";

/// Name of the default directory-backed storage driver.
pub const DEFAULT_STORAGE_DRIVER: &str = "dir";

/// Network mode prefix reserved for joining another container's stack.
pub const CONTAINER_NETWORK_PREFIX: &str = "container";

/// Maximum number of layers in an image chain.
pub const MAX_IMAGE_LAYERS: usize = 128;
