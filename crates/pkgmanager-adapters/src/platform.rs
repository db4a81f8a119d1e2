use pkgmanager_schema::Platform;
use std::fs;

/// Detect the platform this process runs on.
pub fn detect_platform() -> Platform {
    if cfg!(target_os = "macos") {
        return Platform::Darwin;
    }
    let proc_version = fs::read_to_string("/proc/version").unwrap_or_default();
    if is_wsl(std::env::var_os("WSL_DISTRO_NAME").is_some(), &proc_version) {
        Platform::Wsl
    } else {
        Platform::Linux
    }
}

fn is_wsl(distro_env_set: bool, proc_version: &str) -> bool {
    distro_env_set || proc_version.to_ascii_lowercase().contains("microsoft")
}
