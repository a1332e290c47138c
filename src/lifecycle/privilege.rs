//! Privilege check for server mode.

/// True when running with an effective uid of root.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::Uid::effective().is_root()
}

/// Administrator detection is not implemented off Unix; server mode refuses.
#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}
