/// The distributor of this roomforge client.
///
/// Common values include `nixpkgs`, `homebrew` and `dev`.
pub const ROOMFORGE_DISTRIBUTOR: &str = if let Some(distro) = option_env!("ROOMFORGE_DISTRIBUTOR") {
    distro
} else {
    "unknown"
};
