//! Operation-specific types.

pub mod app;
pub mod links;

pub use app::{
    Architecture, ArtifactType, Channel, Dist, LatestReleasesResponse, OperatingSystem,
    ReleaseInfo, UploadResponse,
};
pub use links::{LinkLocationResponse, ShortLinkResponse, ARG_LINK, MAX_LONG_LINK_BYTES};

/// Known resource names.
pub mod resources {
    pub const APP: &str = "app";
    pub const LINKS: &str = "links";
}

/// Known sub-verbs.
pub mod verbs {
    pub const OSX_NOTIFIER: &str = "osxnotifier";
    pub const ADD: &str = "add";
}

/// Security contexts used to authenticate operations.
pub mod contexts {
    pub const APPLICATION_PUT: &str = "application-put";
    pub const OSX_NOTIFIER_PUT: &str = "osx-notifier-put";
}
