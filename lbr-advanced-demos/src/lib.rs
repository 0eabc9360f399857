pub mod logging;
pub mod package_manifest;
