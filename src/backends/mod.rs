#[cfg(feature = "azure")]
pub mod azure;
pub mod local;
