//! Local asset provisioning: content-addressed storage, catalog descriptors,
//! and the checksum-gated download manager.

pub mod catalog;
pub mod downloader;
pub mod store;

pub use catalog::{load_catalog, AssetDescriptor, AssetKind};
pub use downloader::{DownloadError, DownloadManager, DownloadState, DownloadStatus, TaskHandle};
pub use store::AssetStore;
