// Adapters layer: concrete implementations for external systems (local disk, HTTP).

pub mod http;
pub mod storage;

pub use http::{DownloadSettings, HttpDownloader};
pub use storage::LocalStorage;
