pub mod download;
pub mod http;
pub mod refresh;
pub mod session_file;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use download::DownloadDir;
pub use http::ReqwestTransport;
pub use refresh::HttpTokenRefresher;
pub use session_file::FileSessionStore;
