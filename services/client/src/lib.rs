pub mod adapters;
pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod forms;
pub mod report;

pub use api::PriceApi;
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use feedback::StatusMessage;
