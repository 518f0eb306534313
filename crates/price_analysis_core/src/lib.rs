pub mod analysis;
pub mod auth;
pub mod domain;
pub mod format;
pub mod history;
pub mod ports;
pub mod store;
pub mod supplier;

pub use auth::{AuthenticatedTransport, SessionManager};
pub use domain::{
    AdminUserRequest, AnalysisStats, CompanyGroup, Download, PriceAnalysisResult, RefreshedToken,
    RequestedLine, Role, Session, SubscriptionStatus, SupplierGroup, SupplierIdentity,
    SupplierRanking, UploadStats, UserRequest,
};
pub use ports::{
    ApiRequest, ApiResponse, HttpTransport, Method, PortError, PortResult, RequestBody,
    SessionStore, TokenRefresher,
};
pub use store::MemorySessionStore;
