//! services/client/src/api.rs
//!
//! `PriceApi` is the single entry point for every user-facing action. It owns
//! the authenticated transport (and through it the session manager), encodes
//! request bodies, and decodes answers into domain types.
//!
//! Authentication and subscription-grant calls go over the raw transport so a
//! stale session can never leak a bearer token into them or trigger a refresh.

use bytes::Bytes;
use chrono::Utc;
use price_analysis_core::domain::{
    AdminUserRequest, Download, PriceAnalysisResult, Session, SubscriptionStatus, SupplierGroup,
    UploadStats, UserRequest,
};
use price_analysis_core::ports::{ApiRequest, ApiResponse, HttpTransport, PortError};
use price_analysis_core::{AuthenticatedTransport, SessionManager};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::adapters::wire::{
    AdminUserRequestRecord, AuthResponse, DetailedExportRow, GrantRequest, GrantResponse,
    HistoryExportRow, LoginRequest, PriceAnalysisRecord, RegisterRequest, SubscriptionStatusRecord,
    SupplierExportRequest, UploadStatsRecord, UserRequestRecord,
};
use crate::adapters::{FileSessionStore, HttpTokenRefresher, ReqwestTransport};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::forms::{GrantForm, LoginForm, RegisterForm};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const TEMPLATE_PATH: &str = "/template/download";
pub const SUPPLIER_TEMPLATE_PATH: &str = "/template/download-supplier";
pub const ANALYZE_PATH: &str = "/data/analyze-prices";
pub const UPLOAD_SUPPLIERS_PATH: &str = "/data/upload-supplier-data";
pub const EXPORT_ANALYSIS_PATH: &str = "/data/export-analysis";
pub const EXPORT_DETAILED_PATH: &str = "/data/export-detailed-analysis";
pub const EXPORT_RESULTS_PATH: &str = "/data/export-results";
pub const EXPORT_SUPPLIER_PATH: &str = "/data/export-supplier-results";
pub const EXPORT_INVOICE_PATH: &str = "/data/export-invoice";
pub const EXPORT_HISTORY_PATH: &str = "/data/export-history-to-excel";
pub const PROFILE_HISTORY_PATH: &str = "/profile/history";
pub const ADMIN_HISTORY_PATH: &str = "/admin/file-upload-history";
pub const SUBSCRIPTION_CHECK_PATH: &str = "/subscription/check";
pub const SUBSCRIPTION_GRANT_PATH: &str = "/subscription/grant";

//=========================================================================================
// The Facade
//=========================================================================================

#[derive(Clone)]
pub struct PriceApi {
    raw: Arc<dyn HttpTransport>,
    transport: AuthenticatedTransport,
}

impl PriceApi {
    pub fn new(raw: Arc<dyn HttpTransport>, sessions: Arc<SessionManager>) -> Self {
        let transport = AuthenticatedTransport::new(raw.clone(), sessions);
        Self { raw, transport }
    }

    /// Wires the reqwest transport, the refresh endpoint and the session file
    /// described by `config`, restoring any persisted session.
    pub async fn connect(config: &Config) -> ClientResult<Self> {
        let raw: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(&config.api_url, config.request_timeout)?);
        let refresher = Arc::new(HttpTokenRefresher::new(raw.clone()));
        let store = Arc::new(FileSessionStore::new(&config.session_path));
        let sessions = Arc::new(SessionManager::restore(store, refresher).await?);
        Ok(Self::new(raw, sessions))
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.transport.sessions()
    }

    //-------------------------------------------------------------------------------------
    // Authentication
    //-------------------------------------------------------------------------------------

    pub async fn login(&self, form: &LoginForm) -> ClientResult<Session> {
        form.validate()?;
        let body = serde_json::to_string(&LoginRequest {
            phone: &form.phone,
            password: &form.password,
        })?;
        let response = self.send_anonymous(ApiRequest::post_json(LOGIN_PATH, body)).await?;
        self.start_session(&response, None).await
    }

    pub async fn register(&self, form: &RegisterForm) -> ClientResult<Session> {
        form.validate()?;
        let tax_id = form.normalized_tax_id();
        let body = serde_json::to_string(&RegisterRequest {
            inn: &tax_id,
            full_name: form.full_name.trim(),
            phone: &form.phone,
            password: &form.password,
            email: form.email.as_deref(),
            address: form.address.as_deref(),
        })?;
        let response = self.send_anonymous(ApiRequest::post_json(REGISTER_PATH, body)).await?;
        self.start_session(&response, form.email.clone()).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.sessions().logout().await?;
        Ok(())
    }

    pub async fn session(&self) -> Option<Session> {
        self.sessions().current().await
    }

    async fn start_session(&self, response: &ApiResponse, email: Option<String>) -> ClientResult<Session> {
        let auth: AuthResponse = decode(response, "authentication response")?;
        let session = auth.into_session(email, Utc::now());
        self.sessions().login(session.clone()).await?;
        Ok(session)
    }

    //-------------------------------------------------------------------------------------
    // Templates and Uploads
    //-------------------------------------------------------------------------------------

    pub async fn download_template(&self) -> ClientResult<Download> {
        let response = self.transport.execute(ApiRequest::get(TEMPLATE_PATH)).await?;
        Ok(download("template.xlsx", response))
    }

    pub async fn download_supplier_template(&self) -> ClientResult<Download> {
        let response = self.transport.execute(ApiRequest::get(SUPPLIER_TEMPLATE_PATH)).await?;
        Ok(download("suppliers_template.xlsx", response))
    }

    /// Uploads a filled-in request sheet and returns the best price per line.
    pub async fn analyze_prices(&self, file_name: &str, bytes: Bytes) -> ClientResult<Vec<PriceAnalysisResult>> {
        let response = self
            .transport
            .execute(ApiRequest::post_file(ANALYZE_PATH, file_name, bytes))
            .await?;
        let records: Vec<PriceAnalysisRecord> = decode(&response, "analysis results")?;
        let results: Vec<_> = records.into_iter().map(PriceAnalysisRecord::to_domain).collect();
        info!(lines = results.len(), "Price analysis completed");
        Ok(results)
    }

    pub async fn upload_supplier_data(&self, file_name: &str, bytes: Bytes) -> ClientResult<UploadStats> {
        self.require_admin().await?;
        let response = self
            .transport
            .execute(ApiRequest::post_file(UPLOAD_SUPPLIERS_PATH, file_name, bytes))
            .await?;
        let stats: UploadStatsRecord = decode(&response, "upload statistics")?;
        let stats = stats.to_domain();
        if !stats.success {
            warn!(failed = stats.failed_records, "Supplier upload finished with errors");
        }
        Ok(stats)
    }

    //-------------------------------------------------------------------------------------
    // Exports
    //-------------------------------------------------------------------------------------

    pub async fn export_analysis(&self, results: &[PriceAnalysisResult]) -> ClientResult<Download> {
        let body: Vec<_> = results.iter().map(PriceAnalysisRecord::from_domain).collect();
        let response = self.post_json(EXPORT_ANALYSIS_PATH, &body).await?;
        Ok(download("analysis_results.xlsx", response))
    }

    /// Exports one past request from the profile history.
    pub async fn export_detailed_analysis(&self, request: &UserRequest) -> ClientResult<Download> {
        let body: Vec<_> = request
            .response_details
            .iter()
            .map(DetailedExportRow::from_domain)
            .collect();
        let response = self.post_json(EXPORT_DETAILED_PATH, &body).await?;
        let file_name = format!("analysis_{}.xlsx", request.timestamp.format("%Y-%m-%d"));
        Ok(download(&file_name, response))
    }

    pub async fn export_results(&self, results: &[PriceAnalysisResult]) -> ClientResult<Download> {
        let body: Vec<_> = results.iter().map(PriceAnalysisRecord::from_domain).collect();
        let response = self.post_json(EXPORT_RESULTS_PATH, &body).await?;
        Ok(download("results.xlsx", response))
    }

    pub async fn export_supplier_results(&self, group: &SupplierGroup) -> ClientResult<Download> {
        let response = self
            .post_json(EXPORT_SUPPLIER_PATH, &SupplierExportRequest::from_domain(group))
            .await?;
        Ok(download(&format!("supplier_{}.xlsx", group_file_stem(group)), response))
    }

    pub async fn export_invoice(&self, group: &SupplierGroup) -> ClientResult<Download> {
        let response = self
            .post_json(EXPORT_INVOICE_PATH, &SupplierExportRequest::from_domain(group))
            .await?;
        Ok(download(&format!("invoice_{}.xlsx", group_file_stem(group)), response))
    }

    /// Exports the lines a company uploaded. Returns `None` without calling the
    /// server when the request has no usable lines.
    pub async fn export_history(&self, request: &AdminUserRequest) -> ClientResult<Option<Download>> {
        self.require_admin().await?;
        if request.lines.is_empty() {
            return Ok(None);
        }
        let body: Vec<_> = request.lines.iter().map(HistoryExportRow::from_domain).collect();
        let response = self.post_json(EXPORT_HISTORY_PATH, &body).await?;
        let file_name = format!(
            "request_{}_{}.xlsx",
            request.full_name,
            request.timestamp.format("%Y-%m-%d")
        );
        Ok(Some(download(&file_name, response)))
    }

    //-------------------------------------------------------------------------------------
    // History and Subscriptions
    //-------------------------------------------------------------------------------------

    pub async fn profile_history(&self) -> ClientResult<Vec<UserRequest>> {
        let response = self.transport.execute(ApiRequest::get(PROFILE_HISTORY_PATH)).await?;
        let records: Vec<UserRequestRecord> = decode(&response, "profile history")?;
        Ok(records.into_iter().map(UserRequestRecord::to_domain).collect())
    }

    pub async fn admin_upload_history(&self) -> ClientResult<Vec<AdminUserRequest>> {
        self.require_admin().await?;
        let response = self.transport.execute(ApiRequest::get(ADMIN_HISTORY_PATH)).await?;
        let records: Vec<AdminUserRequestRecord> = decode(&response, "upload history")?;
        Ok(records.into_iter().map(AdminUserRequestRecord::to_domain).collect())
    }

    pub async fn check_subscription(&self) -> ClientResult<SubscriptionStatus> {
        let response = self.transport.execute(ApiRequest::get(SUBSCRIPTION_CHECK_PATH)).await?;
        let status: SubscriptionStatusRecord = decode(&response, "subscription status")?;
        Ok(status.to_domain())
    }

    /// Extends the subscription of the account registered under `form.email`.
    /// Returns the server's confirmation message, if it sent one.
    pub async fn grant_subscription(&self, form: &GrantForm) -> ClientResult<Option<String>> {
        form.validate()?;
        let body = serde_json::to_string(&GrantRequest {
            email: &form.email,
            minutes_to_add: form.minutes,
        })?;
        let response = self
            .send_anonymous(ApiRequest::post_json(SUBSCRIPTION_GRANT_PATH, body))
            .await?;

        // Some deployments answer with an empty body.
        let answer: GrantResponse = if response.body.is_empty() {
            GrantResponse::default()
        } else {
            decode(&response, "grant response")?
        };
        if answer.success == Some(false) {
            return Err(ClientError::Rejected(
                answer.message.unwrap_or_else(|| "Subscription was not extended".to_string()),
            ));
        }
        info!(minutes = form.minutes, "Subscription extended");
        Ok(answer.message)
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ClientResult<ApiResponse> {
        let json = serde_json::to_string(body)?;
        Ok(self.transport.execute(ApiRequest::post_json(path, json)).await?)
    }

    async fn send_anonymous(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let response = self.raw.send(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(PortError::Http {
                status: response.status,
                message: response.text(),
            }
            .into())
        }
    }

    async fn require_admin(&self) -> ClientResult<()> {
        match self.sessions().current().await {
            Some(session) if session.is_admin() => Ok(()),
            Some(_) => Err(ClientError::Forbidden("administrator access required".to_string())),
            None => Err(PortError::Unauthorized.into()),
        }
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse, what: &str) -> ClientResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| PortError::Decode(format!("malformed {}: {}", what, e)).into())
}

fn download(file_name: &str, response: ApiResponse) -> Download {
    Download {
        file_name: file_name.to_string(),
        bytes: response.body,
    }
}

/// Display name of a supplier group, preferring the parsed company name.
fn group_file_stem(group: &SupplierGroup) -> &str {
    group
        .supplier_info
        .as_ref()
        .map(|info| info.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(&group.supplier_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::refresh::REFRESH_PATH;
    use crate::adapters::testing::ScriptedTransport;
    use crate::forms::DEFAULT_GRANT_MINUTES;
    use chrono::{Duration, TimeZone};
    use price_analysis_core::analysis::group_by_supplier;
    use price_analysis_core::domain::{RequestedLine, Role};
    use price_analysis_core::ports::{RequestBody, SessionStore};
    use price_analysis_core::MemorySessionStore;
    use rust_decimal::Decimal;

    const ANALYSIS_JSON: &str = r#"[
        {"barcode":"1","quantity":2,"productName":"Milk","supplierName":"Acme LLC, 1234567890, Main St, 8(495)123-45-67",
         "unitPrice":10.5,"totalPrice":21,"requiresManualProcessing":false,"message":"ok"},
        {"barcode":"2","quantity":1,"productName":null,"supplierName":null,
         "unitPrice":null,"totalPrice":null,"requiresManualProcessing":true,"message":"not found"}
    ]"#;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemorySessionStore>,
        api: PriceApi,
    }

    fn session(token: &str, role: Role) -> Session {
        Session {
            access_token: token.into(),
            refresh_token: "refresh".into(),
            role,
            email: None,
            access_token_expires_at: Utc::now() + Duration::minutes(10),
        }
    }

    async fn harness(session: Option<Session>) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(match session {
            Some(session) => MemorySessionStore::with_session(session),
            None => MemorySessionStore::new(),
        });
        let refresher = Arc::new(HttpTokenRefresher::new(transport.clone()));
        let sessions = Arc::new(SessionManager::restore(store.clone(), refresher).await.unwrap());
        let api = PriceApi::new(transport.clone(), sessions);
        Harness { transport, store, api }
    }

    fn login_form() -> LoginForm {
        LoginForm {
            phone: "89991234567".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn login_persists_the_session() {
        let h = harness(None).await;
        h.transport.respond(
            LOGIN_PATH,
            200,
            r#"{"accessToken":"a-1","refreshToken":"r-1","role":"ADMIN","expiresIn":900000}"#,
        );

        let session = h.api.login(&login_form()).await.unwrap();

        assert_eq!(session.access_token, "a-1");
        assert!(session.is_admin());
        assert_eq!(h.store.load().await.unwrap(), Some(session));
        let sent = h.transport.requests_to(LOGIN_PATH);
        assert_eq!(
            sent[0].body,
            RequestBody::Json(r#"{"phone":"89991234567","password":"secret1"}"#.into())
        );
        assert_eq!(sent[0].bearer, None);
    }

    #[tokio::test]
    async fn invalid_form_is_never_sent() {
        let h = harness(None).await;
        let form = LoginForm { phone: "123".into(), password: "secret1".into() };

        let error = h.api.login(&form).await.unwrap_err();

        assert!(matches!(error, ClientError::Validation(_)));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_keeps_server_message() {
        let h = harness(None).await;
        h.transport.respond(LOGIN_PATH, 401, r#"{"message":"Bad credentials"}"#);

        let error = h.api.login(&login_form()).await.unwrap_err();

        assert!(matches!(
            error,
            ClientError::Port(PortError::Http { status: 401, ref message }) if message.contains("Bad credentials")
        ));
        assert!(h.api.session().await.is_none());
    }

    #[tokio::test]
    async fn register_sends_normalized_tax_id() {
        let h = harness(None).await;
        h.transport.respond(REGISTER_PATH, 200, r#"{"token":"a-1","role":"USER"}"#);
        let form = RegisterForm {
            tax_id: "7707-083-893".into(),
            full_name: " Acme ".into(),
            email: Some("buyer@example.com".into()),
            address: None,
            phone: "89991234567".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        };

        let session = h.api.register(&form).await.unwrap();

        assert_eq!(session.email.as_deref(), Some("buyer@example.com"));
        let sent = h.transport.requests_to(REGISTER_PATH);
        let RequestBody::Json(json) = &sent[0].body else {
            panic!("expected a JSON body");
        };
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["inn"], "7707083893");
        assert_eq!(value["fullName"], "Acme");
        assert!(value.get("address").is_none());
    }

    #[tokio::test]
    async fn analyze_uploads_file_and_decodes_results() {
        let h = harness(Some(session("a-1", Role::User))).await;
        h.transport.respond(ANALYZE_PATH, 200, ANALYSIS_JSON);

        let results = h
            .api
            .analyze_prices("request.xlsx", Bytes::from_static(b"xlsx"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].total_price, Some(Decimal::new(21, 0)));
        let sent = h.transport.requests_to(ANALYZE_PATH);
        assert_eq!(sent[0].bearer.as_deref(), Some("a-1"));
        assert!(matches!(
            &sent[0].body,
            RequestBody::Multipart { field, file_name, .. } if field == "file" && file_name == "request.xlsx"
        ));
    }

    #[tokio::test]
    async fn rejected_token_is_refreshed_through_the_refresh_endpoint() {
        let h = harness(Some(session("a-1", Role::User))).await;
        h.transport.respond(ANALYZE_PATH, 401, "");
        h.transport.respond(ANALYZE_PATH, 200, ANALYSIS_JSON);
        h.transport
            .respond(REFRESH_PATH, 200, r#"{"accessToken":"a-2","expiresIn":900000}"#);

        let results = h
            .api
            .analyze_prices("request.xlsx", Bytes::from_static(b"xlsx"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let sent = h.transport.requests_to(ANALYZE_PATH);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].bearer.as_deref(), Some("a-2"));
        assert_eq!(h.store.load().await.unwrap().unwrap().access_token, "a-2");
    }

    #[tokio::test]
    async fn malformed_results_are_a_decode_error() {
        let h = harness(Some(session("a-1", Role::User))).await;
        h.transport.respond(ANALYZE_PATH, 200, "<html>");

        let error = h
            .api
            .analyze_prices("request.xlsx", Bytes::from_static(b"xlsx"))
            .await
            .unwrap_err();

        assert!(matches!(error, ClientError::Port(PortError::Decode(_))));
    }

    #[tokio::test]
    async fn subscription_expiry_ends_the_session() {
        let h = harness(Some(session("a-1", Role::User))).await;
        h.transport.respond(PROFILE_HISTORY_PATH, 402, "");

        let error = h.api.profile_history().await.unwrap_err();

        assert!(matches!(error, ClientError::Port(PortError::SubscriptionExpired)));
        assert!(h.api.session().await.is_none());
        assert!(h.transport.requests_to(REFRESH_PATH).is_empty());
    }

    #[tokio::test]
    async fn admin_operations_require_admin_role() {
        let h = harness(Some(session("a-1", Role::User))).await;

        let error = h.api.admin_upload_history().await.unwrap_err();
        assert!(matches!(error, ClientError::Forbidden(_)));

        let error = h
            .api
            .upload_supplier_data("suppliers.xlsx", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(error, ClientError::Forbidden(_)));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn admin_history_decodes_company_requests() {
        let h = harness(Some(session("a-1", Role::Admin))).await;
        h.transport.respond(
            ADMIN_HISTORY_PATH,
            200,
            r#"[{"fullName":"Acme","inn":"1234567890","phone":"8999","timestamp":"2024-05-03T10:15:00Z",
                 "fileContent":[{"barcode":"1","quantity":3}]}]"#,
        );

        let history = h.api.admin_upload_history().await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tax_id, "1234567890");
        assert_eq!(history[0].lines, vec![RequestedLine { barcode: "1".into(), quantity: 3 }]);
    }

    #[tokio::test]
    async fn exports_are_named_after_their_content() {
        let h = harness(Some(session("a-1", Role::Admin))).await;
        for path in [EXPORT_ANALYSIS_PATH, EXPORT_SUPPLIER_PATH, EXPORT_INVOICE_PATH, EXPORT_HISTORY_PATH] {
            h.transport.respond(path, 200, "PK");
        }
        let records: Vec<PriceAnalysisRecord> = serde_json::from_str(ANALYSIS_JSON).unwrap();
        let results: Vec<_> = records.into_iter().map(PriceAnalysisRecord::to_domain).collect();
        let groups = group_by_supplier(&results);

        let analysis = h.api.export_analysis(&results).await.unwrap();
        assert_eq!(analysis.file_name, "analysis_results.xlsx");
        assert_eq!(analysis.bytes, Bytes::from_static(b"PK"));

        let supplier = h.api.export_supplier_results(&groups[0]).await.unwrap();
        assert_eq!(supplier.file_name, "supplier_Acme LLC.xlsx");
        let invoice = h.api.export_invoice(&groups[0]).await.unwrap();
        assert_eq!(invoice.file_name, "invoice_Acme LLC.xlsx");

        let request = AdminUserRequest {
            full_name: "Acme".into(),
            tax_id: "1234567890".into(),
            phone: String::new(),
            lines: vec![RequestedLine { barcode: "1".into(), quantity: 2 }],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap(),
        };
        let history = h.api.export_history(&request).await.unwrap().unwrap();
        assert_eq!(history.file_name, "request_Acme_2024-05-03.xlsx");

        let empty = AdminUserRequest { lines: Vec::new(), ..request };
        assert_eq!(h.api.export_history(&empty).await.unwrap(), None);
        assert_eq!(h.transport.requests_to(EXPORT_HISTORY_PATH).len(), 1);
    }

    #[tokio::test]
    async fn grant_reports_server_refusal() {
        let h = harness(None).await;
        let form = GrantForm { email: "user@example.com".into(), minutes: DEFAULT_GRANT_MINUTES };

        h.transport.respond(SUBSCRIPTION_GRANT_PATH, 200, r#"{"success":true}"#);
        h.transport
            .respond(SUBSCRIPTION_GRANT_PATH, 200, r#"{"success":false,"message":"User not found"}"#);

        assert_eq!(h.api.grant_subscription(&form).await.unwrap(), None);
        let error = h.api.grant_subscription(&form).await.unwrap_err();
        assert!(matches!(error, ClientError::Rejected(ref message) if message == "User not found"));

        let sent = h.transport.requests_to(SUBSCRIPTION_GRANT_PATH);
        assert_eq!(
            sent[0].body,
            RequestBody::Json(r#"{"email":"user@example.com","minutesToAdd":43200}"#.into())
        );
    }
}
