//! HTTP client for the REST API
//!
//! Used for login, the initial page loads and the refetch fallback when a
//! pushed delta cannot be applied locally.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use shared::client::{LoginRequest, LoginResponse, OrderStatusRequest, TableStatusRequest};
use shared::models::{
    DashboardStats, DiningTable, MenuItem, Order, OrderStatus, Payment, TableStatus,
};

use crate::session::{SessionStore, TOKEN_KEY, USER_ROLE_KEY};
use crate::{ClientConfig, ClientError, ClientResult};

/// List endpoints answer either a bare array or `{ "data": [...] }`
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Stats may also come wrapped
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum StatsResponse {
    Wrapped { stats: DashboardStats },
    Bare(DashboardStats),
}

/// HTTP client for making requests to the POS backend.
///
/// The bearer token is read from the session on every request, so clones
/// follow login and logout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Current bearer token from the session
    pub fn token(&self) -> Option<String> {
        self.session.token()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request builder with the session's bearer token attached
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute(self.request(Method::GET, path)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.execute(self.request(Method::POST, path).json(body)).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            tracing::debug!(%status, body = %text, "API request failed");
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Validation(text))
                }
                _ => Err(ClientError::Internal(text)),
            };
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(format!("{e}")))
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        Ok(self.get::<ListResponse<T>>(path).await?.into_vec())
    }

    // ========== Auth API ==========

    /// Login and store the token + role in the session
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.post("/api/auth/login", &request).await?;

        self.session.set(TOKEN_KEY, &response.token)?;
        self.session.set(USER_ROLE_KEY, &response.user.role)?;
        tracing::info!(user = %response.user.username, role = %response.user.role, "Logged in");
        Ok(response)
    }

    /// Forget the token locally
    pub fn logout(&self) -> ClientResult<()> {
        self.session.clear()
    }

    // ========== Read API ==========

    pub async fn fetch_tables(&self) -> ClientResult<Vec<DiningTable>> {
        self.get_list("/api/tables").await
    }

    pub async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
        self.get_list("/api/orders").await
    }

    pub async fn fetch_menu(&self) -> ClientResult<Vec<MenuItem>> {
        self.get_list("/api/menu").await
    }

    pub async fn fetch_payments(&self) -> ClientResult<Vec<Payment>> {
        self.get_list("/api/payments").await
    }

    /// Dashboard counter snapshot
    pub async fn fetch_stats(&self) -> ClientResult<DashboardStats> {
        match self.get::<StatsResponse>("/api/dashboard/stats").await? {
            StatsResponse::Wrapped { stats } | StatsResponse::Bare(stats) => Ok(stats),
        }
    }

    // ========== Mutations ==========

    fn table_status_request(&self, table_id: i64, status: TableStatus) -> RequestBuilder {
        self.request(Method::PATCH, &format!("/api/tables/{table_id}/status"))
            .json(&TableStatusRequest { status })
    }

    fn order_status_request(&self, order_id: i64, status: OrderStatus) -> RequestBuilder {
        self.request(Method::PATCH, &format!("/api/orders/{order_id}/status"))
            .json(&OrderStatusRequest { status })
    }

    pub async fn update_table_status(
        &self,
        table_id: i64,
        status: TableStatus,
    ) -> ClientResult<DiningTable> {
        self.execute(self.table_status_request(table_id, status)).await
    }

    pub async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> ClientResult<Order> {
        self.execute(self.order_status_request(order_id, status)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;

    fn client(base_url: &str, session: Arc<dyn SessionStore>) -> HttpClient {
        HttpClient::new(&ClientConfig::new(base_url), session).unwrap()
    }

    fn body_json(request: &reqwest::Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_url_joins_paths() {
        let client = client("http://localhost:8000/", Arc::new(MemorySession::new()));
        assert_eq!(client.url("/api/tables"), "http://localhost:8000/api/tables");
        assert_eq!(client.url("api/menu"), "http://localhost:8000/api/menu");
    }

    #[test]
    fn test_list_response_accepts_both_shapes() {
        let bare: ListResponse<MenuItem> = serde_json::from_str(
            r#"[{"id":1,"name":"Soup","category":"starter","price":4.5}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: ListResponse<MenuItem> = serde_json::from_str(
            r#"{"data":[{"id":1,"name":"Soup","category":"starter","price":4.5}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_vec()[0].name, "Soup");
    }

    #[test]
    fn test_stats_response_accepts_both_shapes() {
        let wrapped: StatsResponse =
            serde_json::from_str(r#"{"stats":{"available_tables":2,"occupied_tables":1,"dirty_tables":0}}"#)
                .unwrap();
        let StatsResponse::Wrapped { stats } = wrapped else {
            panic!("expected wrapped stats");
        };
        assert_eq!(stats.available_tables, 2);
    }

    #[test]
    fn test_token_follows_session() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySession::with_token("abc"));
        let client = client("http://localhost:8000", Arc::clone(&session));
        let page_client = client.clone();
        assert_eq!(page_client.token().as_deref(), Some("abc"));

        client.logout().unwrap();
        assert!(page_client.token().is_none());
        let request = page_client.request(Method::GET, "/api/tables").build().unwrap();
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());

        session.set(TOKEN_KEY, "fresh").unwrap();
        let request = page_client.request(Method::GET, "/api/tables").build().unwrap();
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer fresh"
        );
    }

    #[test]
    fn test_status_patch_requests() {
        let client = client("http://pos.local", Arc::new(MemorySession::with_token("abc")));

        let request = client
            .table_status_request(3, TableStatus::Dirty)
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().as_str(), "http://pos.local/api/tables/3/status");
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "Bearer abc");
        assert_eq!(body_json(&request), serde_json::json!({"status": "dirty"}));

        let request = client
            .order_status_request(12, OrderStatus::Preparing)
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().path(), "/api/orders/12/status");
        assert_eq!(body_json(&request), serde_json::json!({"status": "preparing"}));
    }
}
