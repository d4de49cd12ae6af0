use reqwest::Client;
use serde_json::{json, Value};

use crate::models::errors::AppError;
use crate::models::session::{Contact, ContactStatus, Match, User};

/// Thin client over the remote matchmaking API. Every call checks the HTTP
/// status explicitly before touching the body; server-supplied `message`
/// fields are surfaced in rejections.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let response = self
            .client
            .post(self.url("/api/user/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body = self.parse_json(response).await?;

        let payload = unwrap_payload(body, &["user", "data"]);
        if payload.is_null() {
            return Err(AppError::shape_mismatch("No user data received from server"));
        }

        serde_json::from_value(payload)
            .map_err(|e| AppError::shape_mismatch(format!("Malformed user payload: {}", e)))
    }

    pub async fn create_user(&self, payload: &Value) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.url("/api/user"))
            .json(payload)
            .send()
            .await?;
        self.expect_success(response).await
    }

    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let response = self
            .client
            .put(self.url("/api/user"))
            .json(user)
            .send()
            .await?;
        self.expect_success(response).await
    }

    pub async fn search_matches(&self, reference_ids: &[String]) -> Result<Vec<Match>, AppError> {
        let response = self
            .client
            .post(self.url("/api/user/search"))
            .json(&json!({ "referenceIds": reference_ids }))
            .send()
            .await?;
        let body = self.parse_json(response).await?;

        let payload = unwrap_payload(body, &["matches", "data"]);
        serde_json::from_value(payload)
            .map_err(|e| AppError::shape_mismatch(format!("Malformed match list: {}", e)))
    }

    pub async fn create_contact(
        &self,
        user_reference_id: &str,
        contact_reference_id: &str,
        status: Option<ContactStatus>,
    ) -> Result<Contact, AppError> {
        let mut payload = json!({
            "userReferenceId": user_reference_id,
            "contactReferenceId": contact_reference_id,
        });
        if let Some(status) = status {
            payload["status"] = serde_json::to_value(status)
                .map_err(|e| AppError::shape_mismatch(format!("Bad contact status: {}", e)))?;
        }

        let response = self
            .client
            .post(self.url("/api/contact"))
            .json(&payload)
            .send()
            .await?;
        let body = self.parse_json(response).await?;

        serde_json::from_value(body)
            .map_err(|e| AppError::shape_mismatch(format!("Malformed contact record: {}", e)))
    }

    /// Loads the contact records for a user. A server returning a single
    /// object instead of a list is tolerated.
    pub async fn contacts_for_user(&self, reference_id: &str) -> Result<Vec<Contact>, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/api/contact/{}", reference_id)))
            .send()
            .await?;
        let body = self.parse_json(response).await?;

        match serde_json::from_value::<Vec<Contact>>(body.clone()) {
            Ok(contacts) => Ok(contacts),
            Err(_) => serde_json::from_value::<Contact>(body)
                .map(|contact| vec![contact])
                .map_err(|e| AppError::shape_mismatch(format!("Malformed contact record: {}", e))),
        }
    }

    pub async fn upload_photo(
        &self,
        user_reference_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/api/photos/{}", user_reference_id)))
            .multipart(form)
            .send()
            .await?;
        let body = self.parse_json(response).await?;

        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| AppError::shape_mismatch("Photo upload response missing 'url'"))
    }

    pub async fn recommendations(&self, user_id: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/users/recommendations/{}", user_id)))
            .send()
            .await?;
        self.parse_json(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse_json(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let response = self.check_status(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::shape_mismatch(format!("Failed to parse response body: {}", e)))
    }

    async fn expect_success(&self, response: reqwest::Response) -> Result<(), AppError> {
        self.check_status(response).await.map(|_| ())
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| format!("HTTP {}", status));

        tracing::debug!("Server rejected request: {} ({})", message, status);
        Err(AppError::server_rejected(status.as_u16(), message))
    }
}

/// Unwraps a response body following the API's envelope precedence: the first
/// listed field that is present and non-null wins, otherwise the bare body is
/// the payload.
pub(crate) fn unwrap_payload(body: Value, fields: &[&str]) -> Value {
    for field in fields {
        if let Some(inner) = body.get(field) {
            if !inner.is_null() {
                return inner.clone();
            }
        }
    }
    body
}
