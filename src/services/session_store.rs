use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;

use crate::models::errors::AppError;
use crate::models::session::{Contact, ContactStatus, Match, Session, User};
use crate::services::api_client::ApiClient;
use crate::services::kv_store::ExpiringStore;
use crate::services::router::{Router, HOME_ROUTE, LOGIN_ROUTE};

/// Placeholder photo URL the backend serves for users without a real photo.
pub const PLACEHOLDER_AVATAR_URL: &str = "https://example.com/photo.jpg";

/// Local asset substituted whenever the placeholder URL shows up.
pub const DEFAULT_AVATAR_PATH: &str = "/images/avatar-default.png";

const STORAGE_KEY: &str = "user";

/// Owner of the client session: field mutation, match/contact reconciliation,
/// and every remote action that folds results back into the session. Each
/// mutation persists the full snapshot through the expiring store before
/// returning, so the session survives reloads within its TTL.
pub struct SessionStore {
    state: Arc<RwLock<Session>>,
    storage: Arc<ExpiringStore>,
    api: ApiClient,
    router: Arc<Router>,
}

impl SessionStore {
    pub fn new(
        state: Arc<RwLock<Session>>,
        storage: Arc<ExpiringStore>,
        api: ApiClient,
        router: Arc<Router>,
    ) -> Self {
        Self {
            state,
            storage,
            api,
            router,
        }
    }

    /// Loads a previously persisted session snapshot. A missing entry or a
    /// snapshot that no longer parses yields a fresh anonymous session;
    /// storage I/O failures propagate.
    pub async fn restore(storage: &ExpiringStore) -> Result<Session, AppError> {
        match storage.get(STORAGE_KEY).await? {
            Some(value) => match serde_json::from_value::<Session>(value) {
                Ok(session) => {
                    tracing::debug!(
                        "Restored session (authenticated: {})",
                        session.is_authenticated()
                    );
                    Ok(session)
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed persisted session: {}", e);
                    Ok(Session::default())
                }
            },
            None => Ok(Session::default()),
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn avatar(&self) -> Option<String> {
        self.state.read().await.avatar.clone()
    }

    pub async fn has_loaded_matches(&self) -> bool {
        self.state.read().await.has_loaded_matches
    }

    pub async fn set_user(&self, user: Option<User>) -> Result<(), AppError> {
        self.state.write().await.user = user;
        self.persist().await
    }

    /// Replaces the avatar, mapping the known placeholder URL to the bundled
    /// default asset. Anything else, including `None`, passes through.
    pub async fn set_avatar(&self, avatar: Option<String>) -> Result<(), AppError> {
        self.state.write().await.avatar = resolve_avatar(avatar);
        self.persist().await
    }

    pub async fn set_matches(&self, matches: Option<Vec<Match>>) -> Result<(), AppError> {
        self.state.write().await.matches = matches;
        self.persist().await
    }

    pub async fn set_has_loaded_matches(&self, flag: bool) -> Result<(), AppError> {
        self.state.write().await.has_loaded_matches = flag;
        self.persist().await
    }

    /// Appends a contact, lazily creating the list on first use.
    pub async fn add_contact(&self, contact: Contact) -> Result<(), AppError> {
        {
            let mut state = self.state.write().await;
            match state.contacts.as_mut() {
                Some(contacts) => contacts.push(contact),
                None => state.contacts = Some(vec![contact]),
            }
        }
        self.persist().await
    }

    /// Drops the match with the given id. Callers are expected to check
    /// `has_loaded_matches` first; an unloaded list is a precondition error.
    pub async fn remove_match(&self, id: i64) -> Result<(), AppError> {
        {
            let mut state = self.state.write().await;
            let matches = state
                .matches
                .as_mut()
                .ok_or_else(|| AppError::precondition_failed("Matches have not been loaded"))?;
            matches.retain(|m| m.id != id);
        }
        self.persist().await
    }

    /// Returns the matches not yet contacted, or `None` when no match data
    /// has been loaded. When the contact list is still unset and a user is
    /// present, contacts are loaded remotely first; a failed load degrades to
    /// an empty contact list rather than surfacing an error.
    pub async fn get_matches(&self) -> Result<Option<Vec<Match>>, AppError> {
        let (contacts_unset, user_reference_id) = {
            let state = self.state.read().await;
            (
                state.contacts.is_none(),
                state.user.as_ref().map(|u| u.reference_id.clone()),
            )
        };

        if contacts_unset {
            if let Some(reference_id) = user_reference_id {
                let contacts = match self.api.contacts_for_user(&reference_id).await {
                    Ok(contacts) => contacts,
                    Err(e) => {
                        tracing::warn!("Failed to load contacts, assuming none: {}", e);
                        Vec::new()
                    }
                };
                self.state.write().await.contacts = Some(contacts);
                self.persist().await?;
            }
        }

        let state = self.state.read().await;
        let matches = match state.matches.as_ref() {
            Some(matches) => matches,
            None => return Ok(None),
        };

        let filtered = match state.contacts.as_ref() {
            Some(contacts) if !contacts.is_empty() => matches
                .iter()
                .filter(|m| {
                    !contacts
                        .iter()
                        .any(|c| c.contact_reference_id == m.reference_id)
                })
                .cloned()
                .collect(),
            _ => matches.clone(),
        };

        Ok(Some(filtered))
    }

    /// Creates a new user record with status `ACTIVE`. Does not log in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        age: u32,
        address: &str,
        gender: &str,
    ) -> Result<(), AppError> {
        let payload = json!({
            "name": name,
            "email": email,
            "password": password,
            "age": age,
            "address": address,
            "gender": gender,
            "status": "ACTIVE",
        });
        self.api.create_user(&payload).await
    }

    /// Authenticates and installs the returned user, deriving the avatar from
    /// the user's photo and navigating home. Any failure clears the current
    /// user before the error is re-raised.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        match self.api.login(email, password).await {
            Ok(user) => {
                let photo = user.photo.clone();
                self.set_user(Some(user.clone())).await?;
                self.set_avatar(photo).await?;
                self.router.push(HOME_ROUTE).await;
                tracing::info!("User '{}' logged in", user.reference_id);
                Ok(user)
            }
            Err(e) => {
                if let Err(clear_err) = self.set_user(None).await {
                    tracing::warn!("Failed to clear session after login failure: {}", clear_err);
                }
                Err(e)
            }
        }
    }

    /// Clears the whole session and navigates to the login route. Problems
    /// while persisting the cleared state are logged, never raised.
    pub async fn logout(&self) {
        *self.state.write().await = Session::default();

        if let Err(e) = self.persist().await {
            tracing::warn!("Failed to persist cleared session: {}", e);
        }
        self.router.push(LOGIN_ROUTE).await;
        tracing::info!("Session cleared");
    }

    /// Fetches matches for a set of recommendation reference ids and stores
    /// them, latching `has_loaded_matches`. Remote failures degrade to an
    /// empty match list instead of re-raising.
    pub async fn get_matches_by_recommendations(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<Match>, AppError> {
        match self.api.search_matches(reference_ids).await {
            Ok(matches) => {
                {
                    let mut state = self.state.write().await;
                    state.matches = Some(matches.clone());
                    state.has_loaded_matches = true;
                }
                self.persist().await?;
                Ok(matches)
            }
            Err(e) => {
                tracing::error!("Error fetching recommendations: {}", e);
                self.state.write().await.matches = Some(Vec::new());
                self.persist().await?;
                Ok(Vec::new())
            }
        }
    }

    /// Pushes updated profile fields to the server. Local state is left
    /// untouched; callers refresh by logging in again.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.api.update_user(user).await
    }

    /// Uploads an avatar image for the logged-in user and installs the
    /// returned URL.
    pub async fn upload_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let reference_id = self
            .user()
            .await
            .map(|u| u.reference_id)
            .ok_or_else(|| {
                AppError::precondition_failed("Cannot upload an avatar without a logged-in user")
            })?;

        let url = self.api.upload_photo(&reference_id, file_name, bytes).await?;
        self.set_avatar(Some(url.clone())).await?;
        Ok(url)
    }

    pub async fn send_like(&self, reference_id: &str) -> Result<Contact, AppError> {
        self.send_contact(reference_id, None).await
    }

    pub async fn send_rejection(&self, reference_id: &str) -> Result<Contact, AppError> {
        self.send_contact(reference_id, Some(ContactStatus::Rejected)).await
    }

    async fn send_contact(
        &self,
        reference_id: &str,
        status: Option<ContactStatus>,
    ) -> Result<Contact, AppError> {
        let user_reference_id = self
            .user()
            .await
            .map(|u| u.reference_id)
            .ok_or_else(|| {
                AppError::precondition_failed("Cannot create a contact without a logged-in user")
            })?;

        let contact = self
            .api
            .create_contact(&user_reference_id, reference_id, status)
            .await?;
        self.add_contact(contact.clone()).await?;
        Ok(contact)
    }

    async fn persist(&self) -> Result<(), AppError> {
        let snapshot = self.state.read().await.clone();
        let value = serde_json::to_value(&snapshot)
            .map_err(|e| AppError::storage_failed(format!("Failed to serialize session: {}", e)))?;
        self.storage.set(STORAGE_KEY, value).await
    }
}

fn resolve_avatar(avatar: Option<String>) -> Option<String> {
    match avatar {
        Some(url) if url == PLACEHOLDER_AVATAR_URL => Some(DEFAULT_AVATAR_PATH.to_string()),
        other => other,
    }
}
