//! HTTP route definitions

use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::auth::tokens::{issue_pair, TokenPair};
use crate::cache::item_key;
use crate::http::middleware::require_auth;
use crate::store::{Item, ItemChanges, NewItem, NewUser, StoreError};
use crate::util::time::uptime_secs;

/// Maximum username length accepted at registration
const MAX_USERNAME_LENGTH: usize = 150;
/// Maximum item name length
const MAX_ITEM_NAME_LENGTH: usize = 200;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/register/", post(register_handler))
        .route("/login/", post(login_handler));

    // Protected routes (access token required)
    let protected_routes = Router::new()
        .route("/items/", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/:item_id/",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
    })
}

// ============================================================================
// Registration endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    message: &'static str,
}

async fn register_handler(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("Register user initiated");

    let mut errors = FieldErrors::new();
    let fields = validate_registration(&req, &mut errors);

    // Uniqueness pre-check only runs for an otherwise valid username
    if let Some((username, _, _)) = &fields {
        if state.users.get_by_username(username).await?.is_some() {
            push_error(
                &mut errors,
                "username",
                "A user with that username already exists.",
            );
        }
    }

    let Some((username, password, email)) = fields.filter(|_| errors.is_empty()) else {
        warn!("User registration failed");
        return Err(AppError::Validation(errors));
    };

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::Internal
    })?;

    match state
        .users
        .create(NewUser {
            username,
            password_hash,
            email,
        })
        .await
    {
        Ok(_) => {
            info!("User registered successfully");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "User registered successfully.",
                }),
            ))
        }
        // Lost the race against a concurrent registration with the same name
        Err(StoreError::Conflict(_)) => {
            warn!("User registration failed");
            let mut errors = FieldErrors::new();
            push_error(
                &mut errors,
                "username",
                "A user with that username already exists.",
            );
            Err(AppError::Validation(errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate registration fields, returning the unwrapped values when usable.
/// Field messages accumulate in `errors`.
fn validate_registration(
    req: &RegisterRequest,
    errors: &mut FieldErrors,
) -> Option<(String, String, String)> {
    let username = match req.username.as_deref() {
        None => {
            push_error(errors, "username", "This field is required.");
            None
        }
        Some("") => {
            push_error(errors, "username", "This field may not be blank.");
            None
        }
        Some(u) if u.len() > MAX_USERNAME_LENGTH => {
            push_error(
                errors,
                "username",
                "Ensure this field has no more than 150 characters.",
            );
            None
        }
        Some(u) if !u
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c)) =>
        {
            push_error(
                errors,
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
            None
        }
        Some(u) => Some(u.to_string()),
    };

    let password = match req.password.as_deref() {
        None => {
            push_error(errors, "password", "This field is required.");
            None
        }
        Some(p) if p.len() < MIN_PASSWORD_LENGTH => {
            push_error(
                errors,
                "password",
                "Ensure this field has at least 8 characters.",
            );
            None
        }
        Some(p) => Some(p.to_string()),
    };

    let email = match req.email.as_deref() {
        None => {
            push_error(errors, "email", "This field is required.");
            None
        }
        Some("") => {
            push_error(errors, "email", "This field may not be blank.");
            None
        }
        Some(e) if !is_valid_email(e) => {
            push_error(errors, "email", "Enter a valid email address.");
            None
        }
        Some(e) => Some(e.to_string()),
    };

    Some((username?, password?, email?))
}

/// Structural email check: one `@`, non-empty local part, dotted domain
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.splitn(2, '.').all(|label| !label.is_empty())
}

// ============================================================================
// Login endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_handler(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    info!("User login initiated");

    let user = state.users.get_by_username(&req.username).await?;

    // Unknown usernames and wrong passwords are indistinguishable to the caller
    let authenticated = user
        .as_ref()
        .is_some_and(|u| verify_password(&req.password, &u.password_hash));

    let Some(user) = user.filter(|_| authenticated) else {
        error!("Invalid credentials provided");
        return Err(AppError::Unauthorized);
    };

    info!("User authenticated successfully");

    let pair = issue_pair(user.id, &state.config).map_err(|e| {
        error!(error = %e, "Token issuance failed");
        AppError::Internal
    })?;
    debug!("Tokens generated");

    Ok(Json(pair))
}

// ============================================================================
// Item endpoints
// ============================================================================

/// API representation of an item - timestamps stay store-internal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quantity: Option<i32>,
    #[serde(default)]
    price: Option<Decimal>,
}

/// Validate item fields, applying the model defaults for quantity and price
fn validate_item_payload(
    payload: &ItemPayload,
) -> Result<(String, Option<String>, i32, Decimal), FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match payload.name.as_deref() {
        None => {
            push_error(&mut errors, "name", "This field is required.");
            None
        }
        Some("") => {
            push_error(&mut errors, "name", "This field may not be blank.");
            None
        }
        Some(n) if n.len() > MAX_ITEM_NAME_LENGTH => {
            push_error(
                &mut errors,
                "name",
                "Ensure this field has no more than 200 characters.",
            );
            None
        }
        Some(n) => Some(n.to_string()),
    };

    let quantity = payload.quantity.unwrap_or(0);
    if quantity < 0 {
        push_error(
            &mut errors,
            "quantity",
            "Ensure this value is greater than or equal to 0.",
        );
    }

    let price = payload.price.unwrap_or(Decimal::ZERO);
    if price < Decimal::ZERO {
        push_error(
            &mut errors,
            "price",
            "Ensure this value is greater than or equal to 0.",
        );
    }

    match name {
        Some(name) if errors.is_empty() => {
            Ok((name, payload.description.clone(), quantity, price))
        }
        _ => Err(errors),
    }
}

async fn create_item_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    info!("Creating new item");

    // Fast-path duplicate check; the store's unique constraint is the true
    // enforcement under concurrent creators
    if let Some(name) = payload.name.as_deref().filter(|n| !n.is_empty()) {
        if state.items.get_by_name(name).await?.is_some() {
            warn!("Item already exists");
            return Err(AppError::BadRequest("Item already exists.".to_string()));
        }
    }

    let (name, description, quantity, price) =
        validate_item_payload(&payload).map_err(AppError::Validation)?;

    match state
        .items
        .create(NewItem {
            name,
            description,
            quantity,
            price,
        })
        .await
    {
        Ok(item) => {
            info!(name = %item.name, "Item created successfully");
            Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
        }
        Err(StoreError::Conflict(_)) => {
            warn!("Item already exists");
            Err(AppError::BadRequest("Item already exists.".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_items_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    info!("Fetching all items");

    let items = state.items.list_all().await?;
    let response: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();

    debug!("Items fetched successfully");
    Ok(Json(response))
}

/// Single-item read with cache-aside: a cache hit is trusted as-is until its
/// TTL; any cache failure degrades to a store lookup.
async fn get_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemResponse>, AppError> {
    let key = item_key(item_id);

    match state.cache.get(&key).await {
        Ok(Some(cached)) => match serde_json::from_str::<ItemResponse>(&cached) {
            Ok(item) => {
                debug!(item_id, "Item fetched from cache");
                return Ok(Json(item));
            }
            Err(e) => warn!(item_id, error = %e, "Discarding undecodable cache entry"),
        },
        Ok(None) => {}
        Err(e) => warn!(item_id, error = %e, "Cache read failed, falling back to store"),
    }

    let Some(item) = state.items.get_by_id(item_id).await? else {
        error!(item_id, "Item not found");
        return Err(AppError::NotFound("Item not found.".to_string()));
    };

    let response = ItemResponse::from(item);
    match serde_json::to_string(&response) {
        Ok(serialized) => {
            if let Err(e) = state
                .cache
                .set(&key, &serialized, state.config.cache_ttl_secs)
                .await
            {
                warn!(item_id, error = %e, "Cache write failed");
            } else {
                debug!(item_id, "Item saved to cache");
            }
        }
        Err(e) => warn!(item_id, error = %e, "Failed to serialize item for cache"),
    }

    Ok(Json(response))
}

async fn update_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    AppJson(payload): AppJson<ItemPayload>,
) -> Result<Json<ItemResponse>, AppError> {
    if state.items.get_by_id(item_id).await?.is_none() {
        error!(item_id, "Item not found for update");
        return Err(AppError::NotFound("Item not found.".to_string()));
    }

    let (name, description, quantity, price) =
        validate_item_payload(&payload).map_err(AppError::Validation)?;

    match state
        .items
        .update(
            item_id,
            ItemChanges {
                name,
                description,
                quantity,
                price,
            },
        )
        .await
    {
        Ok(item) => {
            invalidate_cached_item(&state, item_id).await;
            info!(item_id, "Item updated successfully");
            Ok(Json(ItemResponse::from(item)))
        }
        Err(StoreError::Conflict(_)) => {
            error!(item_id, "Failed to update item: Invalid data");
            let mut errors = FieldErrors::new();
            push_error(&mut errors, "name", "item with this name already exists.");
            Err(AppError::Validation(errors))
        }
        Err(StoreError::NotFound) => {
            error!(item_id, "Item not found for update");
            Err(AppError::NotFound("Item not found.".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    match state.items.delete(item_id).await {
        Ok(()) => {
            invalidate_cached_item(&state, item_id).await;
            info!(item_id, "Item deleted successfully");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound) => {
            error!(item_id, "Item not found for deletion");
            Err(AppError::NotFound("Item not found.".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Drop an item's cache entry after a write, when configured to.
/// Best-effort: a failure here only extends staleness to the TTL bound.
async fn invalidate_cached_item(state: &AppState, item_id: i64) {
    if !state.config.cache_invalidate_on_write {
        return;
    }

    if let Err(e) = state.cache.delete(&item_key(item_id)).await {
        warn!(item_id, error = %e, "Cache invalidation failed");
    }
}

// ============================================================================
// Error handling
// ============================================================================

/// Field name -> validation messages, rendered as the 400 response body
pub type FieldErrors = BTreeMap<String, Vec<String>>;

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!(errors),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "Invalid credentials" }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Item not found.".to_string()),
            StoreError::Conflict(msg) => AppError::BadRequest(msg),
            other => {
                error!(error = %other, "Store operation failed");
                AppError::Internal
            }
        }
    }
}

/// Json extractor that reports malformed bodies as 400s with an `error` body
/// instead of the framework's plain-text 422
struct AppJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_representation_round_trips() {
        let item = ItemResponse {
            id: 7,
            name: "Widget".to_string(),
            description: Some("A widget".to_string()),
            quantity: 3,
            price: Decimal::new(1999, 2),
        };

        let serialized = serde_json::to_string(&item).unwrap();
        let deserialized: ItemResponse = serde_json::from_str(&serialized).unwrap();
        assert_eq!(item, deserialized);
    }

    #[test]
    fn blank_username_is_a_field_error() {
        let req = RegisterRequest {
            username: Some(String::new()),
            password: Some("password123".to_string()),
            email: Some("testuser@example.com".to_string()),
        };
        let mut errors = FieldErrors::new();
        assert!(validate_registration(&req, &mut errors).is_none());
        assert_eq!(
            errors.get("username"),
            Some(&vec!["This field may not be blank.".to_string()])
        );
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let req = RegisterRequest {
            username: None,
            password: None,
            email: None,
        };
        let mut errors = FieldErrors::new();
        assert!(validate_registration(&req, &mut errors).is_none());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["plainaddress", "user@", "@example.com", "user@nodot", "user@.com"] {
            assert!(!is_valid_email(email), "{email} should be invalid");
        }
        assert!(is_valid_email("testuser@example.com"));
    }

    #[test]
    fn item_defaults_apply_when_fields_are_omitted() {
        let payload = ItemPayload {
            name: Some("Widget".to_string()),
            description: None,
            quantity: None,
            price: None,
        };
        let (name, description, quantity, price) = validate_item_payload(&payload).unwrap();
        assert_eq!(name, "Widget");
        assert_eq!(description, None);
        assert_eq!(quantity, 0);
        assert_eq!(price, Decimal::ZERO);
    }

    #[test]
    fn negative_quantity_and_price_are_field_errors() {
        let payload = ItemPayload {
            name: Some("Widget".to_string()),
            description: None,
            quantity: Some(-1),
            price: Some(Decimal::new(-100, 2)),
        };
        let errors = validate_item_payload(&payload).unwrap_err();
        assert!(errors.contains_key("quantity"));
        assert!(errors.contains_key("price"));
    }

    #[test]
    fn missing_item_name_is_a_field_error() {
        let payload = ItemPayload {
            name: None,
            description: Some("No name".to_string()),
            quantity: Some(1),
            price: None,
        };
        let errors = validate_item_payload(&payload).unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&vec!["This field is required.".to_string()])
        );
    }
}
