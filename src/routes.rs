//! HTTP routes: auth, catalog, orders, and the admin surface.

use crate::auth::{self, bearer_token, hash_password, verify_password};
use crate::error::ApiError;
use crate::model::{
    InsertUser, Order, OrderItem, UpdateProduct, UpdateUser, UserSummary, UserView,
    ADMIN_CLASSROOM,
};
use crate::orders::{place_order, CartLine};
use crate::policy::{Capability, RoleSet};
use crate::state::AppState;
use crate::store::Store;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Login/registration response: the session token plus the user it belongs to.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// An order with its line items embedded.
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Admin order listing entry: items plus a summary of the owning user.
#[derive(Debug, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub total: f64,
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<CartItemRequest>,
}

/// One cart line as the client sends it: a product reference carrying the
/// unit price the client saw, plus a quantity.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product: CartProductRef,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CartProductRef {
    pub id: i64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ClassesUpdateRequest {
    pub classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub date: Option<String>,
}

/// Builds the application router with CORS and request tracing applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/user", get(me_handler))
        .route("/api/products", get(list_products_handler).post(create_product_handler))
        .route(
            "/api/products/{id}",
            get(get_product_handler)
                .patch(update_product_handler)
                .delete(delete_product_handler),
        )
        .route("/api/orders", get(list_orders_handler).post(create_order_handler))
        .route("/api/admin/orders", get(admin_orders_handler))
        .route("/api/admin/orders/class/{classroom}", get(admin_orders_by_class_handler))
        .route("/api/admin/orders/{id}/status", patch(update_order_status_handler))
        .route("/api/admin/classes", get(list_classes_handler).post(update_classes_handler))
        .route("/api/admin/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/api/admin/users/{id}",
            patch(update_user_handler).delete(delete_user_handler),
        )
        .route("/api/admin/users/students/all", delete(delete_students_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves the requester and checks the capability, honoring the
/// development bypass (which skips the role check, not authentication).
fn require(
    state: &AppState,
    headers: &HeaderMap,
    capability: Capability,
) -> Result<crate::model::User, ApiError> {
    let user = auth::current_user(state, headers)?;
    if state.config.auth_bypass {
        tracing::warn!("auth bypass active: skipping {:?} check", capability);
        return Ok(user);
    }
    if RoleSet::of(&user).allows(capability) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Shared validation for creating a user, from registration or the admin API.
fn validate_new_user(store: &mut Store, insert: &InsertUser) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if !insert.username.contains('@') {
        errors.push("username must be an email address".to_string());
    }
    if insert.password.is_empty() {
        errors.push("password must not be empty".to_string());
    }
    if store.get_user_by_username(&insert.username).is_some() {
        errors.push("username already exists".to_string());
    }
    // Non-staff accounts must belong to a registered classroom.
    if !insert.is_admin && !insert.is_user_admin {
        let classes = store.available_classes();
        if insert.class_room.is_empty() || !classes.contains(&insert.class_room) {
            errors.push("classRoom must be one of the available classes".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_fields("Invalid user data", errors))
    }
}

// GET /api/health

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

// POST /api/register - public registration; always creates a plain user

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(mut insert): Json<InsertUser>,
) -> Result<impl IntoResponse, ApiError> {
    // Privileged flags are only granted through the user-admin API.
    insert.is_admin = false;
    insert.is_representative = false;
    insert.is_user_admin = false;

    let mut store = state.store.write().expect("store lock poisoned");
    validate_new_user(&mut store, &insert)?;
    insert.password = hash_password(&insert.password);
    let user = store.create_user(insert);
    drop(store);

    let token = state.sessions.create(user.id);
    tracing::info!("registered user {} ({})", user.id, user.username);
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: UserView::from(&user),
        }),
    ))
}

// POST /api/login

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.read().expect("store lock poisoned");
    let user = store
        .get_user_by_username(&request.username)
        .ok_or(ApiError::Unauthorized)?;
    drop(store);

    if !verify_password(&request.password, &user.password) {
        return Err(ApiError::Unauthorized);
    }

    let token = state.sessions.create(user.id);
    Ok(Json(SessionResponse {
        token,
        user: UserView::from(&user),
    }))
}

// POST /api/logout

async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    Json(json!({ "message": "Logged out" }))
}

// GET /api/user - the authenticated user's own record

async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth::current_user(&state, &headers)?;
    Ok(Json(UserView::from(&user)))
}

// GET /api/products[?category=X]

async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> impl IntoResponse {
    let store = state.store.read().expect("store lock poisoned");
    let products = match query.category.as_deref() {
        Some(category) => store.get_products_by_category(category),
        None => store.get_products(),
    };
    Json(products)
}

// GET /api/products/{id}

async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.read().expect("store lock poisoned");
    let product = store.get_product(id).ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

// POST /api/products (Admin)

async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(insert): Json<crate::model::InsertProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageProducts)?;

    let mut errors = Vec::new();
    if insert.name.is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if !insert.price.is_finite() || insert.price < 0.0 {
        errors.push("price must be a non-negative number".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::validation_fields("Invalid product data", errors));
    }

    let mut store = state.store.write().expect("store lock poisoned");
    let product = store.create_product(insert);
    Ok((StatusCode::CREATED, Json(product)))
}

// PATCH /api/products/{id} (Admin)

async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(update): Json<UpdateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageProducts)?;

    if let Some(price) = update.price {
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::validation("price must be a non-negative number"));
        }
    }

    let mut store = state.store.write().expect("store lock poisoned");
    let product = store
        .update_product(id, update)
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

// DELETE /api/products/{id} (Admin)

async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageProducts)?;

    let mut store = state.store.write().expect("store lock poisoned");
    if !store.delete_product(id) {
        return Err(ApiError::NotFound("Product"));
    }
    Ok(Json(json!({ "message": "Product deleted" })))
}

// GET /api/orders - the authenticated user's own orders, items embedded

async fn list_orders_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth::current_user(&state, &headers)?;

    let store = state.store.read().expect("store lock poisoned");
    let orders: Vec<OrderWithItems> = store
        .get_orders_by_user(user.id)
        .into_iter()
        .map(|order| {
            let items = store.get_order_items(order.id);
            OrderWithItems { order, items }
        })
        .collect();
    Ok(Json(orders))
}

// POST /api/orders

async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth::current_user(&state, &headers)?;

    let lines: Vec<CartLine> = request
        .items
        .iter()
        .map(|item| CartLine {
            product_id: item.product.id,
            quantity: u32::try_from(item.quantity).unwrap_or(0),
            price: item.product.price,
        })
        .collect();

    let mut store = state.store.write().expect("store lock poisoned");
    let order = place_order(&mut store, user.id, request.total, request.order_date, &lines)?;
    tracing::info!("order {} placed by user {}", order.id, user.id);
    Ok((StatusCode::CREATED, Json(order)))
}

fn admin_order(store: &Store, order: Order) -> AdminOrder {
    let items = store.get_order_items(order.id);
    let user = store.get_user(order.user_id).map(|u| UserSummary::from(&u));
    AdminOrder { order, items, user }
}

// GET /api/admin/orders[?date=YYYY-MM-DD] (Admin/Representative)

async fn admin_orders_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ViewAllOrders)?;

    let store = state.store.read().expect("store lock poisoned");
    let orders = match query.date.as_deref() {
        Some(raw) => {
            let date: NaiveDate = raw
                .parse()
                .map_err(|_| ApiError::validation("date must be YYYY-MM-DD"))?;
            store.get_orders_by_date(date)
        }
        None => store.get_orders(),
    };
    let detailed: Vec<AdminOrder> = orders
        .into_iter()
        .map(|order| admin_order(&store, order))
        .collect();
    Ok(Json(detailed))
}

// GET /api/admin/orders/class/{classroom} (Admin/Representative)
//
// Any classroom may be requested; a representative's own classroom is not
// checked against the parameter.

async fn admin_orders_by_class_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(classroom): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ViewClassOrders)?;

    let store = state.store.read().expect("store lock poisoned");
    let detailed: Vec<AdminOrder> = store
        .get_orders_by_class(&classroom)
        .into_iter()
        .map(|order| admin_order(&store, order))
        .collect();
    Ok(Json(detailed))
}

// PATCH /api/admin/orders/{id}/status (Admin/Representative)

async fn update_order_status_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::UpdateOrderStatus)?;

    let mut store = state.store.write().expect("store lock poisoned");
    let order = store
        .update_order_status(id, &request.status)
        .ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(order))
}

// GET /api/admin/classes - public: the registration form needs the list

async fn list_classes_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut store = state.store.write().expect("store lock poisoned");
    Json(store.available_classes())
}

// POST /api/admin/classes (User-Admin)

async fn update_classes_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ClassesUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageClasses)?;

    let mut store = state.store.write().expect("store lock poisoned");
    Ok(Json(store.update_classes(request.classes)))
}

// GET /api/admin/users (User-Admin)

async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageUsers)?;

    let store = state.store.read().expect("store lock poisoned");
    let users: Vec<UserView> = store.get_all_users().iter().map(UserView::from).collect();
    Ok(Json(users))
}

// POST /api/admin/users (User-Admin) - may set role flags

async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(mut insert): Json<InsertUser>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageUsers)?;

    // Staff accounts without a classroom get the sentinel label.
    if (insert.is_admin || insert.is_user_admin) && insert.class_room.is_empty() {
        insert.class_room = ADMIN_CLASSROOM.to_string();
    }

    let mut store = state.store.write().expect("store lock poisoned");
    validate_new_user(&mut store, &insert)?;
    insert.password = hash_password(&insert.password);
    let user = store.create_user(insert);
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

// PATCH /api/admin/users/{id} (User-Admin)

async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(mut update): Json<UpdateUser>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageUsers)?;

    let mut store = state.store.write().expect("store lock poisoned");
    let existing = store.get_user(id).ok_or(ApiError::NotFound("User"))?;

    if let Some(username) = &update.username {
        if let Some(other) = store.get_user_by_username(username) {
            if other.id != id {
                return Err(ApiError::validation("username already exists"));
            }
        }
    }

    // Check the classroom invariant against the post-update flags.
    let is_admin = update.is_admin.unwrap_or(existing.is_admin);
    let is_user_admin = update.is_user_admin.unwrap_or(existing.is_user_admin);
    if !is_admin && !is_user_admin {
        let class_room = update
            .class_room
            .clone()
            .unwrap_or_else(|| existing.class_room.clone());
        let classes = store.available_classes();
        if class_room.is_empty() || !classes.contains(&class_room) {
            return Err(ApiError::validation(
                "classRoom must be one of the available classes",
            ));
        }
    }

    if let Some(password) = &update.password {
        update.password = Some(hash_password(password));
    }

    let user = store.update_user(id, update).ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserView::from(&user)))
}

// DELETE /api/admin/users/{id} (User-Admin)

async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageUsers)?;

    let mut store = state.store.write().expect("store lock poisoned");
    if !store.delete_user(id) {
        return Err(ApiError::NotFound("User"));
    }
    tracing::info!("deleted user {}", id);
    Ok(Json(json!({ "message": "User deleted" })))
}

// DELETE /api/admin/users/students/all (User-Admin)
//
// Removes every student and representative account; admin and user-admin
// accounts are kept.

async fn delete_students_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &headers, Capability::ManageUsers)?;

    let mut store = state.store.write().expect("store lock poisoned");
    let targets: Vec<i64> = store
        .get_all_users()
        .iter()
        .filter(|user| !user.is_admin && !user.is_user_admin)
        .map(|user| user.id)
        .collect();

    let mut count = 0;
    for id in &targets {
        if store.delete_user(*id) {
            count += 1;
        }
    }
    tracing::info!("bulk-deleted {} student/representative accounts", count);
    Ok(Json(json!({
        "message": "Students deleted",
        "count": count,
    })))
}
