//! End-to-end tests driving the router the way the client does.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use merenda::auth::hash_password;
use merenda::config::Config;
use merenda::model::{InsertProduct, InsertUser, ADMIN_CLASSROOM};
use merenda::routes;
use merenda::state::AppState;
use merenda::store::Store;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Builds a router over an in-memory store holding a bootstrap admin
/// (admin + user-admin flags), a representative for 3A, and one product.
fn test_app() -> Router {
    let mut store = Store::new();
    store.create_user(InsertUser {
        username: "admin@scuola.it".to_string(),
        password: hash_password("admin"),
        first_name: "Admin".to_string(),
        last_name: "Scuola".to_string(),
        class_room: ADMIN_CLASSROOM.to_string(),
        email: "admin@scuola.it".to_string(),
        is_admin: true,
        is_representative: false,
        is_user_admin: true,
    });
    store.create_user(InsertUser {
        username: "rep@scuola.it".to_string(),
        password: hash_password("rep"),
        first_name: "Rita".to_string(),
        last_name: "Verdi".to_string(),
        class_room: "3A".to_string(),
        email: "rep@scuola.it".to_string(),
        is_admin: false,
        is_representative: true,
        is_user_admin: false,
    });
    store.create_product(InsertProduct {
        name: "Pizza margherita".to_string(),
        description: "Trancio di pizza".to_string(),
        price: 2.0,
        category: "Pizze".to_string(),
        available: true,
    });

    let state = AppState::new(Config::default(), store);
    routes::router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn register_student(app: &Router, username: &str, class_room: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "password": "segreto1",
            "firstName": "Mario",
            "lastName": "Rossi",
            "classRoom": class_room,
            "email": username,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_products_are_public_and_category_filter_works() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, tutti) = send(&app, Method::GET, "/api/products?category=Tutti", None, None).await;
    assert_eq!(tutti.as_array().unwrap().len(), 1);

    let (_, none) = send(&app, Method::GET, "/api/products?category=Panini", None, None).await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/api/products/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_management_is_admin_only() {
    let app = test_app();
    let student = register_student(&app, "mario@scuola.it", "3A").await;
    let admin = login(&app, "admin@scuola.it", "admin").await;

    let product = json!({ "name": "Focaccia", "price": 1.5, "category": "Focacce" });

    let (status, _) = send(&app, Method::POST, "/api/products", None, Some(product.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(&student),
        Some(product.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) =
        send(&app, Method::POST, "/api/products", Some(&admin), Some(product)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let uri = format!("/api/products/{}", id);
    let (status, updated) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["available"], false);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_place_order_scenario() {
    // User in 3A orders 2 x 2.00 pizza for a total of 4.00.
    let app = test_app();
    let student = register_student(&app, "mario@scuola.it", "3A").await;

    let (status, order) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&student),
        Some(json!({
            "total": 4.0,
            "items": [ { "product": { "id": 1, "price": 2.0 }, "quantity": 2 } ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 4.0);

    let (status, orders) = send(&app, Method::GET, "/api/orders", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let items = orders[0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["price"], 2.0);
}

#[tokio::test]
async fn test_orders_require_authentication() {
    let app = test_app();
    let (status, _) = send(&app, Method::GET, "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some("not-a-token"),
        Some(json!({ "total": 1.0, "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_cart_rejected_with_field_errors() {
    let app = test_app();
    let student = register_student(&app, "mario@scuola.it", "3A").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&student),
        Some(json!({
            "total": -1.0,
            "items": [ { "product": { "id": 1, "price": 2.0 }, "quantity": 0 } ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
}

#[tokio::test]
async fn test_admin_order_views_and_status_updates() {
    let app = test_app();
    let student = register_student(&app, "mario@scuola.it", "3A").await;
    let rep = login(&app, "rep@scuola.it", "rep").await;

    send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&student),
        Some(json!({
            "total": 2.0,
            "items": [ { "product": { "id": 1, "price": 2.0 }, "quantity": 1 } ]
        })),
    )
    .await;

    // Students see neither admin view.
    let (status, _) = send(&app, Method::GET, "/api/admin/orders", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The representative sees all orders, with user summaries attached.
    let (status, orders) = send(&app, Method::GET, "/api/admin/orders", Some(&rep), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user"]["classRoom"], "3A");

    // Class lookup is case-insensitive, and open to any class.
    let (status, scoped) = send(
        &app,
        Method::GET,
        "/api/admin/orders/class/3a",
        Some(&rep),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scoped.as_array().unwrap().len(), 1);

    let (_, empty) = send(
        &app,
        Method::GET,
        "/api/admin/orders/class/5H",
        Some(&rep),
        None,
    )
    .await;
    assert!(empty.as_array().unwrap().is_empty());

    // Status overwrite accepts any of the four states (and is unchecked).
    let order_id = orders[0]["id"].as_i64().unwrap();
    let uri = format!("/api/admin/orders/{}/status", order_id);
    for status_name in ["processing", "completed", "cancelled", "pending"] {
        let (status, updated) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&rep),
            Some(json!({ "status": status_name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], status_name);
    }

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/admin/orders/999/status",
        Some(&rep),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_orders_date_filter() {
    let app = test_app();
    let student = register_student(&app, "mario@scuola.it", "3A").await;
    let admin = login(&app, "admin@scuola.it", "admin").await;

    send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&student),
        Some(json!({
            "total": 2.0,
            "orderDate": "2025-03-10T08:15:00Z",
            "items": [ { "product": { "id": 1, "price": 2.0 }, "quantity": 1 } ]
        })),
    )
    .await;

    let (status, hit) = send(
        &app,
        Method::GET,
        "/api/admin/orders?date=2025-03-10",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hit.as_array().unwrap().len(), 1);

    let (_, miss) = send(
        &app,
        Method::GET,
        "/api/admin/orders?date=2025-03-11",
        Some(&admin),
        None,
    )
    .await;
    assert!(miss.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/admin/orders?date=not-a-date",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_class_registry_endpoints() {
    let app = test_app();
    let admin = login(&app, "admin@scuola.it", "admin").await;
    let rep = login(&app, "rep@scuola.it", "rep").await;

    // The list is public (registration form needs it); the rep's 3A is
    // already in use so the derived list is just that.
    let (status, classes) = send(&app, Method::GET, "/api/admin/classes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(classes.as_array().unwrap().len(), 1);
    assert_eq!(classes[0], "3A");

    // Only the user-admin may replace it; the admin token carries both
    // flags here, the rep does not.
    let update = json!({ "classes": ["2B", "1A"] });
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/classes",
        Some(&rep),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        Method::POST,
        "/api/admin/classes",
        Some(&admin),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated.as_array().unwrap().len(), 2);
    assert_eq!(updated[0], "1A"); // sorted
}

#[tokio::test]
async fn test_registration_validates_classroom_against_registry() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "username": "x@scuola.it",
            "password": "segreto1",
            "firstName": "X",
            "lastName": "Y",
            "classRoom": "9Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e.as_str().unwrap().contains("classRoom")));
}

#[tokio::test]
async fn test_registration_cannot_grant_roles() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "username": "furbo@scuola.it",
            "password": "segreto1",
            "firstName": "Furbo",
            "lastName": "Furbi",
            "classRoom": "3A",
            "isAdmin": true,
            "isUserAdmin": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["isAdmin"], false);
    assert_eq!(body["user"]["isUserAdmin"], false);
}

#[tokio::test]
async fn test_user_admin_crud_and_password_stripping() {
    let app = test_app();
    let admin = login(&app, "admin@scuola.it", "admin").await;
    let rep = login(&app, "rep@scuola.it", "rep").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&rep), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, Method::GET, "/api/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    for user in users.as_array().unwrap() {
        assert!(user.get("password").is_none());
    }

    // Create a representative directly through the admin API.
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/admin/users",
        Some(&admin),
        Some(json!({
            "username": "rep2@scuola.it",
            "password": "segreto1",
            "firstName": "Rosa",
            "lastName": "Neri",
            "classRoom": "3A",
            "isRepresentative": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["isRepresentative"], true);
    let id = created["id"].as_i64().unwrap();

    // Update the classroom, then delete.
    let uri = format!("/api/admin/users/{}", id);
    let (status, updated) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "classRoom": "9Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "9Z is not a class: {}", updated);

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "firstName": "Rosanna" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["firstName"], "Rosanna");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_keeps_staff_and_cascades_orders() {
    let app = test_app();
    let admin = login(&app, "admin@scuola.it", "admin").await;
    let student = register_student(&app, "mario@scuola.it", "3A").await;

    send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&student),
        Some(json!({
            "total": 2.0,
            "items": [ { "product": { "id": 1, "price": 2.0 }, "quantity": 1 } ]
        })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/admin/users/students/all",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // The registered student and the seeded representative, not the admin.
    assert_eq!(body["count"], 2);

    let (status, users) = send(&app, Method::GET, "/api/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "admin@scuola.it");

    // The student's session is gone along with the account.
    let (status, _) = send(&app, Method::GET, "/api/orders", Some(&student), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_logout_cycle() {
    let app = test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "username": "admin@scuola.it", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "admin@scuola.it", "admin").await;
    let (status, me) = send(&app, Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin@scuola.it");
    assert!(me.get("password").is_none());

    let (status, _) = send(&app, Method::POST, "/api/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
