//! Entity types and insert/update payloads.
//!
//! Wire names are camelCase to match the JSON API (`classRoom`, `orderDate`,
//! ...). The password hash never leaves the server: client-facing views go
//! through [`UserView`] and [`UserSummary`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four nominal order states. Stored as plain strings on [`Order`];
/// `update_order_status` accepts any string and enforces no transition graph.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const PROCESSING: &str = "processing";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";
}

/// Classroom label carried by staff accounts instead of a real classroom.
pub const ADMIN_CLASSROOM: &str = "Admin";

/// A registered account: student, representative, or staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub class_room: String,
    pub email: String,
    pub is_admin: bool,
    pub is_representative: bool,
    pub is_user_admin: bool,
}

/// Fields for creating a user. Role flags are independently settable; the
/// public registration route forces them off before calling the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub class_room: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_representative: bool,
    #[serde(default)]
    pub is_user_admin: bool,
}

/// Partial user update. `password`, when present, is the already-hashed form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub class_room: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_representative: Option<bool>,
    pub is_user_admin: Option<bool>,
}

/// Password-stripped user, the only form that crosses the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub class_room: String,
    pub email: String,
    pub is_admin: bool,
    pub is_representative: bool,
    pub is_user_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            class_room: user.class_room.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_representative: user.is_representative,
            is_user_admin: user.is_user_admin,
        }
    }
}

/// Short user descriptor embedded in admin order listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub class_room: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            class_room: user.class_room.clone(),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

/// An order header. `created_at` is stamped at insertion and never changes;
/// `order_date` is caller-supplied (defaulting to now) and is what the
/// by-date queries match on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub order_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InsertOrder {
    pub user_id: i64,
    pub total: f64,
    pub order_date: DateTime<Utc>,
}

/// A line entry within an order. `price` is the unit price at order time,
/// deliberately decoupled from the live product price so historical totals
/// stay stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct InsertOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub price: f64,
}
