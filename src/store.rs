//! Entity store: CRUD primitives over the four entity maps, with persistence.
//!
//! One `Store` is constructed at process start and handed to request handlers
//! through the shared state; there is no global singleton. Every mutating
//! operation synchronously rewrites the full JSON snapshot to disk (when the
//! store is file-backed). There is no partial-write recovery.

use crate::classes::ClassRegistry;
use crate::model::{
    InsertOrder, InsertOrderItem, InsertProduct, InsertUser, Order, OrderItem, Product, UpdateProduct,
    UpdateUser, User,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// The serialized snapshot: entity maps plus counters and the freed-id pool.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreData {
    users: BTreeMap<i64, User>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    next_user_id: i64,
    next_product_id: i64,
    next_order_id: i64,
    next_order_item_id: i64,
    freed_user_ids: BTreeSet<i64>,
}

impl StoreData {
    fn new() -> Self {
        Self {
            next_user_id: 1,
            next_product_id: 1,
            next_order_id: 1,
            next_order_item_id: 1,
            ..Self::default()
        }
    }
}

pub struct Store {
    data: StoreData,
    pub classes: ClassRegistry,
    path: Option<PathBuf>,
}

impl Store {
    /// Purely in-memory store, used by tests.
    pub fn new() -> Self {
        Self {
            data: StoreData::new(),
            classes: ClassRegistry::new(),
            path: None,
        }
    }

    /// File-backed store. Loads the previous snapshot if one exists,
    /// otherwise starts fresh and seeds the sample catalog.
    pub fn open(data_path: PathBuf, classes_path: PathBuf) -> Self {
        let loaded = fs::read_to_string(&data_path)
            .ok()
            .and_then(|json| serde_json::from_str::<StoreData>(&json).ok());

        let mut store = match loaded {
            Some(data) => {
                info!(
                    "loaded store snapshot: {} users, {} products, {} orders",
                    data.users.len(),
                    data.products.len(),
                    data.orders.len()
                );
                Self {
                    data,
                    classes: ClassRegistry::open(classes_path),
                    path: Some(data_path),
                }
            }
            None => {
                info!("no store snapshot at {}, starting fresh", data_path.display());
                let mut store = Self {
                    data: StoreData::new(),
                    classes: ClassRegistry::open(classes_path),
                    path: Some(data_path),
                };
                store.seed_sample_products();
                store
            }
        };
        // Counters can lag the snapshot if an old file is hand-edited.
        store.repair_counters();
        store
    }

    /// Seeds the catalog the school bar actually sells.
    pub fn seed_sample_products(&mut self) {
        let samples = [
            ("Panino al prosciutto", "Panino con prosciutto cotto e formaggio", 2.50, "Panini", true),
            ("Pizza margherita", "Trancio di pizza con pomodoro e mozzarella", 1.80, "Pizze", true),
            ("Focaccia al rosmarino", "Focaccia con olio e rosmarino", 1.50, "Focacce", true),
            ("Cornetto alla crema", "Cornetto sfogliato con ripieno alla crema", 1.20, "Dolci", true),
            ("Panino vegetariano", "Panino con verdure grigliate e formaggio", 2.20, "Panini", false),
            ("Acqua naturale 0.5L", "Bottiglia d'acqua naturale da 0.5 litri", 0.80, "Bevande", true),
        ];
        for (name, description, price, category, available) in samples {
            self.create_product(InsertProduct {
                name: name.to_string(),
                description: description.to_string(),
                price,
                category: category.to_string(),
                available,
            });
        }
    }

    fn repair_counters(&mut self) {
        let data = &mut self.data;
        if let Some(max) = data.users.keys().max() {
            data.next_user_id = data.next_user_id.max(max + 1);
        }
        if let Some(max) = data.products.keys().max() {
            data.next_product_id = data.next_product_id.max(max + 1);
        }
        if let Some(max) = data.orders.keys().max() {
            data.next_order_id = data.next_order_id.max(max + 1);
        }
        if let Some(max) = data.order_items.keys().max() {
            data.next_order_item_id = data.next_order_item_id.max(max + 1);
        }
    }

    /// Writes the full snapshot to disk. Called after every mutation; a
    /// failure is logged and the in-memory state stays authoritative.
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        match serde_json::to_string_pretty(&self.data) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("failed to persist store to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("failed to serialize store snapshot: {}", e),
        }
    }

    // User operations

    pub fn get_user(&self, id: i64) -> Option<User> {
        self.data.users.get(&id).cloned()
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.data
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
    }

    pub fn get_all_users(&self) -> Vec<User> {
        self.data.users.values().cloned().collect()
    }

    /// Assigns the smallest previously-freed user id if any, else the next
    /// counter value.
    pub fn create_user(&mut self, insert: InsertUser) -> User {
        let id = match self.data.freed_user_ids.pop_first() {
            Some(reused) => reused,
            None => {
                let id = self.data.next_user_id;
                self.data.next_user_id += 1;
                id
            }
        };
        let user = User {
            id,
            username: insert.username,
            password: insert.password,
            first_name: insert.first_name,
            last_name: insert.last_name,
            class_room: insert.class_room,
            email: insert.email,
            is_admin: insert.is_admin,
            is_representative: insert.is_representative,
            is_user_admin: insert.is_user_admin,
        };
        self.data.users.insert(id, user.clone());
        self.persist();
        user
    }

    pub fn update_user(&mut self, id: i64, update: UpdateUser) -> Option<User> {
        let user = self.data.users.get_mut(&id)?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(password) = update.password {
            user.password = password;
        }
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(class_room) = update.class_room {
            user.class_room = class_room;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(is_admin) = update.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_representative) = update.is_representative {
            user.is_representative = is_representative;
        }
        if let Some(is_user_admin) = update.is_user_admin {
            user.is_user_admin = is_user_admin;
        }
        let updated = user.clone();
        self.persist();
        Some(updated)
    }

    /// Deletes a user, cascading to all their orders and those orders' items,
    /// then returns the id to the reuse pool.
    pub fn delete_user(&mut self, id: i64) -> bool {
        if self.data.users.remove(&id).is_none() {
            return false;
        }
        let order_ids: Vec<i64> = self
            .data
            .orders
            .values()
            .filter(|order| order.user_id == id)
            .map(|order| order.id)
            .collect();
        for order_id in order_ids {
            self.data.orders.remove(&order_id);
            self.data
                .order_items
                .retain(|_, item| item.order_id != order_id);
        }
        self.data.freed_user_ids.insert(id);
        self.persist();
        true
    }

    // Product operations

    pub fn get_products(&self) -> Vec<Product> {
        self.data.products.values().cloned().collect()
    }

    /// "Tutti" (and its English counterpart "All") means no filter.
    pub fn get_products_by_category(&self, category: &str) -> Vec<Product> {
        if category == "Tutti" || category == "All" {
            return self.get_products();
        }
        self.data
            .products
            .values()
            .filter(|product| product.category == category)
            .cloned()
            .collect()
    }

    pub fn get_product(&self, id: i64) -> Option<Product> {
        self.data.products.get(&id).cloned()
    }

    pub fn create_product(&mut self, insert: InsertProduct) -> Product {
        let id = self.data.next_product_id;
        self.data.next_product_id += 1;
        let product = Product {
            id,
            name: insert.name,
            description: insert.description,
            price: insert.price,
            category: insert.category,
            available: insert.available,
        };
        self.data.products.insert(id, product.clone());
        self.persist();
        product
    }

    pub fn update_product(&mut self, id: i64, update: UpdateProduct) -> Option<Product> {
        let product = self.data.products.get_mut(&id)?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(available) = update.available {
            product.available = available;
        }
        let updated = product.clone();
        self.persist();
        Some(updated)
    }

    /// No cascade: order items keep their (now stale) product id and the
    /// price snapshot they were created with.
    pub fn delete_product(&mut self, id: i64) -> bool {
        let removed = self.data.products.remove(&id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    // Order operations

    pub fn get_orders(&self) -> Vec<Order> {
        self.data.orders.values().cloned().collect()
    }

    pub fn get_orders_by_user(&self, user_id: i64) -> Vec<Order> {
        self.data
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Same-day match on `order_date`, ignoring time of day.
    pub fn get_orders_by_date(&self, date: NaiveDate) -> Vec<Order> {
        self.data
            .orders
            .values()
            .filter(|order| order.order_date.date_naive() == date)
            .cloned()
            .collect()
    }

    /// Orders whose owning user's classroom matches `class_room`,
    /// case-insensitively. Orders of deleted users cannot occur (deletes
    /// cascade), but an order whose user is missing is simply skipped.
    pub fn get_orders_by_class(&self, class_room: &str) -> Vec<Order> {
        self.data
            .orders
            .values()
            .filter(|order| {
                self.data
                    .users
                    .get(&order.user_id)
                    .map(|user| user.class_room.eq_ignore_ascii_case(class_room))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn get_order(&self, id: i64) -> Option<Order> {
        self.data.orders.get(&id).cloned()
    }

    /// Inserts the order with status "pending" and stamps `created_at`.
    /// No referential check is performed against the user map.
    pub fn create_order(&mut self, insert: InsertOrder) -> Order {
        let id = self.data.next_order_id;
        self.data.next_order_id += 1;
        let order = Order {
            id,
            user_id: insert.user_id,
            status: crate::model::status::PENDING.to_string(),
            total: insert.total,
            created_at: Utc::now(),
            order_date: insert.order_date,
        };
        self.data.orders.insert(id, order.clone());
        self.persist();
        order
    }

    /// Unconditional overwrite of the status field. The store validates
    /// neither the value nor the transition.
    pub fn update_order_status(&mut self, id: i64, status: &str) -> Option<Order> {
        let order = self.data.orders.get_mut(&id)?;
        order.status = status.to_string();
        let updated = order.clone();
        self.persist();
        Some(updated)
    }

    // Order item operations

    pub fn get_order_items(&self, order_id: i64) -> Vec<OrderItem> {
        self.data
            .order_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn create_order_item(&mut self, insert: InsertOrderItem) -> OrderItem {
        let id = self.data.next_order_item_id;
        self.data.next_order_item_id += 1;
        let item = OrderItem {
            id,
            order_id: insert.order_id,
            product_id: insert.product_id,
            quantity: insert.quantity,
            price: insert.price,
        };
        self.data.order_items.insert(id, item.clone());
        self.persist();
        item
    }

    // Class registry

    pub fn available_classes(&mut self) -> Vec<String> {
        self.classes
            .available(self.data.users.values().map(|user| user.class_room.as_str()))
    }

    pub fn update_classes(&mut self, new_list: Vec<String>) -> Vec<String> {
        self.classes.update(new_list)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
