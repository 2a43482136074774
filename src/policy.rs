//! Role-based access policy, isolated from HTTP.
//!
//! Routes map each gated operation to a [`Capability`] and ask
//! [`RoleSet::allows`] for an allow/deny answer. Roles are non-exclusive: a
//! user may hold several flags at once.

use crate::model::User;

/// The gated operations of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, update, and delete catalog products.
    ManageProducts,
    /// List every order in the system, with user details.
    ViewAllOrders,
    /// List orders scoped to a classroom. Any classroom may be queried; the
    /// requesting representative's own classroom is not checked.
    ViewClassOrders,
    /// Overwrite the status of any order.
    UpdateOrderStatus,
    /// User account CRUD and bulk deletion.
    ManageUsers,
    /// Replace the classroom registry.
    ManageClasses,
}

/// The role flags carried by a requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
    pub admin: bool,
    pub user_admin: bool,
    pub representative: bool,
}

impl RoleSet {
    pub fn of(user: &User) -> Self {
        Self {
            admin: user.is_admin,
            user_admin: user.is_user_admin,
            representative: user.is_representative,
        }
    }

    /// Allow/deny for a single capability.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageProducts => self.admin,
            Capability::ViewAllOrders
            | Capability::ViewClassOrders
            | Capability::UpdateOrderStatus => self.admin || self.representative,
            Capability::ManageUsers | Capability::ManageClasses => self.user_admin,
        }
    }
}
