//! Ownership rule for task mutation.

use crate::task::Task;
use crate::user::UserId;

/// Anything that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> UserId;
}

impl Owned for Task {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// Returns true when `requester` may update or delete `resource`.
///
/// Plain id equality, evaluated on every call. Reading is not governed by
/// this rule.
pub fn authorize<T: Owned + ?Sized>(requester: UserId, resource: &T) -> bool {
    requester == resource.owner_id()
}
