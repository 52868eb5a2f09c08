/*!
Ownership guard.

No tenant may read, restore or delete another tenant's archives. The
predicate is trivial equality (there is no sharing or delegation model), but
it is enforced independently at every call site that touches an archive entry:
the archive index on fetch/remove, and the restore engine again on the
document's embedded owner. The redundancy is intentional; neither check makes
the other removable.
*/

use crate::model::TenantId;

/// Whether `caller` owns a resource belonging to `resource_owner`.
pub fn owns(caller: &TenantId, resource_owner: &TenantId) -> bool {
    caller == resource_owner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owns_same_tenant() {
        let t = TenantId::new("t1");
        assert!(owns(&t, &TenantId::new("t1")));
    }

    #[test]
    fn test_rejects_other_tenant() {
        assert!(!owns(&TenantId::new("t1"), &TenantId::new("t2")));
    }
}
