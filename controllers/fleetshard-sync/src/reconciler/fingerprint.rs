//! Change detection over the desired state
//!
//! MD5 over the JSON serialization of a `ManagedCentral`. Map-valued fields
//! are `BTreeMap`s, so equal content serializes to equal bytes.

use std::sync::{Mutex, PoisonError};

use crds::ManagedCentral;

use crate::error::ControllerError;

pub type Fingerprint = [u8; 16];

pub fn compute(central: &ManagedCentral) -> Result<Fingerprint, ControllerError> {
    let bytes = serde_json::to_vec(central).map_err(ControllerError::Fingerprint)?;
    Ok(md5::compute(bytes).0)
}

/// Fingerprint of the last desired state that reconciled successfully
#[derive(Debug, Default)]
pub struct FingerprintCache {
    last: Mutex<Option<Fingerprint>>,
}

impl FingerprintCache {
    /// True unless `current` equals the recorded fingerprint
    pub fn changed(&self, current: &Fingerprint) -> bool {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.as_ref() != Some(current)
    }

    /// Only called once a pass has fully succeeded
    pub fn record(&self, fingerprint: Fingerprint) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::managed_central;

    #[test]
    fn test_first_call_is_changed() {
        let cache = FingerprintCache::default();
        let fp = compute(&managed_central("abc")).unwrap();
        assert!(cache.changed(&fp));
    }

    #[test]
    fn test_equal_content_is_unchanged() {
        let cache = FingerprintCache::default();
        cache.record(compute(&managed_central("abc")).unwrap());

        assert!(!cache.changed(&compute(&managed_central("abc")).unwrap()));
    }

    #[test]
    fn test_any_field_change_is_detected() {
        let cache = FingerprintCache::default();
        let original = managed_central("abc");
        cache.record(compute(&original).unwrap());

        let mut sized = original.clone();
        sized
            .spec
            .central
            .resources
            .limits
            .insert("cpu".to_string(), "2".to_string());
        assert!(cache.changed(&compute(&sized).unwrap()));

        let mut promoted = original.clone();
        promoted.request_status = "ready".to_string();
        assert!(cache.changed(&compute(&promoted).unwrap()));

        let mut deleting = original;
        deleting.metadata.deletion_timestamp = Some("2024-01-01T00:00:00Z".to_string());
        assert!(cache.changed(&compute(&deleting).unwrap()));
    }
}
