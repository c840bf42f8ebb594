//! Revision counter kept as an annotation on the Central resource

use std::collections::BTreeMap;

use crds::Central;

use crate::error::ControllerError;

pub const REVISION_ANNOTATION: &str = "rhacs.redhat.com/revision";

/// Stamp a Central that is about to be created
pub fn initialize(central: &mut Central) {
    central
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(REVISION_ANNOTATION.to_string(), "1".to_string());
}

/// Bump the revision of an existing Central, returning the new value
pub fn increment(central: &mut Central) -> Result<u64, ControllerError> {
    let name = central.metadata.name.clone().unwrap_or_default();
    let annotations = central.metadata.annotations.get_or_insert_with(BTreeMap::new);
    let raw = annotations.get(REVISION_ANNOTATION).cloned();
    let next = raw
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .and_then(|revision| revision.checked_add(1))
        .ok_or(ControllerError::InvalidRevision { name, value: raw })?;

    annotations.insert(REVISION_ANNOTATION.to_string(), next.to_string());
    Ok(next)
}

pub fn current(central: &Central) -> Option<u64> {
    central
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(REVISION_ANNOTATION))
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::CentralSpec;

    #[test]
    fn test_initialize_then_increment() {
        let mut central = Central::new("central", CentralSpec::default());
        initialize(&mut central);
        assert_eq!(current(&central), Some(1));

        for expected in 2..=5 {
            assert_eq!(increment(&mut central).unwrap(), expected);
        }
        assert_eq!(current(&central), Some(5));
    }

    #[test]
    fn test_missing_annotation_is_an_error() {
        let mut central = Central::new("central", CentralSpec::default());
        let err = increment(&mut central).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidRevision { value: None, .. }));
    }

    #[test]
    fn test_malformed_annotation_is_an_error() {
        let mut central = Central::new("central", CentralSpec::default());
        central.metadata.annotations = Some(BTreeMap::from([(
            REVISION_ANNOTATION.to_string(),
            "one".to_string(),
        )]));

        let err = increment(&mut central).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidRevision { value: Some(v), .. } if v == "one"));
        assert_eq!(
            central.metadata.annotations.unwrap().get(REVISION_ANNOTATION).map(String::as_str),
            Some("one")
        );
    }

    #[test]
    fn test_exhausted_revision_is_an_error() {
        let max = u64::MAX.to_string();
        let mut central = Central::new("central", CentralSpec::default());
        central.metadata.annotations = Some(BTreeMap::from([(REVISION_ANNOTATION.to_string(), max.clone())]));

        let err = increment(&mut central).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidRevision { value: Some(v), .. } if v == max));
        assert_eq!(
            central.metadata.annotations.unwrap().get(REVISION_ANNOTATION),
            Some(&max)
        );
    }
}
