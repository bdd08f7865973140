//! Integration tests for error types

use bulkhead_errors::*;

#[test]
fn test_error_conversion() {
    let adm_err = AdmissionError::Cancelled {
        operation: "task submission".into(),
    };
    let err: Error = adm_err.into();
    assert!(matches!(err, Error::Admission(_)));
}

#[test]
fn test_error_display() {
    let err = ResourceError::OverReleased;
    assert_eq!(
        err.to_string(),
        "release called with no outstanding references"
    );
}

#[test]
fn test_error_clone() {
    let err = PoolError::SinkFailed {
        message: "sink rejected batch".into(),
    };
    let cloned = err.clone();
    assert_eq!(err.to_string(), cloned.to_string());
}

#[test]
fn test_cancellation_classification() {
    let err: Error = AdmissionError::Cancelled {
        operation: "permit".into(),
    }
    .into();
    assert!(err.is_cancellation());

    let err: Error = PoolError::Closed.into();
    assert!(!err.is_cancellation());
}
