use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the platform refused a stream request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", content = "detail", rename_all = "kebab-case")]
pub enum AcquireReason {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    ConstraintsUnsatisfiable,
    InsecureContext,
    Other(String),
}

impl std::fmt::Display for AcquireReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireReason::PermissionDenied => f.write_str("permission-denied"),
            AcquireReason::DeviceNotFound => f.write_str("device-not-found"),
            AcquireReason::DeviceBusy => f.write_str("device-busy"),
            AcquireReason::ConstraintsUnsatisfiable => f.write_str("constraints-unsatisfiable"),
            AcquireReason::InsecureContext => f.write_str("insecure-context"),
            AcquireReason::Other(detail) => write!(f, "other: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// No camera API, or the API refuses to run without secure transport.
    #[error("{message}")]
    Unsupported {
        reason: Option<AcquireReason>,
        message: String,
    },
    #[error("{message}")]
    PermissionDenied {
        reason: AcquireReason,
        message: String,
    },
    /// Missing, busy, or unable to satisfy constraints. The relaxed request
    /// has already been tried by the time this is raised.
    #[error("{message}")]
    DeviceUnavailable {
        reason: AcquireReason,
        message: String,
    },
}

impl CaptureError {
    pub fn capability_missing() -> Self {
        CaptureError::Unsupported {
            reason: None,
            message: "Camera access is not supported on this platform. A secure (HTTPS) context is required."
                .to_string(),
        }
    }

    pub fn classify(reason: AcquireReason) -> Self {
        match reason {
            AcquireReason::PermissionDenied => CaptureError::PermissionDenied {
                reason,
                message: "Camera access denied. Allow camera access in the system settings."
                    .to_string(),
            },
            AcquireReason::DeviceNotFound => CaptureError::DeviceUnavailable {
                reason,
                message: "No camera found on this device.".to_string(),
            },
            AcquireReason::DeviceBusy => CaptureError::DeviceUnavailable {
                reason,
                message: "The camera is in use by another application.".to_string(),
            },
            AcquireReason::ConstraintsUnsatisfiable => CaptureError::DeviceUnavailable {
                reason,
                message: "The camera does not support the requested parameters.".to_string(),
            },
            AcquireReason::InsecureContext => CaptureError::Unsupported {
                reason: Some(reason),
                message: "The camera requires a secure connection (HTTPS).".to_string(),
            },
            AcquireReason::Other(_) => CaptureError::DeviceUnavailable {
                reason,
                message: "Could not access the camera.".to_string(),
            },
        }
    }

    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            CaptureError::Unsupported { .. } => CaptureErrorKind::Unsupported,
            CaptureError::PermissionDenied { .. } => CaptureErrorKind::PermissionDenied,
            CaptureError::DeviceUnavailable { .. } => CaptureErrorKind::DeviceUnavailable,
        }
    }

    pub fn reason(&self) -> Option<&AcquireReason> {
        match self {
            CaptureError::Unsupported { reason, .. } => reason.as_ref(),
            CaptureError::PermissionDenied { reason, .. }
            | CaptureError::DeviceUnavailable { reason, .. } => Some(reason),
        }
    }

    pub fn to_failure(&self) -> CaptureFailure {
        CaptureFailure {
            kind: self.kind(),
            reason: self.reason().cloned(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureErrorKind {
    Unsupported,
    PermissionDenied,
    DeviceUnavailable,
}

/// Serializable form of [`CaptureError`] handed to the webview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFailure {
    pub kind: CaptureErrorKind,
    pub reason: Option<AcquireReason>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_reason_codes() {
        assert_eq!(
            CaptureError::classify(AcquireReason::PermissionDenied).kind(),
            CaptureErrorKind::PermissionDenied
        );
        for reason in [
            AcquireReason::DeviceNotFound,
            AcquireReason::DeviceBusy,
            AcquireReason::ConstraintsUnsatisfiable,
            AcquireReason::Other("boom".into()),
        ] {
            assert_eq!(
                CaptureError::classify(reason).kind(),
                CaptureErrorKind::DeviceUnavailable
            );
        }
        let insecure = CaptureError::classify(AcquireReason::InsecureContext);
        assert_eq!(insecure.kind(), CaptureErrorKind::Unsupported);
        assert_eq!(insecure.reason(), Some(&AcquireReason::InsecureContext));
    }

    #[test]
    fn failure_carries_message_and_reason() {
        let failure = CaptureError::classify(AcquireReason::DeviceBusy).to_failure();
        assert_eq!(failure.message, "The camera is in use by another application.");
        assert_eq!(failure.reason, Some(AcquireReason::DeviceBusy));

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "deviceUnavailable");
        assert_eq!(json["reason"]["code"], "device-busy");
    }

    #[test]
    fn missing_capability_has_no_reason() {
        let err = CaptureError::capability_missing();
        assert_eq!(err.kind(), CaptureErrorKind::Unsupported);
        assert!(err.reason().is_none());
        assert!(err.to_string().contains("HTTPS"));
    }
}
