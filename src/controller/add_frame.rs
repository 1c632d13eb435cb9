//! Outcome handling for the add-frame request.

use crate::host::{AddFrameErrorKind, HostError};
use crate::runtime::Toast;

pub const FRAME_ADDED_TITLE: &str = "Frame Added";
pub const FRAME_ADDED_DESCRIPTION: &str = "This frame has been successfully added to your client";
pub const FRAME_ADD_FAILED_TITLE: &str = "Frame Add Failed";
pub const UNCLASSIFIED_FAILURE: &str = "An error occurred";

/// User-facing message for a failed add.
///
/// Declines and manifest problems carry the host's own reason; anything else
/// (including transport failures) gets the generic message.
pub fn classify_add_frame_failure(error: &HostError) -> String {
    match error {
        HostError::AddFrame(e) => match e.kind {
            AddFrameErrorKind::RejectedByUser | AddFrameErrorKind::InvalidDomainManifest => {
                format!("Not added: {}", e.message)
            }
            AddFrameErrorKind::Other => UNCLASSIFIED_FAILURE.to_string(),
        },
        _ => UNCLASSIFIED_FAILURE.to_string(),
    }
}

/// The stored result message and toast for one add attempt.
pub(crate) fn add_frame_outcome(result: &Result<(), HostError>) -> (String, Toast) {
    match result {
        Ok(()) => (
            String::new(),
            Toast::success(FRAME_ADDED_TITLE, FRAME_ADDED_DESCRIPTION),
        ),
        Err(e) => {
            let message = classify_add_frame_failure(e);
            if message == UNCLASSIFIED_FAILURE {
                tracing::warn!("Add frame failed: {}", e);
            } else {
                tracing::info!("Add frame declined: {}", e);
            }
            let toast = Toast::destructive(FRAME_ADD_FAILED_TITLE, message.clone());
            (message, toast)
        }
    }
}
