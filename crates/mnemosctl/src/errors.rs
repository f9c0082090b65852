//! Exit codes for mnemosctl
//!
//! Values follow sysexits.h where one fits.

use mnemos_common::GatewayError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code for rejected local input (file type, feature count, credentials)
pub const EXIT_INVALID_INPUT: i32 = 2;

/// Exit code when the upstream replied with something we could not use
pub const EXIT_INVALID_RESPONSE: i32 = 65;

/// Exit code when the upstream is unreachable, timed out, or failing (5xx)
pub const EXIT_UPSTREAM_UNAVAILABLE: i32 = 69;

/// Exit code when the backend rejected the session
pub const EXIT_UNAUTHORIZED: i32 = 77;

/// Map an error chain to the process exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(gateway) = err.downcast_ref::<GatewayError>() {
        return gateway_exit_code(gateway);
    }
    EXIT_GENERAL_ERROR
}

pub fn gateway_exit_code(err: &GatewayError) -> i32 {
    match err {
        GatewayError::Network(_) | GatewayError::Timeout(_) => EXIT_UPSTREAM_UNAVAILABLE,
        GatewayError::UpstreamStatus { status, .. } if *status >= 500 => {
            EXIT_UPSTREAM_UNAVAILABLE
        }
        GatewayError::UpstreamStatus { .. } | GatewayError::Format(_) => EXIT_INVALID_RESPONSE,
        GatewayError::Unauthorized => EXIT_UNAUTHORIZED,
        GatewayError::InvalidInput(_) => EXIT_INVALID_INPUT,
        GatewayError::Io(_) => EXIT_GENERAL_ERROR,
    }
}
