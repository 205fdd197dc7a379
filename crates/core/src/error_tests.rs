use super::*;
use yare::parameterized;

#[parameterized(
    unauthorized = { ApiError::Unauthorized, 401, "UNAUTHORIZED" },
    invalid_id = { ApiError::InvalidSessionId, 400, "INVALID_SESSION_ID" },
    not_found = { ApiError::NotFound, 404, "NOT_FOUND" },
    attached = { ApiError::SessionAttached, 409, "SESSION_ATTACHED" },
    conflict = { ApiError::SessionConflict, 409, "SESSION_CONFLICT" },
    max_sessions = { ApiError::MaxSessions, 409, "MAX_SESSIONS" },
    rate_limited = { ApiError::RateLimited, 429, "RATE_LIMITED" },
)]
fn status_and_code_match_spec_table(err: ApiError, status: u16, code: &str) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.code(), code);
}

#[test]
fn internal_error_hides_detail_from_envelope() {
    let err = ApiError::Internal("tmux: permission denied /dev/pts/3".to_string());
    let env = err.envelope();
    assert_eq!(env.error, "INTERNAL");
    assert_eq!(env.message, err.to_string());
    assert_eq!(err.status_code(), 500);
}

#[test]
fn unauthorized_and_attached_have_ws_close_codes() {
    assert_eq!(ApiError::Unauthorized.ws_close_code(), 4401);
    assert_eq!(ApiError::SessionAttached.ws_close_code(), 4409);
    assert_eq!(ApiError::Internal("x".into()).ws_close_code(), 4500);
}
