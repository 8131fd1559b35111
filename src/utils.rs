use kube::{error::ErrorResponse, Error as KubeError};

pub fn is_not_found(error: &KubeError) -> bool {
    matches!(error, KubeError::Api(ErrorResponse { code: 404, .. }))
}

#[cfg(test)]
pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> KubeError {
    KubeError::Api(ErrorResponse {
        status: String::from("Failure"),
        message: message.into(),
        reason: reason.to_string(),
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_404_is_not_found() {
        assert!(is_not_found(&api_error(404, "NotFound", "gone")));
        assert!(!is_not_found(&api_error(403, "Forbidden", "nope")));
        assert!(!is_not_found(&api_error(409, "Conflict", "stale")));
    }
}
