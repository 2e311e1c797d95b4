//! Property-based tests for orgapi
//!
//! Invariants of the error taxonomy, the outcome type and path rendering
//! checked over generated inputs.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    use crate::catalog::render_path;
    use crate::error::{ApiError, ErrorKind};
    use crate::http::{HeaderMap, RetryPolicy};
    use crate::outcome::Outcome;

    // ===== Strategy Generators =====

    fn arb_error_status() -> impl Strategy<Value = u16> {
        prop_oneof![300u16..400, 400u16..500, 500u16..600]
    }

    fn arb_path_value() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 /?#&%~._-]{1,30}"
    }

    // ===== Error Classification Properties =====

    proptest! {
        /// Property: classification preserves the actual status code
        #[test]
        fn prop_classification_keeps_status(status in arb_error_status()) {
            let error = ApiError::from_status(status, &HeaderMap::new(), None, Duration::from_secs(1));
            prop_assert_eq!(error.status_code(), status);
        }

        /// Property: every 4xx other than 401/404/429 is a Validation error
        #[test]
        fn prop_client_errors_are_validation(status in 400u16..500) {
            prop_assume!(![401, 404, 429].contains(&status));
            let error = ApiError::from_status(status, &HeaderMap::new(), None, Duration::ZERO);
            prop_assert_eq!(error.kind(), &ErrorKind::Validation);
        }

        /// Property: a rate limit error always carries a delay
        #[test]
        fn prop_rate_limit_always_has_delay(
            header in proptest::option::of("[0-9a-z ]{0,6}"),
            fallback_ms in 0u64..10_000,
        ) {
            let mut headers = HeaderMap::new();
            if let Some(value) = header {
                headers.insert("retry-after", value.parse().unwrap());
            }
            let error = ApiError::from_status(429, &headers, None, Duration::from_millis(fallback_ms));
            prop_assert!(error.retry_after().is_some());
        }

        /// Property: the retry budget is honored for any setting
        #[test]
        fn prop_total_attempts_is_retries_plus_one(max_retries in 0u32..50) {
            let policy = RetryPolicy::new(max_retries, Duration::from_millis(1));
            prop_assert_eq!(policy.total_attempts(), max_retries + 1);
        }

        /// Property: an aggregate mirrors its first child
        #[test]
        fn prop_aggregate_mirrors_first_child(statuses in proptest::collection::vec(arb_error_status(), 1..10)) {
            let children: Vec<ApiError> = statuses
                .iter()
                .map(|&status| ApiError::from_status(status, &HeaderMap::new(), None, Duration::ZERO))
                .collect();

            let aggregate = ApiError::aggregate(children).unwrap();
            prop_assert_eq!(aggregate.status_code(), statuses[0]);
            prop_assert_eq!(aggregate.children().len(), statuses.len());
        }
    }

    // ===== Outcome Properties =====

    proptest! {
        /// Property: at most one slot of an outcome is populated
        #[test]
        fn prop_outcome_slots_are_exclusive(choice in 0u8..3, value in any::<i64>()) {
            let outcome = match choice {
                0 => Outcome::Data(value),
                1 => Outcome::Error(ApiError::generic(0, "x")),
                _ => Outcome::Empty,
            };
            let (data, error) = outcome.into_parts();
            prop_assert!(!(data.is_some() && error.is_some()));
        }
    }

    // ===== Path Rendering Properties =====

    proptest! {
        /// Property: a rendered value never introduces extra path segments
        #[test]
        fn prop_rendered_value_is_one_segment(value in arb_path_value()) {
            let rendered = render_path("members/{id}", Some(&json!({"id": value}))).unwrap();
            prop_assert_eq!(rendered.matches('/').count(), 1);
            prop_assert!(!rendered.contains(' '));
            prop_assert!(!rendered.contains('?'));
            prop_assert!(!rendered.contains('#'));
        }
    }
}
