use proptest::prelude::*;

use selvage::interrupt::{Decision, ReviewAction};
use selvage::retry::{FailureKind, RetryDecision, RetryPolicy, classify, decide, repair};

proptest! {
    #[test]
    fn classify_is_case_insensitive(reason in "[ -~]{0,80}") {
        prop_assert_eq!(classify(&reason), classify(&reason.to_uppercase()));
    }

    #[test]
    fn transient_reasons_are_always_retried_first(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
        let reason = format!("{prefix}timeout{suffix}");
        prop_assert_eq!(classify(&reason), FailureKind::Transient);
        prop_assert!(matches!(
            decide(FailureKind::Transient, 1, &RetryPolicy::default()),
            RetryDecision::Retry { .. }
        ), "expected a retry decision");
    }

    #[test]
    fn retry_delays_double_until_exhaustion(max in 1u32..8) {
        let policy = RetryPolicy { max_attempts: max, ..RetryPolicy::default() };
        let mut previous = None;
        for attempts in 1..=max {
            match decide(FailureKind::Transient, attempts, &policy) {
                RetryDecision::Retry { delay } => {
                    if let Some(prev) = previous {
                        prop_assert_eq!(delay, prev * 2);
                    }
                    previous = Some(delay);
                }
                RetryDecision::GiveUp => prop_assert!(false, "gave up within budget"),
            }
        }
        prop_assert_eq!(
            decide(FailureKind::Transient, max + 1, &policy),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn repair_always_yields_a_value(reason in ".{0,40}", rows in 0u32..100) {
        let fallback = serde_json::json!({"rows": rows});
        let repaired = repair(Some(&fallback), &reason);
        prop_assert_eq!(&repaired["stale"], &serde_json::json!(true));
        let placeholder = repair(None, &reason);
        prop_assert_eq!(&placeholder["status"], &serde_json::json!("unavailable"));
    }

    #[test]
    fn arbitrary_action_tags_never_parse_as_approval(tag in "[a-z]{1,12}") {
        let raw = format!(r#"{{"action": {}}}"#, serde_json::json!(tag));
        match Decision::parse(&raw) {
            Ok(decision) => prop_assert!(matches!(
                decision.action,
                ReviewAction::Continue
                    | ReviewAction::Update
                    | ReviewAction::Feedback
                    | ReviewAction::Reject
                    | ReviewAction::Exit
            )),
            Err(_) => {}
        }
    }
}
