//! Property tests over arbitrary complaint text
//!
//! Whatever the customer writes, a case must move forward through the
//! lifecycle graph, finish within the step budget and only be sent after
//! passing through READY_TO_SEND.


use casework::case::{Case, CaseState};
use casework::testing::ScriptedCollaborators;
use proptest::prelude::*;
use test_helpers::*;

const VOCABULARY: &[&str] = &[
    "unauthorized", "charge", "debit", "card", "credit", "mortgage", "fee", "late", "delay",
    "locked", "out", "password", "2fa", "online", "banking", "fraud", "scam", "stolen",
    "elderly", "suicide", "threat", "guarantee", "refund", "help", "please", "my", "the",
    "account", "yesterday", "john", "call", "555-123-4567", "me@example.com",
];

fn complaint_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 1..16).prop_map(|words| words.join(" "))
}

fn run(case: &mut Case) -> casework::ProcessOutcome {
    let config = test_config();
    let collaborators = ScriptedCollaborators::new(&config).build();
    tokio_test::block_on(orchestrator(&config).process(case, &collaborators))
        .expect("heuristic collaborators never fail")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn states_never_regress(text in complaint_text()) {
        let mut case = Case::new("C_PROP", text, "chat");
        run(&mut case);

        let mut previous = CaseState::Received;
        for event in case.events() {
            let state = CaseState::from_name(event.state_entered()).unwrap();
            prop_assert!(
                previous.can_transition_to(state),
                "{} -> {} in {:?}", previous, state, trail(&case)
            );
            previous = state;
        }
    }

    #[test]
    fn cases_terminate_within_budget(text in complaint_text()) {
        let mut case = Case::new("C_PROP", text, "chat");
        let outcome = run(&mut case);

        prop_assert!(outcome.is_terminal(), "ended as {:?}", outcome.termination);
        prop_assert!(outcome.steps <= test_config().orchestrator.max_total_steps);
        prop_assert!(case.events().iter().all(|e| e.step() >= 1 && e.step() <= outcome.steps));
        prop_assert!(case.events().windows(2).all(|w| w[0].step() <= w[1].step()));
    }

    #[test]
    fn sent_implies_reviewed_draft(text in complaint_text()) {
        let mut case = Case::new("C_PROP", text, "chat");
        run(&mut case);

        if case.final_response_sent {
            prop_assert!(case.draft.is_some());
            prop_assert!(case.has_visited(CaseState::ReadyToSend));
            prop_assert!(case.has_visited(CaseState::Sent));
            prop_assert!(case.routing_queue.is_some());
        }
        if case.has_visited(CaseState::Escalated) {
            prop_assert!(!case.final_response_sent);
        }
    }

    #[test]
    fn processing_is_deterministic(text in complaint_text()) {
        let mut first = Case::new("C_PROP", text.clone(), "chat");
        let mut second = Case::new("C_PROP", text, "chat");
        run(&mut first);
        run(&mut second);

        prop_assert_eq!(first.state, second.state);
        prop_assert_eq!(first.events().len(), second.events().len());
        for (a, b) in first.events().iter().zip(second.events()) {
            prop_assert!(a.same_record(b), "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn raw_contact_details_never_reach_normalized_text(text in complaint_text()) {
        let mut case = Case::new("C_PROP", text, "chat");
        run(&mut case);

        let normalized = case.normalized_text.unwrap_or_default();
        prop_assert!(!normalized.contains("me@example.com"));
        prop_assert!(!normalized.contains("555-123-4567"));
    }
}
