use proptest::prelude::*;
use shared_error::SharedError;

fn expected_message(messages: &[String]) -> String {
    match messages {
        [] => String::new(),
        [only] => only.clone(),
        many => many
            .iter()
            .enumerate()
            .map(|(i, m)| format!("error {i}: {m}"))
            .collect::<Vec<_>>()
            .join(" / "),
    }
}

proptest! {
    #[test]
    fn combined_message_numbers_entries(messages in prop::collection::vec("[a-z ]{1,12}", 0..8)) {
        let shared = SharedError::new();
        for message in &messages {
            shared.store(message.clone());
        }

        prop_assert_eq!(shared.to_string(), expected_message(&messages));
        prop_assert_eq!(shared.errors().len(), messages.len());
        prop_assert_eq!(shared.triggered(), !messages.is_empty());
    }

    #[test]
    fn reset_returns_previous_message(messages in prop::collection::vec("[a-z]{1,8}", 0..6)) {
        let shared = SharedError::new();
        for message in &messages {
            shared.store(message.as_str());
        }
        let before = shared.to_string();

        let previous = shared.reset();
        prop_assert_eq!(previous.map(|p| p.to_string()), (!messages.is_empty()).then_some(before));
        prop_assert!(!shared.triggered());
        prop_assert!(shared.reset().is_none());
    }
}
