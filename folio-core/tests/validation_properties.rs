//! Property tests for topic name validation.

use proptest::prelude::*;

use folio_core::validation::{validate_topic_name, MAX_TOPIC_NAME_LENGTH};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn plain_names_within_limit_pass(name in "[A-Za-z][A-Za-z0-9 ]{0,150}") {
        // the generator can emit a trailing space, which is rejected
        prop_assume!(name == name.trim());
        prop_assert!(validate_topic_name(&name).is_ok());
    }

    #[test]
    fn any_forbidden_character_rejects_the_whole_name(
        prefix in "[A-Za-z]{0,20}",
        bad in prop::sample::select(vec!['<', '>', '[', ']', '{', '}', '|', '#', '\n', '\t']),
        suffix in "[A-Za-z]{1,20}",
    ) {
        let name = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(validate_topic_name(&name).is_err());
    }

    #[test]
    fn length_limit_is_exact(extra in 1usize..50) {
        let at_limit = "a".repeat(MAX_TOPIC_NAME_LENGTH);
        prop_assert!(validate_topic_name(&at_limit).is_ok());
        let over = "a".repeat(MAX_TOPIC_NAME_LENGTH + extra);
        prop_assert!(validate_topic_name(&over).is_err());
    }
}
