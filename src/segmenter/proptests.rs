//! Property-based tests for reply segmentation

use super::*;
use proptest::prelude::*;

fn arb_label() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,12}".prop_map(|s| s.trim().to_string())
}

/// Non-blank body without brackets
fn arb_body() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 .,!?~^'-]{0,40}"
}

fn arb_separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n\n"), Just("\n"), Just(" ")]
}

fn arb_marker_suffix() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(": "), Just(":"), Just(" "), Just(":\n")]
}

fn arb_blocks() -> impl Strategy<Value = Vec<(String, String, &'static str, &'static str)>> {
    proptest::collection::vec(
        (arb_label(), arb_body(), arb_separator(), arb_marker_suffix()),
        0..8,
    )
}

fn render(blocks: &[(String, String, &'static str, &'static str)]) -> String {
    blocks
        .iter()
        .map(|(label, body, sep, suffix)| format!("{sep}[{label}]{suffix}{body}"))
        .collect()
}

proptest! {
    #[test]
    fn prop_well_formed_blocks_round_trip(blocks in arb_blocks()) {
        let text = render(&blocks);
        let out = segment(&text, PreamblePolicy::Drop);

        prop_assert_eq!(out.len(), blocks.len());
        for (utterance, (label, body, _, _)) in out.iter().zip(&blocks) {
            prop_assert_eq!(utterance.speaker.as_deref(), Some(label.as_str()));
            prop_assert_eq!(utterance.text.as_str(), body.trim());
        }
    }

    #[test]
    fn prop_text_without_brackets_yields_nothing(text in "[^\\[\\]]{0,200}") {
        prop_assert!(segment(&text, PreamblePolicy::Drop).is_empty());
    }

    #[test]
    fn prop_empty_markers_never_produce_output(labels in proptest::collection::vec(arb_label(), 0..6)) {
        let text: String = labels.iter().map(|l| format!("[{l}]: ")).collect();
        prop_assert!(segment(&text, PreamblePolicy::Drop).is_empty());
    }

    #[test]
    fn prop_utterances_are_trimmed_and_non_empty(text in "[a-zA-Z \\[\\]:\n]{0,120}") {
        for policy in [PreamblePolicy::Drop, PreamblePolicy::Surface] {
            for utterance in segment(&text, policy) {
                prop_assert!(!utterance.text.is_empty());
                prop_assert_eq!(utterance.text.trim(), utterance.text.as_str());
            }
        }
    }

    #[test]
    fn prop_surface_adds_at_most_one_leading_utterance(
        preamble in "[a-zA-Z ]{0,30}",
        blocks in arb_blocks(),
    ) {
        let text = format!("{preamble}{}", render(&blocks));
        let dropped = segment(&text, PreamblePolicy::Drop);
        let surfaced = segment(&text, PreamblePolicy::Surface);

        let expected_extra = usize::from(!preamble.trim().is_empty());
        prop_assert_eq!(surfaced.len(), dropped.len() + expected_extra);
        prop_assert_eq!(&surfaced[expected_extra..], &dropped[..]);
    }
}
