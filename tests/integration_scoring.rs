use assert_matches::assert_matches;
use typomaster::admission::{admit, RejectReason, Submission};
use typomaster::diff::{diff, diff_prefix};
use typomaster::metrics::compute_result_default;
use typomaster::validator::{detect_invalid_pattern, invalid_pattern, PatternFlag};

#[test]
fn scenario_short_exact_match() {
    let result = compute_result_default("cat", "cat", 60.0, false);
    assert_eq!(result.accuracy, 100);
    assert_eq!(result.errors, 0);
    assert_eq!(result.wpm, 0);
}

#[test]
fn scenario_single_substitution() {
    let result = compute_result_default("hello world", "hrllo world", 60.0, false);
    assert_eq!(result.errors, 1);
    assert_eq!(result.chars_typed, 11);
    assert_eq!(result.accuracy, 90);
    assert_eq!(result.error_details.substitutions, 1);
    assert_eq!(result.error_details.common.get(&('e', 'r')), Some(&1));
}

#[test]
fn scenario_repeated_char_rejected() {
    let typed = "aaaaaaaaaaaa";
    assert!(detect_invalid_pattern(typed));
    assert_eq!(invalid_pattern(typed), Some(PatternFlag::RepeatedRun));

    let result = compute_result_default(typed, typed, 60.0, true);
    assert_eq!(result.accuracy, 100);
    assert_matches!(admit(&result).reason, Some(RejectReason::InvalidPattern));
}

#[test]
fn scenario_single_char_words() {
    let typed = "a b c d e hello";
    assert!(detect_invalid_pattern(typed));
    assert_eq!(invalid_pattern(typed), Some(PatternFlag::SingleCharWords));
}

#[test]
fn scenario_fast_and_inaccurate() {
    let submission = Submission {
        text: "the quick brown fox".to_string(),
        wpm: 80,
        accuracy: 10,
        duration: 60.0,
        error_count: 30,
        characters: 100,
        error_details: Default::default(),
        invalid_pattern: false,
    };
    let admission = admit(&submission);
    assert!(!admission.accept);
    assert_eq!(admission.reason, Some(RejectReason::InconsistentSpeed));
}

#[test]
fn identity_diff_is_clean() {
    for text in ["", "a", "hello world", "Über straße, naïve café!"] {
        assert!(diff(text, text).is_clean(), "{text:?}");
        let result = compute_result_default(text, text, 12.5, false);
        assert_eq!(result.errors, 0);
        if !text.is_empty() {
            assert_eq!(result.accuracy, 100);
        }
    }
}

#[test]
fn diff_is_deterministic() {
    let reference = "The quick, brown fox jumps.";
    let typed = "teh quick brwon fox jumsp!";
    assert_eq!(diff(reference, typed), diff(reference, typed));
}

#[test]
fn error_total_never_drops_while_typing() {
    let cases = [
        ("the quick brown fox", "teh quikc brwn fox!!"),
        ("Hello, World.", "hello world,,"),
        ("abcdef", "badcfe"),
        ("short", "shrot and then some more"),
    ];
    for (reference, typed) in cases {
        let mut last = 0;
        let mut prefix = String::new();
        for c in typed.chars() {
            prefix.push(c);
            let total = diff_prefix(reference, &prefix).total;
            assert!(total >= last, "{reference:?} / {prefix:?}: {total} < {last}");
            last = total;
        }
    }
}

#[test]
fn accuracy_and_wpm_stay_in_range() {
    let references = ["the quick brown fox jumps over the lazy dog", "a", ""];
    let typed = [
        "the quick brown fox jumps over the lazy dog",
        "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz",
        "x",
        "",
        "the the the the the the the the the the the the the the",
    ];
    for reference in references {
        for t in typed {
            for secs in [0.0, 0.5, 1.0, 60.0] {
                let result = compute_result_default(reference, t, secs, detect_invalid_pattern(t));
                assert!(result.accuracy <= 100);
                assert!(result.wpm <= 220);
            }
        }
    }
}

#[test]
fn submission_json_roundtrip_keeps_admission() {
    let result = compute_result_default("hello world", "hello wrold", 30.0, false);
    let json = serde_json::to_string(&Submission::from_result(&result)).unwrap();
    let back: Submission = serde_json::from_str(&json).unwrap();
    assert_eq!(admit(&back), admit(&result));
    assert_eq!(back.error_details, result.error_details);
}
