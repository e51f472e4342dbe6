use proptest::prelude::*;
use remedy::services::diff_normalizer::{normalize, normalize_with_stats};

/// One hunk body line: context, removal, or addition.
fn body_line() -> impl Strategy<Value = String> {
    (prop_oneof![Just(' '), Just('-'), Just('+')], "[a-z]{1,8}")
        .prop_map(|(marker, text)| format!("{marker}{text}"))
}

/// A hunk with arbitrary (usually wrong) declared counts.
fn hunk() -> impl Strategy<Value = (String, usize, usize)> {
    (
        1usize..500,
        0usize..50,
        0usize..50,
        prop::collection::vec(body_line(), 1..20),
    )
        .prop_map(|(start, old_declared, new_declared, body)| {
            let old = body.iter().filter(|l| !l.starts_with('+')).count();
            let new = body.iter().filter(|l| !l.starts_with('-')).count();
            let text = format!(
                "@@ -{start},{old_declared} +{start},{new_declared} @@\n{}\n",
                body.join("\n")
            );
            (text, old, new)
        })
}

proptest! {
    /// Property: normalizing twice is the same as normalizing once
    #[test]
    fn prop_normalize_is_idempotent(
        hunks in prop::collection::vec(hunk(), 0..5),
        noise in "[ -~\r\n]{0,80}"
    ) {
        let mut input = String::from("--- a/src/lib.rs\n+++ b/src/lib.rs\n");
        for (text, _, _) in &hunks {
            input.push_str(text);
        }
        input.push_str(&noise);

        let once = normalize(&input);
        let twice = normalize_with_stats(&once);
        prop_assert_eq!(&twice.text, &once);
        prop_assert_eq!(twice.repaired_headers, 0);
    }

    /// Property: every rewritten header matches its body
    #[test]
    fn prop_headers_match_bodies(hunks in prop::collection::vec(hunk(), 1..5)) {
        let input: String = hunks.iter().map(|(text, _, _)| text.as_str()).collect();
        let out = normalize_with_stats(&input);
        prop_assert_eq!(out.hunk_count, hunks.len());

        let headers: Vec<&str> = out.text.lines().filter(|l| l.starts_with("@@")).collect();
        prop_assert_eq!(headers.len(), hunks.len());
        for (header, (_, old, new)) in headers.iter().zip(&hunks) {
            let expected_old = format!(",{old} +");
            let expected_new = format!(",{new} @@");
            prop_assert!(header.contains(&expected_old), "{} lacks {}", header, expected_old);
            prop_assert!(header.ends_with(&expected_new), "{} lacks {}", header, expected_new);
        }
    }

    /// Property: output ends in exactly one newline and carries no carriage returns
    #[test]
    fn prop_output_line_endings(input in "[ -~\r\n]{0,200}") {
        let out = normalize(&input);
        prop_assert!(!out.contains('\r'));
        prop_assert!(out.ends_with('\n'));
        prop_assert!(out == "\n" || !out.ends_with("\n\n"));
    }
}

/// Text without any hunk header (no `@` can occur) passes through apart from line endings.
#[test_strategy::proptest]
fn headerless_text_is_only_trimmed(#[strategy("[a-z +-]{0,20}(\n[a-z +-]{1,20}){0,6}")] input: String) {
    let out = normalize_with_stats(&input);
    prop_assert_eq!(out.hunk_count, 0);
    prop_assert_eq!(out.repaired_headers, 0);
    prop_assert_eq!(out.text.trim_end(), input.trim_end());
}
