use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use snooytbust_common::VideoId;

/// Matches the common YouTube URL shapes: `youtu.be/ID`, `watch?v=ID`,
/// `&v=ID`, `/v/ID`, `/v=ID`, `watch/ID`, `/embed/ID`, `/shorts/ID` and the
/// URL-encoded `watch%3Fv%3DID` found in redirect links. Capture 1 is the ID.
static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:/v/|/embed/|/shorts/|watch/|\?v=|&v=|youtu\.be/|/v=|watch%3Fv%3D)([A-Za-z0-9_-]{11,})",
    )
    .unwrap()
});

/// Extract YouTube video IDs from free text, deduplicated in order of
/// first appearance. Never fails; no match yields an empty vec.
///
/// Malformed URLs that still satisfy the 11-char floor are accepted; the
/// metadata lookup filters them out later.
pub fn extract_video_ids(text: &str) -> Vec<VideoId> {
    let mut seen = HashSet::new();
    YOUTUBE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| seen.insert(*id))
        .map(VideoId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(text: &str) -> Vec<String> {
        extract_video_ids(text)
            .into_iter()
            .map(|v| v.as_str().to_string())
            .collect()
    }

    #[test]
    fn empty_and_plain_text_yield_nothing() {
        assert!(extract_video_ids("").is_empty());
        assert!(extract_video_ids("no links here").is_empty());
    }

    #[test]
    fn same_id_in_two_shapes_collapses() {
        let text = "see https://www.youtube.com/watch?v=ABCDEFGHIJK and also https://youtu.be/ABCDEFGHIJK";
        assert_eq!(ids(text), vec!["ABCDEFGHIJK"]);
    }

    #[test]
    fn distinct_ids_kept_in_first_seen_order() {
        let text = "https://youtu.be/ZZZZZZZZZZZ then https://youtube.com/watch?v=AAAAAAAAAAA then https://youtu.be/ZZZZZZZZZZZ";
        assert_eq!(ids(text), vec!["ZZZZZZZZZZZ", "AAAAAAAAAAA"]);
    }

    #[test]
    fn recognises_url_shapes() {
        assert_eq!(ids("https://www.youtube.com/embed/dQw4w9WgXcQ"), vec!["dQw4w9WgXcQ"]);
        assert_eq!(ids("https://youtube.com/shorts/dQw4w9WgXcQ?feature=share"), vec!["dQw4w9WgXcQ"]);
        assert_eq!(ids("https://www.youtube.com/v/dQw4w9WgXcQ"), vec!["dQw4w9WgXcQ"]);
        assert_eq!(ids("https://youtube.com/watch?feature=x&v=dQw4w9WgXcQ"), vec!["dQw4w9WgXcQ"]);
        assert_eq!(
            ids("https://consent.youtube.com/m?continue=https://www.youtube.com/watch%3Fv%3DdQw4w9WgXcQ"),
            vec!["dQw4w9WgXcQ"]
        );
        assert_eq!(ids("[vid](https://youtu.be/dQw4w9WgXcQ)"), vec!["dQw4w9WgXcQ"]);
    }

    #[test]
    fn query_parameters_after_id_are_not_part_of_it() {
        assert_eq!(ids("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"), vec!["dQw4w9WgXcQ"]);
    }

    #[test]
    fn ids_shorter_than_floor_ignored() {
        assert!(extract_video_ids("https://youtu.be/short").is_empty());
    }

    #[test]
    fn longer_tokens_accepted_whole() {
        assert_eq!(ids("https://youtu.be/ABCDEFGHIJKLMN"), vec!["ABCDEFGHIJKLMN"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Output never repeats an ID, and follows first-occurrence order.
        #[test]
        fn prop_dedup_preserves_first_occurrence(
            picks in prop::collection::vec(0usize..4, 0..12),
            filler in "[ a-z.,]{0,8}",
        ) {
            let pool = ["AAAAAAAAAAA", "BBBBBBBBBBB", "CCCCCCCCCCC", "DDDDDDDDDDD"];
            let text: String = picks
                .iter()
                .map(|&i| format!("https://youtu.be/{} {}", pool[i], filler))
                .collect();

            let mut expected: Vec<&str> = Vec::new();
            for &i in &picks {
                if !expected.contains(&pool[i]) {
                    expected.push(pool[i]);
                }
            }

            prop_assert_eq!(ids(&text), expected);
        }
    }
}
