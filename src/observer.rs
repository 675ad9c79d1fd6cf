use once_cell::sync::Lazy;
use regex::Regex;

use crate::page::NodeSummary;

static LISTING_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)toc|chapter").expect("valid listing text regex"));
static LISTING_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)chap|toc").expect("valid listing target regex"));

/// Whether an inserted node looks like a freshly loaded content listing:
/// chapter/table-of-contents keywords in its text plus at least one anchor
/// pointing at a chapter- or TOC-like target. Pure predicate over the node
/// summary, separate from the rescan trigger.
pub fn is_listing_insertion(summary: &NodeSummary) -> bool {
    LISTING_TEXT.is_match(&summary.text)
        && summary
            .anchor_targets
            .iter()
            .any(|target| LISTING_TARGET.is_match(target))
}

/// A batch of insertions qualifies as soon as one node does; the rescan
/// runs once per batch no matter how many nodes match.
pub fn batch_triggers_rescan(batch: &[NodeSummary]) -> bool {
    batch.iter().any(is_listing_insertion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_and_anchor_together_qualify() {
        let summary = NodeSummary::new(
            "Chapter 12: The Long Road",
            vec!["/novel/123/chapter-12".to_string()],
        );
        assert!(is_listing_insertion(&summary));
    }

    #[test]
    fn keyword_without_matching_anchor_does_not_qualify() {
        let summary = NodeSummary::new("Chapter 12: The Long Road", vec!["/home".to_string()]);
        assert!(!is_listing_insertion(&summary));

        let no_anchor = NodeSummary::new("Table of contents", Vec::new());
        assert!(!is_listing_insertion(&no_anchor));
    }

    #[test]
    fn anchor_without_keyword_does_not_qualify() {
        let summary = NodeSummary::new("Recommended for you", vec!["/toc/456".to_string()]);
        assert!(!is_listing_insertion(&summary));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let summary = NodeSummary::new("FULL TOC", vec!["/NOVEL/CHAP-1".to_string()]);
        assert!(is_listing_insertion(&summary));
    }

    #[test]
    fn one_qualifying_node_is_enough_for_a_batch() {
        let batch = vec![
            NodeSummary::new("ad banner", Vec::new()),
            NodeSummary::new("Chapter list", vec!["/toc".to_string()]),
        ];
        assert!(batch_triggers_rescan(&batch));
        assert!(!batch_triggers_rescan(&batch[..1]));
    }
}
