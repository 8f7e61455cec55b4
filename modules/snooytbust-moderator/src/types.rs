use std::fmt;

use snooytbust_common::ItemKind;

use crate::pipeline::ItemOutcome;

/// Running totals for a moderator session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModerationStats {
    pub posts_seen: u64,
    pub comments_seen: u64,
    pub links_checked: u64,
    pub lookups_failed: u64,
    pub blacklist_errors: u64,
    pub matches: u64,
    pub removals: u64,
    pub removal_failures: u64,
}

impl ModerationStats {
    pub fn record(&mut self, kind: ItemKind, outcome: &ItemOutcome) {
        match kind {
            ItemKind::Post => self.posts_seen += 1,
            ItemKind::Comment => self.comments_seen += 1,
        }
        self.links_checked += outcome.links as u64;
        self.lookups_failed += outcome.lookups_failed as u64;
        self.blacklist_errors += outcome.blacklist_errors as u64;
        self.matches += outcome.matches as u64;
        self.removals += outcome.removals as u64;
        self.removal_failures += outcome.removal_failures as u64;
    }
}

impl fmt::Display for ModerationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "posts_seen={} comments_seen={} links_checked={} lookups_failed={} blacklist_errors={} matches={} removals={} removal_failures={}",
            self.posts_seen,
            self.comments_seen,
            self.links_checked,
            self.lookups_failed,
            self.blacklist_errors,
            self.matches,
            self.removals,
            self.removal_failures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_folds_outcomes() {
        let mut stats = ModerationStats::default();
        stats.record(
            ItemKind::Comment,
            &ItemOutcome {
                links: 2,
                matches: 1,
                removals: 1,
                ..Default::default()
            },
        );
        stats.record(ItemKind::Post, &ItemOutcome::default());

        assert_eq!(stats.posts_seen, 1);
        assert_eq!(stats.comments_seen, 1);
        assert_eq!(stats.links_checked, 2);
        assert_eq!(stats.removals, 1);
        assert!(stats.to_string().contains("removals=1"));
    }
}
