use super::contract::Ledger;
use ethers::types::{Address, Bytes, U256};
use futures::future;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single uploaded photo as recorded on the ledger. The id is assigned by
/// the chain and never reused; metadata is immutable after creation and only
/// the owner history grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub data: Bytes,
    /// Every owner the record has had, oldest first. The first entry is the
    /// creator.
    pub owner_history: Vec<Address>,
    pub file_name: String,
    pub location: String,
    pub caption: String,
    pub uploaded_at: U256,
}

impl Record {
    pub fn current_owner(&self) -> Option<&Address> {
        self.owner_history.last()
    }
}

/// Newest-first collection of records. Cloning is cheap; reconciliation
/// produces a fresh snapshot and never edits records shared with snapshots
/// held elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    records: Vec<Arc<Record>>,
}

impl Feed {
    pub fn from_records(records: Vec<Record>) -> Self {
        Feed {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }

    pub fn get(&self, token_id: u64) -> Option<&Arc<Record>> {
        self.records.iter().find(|record| record.id == token_id)
    }

    pub fn contains(&self, token_id: u64) -> bool {
        self.get(token_id).is_some()
    }

    /// Prepends a freshly confirmed record. Keeps ids unique: reconciling the
    /// same confirmation twice leaves the feed as it was.
    pub fn with_uploaded(&self, record: Record) -> Feed {
        if self.contains(record.id) {
            debug!("record {} already in feed, keeping existing entry", record.id);
            return self.clone();
        }
        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.push(Arc::new(record));
        records.extend(self.records.iter().cloned());
        Feed { records }
    }

    /// Appends a confirmed new owner to one record's history. A target id
    /// that is not in the feed (not loaded yet, for instance) is a no-op.
    pub fn with_owner_appended(&self, token_id: u64, new_owner: Address) -> Feed {
        if !self.contains(token_id) {
            debug!("transfer of record {} not in feed, nothing to update", token_id);
            return self.clone();
        }
        let records = self
            .records
            .iter()
            .map(|record| {
                if record.id == token_id {
                    let mut updated = record.as_ref().clone();
                    updated.owner_history.push(new_owner);
                    Arc::new(updated)
                } else {
                    Arc::clone(record)
                }
            })
            .collect();
        Feed { records }
    }
}

/// Builds the initial feed: every record fetched by id from the highest down
/// to 1, all fetches in flight at once. Any single failure fails the whole
/// load; no partial feed is ever produced.
pub async fn load_feed(ledger: &dyn Ledger) -> anyhow::Result<Feed> {
    let total = ledger.total_count().await?;
    if total == 0 {
        return Ok(Feed::default());
    }
    let fetches: Vec<_> = (1..=total)
        .rev()
        .map(|token_id| ledger.photo(token_id))
        .collect();
    let records = future::try_join_all(fetches).await?;
    Ok(Feed::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{owner, record, FakeLedger};

    fn feed_of(ids: &[u64]) -> Feed {
        Feed::from_records(ids.iter().map(|id| record(*id, owner(*id))).collect())
    }

    fn ids(feed: &Feed) -> Vec<u64> {
        feed.iter().map(|r| r.id).collect()
    }

    #[test]
    fn upload_prepends_and_keeps_the_rest_in_order() {
        let feed = feed_of(&[3, 2, 1]);
        let next = feed.with_uploaded(record(4, owner(4)));

        assert_eq!(ids(&next), vec![4, 3, 2, 1]);
        assert_eq!(ids(&feed), vec![3, 2, 1]);
    }

    #[test]
    fn duplicate_upload_confirmation_is_a_noop() {
        let feed = feed_of(&[3, 2, 1]);
        let next = feed.with_uploaded(record(2, owner(9)));

        assert_eq!(ids(&next), vec![3, 2, 1]);
        assert_eq!(next.get(2).unwrap().owner_history, vec![owner(2)]);
    }

    #[test]
    fn owner_append_touches_exactly_one_record() {
        let feed = feed_of(&[3, 2, 1]);
        let next = feed.with_owner_appended(2, owner(42));

        let updated = next.get(2).unwrap();
        assert_eq!(updated.owner_history, vec![owner(2), owner(42)]);
        assert_eq!(updated.current_owner(), Some(&owner(42)));
        assert_eq!(ids(&next), vec![3, 2, 1]);

        // untouched records are shared with the previous snapshot, not copied
        assert!(Arc::ptr_eq(feed.get(3).unwrap(), next.get(3).unwrap()));
        assert!(Arc::ptr_eq(feed.get(1).unwrap(), next.get(1).unwrap()));
    }

    #[test]
    fn owner_append_leaves_the_previous_snapshot_alone() {
        let feed = feed_of(&[1]);
        let _next = feed.with_owner_appended(1, owner(42));

        assert_eq!(feed.get(1).unwrap().owner_history, vec![owner(1)]);
    }

    #[test]
    fn owner_append_for_an_absent_id_changes_nothing() {
        let feed = feed_of(&[3, 2, 1]);
        let next = feed.with_owner_appended(99, owner(42));

        assert_eq!(ids(&next), ids(&feed));
        for (before, after) in feed.iter().zip(next.iter()) {
            assert_eq!(before, after);
        }
    }

    #[tokio::test]
    async fn empty_ledger_loads_an_empty_feed() {
        let ledger = FakeLedger::with_count(0);
        let feed = load_feed(&ledger).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn load_orders_records_newest_first() {
        let ledger = FakeLedger::with_count(3);
        let feed = load_feed(&ledger).await.unwrap();
        assert_eq!(ids(&feed), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn one_failing_fetch_fails_the_whole_load() {
        let ledger = FakeLedger::with_count(3);
        ledger.fail_on(2);
        assert!(load_feed(&ledger).await.is_err());
    }
}
