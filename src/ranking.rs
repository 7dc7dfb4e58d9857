// src/ranking.rs

//! Read-only standings over the ledger.

use std::sync::Arc;

use crate::models::ledger::{Bucket, LedgerBalance, StandingEntry};
use crate::store::{LedgerStore, StoreResult};

pub struct RankingService {
    ledger: Arc<dyn LedgerStore>,
}

impl RankingService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// 1-based position of the user in the bucket, or `None` without a ledger row.
    pub async fn rank(&self, user_id: i64, bucket: Bucket) -> StoreResult<Option<i64>> {
        let rows = self.ledger.bucket_points(bucket).await?;
        Ok(rank_position(&rows, user_id))
    }

    pub async fn standings(&self, bucket: Bucket, limit: i64) -> StoreResult<Vec<StandingEntry>> {
        self.ledger.standings(bucket, limit).await
    }

    pub async fn balance(&self, user_id: i64) -> StoreResult<Option<LedgerBalance>> {
        self.ledger.balance(user_id).await
    }
}

/// Counts the users ordered ahead: more points, or equal points and a lower id.
fn rank_position(rows: &[(i64, i64)], user_id: i64) -> Option<i64> {
    let (_, points) = rows.iter().find(|(id, _)| *id == user_id)?;

    let ahead = rows
        .iter()
        .filter(|(id, p)| *p > *points || (*p == *points && *id < user_id))
        .count() as i64;

    Some(ahead + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::{Credit, PointSource};
    use crate::settlement::period::Period;
    use crate::store::memory::MemoryStore;

    #[test]
    fn ties_go_to_the_lower_user_id() {
        let rows = [(4, 20), (2, 20), (9, 35), (1, 5)];

        assert_eq!(rank_position(&rows, 9), Some(1));
        assert_eq!(rank_position(&rows, 2), Some(2));
        assert_eq!(rank_position(&rows, 4), Some(3));
        assert_eq!(rank_position(&rows, 1), Some(4));
        assert_eq!(rank_position(&rows, 7), None);
    }

    #[tokio::test]
    async fn rank_and_standings_agree() {
        let store = Arc::new(MemoryStore::new());
        let period = Period { month: 3, year: 2026, season_year: 2025 };
        for (user_id, points) in [(3, 10), (1, 10), (2, 25)] {
            store.set_user_name(user_id, "User", &user_id.to_string());
            store
                .credit(&Credit { user_id, source: PointSource::Quiz, points, period })
                .await
                .unwrap();
        }

        let ranking = RankingService::new(store);
        let standings = ranking.standings(Bucket::Monthly, 30).await.unwrap();
        let order: Vec<i64> = standings.iter().map(|s| s.user_id).collect();
        assert_eq!(order, vec![2, 1, 3]);

        for (position, entry) in standings.iter().enumerate() {
            let rank = ranking.rank(entry.user_id, Bucket::Monthly).await.unwrap();
            assert_eq!(rank, Some(position as i64 + 1));
        }
        assert_eq!(ranking.rank(42, Bucket::Seasonal).await.unwrap(), None);
        assert_eq!(ranking.balance(2).await.unwrap().unwrap().quiz_points, 25);

        let top = ranking.standings(Bucket::Seasonal, 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].last_name, "2");
    }
}
