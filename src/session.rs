// Advisor session: the single-writer surface around the pure core.
// Owns the record store, the current recommendation list and the engine;
// every mutation ends with a fresh reconciliation pass, so the list the
// consumer reads is always the full authoritative state.

use anyhow::{bail, Result};

use crate::engine::RecommendationEngine;
use crate::record::Record;
use crate::recommendation::{
    Recommendation, RecommendationKind, RecommendationStatus, DUPLICATE_ACTION_DELETE,
};
use crate::store::RecordStore;

// ============================================================================
// SESSION
// ============================================================================

pub struct AdvisorSession {
    store: RecordStore,
    recommendations: Vec<Recommendation>,
    engine: RecommendationEngine,
}

impl AdvisorSession {
    pub fn new() -> Self {
        AdvisorSession {
            store: RecordStore::new(),
            recommendations: Vec::new(),
            engine: RecommendationEngine::new(),
        }
    }

    pub fn with_engine(engine: RecommendationEngine) -> Self {
        AdvisorSession {
            store: RecordStore::new(),
            recommendations: Vec::new(),
            engine,
        }
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The full authoritative recommendation list, re-derived after every
    /// mutation. Not a delta.
    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn pending(&self) -> Vec<&Recommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.status == RecommendationStatus::Pending)
            .collect()
    }

    // ========================================================================
    // RECORD MUTATIONS
    // ========================================================================

    pub fn import(&mut self, records: Vec<Record>) {
        self.store.extend(records);
        self.reconcile();
    }

    pub fn add_record(&mut self, record: Record) {
        self.store.add(record);
        self.reconcile();
    }

    pub fn update_record<F>(&mut self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Record),
    {
        if !self.store.update(id, f) {
            bail!("record not found: {}", id);
        }
        self.reconcile();
        Ok(())
    }

    pub fn soft_delete(&mut self, id: &str) -> Result<()> {
        if !self.store.soft_delete(id) {
            bail!("record not found: {}", id);
        }
        self.reconcile();
        Ok(())
    }

    pub fn restore(&mut self, id: &str) -> Result<()> {
        if !self.store.restore(id) {
            bail!("record not found: {}", id);
        }
        self.reconcile();
        Ok(())
    }

    pub fn hard_delete(&mut self, id: &str) -> Result<()> {
        if !self.store.hard_delete(id) {
            bail!("record not found: {}", id);
        }
        self.reconcile();
        Ok(())
    }

    // ========================================================================
    // RECOMMENDATION ACTIONS
    // ========================================================================

    /// Apply a pending recommendation: snapshot the original field value
    /// (first overwrite only), write the suggested value, set the provenance
    /// flag, mark the recommendation applied, reconcile.
    pub fn apply(&mut self, recommendation_id: &str) -> Result<()> {
        let rec = self.take_pending(recommendation_id)?;

        match rec.kind {
            RecommendationKind::Duplicate => {
                for target in &rec.transaction_ids {
                    self.store
                        .update(target, |r| r.flags.is_duplicate_candidate = true);
                }
                // The pair is in sorted canonical order; deletion takes the
                // second member.
                if rec.suggested_value == DUPLICATE_ACTION_DELETE {
                    if let Some(victim) = rec.transaction_ids.get(1) {
                        self.store.soft_delete(victim);
                    }
                }
            }
            kind => {
                let Some(field) = rec.affected_field else {
                    bail!(
                        "recommendation {} has no affected field",
                        recommendation_id
                    );
                };
                for target in &rec.transaction_ids {
                    self.store.update(target, |r| {
                        let current = r.field(field).to_string();
                        r.original_values.snapshot_once(field, &current);
                        r.set_field(field, &rec.suggested_value);
                        match kind {
                            RecommendationKind::MerchantNormalization => {
                                r.flags.merchant_normalized = true;
                            }
                            RecommendationKind::MissingField => {
                                r.flags.fields_filled = true;
                            }
                            RecommendationKind::Classification => {
                                r.flags.category_suggested = true;
                            }
                            RecommendationKind::Duplicate => unreachable!(),
                        }
                    });
                }
            }
        }

        self.set_status(recommendation_id, RecommendationStatus::Applied);
        self.reconcile();
        Ok(())
    }

    /// Ignore a pending recommendation: status flip only, no record mutation.
    pub fn ignore(&mut self, recommendation_id: &str) -> Result<()> {
        self.take_pending(recommendation_id)?;
        self.set_status(recommendation_id, RecommendationStatus::Ignored);
        self.reconcile();
        Ok(())
    }

    /// Apply a batch sequentially. Later items see earlier items' mutations;
    /// the first failure stops the batch.
    pub fn apply_many(&mut self, recommendation_ids: &[String]) -> Result<()> {
        for id in recommendation_ids {
            self.apply(id)?;
        }
        Ok(())
    }

    pub fn ignore_many(&mut self, recommendation_ids: &[String]) -> Result<()> {
        for id in recommendation_ids {
            self.ignore(id)?;
        }
        Ok(())
    }

    /// Explicit re-run. Idempotent when nothing changed since the last pass.
    pub fn reconcile(&mut self) {
        self.recommendations = self.engine.reconcile(&self.store, &self.recommendations);
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    fn take_pending(&self, recommendation_id: &str) -> Result<Recommendation> {
        let Some(rec) = self
            .recommendations
            .iter()
            .find(|r| r.id == recommendation_id)
        else {
            bail!("recommendation not found: {}", recommendation_id);
        };
        if rec.status != RecommendationStatus::Pending {
            bail!("recommendation {} is not pending", recommendation_id);
        }
        Ok(rec.clone())
    }

    fn set_status(&mut self, recommendation_id: &str, status: RecommendationStatus) {
        if let Some(rec) = self
            .recommendations
            .iter_mut()
            .find(|r| r.id == recommendation_id)
        {
            rec.status = status;
        }
    }
}

impl Default for AdvisorSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{normalize_row, RawRow, RecordField, RecordKind};

    fn expense(date: &str, amount: &str, paid_to: &str, description: &str) -> Record {
        let raw = RawRow {
            date: date.to_string(),
            amount: amount.to_string(),
            paid_to: paid_to.to_string(),
            description: description.to_string(),
            ..Default::default()
        };
        normalize_row(&raw, RecordKind::Expense)
    }

    fn merchant_session() -> AdvisorSession {
        let mut session = AdvisorSession::new();
        let mut records: Vec<Record> = (0..5)
            .map(|i| expense("2024-01-01", &format!("{}.00", 10 + i), "AMZN Mktp US", "order"))
            .collect();
        records.push(expense("2024-02-01", "99.00", "AMZN MKTPLACE", "order"));
        session.import(records);
        session
    }

    fn merchant_rec_id(session: &AdvisorSession) -> String {
        session
            .recommendations()
            .iter()
            .find(|r| r.kind == RecommendationKind::MerchantNormalization)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn test_apply_merchant_normalization_round_trip() {
        let mut session = merchant_session();
        let rec_id = merchant_rec_id(&session);
        let target = session
            .recommendations()
            .iter()
            .find(|r| r.id == rec_id)
            .unwrap()
            .transaction_ids[0]
            .clone();

        session.apply(&rec_id).unwrap();

        let record = session.store().get(&target).unwrap();
        assert_eq!(record.paid_to, "AMZN Mktp US");
        assert_eq!(
            record.original_values.get(RecordField::PaidTo),
            Some("AMZN MKTPLACE")
        );
        assert!(record.flags.merchant_normalized);

        // The applied decision stays terminal and is not re-offered
        let applied = session
            .recommendations()
            .iter()
            .find(|r| r.id == rec_id)
            .unwrap();
        assert_eq!(applied.status, RecommendationStatus::Applied);
        assert!(!session.recommendations().iter().any(|r| {
            r.kind == RecommendationKind::MerchantNormalization
                && r.status == RecommendationStatus::Pending
                && r.transaction_ids == vec![target.clone()]
                && r.original_value == "AMZN MKTPLACE"
        }));
    }

    #[test]
    fn test_second_apply_does_not_overwrite_snapshot() {
        let mut session = merchant_session();
        let rec_id = merchant_rec_id(&session);
        let target = session
            .recommendations()
            .iter()
            .find(|r| r.id == rec_id)
            .unwrap()
            .transaction_ids[0]
            .clone();

        session.apply(&rec_id).unwrap();

        // Simulate the variant reappearing and being re-applied
        session
            .update_record(&target, |r| r.paid_to = "AMZN MKT".to_string())
            .unwrap();
        let second = session
            .recommendations()
            .iter()
            .find(|r| {
                r.kind == RecommendationKind::MerchantNormalization
                    && r.status == RecommendationStatus::Pending
                    && r.transaction_ids == vec![target.clone()]
            })
            .map(|r| r.id.clone());

        if let Some(second_id) = second {
            session.apply(&second_id).unwrap();
        }

        // The snapshot still holds the first original value
        let record = session.store().get(&target).unwrap();
        assert_eq!(
            record.original_values.get(RecordField::PaidTo),
            Some("AMZN MKTPLACE")
        );
    }

    #[test]
    fn test_apply_duplicate_soft_deletes_second_member() {
        let mut session = AdvisorSession::new();
        session.import(vec![
            expense("2024-03-01", "42.50", "Starbucks #123", "coffee"),
            expense("2024-03-01", "42.50", "Starbucks #124", "coffee"),
        ]);

        let rec = session
            .recommendations()
            .iter()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap()
            .clone();

        session.apply(&rec.id).unwrap();

        let first = session.store().get(&rec.transaction_ids[0]).unwrap();
        let second = session.store().get(&rec.transaction_ids[1]).unwrap();

        assert!(first.flags.is_duplicate_candidate);
        assert!(second.flags.is_duplicate_candidate);
        assert!(first.is_active());
        assert!(!second.is_active());
    }

    #[test]
    fn test_ignore_mutates_nothing() {
        let mut session = merchant_session();
        let rec_id = merchant_rec_id(&session);
        let target = session
            .recommendations()
            .iter()
            .find(|r| r.id == rec_id)
            .unwrap()
            .transaction_ids[0]
            .clone();

        session.ignore(&rec_id).unwrap();

        let record = session.store().get(&target).unwrap();
        assert_eq!(record.paid_to, "AMZN MKTPLACE");
        assert!(!record.flags.merchant_normalized);

        let ignored = session
            .recommendations()
            .iter()
            .find(|r| r.id == rec_id)
            .unwrap();
        assert_eq!(ignored.status, RecommendationStatus::Ignored);

        // Not re-offered as pending either
        assert!(!session.recommendations().iter().any(|r| {
            r.kind == RecommendationKind::MerchantNormalization
                && r.status == RecommendationStatus::Pending
                && r.transaction_ids == vec![target.clone()]
        }));
    }

    #[test]
    fn test_apply_unknown_id_fails() {
        let mut session = AdvisorSession::new();
        assert!(session.apply("no-such-id").is_err());
        assert!(session.ignore("no-such-id").is_err());
    }

    #[test]
    fn test_apply_twice_fails() {
        let mut session = merchant_session();
        let rec_id = merchant_rec_id(&session);

        session.apply(&rec_id).unwrap();
        assert!(session.apply(&rec_id).is_err());
    }

    #[test]
    fn test_bulk_ignore_settles_everything() {
        let mut session = AdvisorSession::new();
        session.import(vec![
            expense("2024-03-01", "42.50", "Starbucks #123", "coffee"),
            expense("2024-03-01", "42.50", "Starbucks #124", "coffee"),
        ]);

        let ids: Vec<String> = session.pending().iter().map(|r| r.id.clone()).collect();
        assert!(!ids.is_empty());

        session.ignore_many(&ids).unwrap();
        assert!(session.pending().is_empty());

        // Another pass resurrects nothing
        session.reconcile();
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_bulk_apply_sees_accumulating_snapshot() {
        let mut session = AdvisorSession::new();
        let mut records: Vec<Record> = (0..3)
            .map(|i| expense("2024-01-01", &format!("{}.00", 20 + i), "Cafe Luna", "lunch"))
            .collect();
        records.push(expense("2024-02-01", "7.00", "Cafe Lunaa", "lunch"));
        records.push(expense("2024-02-02", "8.00", "Cafe Lunab", "lunch"));
        session.import(records);

        let ids: Vec<String> = session
            .pending()
            .iter()
            .filter(|r| r.kind == RecommendationKind::MerchantNormalization)
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(ids.len(), 2);

        session.apply_many(&ids).unwrap();

        let variants: Vec<&str> = session
            .store()
            .all()
            .iter()
            .map(|r| r.paid_to.as_str())
            .collect();
        assert!(variants.iter().all(|v| *v == "Cafe Luna"));
    }

    #[test]
    fn test_empty_session_positive_state() {
        let mut session = AdvisorSession::new();
        session.reconcile();
        assert!(session.recommendations().is_empty());
        assert!(session.pending().is_empty());
    }
}
