// Recommendation reconciliation engine.
//
// A rule run is stateless, but recommendation identity has to survive it:
// re-running the rules after every mutation must not resurrect decisions the
// user already made, must not reshuffle ids under open dialogs, and must
// drop recommendations whose targets are gone. The step order below is
// load-bearing; later steps depend on earlier bookkeeping.

use std::collections::{HashMap, HashSet};

use crate::recommendation::{Recommendation, RecommendationKind, RecommendationStatus};
use crate::rules::{default_rules, RecommendationRule};
use crate::store::RecordStore;

// ============================================================================
// ENGINE
// ============================================================================

pub struct RecommendationEngine {
    rules: Vec<Box<dyn RecommendationRule>>,
}

impl RecommendationEngine {
    /// Engine with the default rule set (duplicates, merchant normalization,
    /// missing fields, classification), in that order.
    pub fn new() -> Self {
        RecommendationEngine {
            rules: default_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn RecommendationRule>>) -> Self {
        RecommendationEngine { rules }
    }

    /// One full reconciliation pass: pure function of the store contents and
    /// the previous recommendation list. Idempotent when nothing changed in
    /// between: same ids, same statuses, same content, same order.
    pub fn reconcile(
        &self,
        store: &RecordStore,
        previous: &[Recommendation],
    ) -> Vec<Recommendation> {
        // Step 1: carry forward applied/ignored recommendations and note
        // their identities as already resolved. Hard-deleted targets drop
        // out of the id list; if everything is gone the entry stays, with
        // an annotated description, so the decision history survives.
        let mut resolved: HashSet<String> = HashSet::new();
        let mut carried: Vec<Recommendation> = Vec::new();

        for prev in previous {
            if !prev.status.is_terminal() {
                continue;
            }
            let mut rec = prev.clone();
            let had_targets = !rec.transaction_ids.is_empty();
            rec.transaction_ids.retain(|id| store.contains(id));
            if had_targets && rec.transaction_ids.is_empty() && !rec.description.ends_with(" (records deleted)") {
                rec.description.push_str(" (records deleted)");
            }
            resolved.insert(rec.identity_key());
            carried.push(rec);
        }

        // Step 2: fresh candidates from every rule, in rule order.
        let all = store.all();
        let active = store.active();
        let mut candidates: Vec<Recommendation> = Vec::new();
        for rule in &self.rules {
            candidates.extend(rule.generate(&active, all));
        }

        // Step 3: merge. Previous pending recommendations keep their slot
        // and id; an identity-matching candidate refreshes their content.
        // Candidates whose identity was resolved in step 1 are discarded:
        // a rule must not re-open a decision the user already made.
        let mut merged: Vec<Recommendation> = Vec::new();
        let mut slot_by_identity: HashMap<String, usize> = HashMap::new();

        for prev in previous {
            if prev.status.is_terminal() {
                continue;
            }
            let key = prev.identity_key();
            if resolved.contains(&key) || slot_by_identity.contains_key(&key) {
                continue;
            }
            slot_by_identity.insert(key, merged.len());
            merged.push(prev.clone());
        }

        for candidate in candidates {
            let key = candidate.identity_key();
            if resolved.contains(&key) {
                continue;
            }
            match slot_by_identity.get(&key) {
                Some(&slot) => {
                    let stable_id = merged[slot].id.clone();
                    merged[slot] = candidate;
                    merged[slot].id = stable_id;
                }
                None => {
                    slot_by_identity.insert(key, merged.len());
                    merged.push(candidate);
                }
            }
        }

        // Step 4: final pruning. Pending entries reduced to zero targets are
        // gone for good; pending non-Duplicate entries whose every remaining
        // target is soft-deleted are moot while their subject is hidden.
        // Duplicates are exempt from the moot check: both members of a pair
        // can be soft-deleted together and the pair should persist.
        let mut surviving: Vec<Recommendation> = Vec::new();
        for mut rec in carried.into_iter().chain(merged) {
            let had_targets = !rec.transaction_ids.is_empty();
            rec.transaction_ids.retain(|id| store.contains(id));

            if rec.status == RecommendationStatus::Pending {
                if had_targets && rec.transaction_ids.is_empty() {
                    continue;
                }
                if rec.kind != RecommendationKind::Duplicate {
                    let all_soft_deleted = !rec.transaction_ids.is_empty()
                        && rec
                            .transaction_ids
                            .iter()
                            .all(|id| store.get(id).is_some_and(|r| !r.is_active()));
                    if all_soft_deleted {
                        continue;
                    }
                }
            }

            surviving.push(rec);
        }

        // Step 5: deduplicate by id. Should not collide with UUID ids, but
        // when it does the terminal entry wins over a pending one.
        let mut final_list: Vec<Recommendation> = Vec::new();
        let mut slot_by_id: HashMap<String, usize> = HashMap::new();
        for rec in surviving {
            match slot_by_id.get(&rec.id) {
                Some(&slot) => {
                    if !final_list[slot].status.is_terminal() && rec.status.is_terminal() {
                        final_list[slot] = rec;
                    }
                }
                None => {
                    slot_by_id.insert(rec.id.clone(), final_list.len());
                    final_list.push(rec);
                }
            }
        }

        final_list
    }
}

impl Default for RecommendationEngine {
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
    use crate::record::{normalize_row, RawRow, Record, RecordField, RecordKind};

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

    fn duplicate_pair_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.add(expense("2024-03-01", "42.50", "Starbucks #123", "coffee"));
        store.add(expense("2024-03-01", "42.50", "Starbucks #124", "coffee"));
        store
    }

    fn render(recs: &[Recommendation]) -> Vec<String> {
        recs.iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect()
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let engine = RecommendationEngine::new();
        let mut store = duplicate_pair_store();
        store.add(expense("2024-03-05", "12.00", "Shell Gas", ""));

        let first = engine.reconcile(&store, &[]);
        assert!(!first.is_empty());

        let second = engine.reconcile(&store, &first);
        let third = engine.reconcile(&store, &second);

        // Byte-identical: same ids, same statuses, same content, same order
        assert_eq!(render(&first), render(&second));
        assert_eq!(render(&second), render(&third));
    }

    #[test]
    fn test_pending_ids_stable_across_runs() {
        let engine = RecommendationEngine::new();
        let store = duplicate_pair_store();

        let first = engine.reconcile(&store, &[]);
        let second = engine.reconcile(&store, &first);

        let first_ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_applied_identity_not_rediscovered() {
        let engine = RecommendationEngine::new();
        let store = duplicate_pair_store();

        let mut recs = engine.reconcile(&store, &[]);
        let duplicate = recs
            .iter_mut()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap();
        duplicate.status = RecommendationStatus::Applied;
        let applied_key = duplicate.identity_key();

        let next = engine.reconcile(&store, &recs);

        let pending_same_identity = next.iter().any(|r| {
            r.status == RecommendationStatus::Pending && r.identity_key() == applied_key
        });
        assert!(!pending_same_identity);

        // The applied entry itself is carried forward untouched
        let applied = next
            .iter()
            .find(|r| r.identity_key() == applied_key)
            .unwrap();
        assert_eq!(applied.status, RecommendationStatus::Applied);
    }

    #[test]
    fn test_ignored_identity_not_rediscovered() {
        let engine = RecommendationEngine::new();
        let store = duplicate_pair_store();

        let mut recs = engine.reconcile(&store, &[]);
        let key = recs[0].identity_key();
        recs[0].status = RecommendationStatus::Ignored;

        let next = engine.reconcile(&store, &recs);
        assert!(!next
            .iter()
            .any(|r| r.status == RecommendationStatus::Pending && r.identity_key() == key));
    }

    #[test]
    fn test_hard_delete_drops_pending_recommendation() {
        let engine = RecommendationEngine::new();
        let mut store = duplicate_pair_store();

        let recs = engine.reconcile(&store, &[]);
        let duplicate = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap();
        let victim = duplicate.transaction_ids[0].clone();

        store.hard_delete(&victim);
        let next = engine.reconcile(&store, &recs);

        assert!(!next.iter().any(|r| r.kind == RecommendationKind::Duplicate));
    }

    #[test]
    fn test_hard_delete_keeps_terminal_history_with_annotation() {
        let engine = RecommendationEngine::new();
        let mut store = duplicate_pair_store();

        let mut recs = engine.reconcile(&store, &[]);
        let duplicate = recs
            .iter_mut()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap();
        duplicate.status = RecommendationStatus::Applied;
        let ids = duplicate.transaction_ids.clone();

        for id in &ids {
            store.hard_delete(id);
        }
        let next = engine.reconcile(&store, &recs);

        let history = next
            .iter()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap();
        assert_eq!(history.status, RecommendationStatus::Applied);
        assert!(history.transaction_ids.is_empty());
        assert!(history.description.ends_with("(records deleted)"));

        // A second pass must not grow the annotation again
        let again = engine.reconcile(&store, &next);
        assert_eq!(render(&next), render(&again));
    }

    #[test]
    fn test_soft_delete_moots_missing_field_recommendation() {
        let engine = RecommendationEngine::new();
        let mut store = RecordStore::new();
        for _ in 0..5 {
            let mut history = expense("2024-01-10", "35.00", "Shell Gas", "");
            history.category = "Transportation".to_string();
            store.add(history);
        }
        let blank = expense("2024-02-01", "40.00", "Shell Gas", "");
        let blank_id = blank.id.clone();
        store.add(blank);

        let recs = engine.reconcile(&store, &[]);
        assert!(recs.iter().any(|r| {
            r.kind == RecommendationKind::MissingField && r.transaction_ids == vec![blank_id.clone()]
        }));

        store.soft_delete(&blank_id);
        let next = engine.reconcile(&store, &recs);

        assert!(!next.iter().any(|r| {
            r.kind == RecommendationKind::MissingField && r.transaction_ids == vec![blank_id.clone()]
        }));

        // Reverting the soft delete brings the recommendation back (fresh
        // computation, identity-equal)
        store.restore(&blank_id);
        let restored = engine.reconcile(&store, &next);
        assert!(restored.iter().any(|r| {
            r.kind == RecommendationKind::MissingField && r.transaction_ids == vec![blank_id.clone()]
        }));
    }

    #[test]
    fn test_soft_deleted_pair_keeps_pending_duplicate() {
        let engine = RecommendationEngine::new();
        let mut store = duplicate_pair_store();

        let recs = engine.reconcile(&store, &[]);
        let duplicate = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap()
            .clone();

        for id in &duplicate.transaction_ids {
            store.soft_delete(id);
        }
        let next = engine.reconcile(&store, &recs);

        let survivor = next
            .iter()
            .find(|r| r.kind == RecommendationKind::Duplicate)
            .unwrap();
        assert_eq!(survivor.id, duplicate.id);
        assert_eq!(survivor.status, RecommendationStatus::Pending);
    }

    #[test]
    fn test_new_record_appends_without_reshuffling() {
        let engine = RecommendationEngine::new();
        let mut store = duplicate_pair_store();

        let first = engine.reconcile(&store, &[]);
        let first_ids: Vec<String> = first.iter().map(|r| r.id.clone()).collect();

        store.add(expense("2024-03-02", "9.99", "Netflix.com", ""));
        let second = engine.reconcile(&store, &first);

        // Existing recommendations keep their ids and relative order
        let kept: Vec<String> = second
            .iter()
            .filter(|r| first_ids.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(kept, first_ids);
        assert!(second.len() > first.len());
    }

    #[test]
    fn test_empty_store_empty_output() {
        let engine = RecommendationEngine::new();
        let store = RecordStore::new();
        assert!(engine.reconcile(&store, &[]).is_empty());
    }

    #[test]
    fn test_id_collision_terminal_wins() {
        let engine = RecommendationEngine::with_rules(vec![]);
        let mut store = RecordStore::new();
        let record = expense("2024-01-01", "5.00", "Starbucks", "coffee");
        let record_id = record.id.clone();
        store.add(record);

        let mut terminal = Recommendation::new(
            RecommendationKind::MissingField,
            vec![record_id.clone()],
            Some(RecordField::Category),
            String::new(),
            "Dining".to_string(),
            0.8,
            "a".to_string(),
        );
        terminal.status = RecommendationStatus::Applied;

        let mut pending = Recommendation::new(
            RecommendationKind::MissingField,
            vec![record_id],
            Some(RecordField::Subcategory),
            String::new(),
            "Coffee".to_string(),
            0.8,
            "b".to_string(),
        );
        pending.id = terminal.id.clone(); // forced collision

        let out = engine.reconcile(&store, &[pending, terminal.clone()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, RecommendationStatus::Applied);
        assert_eq!(out[0].description, "a");
    }
}
