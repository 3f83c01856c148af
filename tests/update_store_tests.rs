use std::sync::Arc;
use router_owner::annotation::{DecisionCode, Rule, UpdateStore};
use router_owner::topology::RouterId;

fn code(rule: Rule) -> DecisionCode {
    DecisionCode::new(rule)
}

#[test]
fn test_missing_key_reads_unknown() {
    let store: UpdateStore<RouterId> = UpdateStore::new();
    let annotation = store.get(RouterId(7));

    assert_eq!(annotation.asn, -1);
    assert_eq!(annotation.org, "-1");
    assert_eq!(annotation.code, DecisionCode::UNKNOWN);
    assert!(!store.contains(RouterId(7)));
    assert!(store.is_empty());
}

#[test]
fn test_staged_updates_are_invisible_until_advance() {
    let mut store = UpdateStore::new();
    store.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));

    assert!(store.has_staged());
    assert_eq!(store.get(RouterId(0)).asn, -1);

    assert_eq!(store.advance(), 1);
    assert_eq!(store.get(RouterId(0)).asn, 100);
    assert_eq!(store.generation(), 1);
    assert!(!store.has_staged());
}

#[test]
fn test_advance_reports_only_changed_values() {
    let mut store = UpdateStore::new();
    store.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));
    store.add_update(RouterId(1), 200, "200".to_string(), code(Rule::VoteSingle));
    store.advance();

    store.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));
    store.add_update(RouterId(1), 300, "300".to_string(), code(Rule::VoteSingle));
    assert_eq!(store.advance(), 1);
    assert_eq!(store.changes().iter().copied().collect::<Vec<_>>(), vec![RouterId(1)]);

    // a different code alone is a change
    store.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteTie));
    assert_eq!(store.advance(), 1);
    assert!(store.changes().contains(&RouterId(0)));

    assert_eq!(store.advance(), 0);
    assert!(store.changes().is_empty());
}

#[test]
fn test_view_falls_through_to_base() {
    let mut base = UpdateStore::new();
    base.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));
    base.add_update(RouterId(1), 200, "200".to_string(), code(Rule::VoteSingle));
    base.advance();

    let mut view = UpdateStore::view(&base);
    assert_eq!(view.get(RouterId(1)).asn, 200);
    assert!(view.contains(RouterId(1)));

    // equal to the base value, so not a change
    view.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));
    view.add_update(RouterId(1), 300, "300".to_string(), code(Rule::VoteSingle));
    assert_eq!(view.advance(), 1);

    assert_eq!(view.get(RouterId(1)).asn, 300);
    assert_eq!(base.get(RouterId(1)).asn, 200);

    let merged: Vec<(RouterId, i64)> =
        view.iter().map(|(key, annotation)| (key, annotation.asn)).collect();
    assert_eq!(merged, vec![(RouterId(0), 100), (RouterId(1), 300)]);
    assert_eq!(view.len(), 2);
}

#[test]
fn test_snapshot_is_not_mutated_by_later_advance() {
    let mut store = UpdateStore::new();
    store.add_update(RouterId(0), 100, "100".to_string(), code(Rule::VoteSingle));
    store.advance();
    let snapshot = store.snapshot();

    store.add_update(RouterId(0), 200, "200".to_string(), code(Rule::VoteSingle));
    store.advance();

    assert_eq!(snapshot.get(&RouterId(0)).map(|a| a.asn), Some(100));
    assert_eq!(store.get(RouterId(0)).asn, 200);
    assert!(!Arc::ptr_eq(&snapshot, &store.snapshot()));
}
