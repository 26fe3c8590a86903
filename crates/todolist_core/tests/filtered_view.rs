use std::cell::RefCell;
use std::rc::Rc;
use todolist_core::{
    FilterMode, FilteredView, MemoryStorage, RecordChange, RecordStore, ViewError, ViewEvent,
};

/// Buy milk, Walk dog, Pay bills with "Walk dog" completed.
fn seeded_store() -> RecordStore<MemoryStorage> {
    let mut store = RecordStore::in_memory();
    store.insert("Buy milk", None).unwrap();
    let walk = store.insert("Walk dog", None).unwrap();
    store.insert("Pay bills", None).unwrap();
    store.toggle_completed(walk.id).unwrap();
    store
}

fn visible_titles(view: &mut FilteredView, store: &RecordStore<MemoryStorage>) -> Vec<String> {
    view.visible_records(store)
        .into_iter()
        .map(|record| record.title.clone())
        .collect()
}

#[test]
fn projections_follow_each_filter() {
    let store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::All);

    assert_eq!(view.projection(&store), &[0, 1, 2]);

    view.set_filter(&store, FilterMode::Active);
    assert_eq!(view.projection(&store), &[0, 2]);
    assert_eq!(
        visible_titles(&mut view, &store),
        vec!["Buy milk", "Pay bills"]
    );

    view.set_filter(&store, FilterMode::Completed);
    assert_eq!(view.projection(&store), &[1]);
    assert_eq!(view.visible_at(&store, 0).unwrap().title, "Walk dog");
}

#[test]
fn buy_milk_walk_dog_pay_bills_walkthrough() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);

    assert_eq!(view.visible_count(&store), 2);
    assert_eq!(
        visible_titles(&mut view, &store),
        vec!["Buy milk", "Pay bills"]
    );

    let removed = view.remove_at_visible(&mut store, 0).unwrap();
    assert_eq!(removed.title, "Buy milk");
    assert!(store.iter().any(|record| record.title == "Walk dog"));

    assert_eq!(store.clear_completed(), 1);
    view.set_filter(&store, FilterMode::All);
    assert_eq!(visible_titles(&mut view, &store), vec!["Pay bills"]);
}

#[test]
fn clear_completed_then_all_shows_remaining() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);

    assert_eq!(store.clear_completed(), 1);
    view.set_filter(&store, FilterMode::All);

    assert_eq!(view.visible_count(&store), 2);
    assert_eq!(
        visible_titles(&mut view, &store),
        vec!["Buy milk", "Pay bills"]
    );
}

#[test]
fn toggling_under_active_filter_shrinks_projection() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);

    assert!(view.toggle_at_visible(&mut store, 0).unwrap());

    assert_eq!(view.visible_count(&store), 1);
    assert_eq!(view.visible_at(&store, 0).unwrap().title, "Pay bills");
    assert_eq!(store.completed_count(), 2);
}

#[test]
fn remove_at_visible_maps_to_underlying_record() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);

    let removed = view.remove_at_visible(&mut store, 1).unwrap();

    assert_eq!(removed.title, "Pay bills");
    assert_eq!(store.total_count(), 2);
    assert_eq!(view.projection(&store), &[0]);
}

#[test]
fn out_of_range_positions_are_errors() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Completed);

    assert_eq!(
        view.visible_at(&store, 1).unwrap_err(),
        ViewError::OutOfRange {
            position: 1,
            len: 1
        }
    );
    assert!(view.remove_at_visible(&mut store, 5).is_err());
    assert!(view.toggle_at_visible(&mut store, 1).is_err());
    assert!(view.underlying_position_of(&store, 1).is_err());
    assert_eq!(store.total_count(), 3);
}

#[test]
fn position_mapping_round_trips() {
    let store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);

    assert_eq!(view.underlying_position_of(&store, 1).unwrap(), 2);
    assert_eq!(view.visible_position_of(&store, 2), Some(1));
    assert_eq!(view.visible_position_of(&store, 1), None);
    assert_eq!(view.visible_position_of(&store, 99), None);
}

#[test]
fn view_resyncs_after_direct_store_mutation() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);
    assert!(view.is_synced_with(&store));

    store.insert("Call mom", None).unwrap();
    assert!(!view.is_synced_with(&store));

    assert_eq!(view.projection(&store), &[0, 2, 3]);
    assert!(view.is_synced_with(&store));
}

#[test]
fn field_update_on_filtered_out_record_keeps_projection() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);
    let walk = store.get(1).unwrap().id;

    store
        .update(walk, RecordChange::Category("pets".to_string()))
        .unwrap();

    assert_eq!(view.projection(&store), &[0, 2]);
}

#[test]
fn all_filter_counts_every_record() {
    let mut store = seeded_store();
    let mut view = FilteredView::new(FilterMode::All);

    assert_eq!(view.visible_count(&store), store.total_count());
    store.clear_completed();
    assert_eq!(view.visible_count(&store), store.total_count());
    store.clear_all();
    assert_eq!(view.visible_count(&store), 0);
}

#[test]
fn set_filter_to_active_mode_is_a_no_op() {
    let store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    view.subscribe(move |event| sink.borrow_mut().push(*event));

    assert!(!view.set_filter(&store, FilterMode::Active));
    assert!(events.borrow().is_empty());

    assert!(view.set_filter(&store, FilterMode::Completed));
    assert_eq!(
        events.borrow().as_slice(),
        &[
            ViewEvent::FilterChanged(FilterMode::Completed),
            ViewEvent::Changed { visible_count: 1 },
        ]
    );
}

#[test]
fn rebuild_is_idempotent() {
    let store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::Active);
    let events = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&events);
    view.subscribe(move |_| *sink.borrow_mut() += 1);

    view.rebuild(&store);
    view.rebuild(&store);

    assert_eq!(view.projection(&store), &[0, 2]);
    assert_eq!(*events.borrow(), 0);
}

#[test]
fn sync_notifies_once_per_store_change() {
    let mut store = seeded_store();
    let mut view = FilteredView::attached(&store, FilterMode::All);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    view.subscribe(move |event| sink.borrow_mut().push(*event));

    store.insert("Call mom", None).unwrap();
    assert!(view.sync(&store));
    assert!(!view.sync(&store));

    assert_eq!(
        events.borrow().as_slice(),
        &[ViewEvent::Changed { visible_count: 4 }]
    );
}

#[test]
fn bulk_completion_flips_active_and_completed_projections() {
    let mut store = seeded_store();
    let mut active = FilteredView::attached(&store, FilterMode::Active);
    let mut completed = FilteredView::attached(&store, FilterMode::Completed);

    assert_eq!(store.set_all_completed(true), 2);
    assert_eq!(active.visible_count(&store), 0);
    assert_eq!(completed.projection(&store), &[0, 1, 2]);

    assert_eq!(store.set_all_completed(false), 3);
    assert_eq!(active.projection(&store), &[0, 1, 2]);
    assert_eq!(completed.visible_count(&store), 0);
}
