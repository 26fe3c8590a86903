use proptest::prelude::*;
use todolist_core::storage::parse_document;
use todolist_core::{
    FilterMode, FilteredView, MemoryStorage, Priority, RecordStore, TodoDocument, TodoRecord,
};

#[derive(Debug, Clone)]
enum Op {
    Insert(String, Priority),
    RemoveAt(usize),
    Toggle(usize),
    ToggleVisible(usize),
    RemoveVisible(usize),
    SetFilter(FilterMode),
    SetAllCompleted(bool),
    ClearCompleted,
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

fn filter_strategy() -> impl Strategy<Value = FilterMode> {
    prop::sample::select(FilterMode::ALL.to_vec())
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => ("[ a-z]{0,8}", priority_strategy()).prop_map(|(title, priority)| Op::Insert(title, priority)),
        1 => (0usize..12).prop_map(Op::RemoveAt),
        3 => (0usize..12).prop_map(Op::Toggle),
        2 => (0usize..12).prop_map(Op::ToggleVisible),
        1 => (0usize..12).prop_map(Op::RemoveVisible),
        2 => filter_strategy().prop_map(Op::SetFilter),
        1 => any::<bool>().prop_map(Op::SetAllCompleted),
        1 => Just(Op::ClearCompleted),
    ]
}

fn apply(op: Op, store: &mut RecordStore<MemoryStorage>, view: &mut FilteredView) {
    match op {
        Op::Insert(title, priority) => {
            let _ = store.insert(&title, Some(priority));
        }
        Op::RemoveAt(position) => {
            store.remove_at(position);
        }
        Op::Toggle(position) => {
            if let Some(id) = store.get(position).map(|record| record.id) {
                store.toggle_completed(id);
            }
        }
        Op::ToggleVisible(position) => {
            let _ = view.toggle_at_visible(store, position);
        }
        Op::RemoveVisible(position) => {
            let _ = view.remove_at_visible(store, position);
        }
        Op::SetFilter(mode) => {
            view.set_filter(store, mode);
        }
        Op::SetAllCompleted(completed) => {
            store.set_all_completed(completed);
        }
        Op::ClearCompleted => {
            store.clear_completed();
        }
    }
}

fn naive_projection(store: &RecordStore<MemoryStorage>, mode: FilterMode) -> Vec<usize> {
    store
        .iter()
        .enumerate()
        .filter(|(_, record)| mode.matches(record))
        .map(|(position, _)| position)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn projection_matches_naive_filter(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut store = RecordStore::in_memory();
        let mut view = FilteredView::new(FilterMode::All);

        for op in ops {
            apply(op, &mut store, &mut view);

            let expected = naive_projection(&store, view.mode());
            prop_assert_eq!(view.projection(&store), expected.as_slice());
            prop_assert_eq!(
                store.total_count(),
                store.active_count() + store.completed_count()
            );
            prop_assert_eq!(store.storage().records(), store.all());
        }
    }

    #[test]
    fn live_ids_stay_unique(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut store = RecordStore::in_memory();
        let mut view = FilteredView::new(FilterMode::Active);

        for op in ops {
            apply(op, &mut store, &mut view);
        }

        let mut ids: Vec<_> = store.iter().map(|record| record.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
        prop_assert!(store.iter().all(|record| !record.title.trim().is_empty()));
    }

    #[test]
    fn documents_round_trip(
        entries in prop::collection::vec(("[A-Za-z][A-Za-z ]{0,12}", any::<bool>(), priority_strategy()), 0..10)
    ) {
        let records: Vec<TodoRecord> = entries
            .iter()
            .map(|(title, completed, priority)| {
                let mut record = TodoRecord::new(title, *priority).unwrap();
                record.completed = *completed;
                record
            })
            .collect();

        let text = serde_json::to_string(&TodoDocument::new(&records)).unwrap();
        let parsed = parse_document(&text).unwrap();

        prop_assert_eq!(parsed.skipped, 0);
        prop_assert_eq!(parsed.records, records);
    }
}
