mod common;

use common::{records, ScriptedSource};
use proptest::prelude::*;
use trip_shared::{
    CursorToken, ItemId, PageResult, PaginationConfig, Paginator, Record, MAX_PAGE_SIZE,
};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn pages(sizes: &[usize]) -> Vec<Result<PageResult<Record>, trip_shared::FetchError>> {
    let last = sizes.len().saturating_sub(1);
    sizes
        .iter()
        .enumerate()
        .map(|(n, &size)| {
            let more = n < last;
            let cursor = more.then(|| CursorToken::new(format!("c{n}")));
            Ok(PageResult::new(records(&format!("p{n}-"), size), cursor, more))
        })
        .collect()
}

fn ids(paginator: &Paginator<Record>) -> Vec<String> {
    paginator
        .items()
        .iter()
        .filter_map(|r| r.get("id").and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

proptest! {
    #[test]
    fn loaded_items_are_the_pages_in_order(sizes in prop::collection::vec(0usize..12, 1..6)) {
        let source = ScriptedSource::new(pages(&sizes));
        let paginator: Paginator<Record> = Paginator::default();

        block_on(async {
            paginator.load_first_page(&source, &()).await;
            while paginator.can_load_more() {
                paginator.load_next_page(&source, &()).await;
            }
        });

        let expected: Vec<String> = sizes
            .iter()
            .enumerate()
            .flat_map(|(n, &size)| (0..size).map(move |i| format!("p{n}-{i}")))
            .collect();
        prop_assert_eq!(ids(&paginator), expected);
        prop_assert_eq!(paginator.total_loaded(), sizes.iter().sum::<usize>());
        prop_assert_eq!(source.requests().len(), sizes.len());
        prop_assert!(!paginator.has_error());
    }

    #[test]
    fn page_size_is_always_clamped(requested in any::<usize>()) {
        let paginator: Paginator<Record> = Paginator::new(PaginationConfig::default());
        let stored = paginator.set_page_size(requested);

        prop_assert!((1..=MAX_PAGE_SIZE).contains(&stored));
        prop_assert_eq!(paginator.with_state(|s| s.page_size()), stored);
        if (1..=MAX_PAGE_SIZE).contains(&requested) {
            prop_assert_eq!(stored, requested);
        }
    }

    #[test]
    fn removing_a_loaded_item_shrinks_by_one(count in 1usize..20, pick in any::<prop::sample::Index>()) {
        let source = ScriptedSource::new(vec![Ok(PageResult::new(records("r", count), None, false))]);
        let paginator: Paginator<Record> = Paginator::default();
        block_on(paginator.load_first_page(&source, &()));

        let target = format!("r{}", pick.index(count));
        let removed = paginator.remove_item(&ItemId::new(target.as_str()));

        prop_assert!(removed.is_some());
        prop_assert_eq!(paginator.total_loaded(), count - 1);
        prop_assert!(!ids(&paginator).contains(&target));
    }
}
