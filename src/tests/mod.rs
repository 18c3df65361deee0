use std::collections::HashSet;

use crate::browser::{Browser, BrowserOptions};
use crate::intake::BulkIntake;
use crate::loader::{LoadOutcome, LoadState};
use crate::selection::BulkPolicy;
use crate::source::{Artwork, InlineSource, RecordKey};

fn browser(total: u64, policy: BulkPolicy) -> Browser<InlineSource<Artwork>> {
    Browser::new(
        InlineSource::synthetic(total, 12),
        BrowserOptions {
            page_size: 12,
            policy,
        },
    )
}

fn selected_ranks(browser: &Browser<InlineSource<Artwork>>) -> Vec<u64> {
    browser
        .visible_rows()
        .iter()
        .filter(|r| r.selected)
        .map(|r| r.row.rank())
        .collect()
}

#[tokio::test]
async fn bulk_select_spans_unloaded_pages() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.apply_bulk_directive(20);

    assert!(b.go_to_page(0).await.is_installed());
    assert_eq!(selected_ranks(&b), (1..=12).collect::<Vec<_>>());

    assert!(b.go_to_page(1).await.is_installed());
    assert_eq!(selected_ranks(&b), (13..=20).collect::<Vec<_>>());
    assert_eq!(b.total_selected_count(), 20);
}

#[tokio::test]
async fn manual_toggle_survives_paging_back() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.go_to_page(0).await;
    assert_eq!(b.toggle_position(4), Some(true));

    b.go_to_page(1).await;
    assert!(selected_ranks(&b).is_empty());
    b.go_to_page(0).await;
    assert_eq!(selected_ranks(&b), vec![5]);
    assert_eq!(b.total_selected_count(), 1);
}

async fn toggled_at_5_and_50(policy: BulkPolicy) -> Browser<InlineSource<Artwork>> {
    let mut b = browser(100, policy);
    b.go_to_page(0).await;
    b.toggle_position(4);
    // rank 50 lives on page 4 (ranks 49..=60)
    b.go_to_page(4).await;
    b.toggle_position(1);
    b.go_to_page(0).await;
    assert_eq!(b.total_selected_count(), 2);
    b.apply_bulk_directive(10);
    b
}

#[tokio::test]
async fn reset_policy_drops_manual_extras() {
    let mut b = toggled_at_5_and_50(BulkPolicy::Reset).await;
    assert_eq!(selected_ranks(&b), (1..=10).collect::<Vec<_>>());
    assert_eq!(b.total_selected_count(), 10);

    b.go_to_page(4).await;
    assert!(selected_ranks(&b).is_empty());
}

#[tokio::test]
async fn merge_policy_keeps_manual_extras() {
    let mut b = toggled_at_5_and_50(BulkPolicy::Merge).await;
    assert_eq!(selected_ranks(&b), (1..=10).collect::<Vec<_>>());
    assert_eq!(b.total_selected_count(), 11);

    b.go_to_page(4).await;
    assert_eq!(selected_ranks(&b), vec![50]);
}

#[tokio::test]
async fn merge_realizes_bulk_when_page_loads() {
    let mut b = browser(100, BulkPolicy::Merge);
    b.apply_bulk_directive(20);
    b.go_to_page(0).await;
    b.toggle_position(2);
    assert_eq!(b.total_selected_count(), 19);

    b.go_to_page(1).await;
    b.apply_bulk_directive(30);
    // page 0 still owes the bulk, so rank 3 stays cleared for now
    assert_eq!(b.total_selected_count(), 29);
    assert_eq!(selected_ranks(&b), (13..=24).collect::<Vec<_>>());

    b.go_to_page(0).await;
    assert_eq!(selected_ranks(&b), (1..=12).collect::<Vec<_>>());
    assert_eq!(b.total_selected_count(), 30);
}

#[tokio::test]
async fn invalid_bulk_input_changes_nothing() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.apply_bulk_directive(15);
    b.go_to_page(0).await;
    b.toggle_position(0);
    let before = b.selection().snapshot();

    let mut intake = BulkIntake::new();
    for raw in ["-5", "", "  ", "abc"] {
        intake.open();
        intake.set_input(raw);
        assert!(intake.submit(&mut b).is_err());
        assert!(intake.is_open());
    }

    let after = b.selection().snapshot();
    assert_eq!(after.bulk, before.bulk);
    assert_eq!(after.deselected, before.deselected);
    assert_eq!(b.selection().overrides_len(), 1);
}

#[tokio::test]
async fn intake_submission_reaches_loaded_page() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.go_to_page(0).await;
    let mut intake = BulkIntake::new();
    intake.open();
    intake.set_input("5");
    assert_eq!(intake.submit(&mut b), Ok(5));
    assert_eq!(selected_ranks(&b), (1..=5).collect::<Vec<_>>());
    assert!(!intake.is_open());
}

#[tokio::test]
async fn effective_selection_is_stable_between_mutations() {
    let mut b = browser(100, BulkPolicy::Merge);
    b.apply_bulk_directive(7);
    b.go_to_page(0).await;
    b.toggle_position(9);
    let first = b.effective_selection();
    let second = b.effective_selection();
    assert_eq!(first, second);
    assert_eq!(first.len(), 8);
}

#[tokio::test]
async fn bulk_covers_whole_page_or_none() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.apply_bulk_directive(36);
    b.go_to_page(2).await;
    assert_eq!(selected_ranks(&b).len(), 12);
    b.go_to_page(3).await;
    assert!(selected_ranks(&b).is_empty());
}

#[tokio::test]
async fn total_matches_enumeration_with_overrides_on_one_page() {
    for bulk in [0u64, 5, 12, 18, 24, 40, 150] {
        let mut b = browser(100, BulkPolicy::Reset);
        b.apply_bulk_directive(bulk);
        b.go_to_page(1).await;
        for position in [0usize, 3, 7, 11] {
            b.toggle_position(position);
        }
        let on_page = selected_ranks(&b).len() as u64;
        let bound = bulk.min(100);
        let off_page = bound.min(12) + bound.saturating_sub(24);
        assert_eq!(b.total_selected_count(), on_page + off_page, "bulk {bulk}");
    }
}

#[tokio::test]
async fn bulk_larger_than_dataset_selects_everything() {
    let mut b = browser(30, BulkPolicy::Reset);
    b.apply_bulk_directive(1_000);
    b.go_to_page(2).await;
    assert_eq!(selected_ranks(&b), (25..=30).collect::<Vec<_>>());
    assert_eq!(b.total_selected_count(), 30);
}

#[tokio::test]
async fn failed_page_keeps_last_good_page_and_selection() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.go_to_page(0).await;
    b.toggle_position(0);
    b.source_mut().fail_page(2);

    let outcome = b.next_page().await;
    assert!(matches!(outcome, Some(LoadOutcome::Failed(_))));
    assert_eq!(b.current_page_index(), Some(0));
    assert!(matches!(b.state(), LoadState::Failed { page: 1, .. }));
    assert_eq!(selected_ranks(&b), vec![1]);

    b.source_mut().heal_page(2);
    assert!(b.reload().await.is_installed());
    assert_eq!(b.current_page_index(), Some(1));
    assert!(!b.loading());
}

#[tokio::test]
async fn page_change_offset_maps_to_page_index() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.on_page_change(24).await;
    assert_eq!(b.current_page_index(), Some(2));
    assert_eq!(b.page().map(|p| p.first_rank()), Some(25));
}

#[tokio::test]
async fn navigation_stops_at_edges() {
    let mut b = browser(20, BulkPolicy::Reset);
    assert!(b.next_page().await.is_none());
    b.go_to_page(0).await;
    assert!(b.prev_page().await.is_none());
    assert!(b.next_page().await.is_some());
    assert!(b.next_page().await.is_none());
    assert_eq!(b.current_page_index(), Some(1));
}

#[tokio::test]
async fn page_selection_event_replaces_page_state() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.apply_bulk_directive(3);
    b.go_to_page(0).await;
    let keys: HashSet<RecordKey> = [RecordKey(2), RecordKey(9)].into_iter().collect();
    b.apply_page_selection(&keys);
    assert_eq!(selected_ranks(&b), vec![2, 9]);
    assert_eq!(b.total_selected_count(), 2);

    b.set_page_selected(true);
    assert_eq!(b.total_selected_count(), 12);
    b.set_page_selected(false);
    assert_eq!(b.total_selected_count(), 0);
}

#[tokio::test]
async fn huge_page_index_fails_instead_of_panicking() {
    let mut b = browser(100, BulkPolicy::Reset);
    for index in [u64::MAX / 4, u64::MAX] {
        let outcome = b.go_to_page(index).await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert_eq!(b.current_page_index(), None);
    }
    assert!(matches!(
        b.on_page_change(u64::MAX).await,
        LoadOutcome::Failed(_)
    ));

    assert!(b.go_to_page(0).await.is_installed());
    assert!(matches!(b.go_to_page(u64::MAX).await, LoadOutcome::Failed(_)));
    assert_eq!(b.current_page_index(), Some(0));
    assert_eq!(b.page().map(|p| p.first_rank()), Some(1));
}

#[tokio::test]
async fn row_kept_from_another_page_cannot_be_toggled() {
    let mut b = browser(100, BulkPolicy::Reset);
    b.go_to_page(0).await;
    let saved = b.page().and_then(|p| p.row(0)).unwrap();

    b.go_to_page(1).await;
    b.apply_bulk_directive(0);
    assert!(!b.toggle_row(saved, true));
    assert_eq!(b.selection().overrides_len(), 0);
    assert_eq!(b.total_selected_count(), 0);

    b.go_to_page(0).await;
    assert!(b.toggle_row(saved, true));
    assert_eq!(selected_ranks(&b), vec![1]);
    assert_eq!(b.total_selected_count(), 1);
}

async fn manual_changes_before_zero_bulk(policy: BulkPolicy) -> Browser<InlineSource<Artwork>> {
    let mut b = browser(100, policy);
    b.apply_bulk_directive(20);
    b.go_to_page(0).await;
    // rank 3 off, rank 50 on
    assert_eq!(b.toggle_position(2), Some(false));
    b.go_to_page(4).await;
    assert_eq!(b.toggle_position(1), Some(true));
    assert_eq!(b.selection().overrides_len(), 2);
    assert_eq!(b.total_selected_count(), 20);

    b.apply_bulk_directive(0);
    b
}

#[tokio::test]
async fn zero_bulk_under_reset_clears_everything() {
    let mut b = manual_changes_before_zero_bulk(BulkPolicy::Reset).await;
    assert_eq!(b.selection().overrides_len(), 0);
    assert_eq!(b.total_selected_count(), 0);
    assert!(selected_ranks(&b).is_empty());

    b.go_to_page(0).await;
    assert!(selected_ranks(&b).is_empty());
}

#[tokio::test]
async fn zero_bulk_under_merge_keeps_manual_extras() {
    let mut b = manual_changes_before_zero_bulk(BulkPolicy::Merge).await;
    assert_eq!(b.selection().overrides_len(), 1);
    assert_eq!(b.total_selected_count(), 1);
    assert_eq!(selected_ranks(&b), vec![50]);

    b.go_to_page(0).await;
    assert!(selected_ranks(&b).is_empty());
    assert_eq!(b.selection().pending_pages(), 0);
}
