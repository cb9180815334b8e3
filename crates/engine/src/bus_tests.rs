// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn completion(name: &str) -> BusEvent {
    BusEvent::Completion {
        id: EventId::from("e1"),
        event: TaskCompletionEvent::success(name, None),
    }
}

fn progress(task: &str) -> BusEvent {
    BusEvent::Progress(TaskProgressEvent::new(task, 50))
}

#[parameterized(
    all_completion = { BusFilter::All, completion("c"), true },
    all_progress = { BusFilter::All, progress("c"), true },
    completions_only = { BusFilter::Completions, progress("c"), false },
    progress_only = { BusFilter::Progress, progress("c"), true },
    task_match = { BusFilter::Task("c".into()), completion("c"), true },
    task_mismatch = { BusFilter::Task("c".into()), progress("d"), false },
)]
fn filter_matching(filter: BusFilter, event: BusEvent, expected: bool) {
    assert_eq!(filter.matches(&event), expected);
}

#[tokio::test]
async fn publish_routes_to_matching_subscribers() {
    let bus = ProgressBus::new();
    let (_, mut all) = bus.subscribe(BusFilter::All);
    let (_, mut done) = bus.subscribe(BusFilter::Completions);

    assert_eq!(bus.publish(progress("c")), 1);
    assert_eq!(bus.publish(completion("c")), 2);

    assert_eq!(all.recv().await, Some(progress("c")));
    assert_eq!(all.recv().await, Some(completion("c")));
    assert_eq!(done.recv().await, Some(completion("c")));
    assert!(done.try_recv().is_err());
}

#[test]
fn dropped_receivers_are_pruned() {
    let bus = ProgressBus::new();
    let (_, rx) = bus.subscribe(BusFilter::All);
    let (_, _kept) = bus.subscribe(BusFilter::All);
    drop(rx);
    assert_eq!(bus.publish(progress("c")), 1);
    assert_eq!(bus.subscriber_count(), 1);
}

#[test]
fn unsubscribe_stops_delivery() {
    let bus = ProgressBus::new();
    let (id, mut rx) = bus.subscribe(BusFilter::All);
    bus.unsubscribe(id);
    assert_eq!(bus.publish(progress("c")), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn reporter_clamps_progress() {
    let bus = ProgressBus::new();
    let (_, mut rx) = bus.subscribe(BusFilter::Progress);
    let reporter = bus.reporter("upload");

    reporter.report(150, Some("almost"));
    reporter.report(-3, None);
    reporter.report_step(1, 4, None);

    let BusEvent::Progress(first) = rx.try_recv().unwrap() else {
        panic!("expected progress");
    };
    assert_eq!(first.progress, 100);
    assert_eq!(first.message.as_deref(), Some("almost"));

    let BusEvent::Progress(second) = rx.try_recv().unwrap() else {
        panic!("expected progress");
    };
    assert_eq!(second.progress, 0);

    let BusEvent::Progress(third) = rx.try_recv().unwrap() else {
        panic!("expected progress");
    };
    assert_eq!(third.progress, 25);
    assert_eq!(third.current_step, Some(1));
    assert_eq!(third.total_steps, Some(4));
}
