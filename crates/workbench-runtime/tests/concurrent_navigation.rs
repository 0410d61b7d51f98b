//! Consistent reads while navigations are in flight.
//!
//! A navigation blocked on a guard holds back every navigation queued after
//! it; readers see either the layout before both or the layout after both.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use proptest::prelude::*;
use workbench_layout::{Layout, MAIN_AREA_INITIAL_PART, ViewOptions};
use workbench_runtime::{LayoutStore, NavigationOutcome, NavigationTicket, TicketId};

fn open(id: String) -> impl FnOnce(&Layout) -> Result<Layout, workbench_layout::LayoutError> + Send {
    move |layout| layout.add_view(id, MAIN_AREA_INITIAL_PART, &ViewOptions::default())
}

fn view_ids(layout: &Layout) -> BTreeSet<String> {
    layout.views().map(|view| view.id.to_string()).collect()
}

#[test]
fn scenario_e_guarded_navigation_holds_back_later_ones() {
    let store = Arc::new(LayoutStore::new(Layout::new(), 8));
    let (release_guard, guard) = mpsc::channel::<()>();
    let (queued_tx, queued_rx) = mpsc::channel::<()>();

    let guarded = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let ticket = store.begin("view.1").expect("queued");
            queued_tx.send(()).expect("signal");
            guard.recv().expect("guard resolves");
            store.complete(ticket, open("view.1".into())).expect("completed")
        })
    };
    queued_rx.recv().expect("guarded navigation queued");

    let unguarded = store
        .navigate("view.2", open("view.2".into()))
        .expect("queued");
    assert!(view_ids(&store.layout()).is_empty());
    assert_eq!(store.take_outcome(unguarded), None);
    assert_eq!(store.generation(), 0);

    release_guard.send(()).expect("release");
    let guarded = guarded.join().expect("guard thread");

    assert_eq!(store.take_outcome(guarded), Some(NavigationOutcome::Applied));
    assert_eq!(store.take_outcome(unguarded), Some(NavigationOutcome::Applied));
    assert_eq!(
        view_ids(&store.layout()),
        BTreeSet::from(["view.1".to_owned(), "view.2".to_owned()])
    );
    assert_eq!(store.generation(), 1);
}

#[test]
fn readers_never_observe_a_single_view_state() {
    let store = Arc::new(LayoutStore::new(Layout::new(), 8));
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut observed = BTreeSet::new();
            while !done.load(Ordering::Acquire) {
                let _ = observed.insert(view_ids(&store.load_ref()).len());
                thread::yield_now();
            }
            let _ = observed.insert(view_ids(&store.load_ref()).len());
            observed
        })
    };

    for round in 0..50 {
        let first = store.begin(format!("round {round} a")).expect("queued");
        let second = store
            .navigate(format!("round {round} b"), open(format!("view.{}", round * 2 + 2)))
            .expect("queued");
        let _ = store
            .complete(first, open(format!("view.{}", round * 2 + 1)))
            .expect("completed");
        assert_eq!(store.take_outcome(second), Some(NavigationOutcome::Applied));
    }
    done.store(true, Ordering::Release);

    let observed = reader.join().expect("reader thread");
    assert!(observed.iter().all(|count| count % 2 == 0), "{observed:?}");
    assert_eq!(view_ids(&store.layout()).len(), 100);
}

#[test]
fn superseded_navigation_is_discarded() {
    let store = LayoutStore::new(Layout::new(), 8);
    let stale = store.begin("view.1").expect("queued");
    let fresh = store.navigate("view.2", open("view.2".into())).expect("queued");
    let stale = store.cancel(stale).expect("cancelled");

    assert_eq!(store.take_outcome(stale), Some(NavigationOutcome::Cancelled));
    assert_eq!(store.take_outcome(fresh), Some(NavigationOutcome::Applied));
    assert_eq!(
        view_ids(&store.layout()),
        BTreeSet::from(["view.2".to_owned()])
    );
}

// ---- Interleavings ----

#[derive(Debug, Clone)]
enum Step {
    Begin,
    Complete(usize),
    Cancel(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => Just(Step::Begin),
        3 => any::<usize>().prop_map(Step::Complete),
        1 => any::<usize>().prop_map(Step::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn publications_follow_queue_order(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let store = LayoutStore::new(Layout::new(), 64);
        let mut open_tickets: Vec<(NavigationTicket, usize)> = Vec::new();
        let mut settled: Vec<(TicketId, usize, bool)> = Vec::new();
        let mut sequence = 0;

        for step in steps {
            match step {
                Step::Begin => {
                    sequence += 1;
                    let ticket = store.begin(format!("nav {sequence}")).expect("queued");
                    open_tickets.push((ticket, sequence));
                }
                Step::Complete(pick) | Step::Cancel(pick) if !open_tickets.is_empty() => {
                    let (ticket, n) = open_tickets.remove(pick % open_tickets.len());
                    let id = ticket.id();
                    let applied = matches!(step, Step::Complete(_));
                    if applied {
                        let _ = store.complete(ticket, open(format!("view.{n}"))).expect("completed");
                    } else {
                        let _ = store.cancel(ticket).expect("cancelled");
                    }
                    settled.push((id, n, applied));
                }
                _ => {}
            }

            let published = view_ids(&store.layout());
            if open_tickets.is_empty() {
                let expected: BTreeSet<String> = settled
                    .iter()
                    .filter(|(_, _, applied)| *applied)
                    .map(|(_, n, _)| format!("view.{n}"))
                    .collect();
                prop_assert_eq!(published, expected);
            } else {
                let oldest = open_tickets.iter().map(|(_, n)| *n).min().unwrap_or(0);
                prop_assert!(published
                    .iter()
                    .all(|id| id.trim_start_matches("view.").parse::<usize>().is_ok_and(|n| n < oldest)));
            }
        }

        for (ticket, _) in open_tickets {
            let _ = store.cancel(ticket).expect("cancelled");
        }
        prop_assert_eq!(store.pending(), 0);
        for (id, _, applied) in settled {
            let outcome = store.take_outcome(id);
            prop_assert_eq!(
                outcome,
                Some(if applied { NavigationOutcome::Applied } else { NavigationOutcome::Cancelled })
            );
        }
    }
}
