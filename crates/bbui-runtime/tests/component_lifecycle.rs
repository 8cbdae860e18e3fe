//! End-to-end lifecycle of a builders overview component.
//!
//! The component mirrors the dashboard's builders page: one accessor, static
//! queries for builders, masters and workers, and a dynamic query for the
//! recent builds of whichever builders are currently shown.

use bbui_data::{
    Build, Builder, Closable, DataCollection, DataError, DepValue, Master, MemorySession, Query,
    Session, Worker,
};
use bbui_runtime::{ComponentHost, ComponentId, RenderCx, RuntimeConfig, RuntimeError};
use proptest::prelude::*;
use tracing_test::traced_test;

struct Overview {
    builders: DataCollection<Builder>,
    masters: DataCollection<Master>,
    workers: DataCollection<Worker>,
    builds: DataCollection<Build>,
}

fn seeded_session() -> MemorySession {
    let session = MemorySession::new();
    session.insert([
        Builder::new(1, "linux").with_tags(["fast"]),
        Builder::new(2, "mac"),
        Builder::new(3, "windows").with_tags(["slow"]),
    ]);
    session.insert([Master::new(1, "m1", true)]);
    session.insert([Worker::new(1, "w1"), Worker::new(2, "w2")]);
    session.insert((1..=9).map(|i| Build::new(i, (i - 1) % 3 + 1, i, i * 100)));
    session
}

/// Renders the overview for the builders in `shown`. An empty `shown` yields
/// an empty placeholder without touching the server.
fn overview(
    cx: &mut RenderCx<'_, MemorySession>,
    shown: &[i64],
) -> Result<Overview, RuntimeError> {
    let handle = cx.use_accessor()?;
    let builders = cx.use_query(|| handle.get_all::<Builder>())?;
    let masters = cx.use_query(|| handle.get::<Master>(Query::new().filter_eq("active", true)))?;
    let workers = cx.use_query(|| handle.get_all::<Worker>())?;

    let deps: Vec<DepValue> = shown.iter().copied().map(DepValue::from).collect();
    let builds = cx.use_dynamic_query(&deps, || {
        if shown.is_empty() {
            return Ok(DataCollection::empty());
        }
        handle.get::<Build>(
            Query::new()
                .filter_in("builderid", shown.iter().copied())
                .order_by("-started_at")
                .limit(15),
        )
    })?;

    Ok(Overview {
        builders,
        masters,
        workers,
        builds,
    })
}

fn mount(host: &mut ComponentHost<MemorySession>) -> ComponentId {
    host.mount("builders-overview")
}

#[test]
fn rerender_with_same_builders_reuses_everything() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);

    let first = host.render(id, |cx| overview(cx, &[1, 2])).unwrap();
    let second = host.render(id, |cx| overview(cx, &[1, 2])).unwrap();

    assert!(first.builders.ptr_eq(&second.builders));
    assert!(first.masters.ptr_eq(&second.masters));
    assert!(first.workers.ptr_eq(&second.workers));
    assert!(first.builds.ptr_eq(&second.builds));
    assert_eq!(first.builds.len(), 6);
    assert_eq!(first.builders.len(), 3);

    let stats = host.session().stats();
    assert_eq!(stats.handles_opened, 1);
    assert_eq!(stats.fetches, 4);
}

#[test]
fn changing_builders_refetches_only_builds() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);

    let first = host.render(id, |cx| overview(cx, &[1, 2])).unwrap();
    let second = host.render(id, |cx| overview(cx, &[1, 3])).unwrap();

    assert!(first.builds.is_closed());
    assert!(!second.builds.is_closed());
    assert!(second.builders.ptr_eq(&first.builders));
    assert!(!second.builders.is_closed());
    assert!(second.builds.array().iter().all(|b| b.builderid != 2));
    assert_eq!(host.session().stats().fetches, 5);
}

#[test]
fn empty_selection_uses_placeholder() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);

    let shown = host.render(id, |cx| overview(cx, &[1])).unwrap();
    let empty = host.render(id, |cx| overview(cx, &[])).unwrap();
    let again = host.render(id, |cx| overview(cx, &[])).unwrap();

    assert!(shown.builds.is_closed());
    assert!(empty.builds.is_empty());
    assert!(empty.builds.is_resolved());
    assert!(empty.builds.ptr_eq(&again.builds));
    // Placeholders never hit the server.
    assert_eq!(host.session().stats().fetches, 4);
}

#[test]
fn pushed_builds_reach_the_live_collection() {
    let session = seeded_session();
    let mut host = ComponentHost::new(session.clone());
    let id = mount(&mut host);

    let view = host.render(id, |cx| overview(cx, &[2])).unwrap();
    let before = view.builds.len();

    session.publish(Build::new(50, 2, 4, 5000));
    session.publish(Build::new(51, 3, 4, 5100));
    assert_eq!(view.builds.len(), before + 1);
    assert!(view.builds.contains(50));
    assert!(!view.builds.contains(51));
}

#[test]
fn unmount_closes_every_collection() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);

    let first = host.render(id, |cx| overview(cx, &[1])).unwrap();
    let second = host.render(id, |cx| overview(cx, &[2])).unwrap();
    assert!(host.unmount(id));

    for closed in [
        first.builders.is_closed(),
        first.masters.is_closed(),
        first.workers.is_closed(),
        first.builds.is_closed(),
        second.builds.is_closed(),
    ] {
        assert!(closed);
    }
    let stats = host.session().stats();
    assert_eq!(stats.handles_closed, 1);
    assert_eq!(stats.open_handles(), 0);
}

#[test]
fn instances_do_not_share_caches() {
    let mut host = ComponentHost::new(seeded_session());
    let a = mount(&mut host);
    let b = mount(&mut host);

    let va = host.render(a, |cx| overview(cx, &[1])).unwrap();
    let vb = host.render(b, |cx| overview(cx, &[1])).unwrap();
    assert!(!va.builds.ptr_eq(&vb.builds));
    assert_eq!(host.session().stats().handles_opened, 2);

    host.unmount(a);
    assert!(va.builds.is_closed());
    assert!(!vb.builds.is_closed());
    assert_eq!(host.session().stats().open_handles(), 1);
}

#[test]
fn failed_refetch_keeps_previous_builds() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);

    let first = host.render(id, |cx| overview(cx, &[1])).unwrap();
    host.session().fail_next_fetch("502 bad gateway");
    let err = host.render(id, |cx| overview(cx, &[2])).err();
    assert!(matches!(
        err,
        Some(RuntimeError::Data(DataError::FetchFailed { .. }))
    ));
    assert!(!first.builds.is_closed());

    let again = host.render(id, |cx| overview(cx, &[1])).unwrap();
    assert!(again.builds.ptr_eq(&first.builds));

    let moved = host.render(id, |cx| overview(cx, &[2])).unwrap();
    assert!(first.builds.is_closed());
    assert_eq!(moved.builds.len(), 3);
}

#[test]
fn refused_open_surfaces_and_recovers() {
    let session = seeded_session();
    session.refuse_open("not logged in");
    let mut host = ComponentHost::new(session);
    let id = mount(&mut host);

    let err = host.render(id, |cx| overview(cx, &[1])).err();
    assert!(matches!(
        err,
        Some(RuntimeError::Data(DataError::OpenRefused { .. }))
    ));
    assert_eq!(host.session().stats().fetches, 0);

    host.session().allow_open();
    let view = host.render(id, |cx| overview(cx, &[1])).unwrap();
    assert_eq!(view.builds.len(), 3);
}

#[test]
fn fetching_through_released_handle_fails() {
    let session = seeded_session();
    let handle = session.open().unwrap();
    handle.close();
    let err = handle.get_all::<Builder>().unwrap_err();
    assert_eq!(err, DataError::HandleReleased { handle: 1 });
}

#[traced_test]
#[test]
fn second_unmount_is_logged_and_ignored() {
    let mut host = ComponentHost::new(seeded_session());
    let id = mount(&mut host);
    host.render(id, |cx| overview(cx, &[1])).unwrap();

    assert!(host.unmount(id));
    assert!(!host.unmount(id));
    assert!(logs_contain("component torn down"));
    assert!(logs_contain("unmount of component that is not mounted"));
    assert_eq!(host.session().stats().handles_closed, 1);
}

#[traced_test]
#[test]
fn leaked_components_are_reported() {
    let session = seeded_session();
    {
        let mut host = ComponentHost::new(session.clone());
        let id = mount(&mut host);
        host.render(id, |cx| overview(cx, &[1])).unwrap();
    }
    assert!(logs_contain("host dropped with components still mounted"));
    assert_eq!(session.stats().open_handles(), 0);
}

#[traced_test]
#[test]
fn leak_warning_can_be_disabled() {
    let session = seeded_session();
    {
        let mut host = ComponentHost::new(session.clone())
            .with_config(RuntimeConfig::default().with_warn_on_leaked_components(false));
        mount(&mut host);
    }
    assert!(!logs_contain("host dropped with components still mounted"));
}

// ═════════════════════════════════════════════════════════════════════════
// Render/unmount churn
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Step {
    Mount,
    Render { slot: usize, shown: Vec<i64> },
    Unmount { slot: usize },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => Just(Step::Mount),
        4 => (0usize..4, proptest::collection::vec(1i64..=3, 0..3))
            .prop_map(|(slot, shown)| Step::Render { slot, shown }),
        1 => (0usize..4).prop_map(|slot| Step::Unmount { slot }),
    ]
}

proptest! {
    #[test]
    fn open_handles_match_rendered_instances(steps in proptest::collection::vec(step_strategy(), 1..40)) {
        let session = seeded_session();
        let mut host = ComponentHost::new(session.clone())
            .with_config(RuntimeConfig::default().with_warn_on_leaked_components(false));
        let mut ids: Vec<ComponentId> = Vec::new();
        let mut rendered: Vec<ComponentId> = Vec::new();

        for step in steps {
            match step {
                Step::Mount => ids.push(mount(&mut host)),
                Step::Render { slot, shown } => {
                    if let Some(&id) = ids.get(slot) {
                        let result = host.render(id, |cx| overview(cx, &shown));
                        if host.is_mounted(id) {
                            prop_assert!(result.is_ok());
                            if !rendered.contains(&id) {
                                rendered.push(id);
                            }
                        } else {
                            prop_assert_eq!(result.err(), Some(RuntimeError::UnknownComponent(id)));
                        }
                    }
                }
                Step::Unmount { slot } => {
                    if let Some(&id) = ids.get(slot) {
                        let was_mounted = host.is_mounted(id);
                        prop_assert_eq!(host.unmount(id), was_mounted);
                        rendered.retain(|r| *r != id);
                    }
                }
            }
            prop_assert_eq!(session.stats().open_handles(), rendered.len() as u64);
        }

        drop(host);
        prop_assert_eq!(session.stats().open_handles(), 0);
    }
}
