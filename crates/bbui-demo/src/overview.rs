#![forbid(unsafe_code)]

//! The builders overview component and the scripted run that drives it.

use bbui_data::{
    Build, Builder, Buildrequest, DataCollection, DependencyVector, Master, MemorySession, Query,
    SessionStats, Worker,
};
use bbui_runtime::{ComponentHost, RenderCx, RuntimeConfig, RuntimeError};
use serde::Serialize;
use tracing::info;

use crate::cli::Opts;

/// Most recent builds shown for the selected builders.
const RECENT_BUILDS: usize = 15;

pub struct Overview {
    pub builders: DataCollection<Builder>,
    pub masters: DataCollection<Master>,
    pub workers: DataCollection<Worker>,
    pub builds: DataCollection<Build>,
    pub pending: DataCollection<Buildrequest>,
}

/// Render one frame of the overview for the builders in `shown`.
pub fn overview(
    cx: &mut RenderCx<'_, MemorySession>,
    shown: &DependencyVector,
) -> Result<Overview, RuntimeError> {
    let handle = cx.use_accessor()?;
    let builders = cx.use_query(|| handle.get::<Builder>(Query::new().order_by("name")))?;
    let masters = cx.use_query(|| handle.get::<Master>(Query::new().filter_eq("active", true)))?;
    let workers = cx.use_query(|| handle.get_all::<Worker>())?;

    let builds = cx.use_dynamic_query(shown, || {
        if shown.is_empty() {
            return Ok(DataCollection::empty());
        }
        handle.get::<Build>(
            Query::new()
                .filter_in("builderid", shown.iter().cloned())
                .filter_eq("complete", false)
                .order_by("-started_at")
                .limit(RECENT_BUILDS),
        )
    })?;

    let pending = cx.use_dynamic_query(shown, || {
        if shown.is_empty() {
            return Ok(DataCollection::empty());
        }
        handle.get::<Buildrequest>(
            Query::new()
                .filter_in("builderid", shown.iter().cloned())
                .filter_eq("claimed", false)
                .order_by("submitted_at"),
        )
    })?;

    Ok(Overview {
        builders,
        masters,
        workers,
        builds,
        pending,
    })
}

pub fn seed(session: &MemorySession, builders: i64) {
    session.insert((1..=builders).map(|id| {
        Builder::new(id, format!("builder-{id:02}"))
            .with_masters([1])
            .with_tags(if id % 2 == 0 { ["even"] } else { ["odd"] })
    }));
    session.insert([Master::new(1, "master-a", true), Master::new(2, "master-b", false)]);
    session.insert((1..=builders.max(1)).map(|id| Worker::new(id, format!("worker-{id}"))));
    session.insert((1..=builders * 4).map(|buildid| {
        let builderid = (buildid - 1) % builders.max(1) + 1;
        let build = Build::new(buildid, builderid, buildid, buildid * 60);
        if buildid % 3 == 0 {
            build.finished(buildid * 60 + 30, 0)
        } else {
            build
        }
    }));
    session.insert((1..=builders * 2).map(|id| {
        let builderid = (id - 1) % builders.max(1) + 1;
        let mut request = Buildrequest::new(id, builderid, id * 45);
        request.claimed = id % 2 == 0;
        request
    }));
}

/// Pages of builder ids, followed by an empty selection.
pub fn pages(builders: i64, page_size: usize) -> Vec<DependencyVector> {
    let ids: Vec<i64> = (1..=builders).collect();
    let mut pages: Vec<DependencyVector> = ids
        .chunks(page_size)
        .map(|chunk| DependencyVector::from_values(chunk.iter().copied()))
        .collect();
    pages.push(DependencyVector::new());
    pages
}

#[derive(Debug, Serialize)]
pub struct Frame {
    pub render: u32,
    pub shown: DependencyVector,
    pub builds: usize,
    /// Unclaimed build requests for the shown builders.
    pub pending: usize,
    pub refetched: bool,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub frames: Vec<Frame>,
    pub builders: usize,
    pub masters: usize,
    pub workers: usize,
    pub stats: SessionStats,
}

/// Mount the overview, render it `opts.renders` times while paging through
/// the builders, then unmount it.
pub fn run(opts: &Opts, config: RuntimeConfig) -> Result<Summary, RuntimeError> {
    let session = MemorySession::new();
    seed(&session, opts.builders);
    let pages = pages(opts.builders, opts.page_size);

    let mut host = ComponentHost::new(session.clone()).with_config(config);
    let id = host.mount("builders-overview");
    let mut frames = Vec::with_capacity(opts.renders as usize);
    let mut counts = (0, 0, 0);

    for render in 0..opts.renders {
        let shown = &pages[(render as usize / 2) % pages.len()];
        if render == opts.renders / 2
            && let Some(builderid) = shown.first().and_then(|v| v.as_int())
        {
            let buildid = opts.builders * 4 + i64::from(render) + 1;
            session.publish(Build::new(buildid, builderid, buildid, buildid * 60));
            info!(buildid, builderid, "new build published");
        }

        let before = session.stats().fetches;
        let view = host.render(id, |cx| overview(cx, shown))?;
        counts = (view.builders.len(), view.masters.len(), view.workers.len());
        frames.push(Frame {
            render: render + 1,
            shown: shown.clone(),
            builds: view.builds.len(),
            pending: view.pending.len(),
            refetched: session.stats().fetches > before,
        });
    }

    host.unmount(id);
    Ok(Summary {
        frames,
        builders: counts.0,
        masters: counts.1,
        workers: counts.2,
        stats: session.stats(),
    })
}
