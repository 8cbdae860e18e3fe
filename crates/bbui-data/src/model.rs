#![forbid(unsafe_code)]

//! Entity kinds shown by the dashboard.
//!
//! Each kind is served from its own endpoint and identified by an integer id.
//! [`Entity::field`] exposes the subset of fields queries can filter and sort
//! on.

use crate::dependency::DepValue;

pub type EntityId = i64;

/// A server-side record that can live in a [`crate::DataCollection`].
pub trait Entity: Clone + 'static {
    /// Endpoint the entity kind is served from, e.g. `"builders"`.
    const ENDPOINT: &'static str;

    fn id(&self) -> EntityId;

    /// Value of a named field, or `None` if the kind has no such field.
    fn field(&self, name: &str) -> Option<DepValue>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Builder {
    pub builderid: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub masterids: Vec<EntityId>,
    pub tags: Vec<String>,
}

impl Builder {
    #[must_use]
    pub fn new(builderid: EntityId, name: impl Into<String>) -> Self {
        Self {
            builderid,
            name: name.into(),
            description: None,
            masterids: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_masters(mut self, masterids: impl IntoIterator<Item = EntityId>) -> Self {
        self.masterids = masterids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl Entity for Builder {
    const ENDPOINT: &'static str = "builders";

    fn id(&self) -> EntityId {
        self.builderid
    }

    fn field(&self, name: &str) -> Option<DepValue> {
        match name {
            "builderid" => Some(self.builderid.into()),
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.clone().into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Master {
    pub masterid: EntityId,
    pub name: String,
    pub active: bool,
    pub last_active: i64,
}

impl Master {
    #[must_use]
    pub fn new(masterid: EntityId, name: impl Into<String>, active: bool) -> Self {
        Self {
            masterid,
            name: name.into(),
            active,
            last_active: 0,
        }
    }
}

impl Entity for Master {
    const ENDPOINT: &'static str = "masters";

    fn id(&self) -> EntityId {
        self.masterid
    }

    fn field(&self, name: &str) -> Option<DepValue> {
        match name {
            "masterid" => Some(self.masterid.into()),
            "name" => Some(self.name.as_str().into()),
            "active" => Some(self.active.into()),
            "last_active" => Some(self.last_active.into()),
            _ => None,
        }
    }
}

/// Builder/master pair a worker is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerConfig {
    pub builderid: EntityId,
    pub masterid: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Worker {
    pub workerid: EntityId,
    pub name: String,
    pub configured_on: Vec<WorkerConfig>,
    /// Masters the worker currently has a connection to.
    pub connected_to: Vec<EntityId>,
}

impl Worker {
    #[must_use]
    pub fn new(workerid: EntityId, name: impl Into<String>) -> Self {
        Self {
            workerid,
            name: name.into(),
            configured_on: Vec::new(),
            connected_to: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.connected_to.is_empty()
    }
}

impl Entity for Worker {
    const ENDPOINT: &'static str = "workers";

    fn id(&self) -> EntityId {
        self.workerid
    }

    fn field(&self, name: &str) -> Option<DepValue> {
        match name {
            "workerid" => Some(self.workerid.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Build {
    pub buildid: EntityId,
    pub builderid: EntityId,
    pub buildrequestid: EntityId,
    pub number: i64,
    pub started_at: i64,
    pub complete: bool,
    pub complete_at: Option<i64>,
    pub results: Option<i64>,
    pub state_string: String,
}

impl Build {
    #[must_use]
    pub fn new(buildid: EntityId, builderid: EntityId, number: i64, started_at: i64) -> Self {
        Self {
            buildid,
            builderid,
            buildrequestid: 0,
            number,
            started_at,
            complete: false,
            complete_at: None,
            results: None,
            state_string: String::from("building"),
        }
    }

    /// Mark the build finished with a result code.
    #[must_use]
    pub fn finished(mut self, complete_at: i64, results: i64) -> Self {
        self.complete = true;
        self.complete_at = Some(complete_at);
        self.results = Some(results);
        self.state_string = String::from("finished");
        self
    }
}

impl Entity for Build {
    const ENDPOINT: &'static str = "builds";

    fn id(&self) -> EntityId {
        self.buildid
    }

    fn field(&self, name: &str) -> Option<DepValue> {
        match name {
            "buildid" => Some(self.buildid.into()),
            "builderid" => Some(self.builderid.into()),
            "buildrequestid" => Some(self.buildrequestid.into()),
            "number" => Some(self.number.into()),
            "started_at" => Some(self.started_at.into()),
            "complete" => Some(self.complete.into()),
            "complete_at" => Some(self.complete_at.into()),
            "results" => Some(self.results.into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Buildrequest {
    pub buildrequestid: EntityId,
    pub builderid: EntityId,
    pub buildsetid: EntityId,
    pub claimed: bool,
    pub priority: i64,
    pub submitted_at: i64,
    pub results: Option<i64>,
}

impl Buildrequest {
    #[must_use]
    pub fn new(buildrequestid: EntityId, builderid: EntityId, submitted_at: i64) -> Self {
        Self {
            buildrequestid,
            builderid,
            buildsetid: 0,
            claimed: false,
            priority: 0,
            submitted_at,
            results: None,
        }
    }
}

impl Entity for Buildrequest {
    const ENDPOINT: &'static str = "buildrequests";

    fn id(&self) -> EntityId {
        self.buildrequestid
    }

    fn field(&self, name: &str) -> Option<DepValue> {
        match name {
            "buildrequestid" => Some(self.buildrequestid.into()),
            "builderid" => Some(self.builderid.into()),
            "buildsetid" => Some(self.buildsetid.into()),
            "claimed" => Some(self.claimed.into()),
            "priority" => Some(self.priority.into()),
            "submitted_at" => Some(self.submitted_at.into()),
            "results" => Some(self.results.into()),
            _ => None,
        }
    }
}
