#![forbid(unsafe_code)]

//! Query descriptors captured by fetch callbacks.
//!
//! A [`Query`] narrows the entities of one endpoint with field filters, an
//! optional ordering and an optional limit. The transport decides how the
//! query is sent to the server; [`Query::apply`] evaluates it locally.

use std::cmp::Ordering;
use std::fmt;

use crate::dependency::DepValue;
use crate::model::Entity;

/// A single field predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field == value`
    Eq { field: String, value: DepValue },
    /// `field` is one of `values`. An empty list matches nothing.
    In { field: String, values: Vec<DepValue> },
}

impl Filter {
    #[must_use]
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Self::Eq { field, value } => entity.field(field).as_ref() == Some(value),
            Self::In { field, values } => entity
                .field(field)
                .is_some_and(|actual| values.contains(&actual)),
        }
    }
}

/// Sort key. Parsed from `"field"` (ascending) or `"-field"` (descending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_owned(),
                descending: true,
            },
            None => Self {
                field: raw.to_owned(),
                descending: false,
            },
        }
    }

    fn compare<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        let ord = a.field(&self.field).cmp(&b.field(&self.field));
        if self.descending { ord.reverse() } else { ord }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<DepValue>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn filter_in<V: Into<DepValue>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, raw: &str) -> Self {
        self.order = Some(Order::parse(raw));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    #[must_use]
    pub fn max_items(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `entity` passes every filter. Ordering and limit are ignored.
    #[must_use]
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.filters.iter().all(|f| f.matches(entity))
    }

    /// Filter, sort (stable) and truncate `items`.
    pub fn apply<E: Entity>(&self, items: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut out: Vec<E> = items.into_iter().filter(|e| self.matches(e)).collect();
        if let Some(order) = &self.order {
            out.sort_by(|a, b| order.compare(a, b));
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for filter in &self.filters {
            match filter {
                Filter::Eq { field, value } => write!(f, "{sep}{field}__eq={value}")?,
                Filter::In { field, values } => {
                    write!(f, "{sep}{field}__in=[")?;
                    for (i, v) in values.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{v}")?;
                    }
                    f.write_str("]")?;
                }
            }
            sep = "&";
        }
        if let Some(order) = &self.order {
            let dir = if order.descending { "-" } else { "" };
            write!(f, "{sep}order={dir}{}", order.field)?;
            sep = "&";
        }
        if let Some(limit) = self.limit {
            write!(f, "{sep}limit={limit}")?;
        }
        Ok(())
    }
}
