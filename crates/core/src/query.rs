//! Query specification and execution
//!
//! A [`Query`] describes what to return from a keyspace scan: an
//! optional key prefix, an ordered list of filters, an ordered list of
//! orders, offset/limit, and whether values (or value sizes) are wanted.
//! [`Query::execute`] turns a source of raw entries into a lazy
//! [`Results`] sequence.
//!
//! ## Pipeline
//!
//! Filters are applied lazily, in the order given, before anything else,
//! so selective filters short-circuit without materializing the
//! keyspace. When no order is requested the source's natural
//! byte-lexicographic order is preserved end to end and the whole
//! pipeline stays lazy. Requesting any order forces the filtered set to
//! be materialized and stably sorted before emission resumes; a stable
//! multi-key sort cannot be done incrementally, so this is the one point
//! where laziness breaks. Offset and limit always apply last.
//!
//! Prefix handling is the caller's job: the datastore layer translates
//! `Query::prefix` into a bounded engine scan (see
//! `Key::descendant_range`) rather than post-filtering, and hands the
//! bounded source to `execute`.

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::key::Key;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A keep/drop predicate applied to candidate entries.
pub trait QueryFilter: Send + Sync {
    /// Whether `entry` should be kept in the result set.
    fn keep(&self, entry: &Entry) -> bool;

    /// Whether this filter reads entry values.
    ///
    /// Value-dependent filters cannot run on keys-only queries.
    fn requires_value(&self) -> bool {
        false
    }
}

/// A comparator contributing to the result ordering.
///
/// The first order in a query is primary; subsequent orders break ties
/// in sequence.
pub trait QueryOrder: Send + Sync {
    /// Compare two entries.
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering;

    /// Whether this order reads entry values.
    fn requires_value(&self) -> bool {
        false
    }
}

/// Comparison operator used by the stock filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Equal => ord == Ordering::Equal,
            CompareOp::NotEqual => ord != Ordering::Equal,
            CompareOp::GreaterThan => ord == Ordering::Greater,
            CompareOp::GreaterOrEqual => ord != Ordering::Less,
            CompareOp::LessThan => ord == Ordering::Less,
            CompareOp::LessOrEqual => ord != Ordering::Greater,
        }
    }
}

/// Keep entries whose key compares against a fixed key.
#[derive(Clone, Debug)]
pub struct FilterKeyCompare {
    /// Comparison to apply.
    pub op: CompareOp,
    /// Key compared against.
    pub key: Key,
}

impl QueryFilter for FilterKeyCompare {
    fn keep(&self, entry: &Entry) -> bool {
        self.op.accepts(entry.key.cmp(&self.key))
    }
}

/// Keep entries lying below a key in the path hierarchy.
#[derive(Clone, Debug)]
pub struct FilterKeyPrefix {
    /// Ancestor key; matching follows `Key::descends_from`.
    pub prefix: Key,
}

impl QueryFilter for FilterKeyPrefix {
    fn keep(&self, entry: &Entry) -> bool {
        entry.key.descends_from(&self.prefix)
    }
}

/// Keep entries whose value compares against fixed bytes.
#[derive(Clone, Debug)]
pub struct FilterValueCompare {
    /// Comparison to apply.
    pub op: CompareOp,
    /// Value compared against.
    pub value: Vec<u8>,
}

impl QueryFilter for FilterValueCompare {
    fn keep(&self, entry: &Entry) -> bool {
        match entry.value() {
            Some(value) => self.op.accepts(value.cmp(self.value.as_slice())),
            None => false,
        }
    }

    fn requires_value(&self) -> bool {
        true
    }
}

/// Ascending byte order over keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderByKey;

impl QueryOrder for OrderByKey {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        a.key.cmp(&b.key)
    }
}

/// Descending byte order over keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderByKeyDescending;

impl QueryOrder for OrderByKeyDescending {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        b.key.cmp(&a.key)
    }
}

/// Ascending byte order over values.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderByValue;

impl QueryOrder for OrderByValue {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        a.value().cmp(&b.value())
    }

    fn requires_value(&self) -> bool {
        true
    }
}

/// A query specification.
///
/// # Examples
///
/// ```
/// use shale_core::query::{OrderByKeyDescending, Query};
///
/// let query = Query::new()
///     .with_prefix("/users")
///     .order(OrderByKeyDescending)
///     .offset(10)
///     .limit(5);
/// assert_eq!(query.offset, 10);
/// ```
#[derive(Clone, Default)]
pub struct Query {
    /// Restrict results to descendants of this key.
    pub prefix: Option<Key>,
    /// Predicates applied in order.
    pub filters: Vec<Arc<dyn QueryFilter>>,
    /// Comparators applied in order; first is primary.
    pub orders: Vec<Arc<dyn QueryOrder>>,
    /// Number of matching entries to skip.
    pub offset: usize,
    /// Maximum number of entries to return; `None` is unbounded.
    pub limit: Option<usize>,
    /// Return keys without values.
    pub keys_only: bool,
    /// Attach value sizes to returned entries.
    pub return_sizes: bool,
}

impl Query {
    /// An unrestricted query over the whole keyspace.
    pub fn new() -> Self {
        Query::default()
    }

    /// Restrict results to descendants of `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<Key>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Append a filter.
    pub fn filter(mut self, filter: impl QueryFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Append an order.
    pub fn order(mut self, order: impl QueryOrder + 'static) -> Self {
        self.orders.push(Arc::new(order));
        self
    }

    /// Skip the first `offset` matching entries.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return keys only, without values.
    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Attach value sizes to returned entries.
    pub fn return_sizes(mut self) -> Self {
        self.return_sizes = true;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.keys_only {
            if self.filters.iter().any(|f| f.requires_value()) {
                return Err(Error::invalid_query(
                    "filter requires entry values but the query is keys-only",
                ));
            }
            if self.orders.iter().any(|o| o.requires_value()) {
                return Err(Error::invalid_query(
                    "order requires entry values but the query is keys-only",
                ));
            }
        }
        Ok(())
    }

    /// Run this query over a source of raw entries.
    ///
    /// The source must already be bounded to `prefix` (the datastore
    /// layer does this with a bounded engine scan). With no orders the
    /// returned sequence is fully lazy and preserves the source order;
    /// with orders the filtered set is materialized and sorted here
    /// before the sequence is handed back.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` for a specification this query cannot satisfy;
    /// any source error encountered while materializing a sorted result.
    pub fn execute<S>(&self, source: S) -> Result<Results>
    where
        S: Iterator<Item = Result<(Key, Vec<u8>)>> + Send + 'static,
    {
        self.validate()?;
        let entries = source.map(|item| item.map(|(key, value)| Entry::new(key, value)));

        if self.orders.is_empty() {
            return Ok(Results::new(Box::new(Pipeline {
                source: Box::new(entries),
                filters: self.filters.clone(),
                skip: self.offset,
                remaining: self.limit,
                keys_only: self.keys_only,
                return_sizes: self.return_sizes,
                done: false,
            })));
        }

        // Sorted path: materialize the filtered set, stable-sort it with
        // the composite comparator, then re-expose it lazily.
        let mut matched = Vec::new();
        for item in entries {
            let entry = item?;
            if self.filters.iter().all(|f| f.keep(&entry)) {
                matched.push(entry);
            }
        }
        let orders = self.orders.clone();
        matched.sort_by(|a, b| composite_compare(&orders, a, b));

        let keys_only = self.keys_only;
        let return_sizes = self.return_sizes;
        let iter = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(move |entry| Ok(finish(entry, keys_only, return_sizes)));
        Ok(Results::new(Box::new(iter)))
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("prefix", &self.prefix)
            .field("filters", &self.filters.len())
            .field("orders", &self.orders.len())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("keys_only", &self.keys_only)
            .field("return_sizes", &self.return_sizes)
            .finish()
    }
}

fn composite_compare(orders: &[Arc<dyn QueryOrder>], a: &Entry, b: &Entry) -> Ordering {
    for order in orders {
        match order.compare(a, b) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }
    Ordering::Equal
}

fn finish(mut entry: Entry, keys_only: bool, return_sizes: bool) -> Entry {
    if return_sizes {
        entry.size = entry.value.as_ref().map(Vec::len);
    }
    if keys_only {
        entry.value = None;
    }
    entry
}

/// Lazy filter/offset/limit stage.
///
/// Offset and limit count only kept entries; a source error is yielded
/// once and then the sequence fuses.
struct Pipeline {
    source: Box<dyn Iterator<Item = Result<Entry>> + Send>,
    filters: Vec<Arc<dyn QueryFilter>>,
    skip: usize,
    remaining: Option<usize>,
    keys_only: bool,
    return_sizes: bool,
    done: bool,
}

impl Iterator for Pipeline {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            self.done = true;
            return None;
        }
        loop {
            let entry = match self.source.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(entry)) => entry,
            };
            if !self.filters.iter().all(|f| f.keep(&entry)) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(Ok(finish(entry, self.keys_only, self.return_sizes)));
        }
    }
}

/// A lazy, forward-only, non-restartable query result sequence.
///
/// Dropping the sequence, early or after exhaustion, releases the
/// engine iterator backing it.
pub struct Results {
    iter: Box<dyn Iterator<Item = Result<Entry>> + Send>,
}

impl Results {
    pub(crate) fn new(iter: Box<dyn Iterator<Item = Result<Entry>> + Send>) -> Self {
        Results { iter }
    }

    /// Drain the remaining entries, failing on the first error.
    pub fn rest(self) -> Result<Vec<Entry>> {
        self.collect()
    }
}

impl Iterator for Results {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
