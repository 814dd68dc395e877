//! Trace context and the incremental trace-ID protocol.
//!
//! A [`TraceId`] is a dot-separated chain of segments such as
//! `UICALL.C32PO.V40PO`. Every service that *receives* a request appends one
//! freshly generated 5-character segment; callers forward their current id
//! unchanged. The number of segments therefore equals the number of hops.
//!
//! ```text
//! UI ──UICALL──▶ orders ──UICALL.C32PO──▶ census
//!                 (UICALL.C32PO)            (UICALL.C32PO.V40PO)
//! ```
//!
//! The id of the request being handled lives in a task-local slot managed by
//! [`TraceContext`]. Each request runs inside its own scope, so concurrent
//! requests never observe each other's id. Work spawned onto other tasks does
//! not inherit the scope; hand the id over explicitly with
//! [`spawn_with_trace`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

/// Number of characters in a generated segment.
pub const SEGMENT_LEN: usize = 5;

/// Separator between segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Most segments an inbound id may carry.
pub const MAX_DEPTH: usize = 64;

/// Longest inbound id accepted, in bytes.
pub const MAX_TRACE_ID_LEN: usize = 512;

const SEGMENT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

tokio::task_local! {
    static CURRENT_TRACE: RefCell<Option<TraceId>>;
}

/// Generates a random segment of [`SEGMENT_LEN`] upper-case alphanumerics.
///
/// Segments are only locally distinguishing; collisions are possible.
#[must_use]
pub fn generate_segment() -> String {
    let mut rng = rand::thread_rng();
    (0..SEGMENT_LEN)
        .map(|_| char::from(SEGMENT_ALPHABET[rng.gen_range(0..SEGMENT_ALPHABET.len())]))
        .collect()
}

/// Errors produced when parsing a trace identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceIdParseError {
    /// The input was empty.
    #[error("trace id is empty")]
    Empty,
    /// Two separators were adjacent, or the id started or ended with one.
    #[error("trace id has an empty segment at position {position}")]
    EmptySegment {
        /// Zero-based segment index.
        position: usize,
    },
    /// The id is longer than [`MAX_TRACE_ID_LEN`] bytes.
    #[error("trace id is {len} bytes long, limit is {MAX_TRACE_ID_LEN}")]
    TooLong {
        /// Byte length of the input.
        len: usize,
    },
    /// The id has more than [`MAX_DEPTH`] segments.
    #[error("trace id has {depth} segments, limit is {MAX_DEPTH}")]
    TooDeep {
        /// Segment count of the input.
        depth: usize,
    },
    /// A segment contained a character outside `[A-Za-z0-9_-]`.
    #[error("trace id segment '{segment}' contains invalid character {character:?}")]
    InvalidCharacter {
        /// The offending segment.
        segment: String,
        /// The first invalid character.
        character: char,
    },
}

/// Returned when the trace context is mutated outside a [`TraceContext::scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no trace context scope is active on this task")]
pub struct TraceScopeError;

/// A hierarchical trace identifier.
///
/// Segments are only ever appended, never removed or modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId(String);

impl TraceId {
    /// Creates a single-segment id with a generated origin.
    #[must_use]
    pub fn new_origin() -> Self {
        Self(generate_segment())
    }

    /// Parses and validates a trace id.
    ///
    /// Ids longer than [`MAX_TRACE_ID_LEN`] bytes or deeper than
    /// [`MAX_DEPTH`] segments are rejected, so a runaway chain restarts
    /// instead of growing without bound.
    pub fn parse(value: &str) -> Result<Self, TraceIdParseError> {
        if value.is_empty() {
            return Err(TraceIdParseError::Empty);
        }
        if value.len() > MAX_TRACE_ID_LEN {
            return Err(TraceIdParseError::TooLong { len: value.len() });
        }
        let depth = value.split(SEGMENT_SEPARATOR).count();
        if depth > MAX_DEPTH {
            return Err(TraceIdParseError::TooDeep { depth });
        }
        for (position, segment) in value.split(SEGMENT_SEPARATOR).enumerate() {
            validate_segment(segment, position)?;
        }
        Ok(Self(value.to_string()))
    }

    /// Produces the id a receiving service should use.
    ///
    /// With no inbound id a fresh single-segment id is returned; otherwise a
    /// generated segment is appended to `current`.
    #[must_use]
    pub fn increment(current: Option<&TraceId>) -> TraceId {
        match current {
            Some(id) => id.child(),
            None => Self::new_origin(),
        }
    }

    /// Returns a copy of this id with one generated segment appended.
    #[must_use]
    pub fn child(&self) -> TraceId {
        Self(format!("{}{SEGMENT_SEPARATOR}{}", self.0, generate_segment()))
    }

    /// Returns a copy of this id with `segment` appended.
    pub fn append_segment(&self, segment: &str) -> Result<TraceId, TraceIdParseError> {
        validate_segment(segment, self.depth())?;
        Ok(Self(format!("{}{SEGMENT_SEPARATOR}{segment}", self.0)))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the segments, origin first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEGMENT_SEPARATOR)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The leftmost segment.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// The rightmost segment, added by the most recent receiver.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.0.rsplit(SEGMENT_SEPARATOR).next().unwrap_or_default()
    }

    /// Returns `true` if `other` extends this id by one or more segments.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &TraceId) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with(SEGMENT_SEPARATOR))
    }
}

fn validate_segment(segment: &str, position: usize) -> Result<(), TraceIdParseError> {
    if segment.is_empty() {
        return Err(TraceIdParseError::EmptySegment { position });
    }
    if let Some(character) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(TraceIdParseError::InvalidCharacter {
            segment: segment.to_string(),
            character,
        });
    }
    Ok(())
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TraceId {
    type Err = TraceIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TraceId {
    type Error = TraceIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.0
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Access to the trace id of the request running on the current task.
///
/// # Example
///
/// ```
/// use meridian_core::{TraceContext, TraceId};
///
/// # tokio_test::block_on(async {
/// let id = TraceId::parse("UICALL.C32PO").unwrap();
/// TraceContext::scope(Some(id.clone()), async move {
///     assert_eq!(TraceContext::current(), Some(id));
///     TraceContext::clear().unwrap();
///     assert_eq!(TraceContext::current(), None);
/// })
/// .await;
///
/// // Outside any scope there is no current id.
/// assert_eq!(TraceContext::current(), None);
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContext;

impl TraceContext {
    /// Runs `fut` with its own trace slot, initialised to `initial`.
    ///
    /// Nested scopes shadow outer ones for their duration.
    pub fn scope<F>(initial: Option<TraceId>, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        CURRENT_TRACE.scope(RefCell::new(initial), fut)
    }

    /// Synchronous counterpart of [`scope`](Self::scope).
    pub fn sync_scope<R>(initial: Option<TraceId>, f: impl FnOnce() -> R) -> R {
        CURRENT_TRACE.sync_scope(RefCell::new(initial), f)
    }

    /// Returns the current trace id, or `None` when unset or outside a scope.
    #[must_use]
    pub fn current() -> Option<TraceId> {
        CURRENT_TRACE
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Replaces the current trace id.
    ///
    /// # Errors
    ///
    /// Returns [`TraceScopeError`] when called outside a scope.
    pub fn set_current(id: TraceId) -> Result<(), TraceScopeError> {
        CURRENT_TRACE
            .try_with(|slot| {
                *slot.borrow_mut() = Some(id);
            })
            .map_err(|_| TraceScopeError)
    }

    /// Unsets the current trace id.
    ///
    /// # Errors
    ///
    /// Returns [`TraceScopeError`] when called outside a scope.
    pub fn clear() -> Result<(), TraceScopeError> {
        CURRENT_TRACE
            .try_with(|slot| {
                slot.borrow_mut().take();
            })
            .map_err(|_| TraceScopeError)
    }

    /// Returns `true` if the current task runs inside a scope.
    #[must_use]
    pub fn is_active() -> bool {
        CURRENT_TRACE.try_with(|_| ()).is_ok()
    }
}

/// Spawns `fut` on the runtime inside a fresh scope holding `trace_id`.
///
/// Spawned tasks never inherit the caller's scope, so background work that
/// should log under the caller's trace must receive the id explicitly:
///
/// ```
/// use meridian_core::{spawn_with_trace, TraceContext};
///
/// # tokio_test::block_on(async {
/// let handle = spawn_with_trace(TraceContext::current(), async {
///     TraceContext::current()
/// });
/// assert_eq!(handle.await.unwrap(), None);
/// # });
/// ```
pub fn spawn_with_trace<F>(trace_id: Option<TraceId>, fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(TraceContext::scope(trace_id, fut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_generated_segment(segment: &str) -> bool {
        segment.len() == SEGMENT_LEN
            && segment
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }

    #[test]
    fn test_generate_segment_format() {
        for _ in 0..100 {
            assert!(is_generated_segment(&generate_segment()));
        }
    }

    #[test]
    fn test_increment_none_creates_origin() {
        let id = TraceId::increment(None);
        assert_eq!(id.depth(), 1);
        assert!(is_generated_segment(id.as_str()));
    }

    #[test]
    fn test_increment_appends_one_segment() {
        let parent = TraceId::parse("UICALL.C32PO").unwrap();
        let child = TraceId::increment(Some(&parent));
        assert_eq!(child.depth(), 3);
        assert!(child.as_str().starts_with("UICALL.C32PO."));
        assert!(is_generated_segment(child.last_segment()));
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
    }

    #[test]
    fn test_append_segment() {
        let id = TraceId::parse("A").unwrap();
        let id = id.append_segment("BCDEF").unwrap();
        assert_eq!(id.as_str(), "A.BCDEF");
        assert_eq!(id.origin(), "A");
        assert_eq!(id.last_segment(), "BCDEF");
        assert!(id.append_segment("").is_err());
        assert!(id.append_segment("X.Y").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert_eq!(TraceId::parse(""), Err(TraceIdParseError::Empty));
        assert_eq!(
            TraceId::parse("A..B"),
            Err(TraceIdParseError::EmptySegment { position: 1 })
        );
        assert!(TraceId::parse(".A").is_err());
        assert!(TraceId::parse("A.").is_err());
        assert!(matches!(
            TraceId::parse("A.B C"),
            Err(TraceIdParseError::InvalidCharacter { character: ' ', .. })
        ));
    }

    #[test]
    fn test_parse_bounds_runaway_ids() {
        let at_limit = vec!["A1B2C"; MAX_DEPTH].join(".");
        assert_eq!(TraceId::parse(&at_limit).unwrap().depth(), MAX_DEPTH);

        let too_deep = vec!["A1B2C"; MAX_DEPTH + 1].join(".");
        assert_eq!(
            TraceId::parse(&too_deep),
            Err(TraceIdParseError::TooDeep { depth: MAX_DEPTH + 1 })
        );

        let too_long = "A".repeat(MAX_TRACE_ID_LEN + 1);
        assert_eq!(
            TraceId::parse(&too_long),
            Err(TraceIdParseError::TooLong { len: MAX_TRACE_ID_LEN + 1 })
        );
    }

    #[test]
    fn test_parse_accepts_origin_conventions() {
        for raw in ["UICALL", "ui-call.C32PO", "batch_7.V40PO.A1B2C"] {
            assert_eq!(TraceId::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_is_ancestor_requires_segment_boundary() {
        let short = TraceId::parse("ABC").unwrap();
        let longer = TraceId::parse("ABCD.E").unwrap();
        assert!(!short.is_ancestor_of(&longer));
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let id: TraceId = serde_json::from_str("\"UICALL.C32PO\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"UICALL.C32PO\"");
        assert!(serde_json::from_str::<TraceId>("\"bad id\"").is_err());
    }

    #[tokio::test]
    async fn test_scope_get_set_clear() {
        TraceContext::scope(None, async {
            assert!(TraceContext::is_active());
            assert_eq!(TraceContext::current(), None);

            let id = TraceId::parse("UICALL").unwrap();
            TraceContext::set_current(id.clone()).unwrap();
            assert_eq!(TraceContext::current(), Some(id));

            TraceContext::clear().unwrap();
            assert_eq!(TraceContext::current(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_outside_scope() {
        assert!(!TraceContext::is_active());
        assert_eq!(TraceContext::current(), None);
        assert_eq!(
            TraceContext::set_current(TraceId::new_origin()),
            Err(TraceScopeError)
        );
        assert_eq!(TraceContext::clear(), Err(TraceScopeError));
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_outer() {
        let outer = TraceId::parse("OUTER").unwrap();
        let inner = TraceId::parse("INNER").unwrap();
        TraceContext::scope(Some(outer.clone()), async {
            TraceContext::scope(Some(inner.clone()), async {
                assert_eq!(TraceContext::current(), Some(inner.clone()));
            })
            .await;
            assert_eq!(TraceContext::current(), Some(outer.clone()));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scopes_are_isolated() {
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let id = TraceId::parse(&format!("REQ{i}")).unwrap();
                tokio::spawn(TraceContext::scope(Some(id.clone()), async move {
                    for _ in 0..10 {
                        tokio::task::yield_now().await;
                        assert_eq!(TraceContext::current(), Some(id.clone()));
                    }
                    let child = TraceId::increment(TraceContext::current().as_ref());
                    TraceContext::set_current(child.clone()).unwrap();
                    tokio::task::yield_now().await;
                    assert_eq!(TraceContext::current(), Some(child));
                }))
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_spawn_with_trace_passes_id_explicitly() {
        let id = TraceId::parse("UICALL.C32PO").unwrap();
        let seen = TraceContext::scope(Some(id.clone()), async {
            // Plain spawn does not inherit the scope
            let plain = tokio::spawn(async { TraceContext::current() })
                .await
                .unwrap();
            assert_eq!(plain, None);

            spawn_with_trace(TraceContext::current(), async { TraceContext::current() })
                .await
                .unwrap()
        })
        .await;
        assert_eq!(seen, Some(id));
    }

    #[test]
    fn test_sync_scope() {
        let id = TraceId::parse("SYNC").unwrap();
        let seen = TraceContext::sync_scope(Some(id.clone()), TraceContext::current);
        assert_eq!(seen, Some(id));
    }

    fn segment_strategy() -> impl Strategy<Value = String> {
        "[A-Z0-9]{5}"
    }

    proptest! {
        #[test]
        fn prop_increment_grows_by_exactly_one(segments in prop::collection::vec(segment_strategy(), 1..8)) {
            let parent = TraceId::parse(&segments.join(".")).unwrap();
            let child = TraceId::increment(Some(&parent));

            prop_assert_eq!(child.depth(), parent.depth() + 1);
            let prefix: Vec<&str> = child.segments().take(parent.depth()).collect();
            let original: Vec<&str> = parent.segments().collect();
            prop_assert_eq!(prefix, original);
            prop_assert!(is_generated_segment(child.last_segment()));
        }

        #[test]
        fn prop_parse_display_round_trip(segments in prop::collection::vec(segment_strategy(), 1..8)) {
            let raw = segments.join(".");
            let id: TraceId = raw.parse().unwrap();
            prop_assert_eq!(id.to_string(), raw);
        }
    }
}
