//! Deep sanitizing serializer.
//!
//! # Responsibilities
//! - Turn arbitrary state into a `Snapshot` that is safe to persist as JSON
//! - Convert dates and pseudo-dates to ISO text
//! - Break cycles with a marker and bound recursion depth
//! - Drop function-valued record entries
//!
//! # Design Decisions
//! - Never fails: a subtree that cannot be read is returned as an opaque passthrough
//! - The visited set only holds the current descent path, so shared siblings are
//!   serialized in full while true cycles are still detected
//! - The depth limit is the hard backstop; cycle detection alone does not bound cost

use std::collections::{BTreeMap, HashSet};

use serde::{Serialize, Serializer};

use crate::config::SerializerConfig;
use crate::observability::metrics;
use crate::snapshot::dates::{iso_text, timestamp_text};
use crate::snapshot::value::{ListNode, NodeId, PoisonedNode, RecordNode, Value};

/// Default maximum depth.
pub const DEFAULT_DEPTH_LIMIT: usize = 10;

/// Text written in place of a cyclic reference.
pub const CYCLE_MARKER: &str = "[Circular]";

/// Storage-safe rendering of a `Value`.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Snapshot>),
    Map(BTreeMap<String, Snapshot>),
    /// A reference back into the current path.
    Circular,
    /// Subtree returned unchanged: depth exceeded, non-plain instance,
    /// function outside a record, or an unreadable node.
    Opaque(Value),
}

impl Snapshot {
    pub fn is_circular(&self) -> bool {
        matches!(self, Snapshot::Circular)
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Snapshot::Opaque(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Snapshot::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Snapshot]> {
        match self {
            Snapshot::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Snapshot>> {
        match self {
            Snapshot::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Entry of a map snapshot.
    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// Render as a JSON tree.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Snapshot::Null => serializer.serialize_unit(),
            Snapshot::Bool(b) => serializer.serialize_bool(*b),
            Snapshot::Number(n) => serialize_number(*n, serializer),
            Snapshot::Text(text) => serializer.serialize_str(text),
            Snapshot::List(items) => serializer.collect_seq(items),
            Snapshot::Map(entries) => serializer.collect_map(entries),
            Snapshot::Circular => serializer.serialize_str(CYCLE_MARKER),
            Snapshot::Opaque(value) => serialize_opaque(value, serializer),
        }
    }
}

// Largest integer an f64 holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

fn serialize_opaque<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Value::Bool(b) => serializer.serialize_bool(*b),
        Value::Number(n) => serialize_number(*n, serializer),
        Value::Text(text) => serializer.serialize_str(text),
        Value::Date(instant) => serializer.serialize_str(&iso_text(instant)),
        Value::Timestamp(timestamp) => serializer.serialize_str(&timestamp_text(timestamp.as_ref())),
        Value::Null
        | Value::List(_)
        | Value::Record(_)
        | Value::Instance(_)
        | Value::Function(_) => serializer.serialize_unit(),
    }
}

/// Serializer bound to a depth limit.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSerializer {
    depth_limit: usize,
}

impl Default for SnapshotSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH_LIMIT)
    }
}

impl SnapshotSerializer {
    pub fn new(depth_limit: usize) -> Self {
        Self { depth_limit }
    }

    pub fn from_config(config: &SerializerConfig) -> Self {
        Self::new(config.depth_limit)
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    pub fn serialize(&self, value: &Value) -> Snapshot {
        serialize(value, self.depth_limit)
    }
}

/// Serialize with the default depth limit.
pub fn serialize_default(value: &Value) -> Snapshot {
    serialize(value, DEFAULT_DEPTH_LIMIT)
}

/// Serialize `value`, descending at most `depth_limit` levels.
pub fn serialize(value: &Value, depth_limit: usize) -> Snapshot {
    let mut path = HashSet::new();
    sanitize(value, 0, depth_limit, &mut path)
}

fn sanitize(value: &Value, depth: usize, limit: usize, path: &mut HashSet<NodeId>) -> Snapshot {
    if depth > limit {
        metrics::record_snapshot_truncation();
        return passthrough(value);
    }

    match value {
        Value::Null => Snapshot::Null,
        Value::Bool(b) => Snapshot::Bool(*b),
        Value::Number(n) => Snapshot::Number(*n),
        Value::Text(text) => Snapshot::Text(text.clone()),
        Value::Date(instant) => Snapshot::Text(iso_text(instant)),
        Value::Timestamp(timestamp) => Snapshot::Text(timestamp_text(timestamp.as_ref())),
        Value::Instance(_) | Value::Function(_) => Snapshot::Opaque(value.clone()),
        Value::List(node) => {
            visit(value, node.id(), path, |path| sanitize_list(node, depth, limit, path))
        }
        Value::Record(node) => {
            visit(value, node.id(), path, |path| sanitize_record(node, depth, limit, path))
        }
    }
}

/// Run `descend` with `id` on the path; `id` is removed again on every exit.
fn visit<F>(value: &Value, id: NodeId, path: &mut HashSet<NodeId>, descend: F) -> Snapshot
where
    F: FnOnce(&mut HashSet<NodeId>) -> Result<Snapshot, PoisonedNode>,
{
    if !path.insert(id) {
        metrics::record_snapshot_cycle();
        return Snapshot::Circular;
    }

    let result = descend(path);
    path.remove(&id);

    result.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "serializer returning original value for unreadable node");
        Snapshot::Opaque(value.clone())
    })
}

fn sanitize_list(
    node: &ListNode,
    depth: usize,
    limit: usize,
    path: &mut HashSet<NodeId>,
) -> Result<Snapshot, PoisonedNode> {
    let items = node.read()?;
    Ok(Snapshot::List(
        items
            .iter()
            .map(|item| sanitize(item, depth + 1, limit, path))
            .collect(),
    ))
}

fn sanitize_record(
    node: &RecordNode,
    depth: usize,
    limit: usize,
    path: &mut HashSet<NodeId>,
) -> Result<Snapshot, PoisonedNode> {
    let entries = node.read()?;
    let mut out = BTreeMap::new();
    for (key, entry) in entries.iter() {
        if matches!(entry, Value::Function(_)) {
            continue;
        }
        out.insert(key.clone(), sanitize(entry, depth + 1, limit, path));
    }
    Ok(Snapshot::Map(out))
}

fn passthrough(value: &Value) -> Snapshot {
    match value {
        Value::Null => Snapshot::Null,
        Value::Bool(b) => Snapshot::Bool(*b),
        Value::Number(n) => Snapshot::Number(*n),
        Value::Text(text) => Snapshot::Text(text.clone()),
        _ => Snapshot::Opaque(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::dates::from_text;
    use crate::snapshot::value::{DateError, RemoteTimestamp, ToDate};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct BrokenTimestamp;

    impl ToDate for BrokenTimestamp {
        fn to_date(&self) -> Result<DateTime<Utc>, DateError> {
            Err(DateError::Conversion("missing seconds".into()))
        }
    }

    fn logged_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap() + Duration::milliseconds(10)
    }

    /// Nest `levels` single-entry records around a leaf.
    fn nested(levels: usize) -> Value {
        let mut value = Value::text("leaf");
        for _ in 0..levels {
            value = Value::record([("child", value)]);
        }
        value
    }

    #[test]
    fn test_plain_data_is_isomorphic() {
        let meal = Value::record([
            ("name", Value::text("oatmeal")),
            ("kcal", Value::from(310)),
            ("protein", Value::Number(12.5)),
            ("vegan", Value::Bool(true)),
            ("notes", Value::Null),
            (
                "items",
                Value::list([Value::text("oats"), Value::text("milk"), Value::from(2)]),
            ),
        ]);

        let snapshot = serialize_default(&meal);
        assert_eq!(
            snapshot.to_json(),
            json!({
                "name": "oatmeal",
                "kcal": 310,
                "protein": 12.5,
                "vegan": true,
                "notes": null,
                "items": ["oats", "milk", 2],
            })
        );
    }

    #[test]
    fn test_dates_become_iso_text() {
        let state = Value::record([
            ("created", Value::Date(logged_at())),
            ("synced", Value::from(RemoteTimestamp::from_date(logged_at()))),
            ("history", Value::list([Value::Date(logged_at())])),
        ]);

        let snapshot = serialize_default(&state);
        assert_eq!(
            snapshot.to_json(),
            json!({
                "created": "2024-05-06T07:08:09.010Z",
                "synced": "2024-05-06T07:08:09.010Z",
                "history": ["2024-05-06T07:08:09.010Z"],
            })
        );
    }

    #[test]
    fn test_broken_timestamp_becomes_now() {
        let state = Value::record([("updated", Value::timestamp(BrokenTimestamp))]);
        let snapshot = serialize_default(&state);
        let text = snapshot.get("updated").and_then(Snapshot::as_text).unwrap();
        let parsed = from_text(text).unwrap();
        assert!((Utc::now() - parsed).num_seconds().abs() < 5);
    }

    #[test]
    fn test_function_entries_dropped() {
        let timer = Value::record([
            ("seconds", Value::from(45)),
            ("onTick", Value::function("onTick", |_| Value::Null)),
        ]);
        let snapshot = serialize_default(&timer);
        assert_eq!(snapshot.to_json(), json!({ "seconds": 45 }));

        // functions inside lists are kept as they are
        let list = Value::list([Value::function("cb", |_| Value::Null)]);
        let snapshot = serialize_default(&list);
        assert!(snapshot.as_list().unwrap()[0].is_opaque());
    }

    #[test]
    fn test_self_reference_is_marked() {
        let user = RecordNode::default();
        user.insert("name", Value::text("ana"));
        user.insert("me", Value::Record(user.clone()));

        let snapshot = serialize_default(&Value::Record(user.clone()));
        assert_eq!(snapshot.get("name").and_then(Snapshot::as_text), Some("ana"));
        assert!(snapshot.get("me").unwrap().is_circular());
        assert_eq!(snapshot.to_json(), json!({ "name": "ana", "me": "[Circular]" }));

        user.remove("me");
    }

    #[test]
    fn test_indirect_cycle_through_list() {
        let workout = RecordNode::default();
        let sets = ListNode::default();
        sets.push(Value::from(10));
        sets.push(Value::Record(workout.clone()));
        workout.insert("sets", Value::List(sets.clone()));

        let snapshot = serialize_default(&Value::Record(workout.clone()));
        let sets_out = snapshot.get("sets").and_then(Snapshot::as_list).unwrap();
        assert_eq!(sets_out.len(), 2);
        assert!(sets_out[1].is_circular());

        workout.remove("sets");
    }

    #[test]
    fn test_shared_siblings_are_not_cycles() {
        let goal = Value::record([("kcal", Value::from(2000))]);
        let state = Value::record([
            ("today", goal.clone()),
            ("yesterday", goal.clone()),
            ("week", Value::list([goal.clone(), goal])),
        ]);

        let snapshot = serialize_default(&state);
        assert_eq!(
            snapshot.to_json(),
            json!({
                "today": { "kcal": 2000 },
                "yesterday": { "kcal": 2000 },
                "week": [{ "kcal": 2000 }, { "kcal": 2000 }],
            })
        );
    }

    #[test]
    fn test_depth_limit_returns_value_unchanged() {
        // depth 0..=2 are descended, the record at depth 3 is returned as is
        let snapshot = serialize(&nested(4), 2);
        let deep = snapshot
            .get("child")
            .and_then(|s| s.get("child"))
            .and_then(|s| s.get("child"))
            .unwrap();
        assert!(matches!(deep, Snapshot::Opaque(Value::Record(_))));

        let snapshot = serialize(&nested(4), 4);
        assert_eq!(
            snapshot.to_json(),
            json!({ "child": { "child": { "child": { "child": "leaf" } } } })
        );
    }

    #[test]
    fn test_depth_limit_keeps_primitives() {
        let snapshot = serialize(&Value::record([("a", Value::from(1))]), 0);
        assert_eq!(snapshot.to_json(), json!({ "a": 1 }));
    }

    #[test]
    fn test_deep_cycle_terminates_with_small_limit() {
        let node = RecordNode::default();
        node.insert("next", Value::Record(node.clone()));
        let snapshot = serialize(&Value::Record(node.clone()), 1);
        assert!(snapshot.get("next").unwrap().is_circular());

        // the depth check runs first, so at limit 0 the edge is cut off instead
        let snapshot = serialize(&Value::Record(node.clone()), 0);
        assert!(snapshot.get("next").unwrap().is_opaque());
        node.remove("next");
    }

    #[test]
    fn test_instances_pass_through() {
        #[derive(Debug)]
        struct Upload {
            #[allow(dead_code)]
            bytes: usize,
        }
        let state = Value::record([("pending", Value::instance(Upload { bytes: 12 }))]);
        let snapshot = serialize_default(&state);
        assert!(matches!(
            snapshot.get("pending"),
            Some(Snapshot::Opaque(Value::Instance(_)))
        ));
        assert_eq!(snapshot.to_json(), json!({ "pending": null }));
    }

    #[test]
    fn test_poisoned_node_falls_back_to_original() {
        let meals = ListNode::new(vec![Value::from(1)]);
        let poisoned = Arc::clone(&meals.0);
        let _ = std::thread::spawn(move || {
            let _guard = poisoned.write().unwrap();
            panic!("writer crashed");
        })
        .join();

        let state = Value::record([("meals", Value::List(meals.clone()))]);
        let snapshot = serialize_default(&state);
        match snapshot.get("meals") {
            Some(Snapshot::Opaque(Value::List(node))) => assert!(node.ptr_eq(&meals)),
            other => panic!("expected original list, got {:?}", other),
        }
    }

    #[test]
    fn test_opaque_rendering() {
        let date = Snapshot::Opaque(Value::Date(logged_at()));
        assert_eq!(date.to_json(), json!("2024-05-06T07:08:09.010Z"));
        assert_eq!(Snapshot::Opaque(Value::from(3)).to_json(), json!(3));
        assert_eq!(Snapshot::Number(0.25).to_json(), json!(0.25));
    }

    #[test]
    fn test_serializer_from_config() {
        let config = SerializerConfig { depth_limit: 1 };
        let serializer = SnapshotSerializer::from_config(&config);
        assert_eq!(serializer.depth_limit(), 1);
        assert!(serializer
            .serialize(&nested(3))
            .get("child")
            .and_then(|s| s.get("child"))
            .unwrap()
            .is_opaque());
    }
}
