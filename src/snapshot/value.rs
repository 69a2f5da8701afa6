//! Dynamic application state.
//!
//! # Responsibilities
//! - Represent arbitrary nested state the way the app store holds it
//! - Give lists and records a stable identity so shared and cyclic graphs can exist
//! - Expose the narrow `ToDate` capability for remote timestamp types
//!
//! # Design Decisions
//! - Lists and records are `Arc<RwLock<..>>` nodes; identity is the allocation address
//! - Builders recover poisoned locks for writes; readers report poisoning to the caller
//! - `Debug` never follows node contents, so cyclic graphs can always be printed

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entries of a plain record.
pub type Entries = BTreeMap<String, Value>;

/// Errors produced when a pseudo-date cannot be turned into an instant.
#[derive(Debug, Error)]
pub enum DateError {
    /// Seconds or nanoseconds outside the representable range.
    #[error("timestamp out of range: {seconds}s + {nanos}ns")]
    OutOfRange { seconds: i64, nanos: u32 },

    /// Any other conversion failure reported by the implementor.
    #[error("date conversion failed: {0}")]
    Conversion(String),
}

/// Capability of values that can be converted into a date instant.
///
/// Remote timestamp types implement this instead of being shape-inspected.
pub trait ToDate: fmt::Debug + Send + Sync {
    /// Convert into a UTC instant.
    fn to_date(&self) -> Result<DateTime<Utc>, DateError>;
}

/// Timestamp as delivered by the document database (seconds + nanos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTimestamp {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds, `0..1_000_000_000`.
    pub nanos: u32,
}

impl RemoteTimestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Build a timestamp from an instant.
    pub fn from_date(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanos: instant.timestamp_subsec_nanos(),
        }
    }
}

impl ToDate for RemoteTimestamp {
    fn to_date(&self) -> Result<DateTime<Utc>, DateError> {
        let out_of_range = || DateError::OutOfRange {
            seconds: self.seconds,
            nanos: self.nanos,
        };
        if self.nanos >= 1_000_000_000 {
            return Err(out_of_range());
        }
        DateTime::from_timestamp(self.seconds, self.nanos).ok_or_else(out_of_range)
    }
}

/// Identity of a list or record node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node whose lock was poisoned by a panicking writer.
#[derive(Debug, Error)]
#[error("{kind} node {id:?} is poisoned")]
pub struct PoisonedNode {
    kind: &'static str,
    id: NodeId,
}

/// Shared, mutable ordered sequence.
#[derive(Clone, Default)]
pub struct ListNode(pub(crate) Arc<RwLock<Vec<Value>>>);

impl ListNode {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Append an item.
    pub fn push(&self, item: Value) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).push(item);
    }

    /// Clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Value>>, PoisonedNode> {
        self.0.read().map_err(|_| PoisonedNode {
            kind: "list",
            id: self.id(),
        })
    }
}

impl fmt::Debug for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListNode({:#x})", self.id().0)
    }
}

/// Shared, mutable plain record (string keys).
#[derive(Clone, Default)]
pub struct RecordNode(pub(crate) Arc<RwLock<Entries>>);

impl RecordNode {
    pub fn new(entries: Entries) -> Self {
        Self(Arc::new(RwLock::new(entries)))
    }

    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    /// Clone of the entry under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, PoisonedNode> {
        self.0.read().map_err(|_| PoisonedNode {
            kind: "record",
            id: self.id(),
        })
    }
}

impl fmt::Debug for RecordNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordNode({:#x})", self.id().0)
    }
}

/// A non-plain object (class instance). Never descended into.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            payload: Arc::new(payload),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

type Callable = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A function value kept in state (selectors, callbacks).
#[derive(Clone)]
pub struct Function {
    name: String,
    call: Arc<Callable>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// Any value that can live in application state.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Native date instant.
    Date(DateTime<Utc>),
    /// Pseudo-date exposing a `to_date` conversion.
    Timestamp(Arc<dyn ToDate>),
    List(ListNode),
    Record(RecordNode),
    Instance(Instance),
    Function(Function),
}

impl Value {
    /// Build a plain record from key/value pairs.
    pub fn record<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(RecordNode::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(ListNode::new(items.into_iter().collect()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn timestamp(timestamp: impl ToDate + 'static) -> Self {
        Value::Timestamp(Arc::new(timestamp))
    }

    pub fn instance<T: Any + Send + Sync>(payload: T) -> Self {
        Value::Instance(Instance::new(payload))
    }

    pub fn function<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, call))
    }

    pub fn as_record(&self) -> Option<&RecordNode> {
        match self {
            Value::Record(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Value::List(node) => Some(node),
            _ => None,
        }
    }

    /// True for null, booleans, numbers and text.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Text(_)
        )
    }

    /// Short name of the variant, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Instance(_) => "instance",
            Value::Function(_) => "function",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<RemoteTimestamp> for Value {
    fn from(value: RemoteTimestamp) -> Self {
        Value::timestamp(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::list(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::record(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}
