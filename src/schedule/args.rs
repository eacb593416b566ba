//! Arguments for scheduled actions.
//!
//! An argument is either a plain [`Value`] or a deferred computation that
//! produces another argument. Deferred arguments are resolved at the moment
//! the action fires, so a generator behind a thunk yields its next value in
//! firing order.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Most thunk resolutions [`exhaust`] performs before giving up
pub const MAX_THUNK_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats as-is; integers widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
}

/// A value, or a computation producing the next step toward one
pub enum Arg {
    Value(Value),
    Thunk(Box<dyn FnOnce() -> Arg>),
}

impl Arg {
    pub fn thunk<F>(f: F) -> Self
    where
        F: FnOnce() -> Arg + 'static,
    {
        Arg::Thunk(Box::new(f))
    }

    pub fn is_thunk(&self) -> bool {
        matches!(self, Arg::Thunk(_))
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

/// Resolve thunks until a value appears, at most [`MAX_THUNK_DEPTH`] times
pub fn exhaust(arg: Arg) -> Result<Value> {
    let mut arg = arg;
    for _ in 0..MAX_THUNK_DEPTH {
        match arg {
            Arg::Value(v) => return Ok(v),
            Arg::Thunk(f) => arg = f(),
        }
    }
    match arg {
        Arg::Value(v) => Ok(v),
        Arg::Thunk(_) => Err(Error::UnresolvedThunk {
            limit: MAX_THUNK_DEPTH,
        }),
    }
}

/// Resolved arguments handed to an action
pub type Params = BTreeMap<String, Value>;

/// Named arguments for one action call
#[derive(Debug, Default)]
pub struct Args(BTreeMap<String, Arg>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.insert(name, arg);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, arg: impl Into<Arg>) {
        self.0.insert(name.into(), arg.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exhaust every argument; the first unresolvable one fails the lot
    pub fn resolve(self) -> Result<Params> {
        self.0
            .into_iter()
            .map(|(name, arg)| exhaust(arg).map(|value| (name, value)))
            .collect()
    }
}
