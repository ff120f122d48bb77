// The value model: lazy, memory-parameterized payloads composed by
// pipe-chaining, plus the tagged runtime value the stack machine
// actually pushes and pops.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::memory::Memory;

/// `(Memory, previous T) -> T`. Composition is plain function
/// composition: `a.then(b)` runs `a` first, then feeds its result to `b`.
pub struct Pipe<T> {
    f: Rc<dyn Fn(&Memory, T) -> T>,
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Pipe { f: self.f.clone() }
    }
}

impl<T: 'static> Pipe<T> {
    pub fn identity() -> Pipe<T> {
        Pipe {
            f: Rc::new(|_mem, v| v),
        }
    }

    pub fn new(f: impl Fn(&Memory, T) -> T + 'static) -> Pipe<T> {
        Pipe { f: Rc::new(f) }
    }

    pub fn apply(&self, memory: &Memory, value: T) -> T {
        (self.f)(memory, value)
    }

    /// `self ∘ other`: `self` runs first, `other` sees its result.
    pub fn then(&self, other: Pipe<T>) -> Pipe<T> {
        let a = self.f.clone();
        let b = other.f.clone();
        Pipe::new(move |memory, v| b(memory, a(memory, v)))
    }
}

/// A lazy computation of a `T`, evaluated against a `Memory`.
/// `apply` derives a new value whose pipe is `self`'s pipe followed by
/// the given one; the seed travels unevaluated until `resolve`.
pub struct Value<T> {
    seed: T,
    pipe: Pipe<T>,
}

impl<T: Clone + 'static> Value<T> {
    pub fn new(seed: T) -> Value<T> {
        Value {
            seed,
            pipe: Pipe::identity(),
        }
    }

    pub fn apply(&self, pipe: Pipe<T>) -> Value<T>
    where
        T: 'static,
    {
        Value {
            seed: self.seed.clone(),
            pipe: self.pipe.then(pipe),
        }
    }

    pub fn resolve(&self, memory: &Memory) -> T {
        self.pipe.apply(memory, self.seed.clone())
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        Value {
            seed: self.seed.clone(),
            pipe: self.pipe.clone(),
        }
    }
}

/// Serialization captures only a value's seed: the pipe is a runtime
/// decoration introduced by instruction execution and never appears in
/// a compiled constant, so there is nothing for it to carry across a
/// persisted `Environment`.
impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.seed.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Clone + 'static> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Value::new(T::deserialize(deserializer)?))
    }
}

/// The tagged payload every runtime value carries once resolved.
#[derive(Clone, Serialize, Deserialize)]
pub enum Tag {
    Number(f64),
    Text(String),
    Array(Vec<Rt>),
    /// An ordered map; kept as a vector of pairs rather than a `HashMap`
    /// so that insertion order (and therefore JSON rendering order) is
    /// preserved.
    Object(Vec<(Rt, Rt)>),
    Pair(Box<Rt>, Box<Rt>),
    /// Raw, unevaluated quoted text -- e.g. the body of a `"..."` literal
    /// before any embedded directives inside it are expanded.
    Quote(String),
}

/// The value type instructions actually push onto the stack.
pub type Rt = Value<Tag>;

pub fn text(s: impl Into<String>) -> Rt {
    Rt::new(Tag::Text(s.into()))
}

pub fn number(n: f64) -> Rt {
    Rt::new(Tag::Number(n))
}

/// Canonicalize a number the way the engine's observable boundary
/// requires: integral values (and only values that fit losslessly in
/// an `f64`'s 53-bit mantissa) print without a decimal point; anything
/// else prints as a minimal decimal.
///
/// This refines the naive `x % 1 == 0` check, which misclassifies very
/// large doubles.
pub fn format_number(x: f64) -> String {
    const MAX_SAFE_INTEGER: f64 = 9007199254740992.0; // 2^53
    if x.is_finite() && x == x.floor() && x.abs() < MAX_SAFE_INTEGER {
        format!("{}", x as i64)
    } else {
        let mut s = format!("{}", x);
        if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN") {
            s.push_str(".0");
        }
        s
    }
}

/// Parse text the way the arithmetic instructions do: accept a leading
/// sign, digits, and an optional decimal point; anything else is "not a
/// number" rather than a hard error.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

impl Tag {
    /// Stringify a resolved value. This is the single place that
    /// decides how every tag prints; every other module goes through it.
    pub fn stringify(&self, memory: &Memory) -> String {
        match self {
            Tag::Number(n) => format_number(*n),
            Tag::Text(s) => s.clone(),
            Tag::Quote(s) => s.clone(),
            Tag::Array(items) => items
                .iter()
                .map(|v| v.evaluate(memory))
                .collect::<Vec<_>>()
                .join(", "),
            Tag::Pair(k, v) => format!("{}:{}", k.evaluate(memory), v.evaluate(memory)),
            Tag::Object(entries) => {
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}:{:?}", k.evaluate(memory), v.evaluate(memory)))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{{{}}}", body)
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Tag::Number(n) => Some(*n),
            Tag::Text(s) | Tag::Quote(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Rt]> {
        match self {
            Tag::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Rt {
    pub fn evaluate(&self, memory: &Memory) -> String {
        self.resolve(memory).stringify(memory)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Number(n) => write!(f, "Number({})", n),
            Tag::Text(s) => write!(f, "Text({:?})", s),
            Tag::Quote(s) => write!(f, "Quote({:?})", s),
            Tag::Array(items) => write!(f, "Array(len={})", items.len()),
            Tag::Pair(_, _) => write!(f, "Pair"),
            Tag::Object(entries) => write!(f, "Object(len={})", entries.len()),
        }
    }
}
