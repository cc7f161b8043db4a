//! Connections between instance ports and parent signals.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// The value connected to a port of an instance.
///
/// Signal names refer to signals of the **parent** module.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Connection {
    /// An entire signal.
    Signal(ArcStr),
    /// A contiguous range of bits of a signal.
    Slice(Slice),
    /// A concatenation of other connections, most significant part first.
    Concat(Concat),
    /// A constant value.
    Literal(Literal),
}

impl Connection {
    /// Creates a connection to an entire signal.
    #[inline]
    pub fn signal(name: impl Into<ArcStr>) -> Self {
        Self::Signal(name.into())
    }

    /// Creates a connection to bits `top` down to `bot` (inclusive) of a signal.
    #[inline]
    pub fn slice(name: impl Into<ArcStr>, top: usize, bot: usize) -> Self {
        Self::Slice(Slice::new(name, top, bot))
    }

    /// Creates a connection to a single bit of a signal.
    #[inline]
    pub fn bit(name: impl Into<ArcStr>, index: usize) -> Self {
        Self::Slice(Slice::bit(name, index))
    }

    /// Creates a concatenation of the given connections.
    #[inline]
    pub fn concat(parts: impl IntoIterator<Item = Connection>) -> Self {
        Self::Concat(parts.into_iter().collect())
    }
}

/// Bits `top` down to `bot` (inclusive) of a signal.
///
/// Slices are not validated against the width of the signal they index,
/// nor is `top >= bot` enforced.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Slice {
    signal: ArcStr,
    top: usize,
    bot: usize,
}

impl Slice {
    /// Creates a new [`Slice`].
    #[inline]
    pub fn new(signal: impl Into<ArcStr>, top: usize, bot: usize) -> Self {
        Self {
            signal: signal.into(),
            top,
            bot,
        }
    }

    /// Creates a single-bit [`Slice`].
    #[inline]
    pub fn bit(signal: impl Into<ArcStr>, index: usize) -> Self {
        Self::new(signal, index, index)
    }

    /// The name of the signal this slice indexes.
    #[inline]
    pub fn signal(&self) -> &ArcStr {
        &self.signal
    }

    /// The most significant index (inclusive).
    #[inline]
    pub const fn top(&self) -> usize {
        self.top
    }

    /// The least significant index (inclusive).
    #[inline]
    pub const fn bot(&self) -> usize {
        self.bot
    }

    /// Returns `true` if this slice selects exactly one bit.
    #[inline]
    pub const fn is_bit(&self) -> bool {
        self.top == self.bot
    }
}

/// An ordered concatenation of connections.
///
/// The first part occupies the most significant bits.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Concat {
    parts: Vec<Connection>,
}

impl Concat {
    /// Creates a new concatenation from the given list of parts.
    #[inline]
    pub fn new(parts: Vec<Connection>) -> Self {
        Self { parts }
    }

    /// Iterate over the parts of this concatenation.
    #[inline]
    pub fn parts(&self) -> impl Iterator<Item = &Connection> {
        self.parts.iter()
    }

    /// The number of parts in this concatenation.
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if this concatenation has no parts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl FromIterator<Connection> for Concat {
    fn from_iter<T: IntoIterator<Item = Connection>>(iter: T) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Connection>> for Concat {
    #[inline]
    fn from(value: Vec<Connection>) -> Self {
        Self::new(value)
    }
}

/// A constant, non-negative integer value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Literal {
    width: Option<usize>,
    value: u64,
}

impl Literal {
    /// Creates a literal with an explicit bit width.
    #[inline]
    pub const fn sized(width: usize, value: u64) -> Self {
        Self {
            width: Some(width),
            value,
        }
    }

    /// Creates a literal whose width is inferred by the consumer of the netlist.
    #[inline]
    pub const fn inferred(value: u64) -> Self {
        Self { width: None, value }
    }

    /// The bit width of this literal, if one was given.
    #[inline]
    pub const fn width(&self) -> Option<usize> {
        self.width
    }

    /// The value of this literal.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.value
    }
}

impl From<Slice> for Connection {
    #[inline]
    fn from(value: Slice) -> Self {
        Self::Slice(value)
    }
}

impl From<Concat> for Connection {
    #[inline]
    fn from(value: Concat) -> Self {
        Self::Concat(value)
    }
}

impl From<Literal> for Connection {
    #[inline]
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}
