//! In-memory image header with FITS keyword semantics.
//!
//! Keywords are case-insensitive and stored upper-case. Each card carries a
//! typed value and an optional comment; `HISTORY` entries are kept separately
//! in insertion order. Reading and writing FITS files is left to the caller.

use std::fmt;

/// Typed value of a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl HeaderValue {
    /// Numeric view of the value; integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v:?}"),
            HeaderValue::Str(s) => write!(f, "'{s}'"),
            HeaderValue::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
        }
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        HeaderValue::Int(v as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

/// A single keyword/value/comment record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: HeaderValue,
    pub comment: Option<String>,
}

/// Ordered collection of header cards plus history entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
    history: Vec<String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, keyword: &str) -> Option<usize> {
        self.cards
            .iter()
            .position(|c| c.keyword.eq_ignore_ascii_case(keyword))
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.position(keyword).is_some()
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.position(keyword).map(|i| &self.cards[i].value)
    }

    pub fn card(&self, keyword: &str) -> Option<&Card> {
        self.position(keyword).map(|i| &self.cards[i])
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    /// Set a keyword, replacing any existing value in place. A new keyword is
    /// appended at the end. An existing comment is kept.
    pub fn set(&mut self, keyword: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        match self.position(keyword) {
            Some(i) => self.cards[i].value = value,
            None => self.cards.push(Card {
                keyword: keyword.to_ascii_uppercase(),
                value,
                comment: None,
            }),
        }
    }

    /// Set a keyword together with its comment.
    pub fn set_with_comment(&mut self, keyword: &str, value: impl Into<HeaderValue>, comment: &str) {
        self.set(keyword, value);
        if let Some(i) = self.position(keyword) {
            self.cards[i].comment = Some(comment.to_string());
        }
    }

    /// Remove a keyword. Removing an absent keyword is a no-op; returns the
    /// removed card if there was one.
    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        self.position(keyword).map(|i| self.cards.remove(i))
    }

    pub fn add_history(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
