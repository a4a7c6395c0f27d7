//! Employee identity models.
//!
//! An employee is identified by the structured [`EmployeeKey`] everywhere in
//! the crate. The store keys its records by the legacy "FirstLastYear" string,
//! represented here as [`EmployeeId`]; conversion happens only at the store
//! boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured identity of one employee for one year.
///
/// # Example
///
/// ```
/// use timecard_reconciler::models::EmployeeKey;
///
/// let key = EmployeeKey::new("Lindsay", "Flannery", 2025);
/// assert_eq!(key.id().as_str(), "LindsayFlannery2025");
/// assert_eq!(key.display_name(), "Lindsay Flannery");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeKey {
    /// Given name as it appears in the store's naming system.
    pub first_name: String,
    /// Family name as it appears in the store's naming system.
    pub last_name: String,
    /// The year the hours belong to.
    pub year: i32,
}

impl EmployeeKey {
    /// Creates a key from its parts.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, year: i32) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            year,
        }
    }

    /// Builds a key from a "First Last" display name.
    ///
    /// The first whitespace-separated token is the first name and the
    /// remaining tokens, joined without spaces, are the last name. Returns
    /// `None` when there are fewer than two tokens.
    ///
    /// ```
    /// use timecard_reconciler::models::EmployeeKey;
    ///
    /// let key = EmployeeKey::from_display_name("Dick Van Dyke", 2025).unwrap();
    /// assert_eq!(key.first_name, "Dick");
    /// assert_eq!(key.last_name, "VanDyke");
    /// assert!(EmployeeKey::from_display_name("Cher", 2025).is_none());
    /// ```
    pub fn from_display_name(name: &str, year: i32) -> Option<Self> {
        let mut tokens = name.split_whitespace();
        let first = tokens.next()?;
        let last: String = tokens.collect();
        if last.is_empty() {
            return None;
        }
        Some(Self::new(first, last, year))
    }

    /// The same person in another year.
    pub fn for_year(&self, year: i32) -> Self {
        Self {
            year,
            ..self.clone()
        }
    }

    /// Serializes the key to the store identifier: `first + last + year`,
    /// no separator, whitespace removed.
    pub fn id(&self) -> EmployeeId {
        let mut id = String::with_capacity(self.first_name.len() + self.last_name.len() + 4);
        id.extend(self.first_name.chars().filter(|c| !c.is_whitespace()));
        id.extend(self.last_name.chars().filter(|c| !c.is_whitespace()));
        id.push_str(&self.year.to_string());
        EmployeeId(id)
    }

    /// "First Last".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The store's string identifier for an employee-year record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Wraps a raw store identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing four-digit year, if the identifier has one.
    ///
    /// ```
    /// use timecard_reconciler::models::EmployeeId;
    ///
    /// assert_eq!(EmployeeId::new("BruceBanner2025").year(), Some(2025));
    /// assert_eq!(EmployeeId::new("names").year(), None);
    /// ```
    pub fn year(&self) -> Option<i32> {
        let split = self.year_boundary()?;
        self.0[split..].parse().ok()
    }

    /// The identifier with its year removed.
    pub fn base(&self) -> &str {
        match self.year_boundary() {
            Some(split) => &self.0[..split],
            None => &self.0,
        }
    }

    /// The same identifier base with a different year.
    pub fn with_year(&self, year: i32) -> EmployeeId {
        EmployeeId(format!("{}{}", self.base(), year))
    }

    /// Best-effort "First Last" for display, using [`split_id`].
    ///
    /// Identifiers that cannot be split are returned without their year.
    pub fn display_name(&self) -> String {
        match split_id(self.base()).as_slice() {
            [first, last] => format!("{} {}", first, last),
            _ => self.base().to_string(),
        }
    }

    fn year_boundary(&self) -> Option<usize> {
        let len = self.0.len();
        if len <= 4 || !self.0.is_char_boundary(len - 4) {
            return None;
        }
        let split = len - 4;
        self.0[split..]
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then_some(split)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&EmployeeKey> for EmployeeId {
    fn from(key: &EmployeeKey) -> Self {
        key.id()
    }
}

/// Splits a store identifier at its second uppercase letter.
///
/// This is the legacy heuristic for recovering first and last names from a
/// "FirstLastYear" identifier. Names with internal capitals (or a lowercase
/// last name) do not split where a human would; callers only use it for
/// display.
///
/// ```
/// use timecard_reconciler::models::split_id;
///
/// assert_eq!(split_id("BruceBanner2025"), vec!["Bruce", "Banner2025"]);
/// assert_eq!(split_id("Brucebanner2025"), vec!["Brucebanner2025"]);
/// ```
pub fn split_id(s: &str) -> Vec<&str> {
    let split = s
        .char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .nth(1)
        .map(|(i, _)| i);

    match split {
        Some(i) => vec![&s[..i], &s[i..]],
        None => vec![s],
    }
}
