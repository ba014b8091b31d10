use serde::{Deserialize, Serialize};

/// Version number of an event within its aggregate's history.
///
/// Versions increase strictly per aggregate. Gaps are allowed; ordering is
/// what the store guarantees. Version 0 means "no events applied yet".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a new aggregate.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true for the initial version.
    pub fn is_initial(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// The persisted form of one event.
///
/// `data` is opaque to the store; only the serializer that produced it can
/// tell which event type it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Version of the encoded event.
    pub version: Version,

    /// The encoded event.
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(version: Version, data: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            data: data.into(),
        }
    }
}

/// Records for one aggregate, in ascending version order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Record>);

impl History {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    pub fn push(&mut self, record: Record) {
        self.0.push(record);
    }

    /// Appends records and restores ascending order.
    ///
    /// The sort is stable, so records sharing a version keep their
    /// insertion order.
    pub fn append(&mut self, records: impl IntoIterator<Item = Record>) {
        self.0.extend(records);
        self.sort();
    }

    /// Sorts records by ascending version.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|record| record.version);
    }

    /// Returns the version of the last record, if any.
    pub fn last_version(&self) -> Option<Version> {
        self.0.last().map(|record| record.version)
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Record> {
        self.0
    }
}

impl From<Vec<Record>> for History {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl FromIterator<Record> for History {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for History {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for History {
    type Output = Record;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
