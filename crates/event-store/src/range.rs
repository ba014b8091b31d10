use crate::Version;

/// Inclusive range of versions to load from a history.
///
/// `from` is inclusive; `to` of `None` means "up to the latest record".
/// The default range covers the entire history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionRange {
    /// Minimum version (inclusive).
    pub from: Version,

    /// Maximum version (inclusive), or unbounded.
    pub to: Option<Version>,
}

impl VersionRange {
    /// The range covering every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a range from raw bounds where a `to` of 0 means unbounded.
    pub fn from_bounds(from: i64, to: i64) -> Self {
        Self {
            from: Version::new(from),
            to: (to != 0).then(|| Version::new(to)),
        }
    }

    /// Restricts the range to versions starting at `version` (inclusive).
    pub fn starting_at(mut self, version: Version) -> Self {
        self.from = version;
        self
    }

    /// Restricts the range to versions up to `version` (inclusive).
    pub fn up_to(mut self, version: Version) -> Self {
        self.to = Some(version);
        self
    }

    /// Returns true if the range covers the whole history.
    pub fn is_full(&self) -> bool {
        self.from <= Version::initial() && self.to.is_none()
    }

    /// Returns true if `version` falls inside the range.
    pub fn contains(&self, version: Version) -> bool {
        version >= self.from && self.to.is_none_or(|to| version <= to)
    }
}
