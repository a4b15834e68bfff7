//! Entity families synchronized by the pipeline.

use std::fmt;

/// Kind of rows an extraction query produces.
///
/// The kind tells a relational source how to decode the rows of a query and
/// which search index the resulting documents are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyKind {
    /// Film works, the root entity, with aggregated persons and genres.
    Movies,
    /// Persons taking part in film works.
    Persons,
    /// Genres assigned to film works.
    Genres,
}

impl FamilyKind {
    /// Fixed drain order used by every cycle.
    pub const ALL: [FamilyKind; 3] = [FamilyKind::Movies, FamilyKind::Persons, FamilyKind::Genres];

    /// Name of the search index the family is written to.
    pub fn index_name(&self) -> &'static str {
        match self {
            FamilyKind::Movies => "movies",
            FamilyKind::Persons => "persons",
            FamilyKind::Genres => "genres",
        }
    }

    /// Human readable name used in logs and in the cursor record.
    pub fn name(&self) -> &'static str {
        match self {
            FamilyKind::Movies => "Movies",
            FamilyKind::Persons => "Persons",
            FamilyKind::Genres => "Genres",
        }
    }

    /// Resolve a family from its logged name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_every_family() {
        for kind in FamilyKind::ALL {
            assert_eq!(FamilyKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FamilyKind::from_name("Studios"), None);
    }

    #[test]
    fn test_index_names() {
        assert_eq!(FamilyKind::Movies.index_name(), "movies");
        assert_eq!(FamilyKind::Persons.index_name(), "persons");
        assert_eq!(FamilyKind::Genres.index_name(), "genres");
    }
}
