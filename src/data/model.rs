use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RollRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single dice roll (one row of the cleaned campaign table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollRecord {
    /// Campaign episode the roll happened in.
    pub episode_num: i64,
    /// Who rolled.
    pub character: String,
    /// Narrative/mechanical kind of roll (attack, skill check, save, ...).
    pub roll_category: String,
    /// Result of the roll; `None` when the source cell was empty.
    pub total_value: Option<f64>,
    pub is_nat1: bool,
    pub is_nat20: bool,
    /// Damage attributed to the roll, zero when absent.
    pub damage: f64,
    /// Kill credit attributed to the roll, zero when absent.
    pub kills: f64,
}

impl RollRecord {
    /// Convenience constructor for a plain roll with no damage or kills.
    pub fn new(episode_num: i64, character: &str, roll_category: &str) -> Self {
        RollRecord {
            episode_num,
            character: character.to_string(),
            roll_category: roll_category.to_string(),
            total_value: None,
            is_nat1: false,
            is_nat20: false,
            damage: 0.0,
            kills: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Roster – the fixed set of main characters
// ---------------------------------------------------------------------------

/// The main cast of the campaign. Everyone else counts as a guest or NPC.
pub const MAIN_CAST: [&str; 8] = [
    "Beau", "Fjord", "Jester", "Veth", "Caleb", "Yasha", "Caduceus", "Molly",
];

/// Membership set of "main" characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: BTreeSet<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Roster::new(MAIN_CAST)
    }
}

impl Roster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Roster {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, character: &str) -> bool {
        self.names.contains(character)
    }

    /// Members in name order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RollTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed column indices.
///
/// Built once by the loader and never mutated afterwards; every filter
/// produces a [`Selection`](super::filter::Selection) over it instead.
#[derive(Debug, Clone)]
pub struct RollTable {
    records: Vec<RollRecord>,
    /// Distinct characters in order of first appearance.
    characters: Vec<String>,
    /// Every roll category seen in the table.
    categories: BTreeSet<String>,
    /// Observed `(min, max)` episode, `None` for an empty table.
    episode_bounds: Option<(i64, i64)>,
    /// Row indices flagged as both a natural 1 and a natural 20.
    nat_conflicts: Vec<usize>,
}

impl RollTable {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<RollRecord>) -> Self {
        let mut characters = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut episode_bounds: Option<(i64, i64)> = None;
        let mut nat_conflicts = Vec::new();

        for (i, rec) in records.iter().enumerate() {
            if seen.insert(rec.character.as_str()) {
                characters.push(rec.character.clone());
            }
            categories.insert(rec.roll_category.clone());
            episode_bounds = Some(match episode_bounds {
                None => (rec.episode_num, rec.episode_num),
                Some((lo, hi)) => (lo.min(rec.episode_num), hi.max(rec.episode_num)),
            });
            if rec.is_nat1 && rec.is_nat20 {
                nat_conflicts.push(i);
            }
        }

        RollTable {
            records,
            characters,
            categories,
            episode_bounds,
            nat_conflicts,
        }
    }

    pub fn records(&self) -> &[RollRecord] {
        &self.records
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn episode_bounds(&self) -> Option<(i64, i64)> {
        self.episode_bounds
    }

    /// Rows whose nat flags are both set. The aggregates count each flag
    /// independently, so such rows show up in both tallies.
    pub fn nat_conflicts(&self) -> &[usize] {
        &self.nat_conflicts
    }

    /// Number of rolls.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RollType – label of the nat tally
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RollType {
    #[serde(rename = "Nat 1")]
    Nat1,
    #[serde(rename = "Nat 20")]
    Nat20,
}

impl fmt::Display for RollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollType::Nat1 => write!(f, "Nat 1"),
            RollType::Nat20 => write!(f, "Nat 20"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_first_appearance() {
        let table = RollTable::from_records(vec![
            RollRecord::new(3, "Jester", "Attack"),
            RollRecord::new(1, "Beau", "Skill"),
            RollRecord::new(7, "Jester", "Save"),
        ]);
        assert_eq!(table.characters(), ["Jester", "Beau"]);
        assert_eq!(table.episode_bounds(), Some((1, 7)));
        assert_eq!(
            table.categories().iter().collect::<Vec<_>>(),
            ["Attack", "Save", "Skill"]
        );
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = RollTable::from_records(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.episode_bounds(), None);
    }

    #[test]
    fn conflicting_nat_flags_are_reported() {
        let mut both = RollRecord::new(1, "Veth", "Attack");
        both.is_nat1 = true;
        both.is_nat20 = true;
        let table = RollTable::from_records(vec![RollRecord::new(1, "Veth", "Save"), both]);
        assert_eq!(table.nat_conflicts(), [1]);
    }

    #[test]
    fn default_roster_is_main_cast() {
        let roster = Roster::default();
        assert_eq!(roster.len(), 8);
        assert!(roster.contains("Caduceus"));
        assert!(!roster.contains("DM"));
    }
}
