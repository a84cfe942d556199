use super::model::{RollRecord, RollTable, Roster};

// ---------------------------------------------------------------------------
// Selection – a filtered view over the immutable table
// ---------------------------------------------------------------------------

/// Indices of the rows passing the filters applied so far.
///
/// Every filter is a plain row predicate, so they can be chained in any order
/// and the resulting row set is the same. The indices stay in table order.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    table: &'a RollTable,
    indices: Vec<usize>,
}

impl<'a> Selection<'a> {
    /// Every row of the table.
    pub fn all(table: &'a RollTable) -> Self {
        Selection {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    /// Keep rows with `min <= episode_num <= max`.
    pub fn episodes(self, min: i64, max: i64) -> Self {
        self.retain(|rec| (min..=max).contains(&rec.episode_num))
    }

    /// Keep rows rolled by a roster member. An empty roster keeps every row.
    pub fn roster(self, roster: &Roster) -> Self {
        if roster.is_empty() {
            return self;
        }
        self.retain(|rec| roster.contains(&rec.character))
    }

    /// Keep rows rolled by one character.
    pub fn character(self, name: &str) -> Self {
        self.retain(|rec| rec.character == name)
    }

    fn retain(mut self, keep: impl Fn(&RollRecord) -> bool) -> Self {
        let records = self.table.records();
        self.indices.retain(|&i| keep(&records[i]));
        self
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Rows of the selection, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &'a RollRecord> + '_ {
        let records = self.table.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// The sidebar filter: episode range, then the roster when guests are hidden.
///
/// `roster = None` keeps guests and NPCs, and so does an empty roster.
pub fn filter<'a>(
    table: &'a RollTable,
    episode_min: i64,
    episode_max: i64,
    roster: Option<&Roster>,
) -> Selection<'a> {
    let selection = Selection::all(table).episodes(episode_min, episode_max);
    match roster {
        Some(roster) => selection.roster(roster),
        None => selection,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample_table() -> RollTable {
        RollTable::from_records(vec![
            RollRecord::new(1, "Beau", "Attack"),
            RollRecord::new(2, "DM", "Attack"),
            RollRecord::new(3, "Jester", "Skill Check"),
            RollRecord::new(4, "Essek", "Save"),
            RollRecord::new(5, "Caleb", "Spell Attack"),
        ])
    }

    #[test]
    fn episode_bounds_are_inclusive() {
        let table = sample_table();
        let sel = filter(&table, 2, 4, None);
        assert_eq!(sel.indices(), [1, 2, 3]);
    }

    #[test]
    fn roster_excludes_guests() {
        let table = sample_table();
        let sel = filter(&table, 1, 5, Some(&Roster::default()));
        let names: Vec<_> = sel.iter().map(|r| r.character.as_str()).collect();
        assert_eq!(names, ["Beau", "Jester", "Caleb"]);
    }

    #[test]
    fn empty_roster_keeps_everyone() {
        let table = sample_table();
        let empty = Roster::new(Vec::<String>::new());
        assert_eq!(filter(&table, 1, 5, Some(&empty)).len(), 5);
        assert_eq!(Selection::all(&table).roster(&empty).len(), 5);
    }

    #[test]
    fn range_outside_data_selects_nothing() {
        let table = sample_table();
        assert!(filter(&table, 5000, 5001, None).is_empty());
    }

    #[test]
    fn character_filter_layers_on_top() {
        let table = sample_table();
        let sel = filter(&table, 1, 3, None).character("Jester");
        assert_eq!(sel.indices(), [2]);
    }

    fn arb_records() -> impl Strategy<Value = Vec<RollRecord>> {
        let names = prop::sample::select(vec!["Beau", "Fjord", "DM", "Pumat", "Veth"]);
        prop::collection::vec((1i64..40, names), 0..60).prop_map(|rows| {
            rows.into_iter()
                .map(|(ep, name)| RollRecord::new(ep, name, "Attack"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn filtered_rows_respect_episode_bounds(
            records in arb_records(),
            a in 0i64..45,
            b in 0i64..45,
            guests in any::<bool>(),
        ) {
            let (lo, hi) = (a.min(b), a.max(b));
            let table = RollTable::from_records(records);
            let roster = Roster::default();
            let sel = filter(&table, lo, hi, (!guests).then_some(&roster));
            for rec in sel.iter() {
                prop_assert!(lo <= rec.episode_num && rec.episode_num <= hi);
            }
        }

        #[test]
        fn filters_commute(records in arb_records(), a in 0i64..45, b in 0i64..45) {
            let (lo, hi) = (a.min(b), a.max(b));
            let table = RollTable::from_records(records);
            let roster = Roster::default();
            let roster_first = Selection::all(&table).roster(&roster).episodes(lo, hi);
            let episodes_first = Selection::all(&table).episodes(lo, hi).roster(&roster);
            prop_assert_eq!(roster_first.indices(), episodes_first.indices());
        }
    }
}
