use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::filter::{Selection, filter};
use super::model::{RollTable, RollType, Roster};

/// Width of the centered rolling mean over rolls per episode.
pub const ROLLING_WINDOW: usize = 7;

// ---------------------------------------------------------------------------
// Dashboard controls
// ---------------------------------------------------------------------------

/// The sidebar controls the views are computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    /// Inclusive `(min, max)` episode range.
    pub episode_range: (i64, i64),
    /// Character shown in the roll-category breakdown.
    pub selected_character: Option<String>,
    /// Whether guests and NPCs stay in the episode-filtered slice.
    pub include_guests: bool,
}

impl DashboardState {
    /// Defaults for a freshly loaded table: the full episode range, the first
    /// character in the table and guests included.
    pub fn for_table(table: &RollTable) -> Self {
        DashboardState {
            episode_range: table.episode_bounds().unwrap_or((0, 0)),
            selected_character: table.characters().first().cloned(),
            include_guests: true,
        }
    }

    /// Clamp the episode range into the table's observed bounds and keep
    /// `min <= max`.
    pub fn clamp_to(&mut self, table: &RollTable) {
        let Some((lo, hi)) = table.episode_bounds() else {
            return;
        };
        let (mut min, mut max) = self.episode_range;
        min = min.clamp(lo, hi);
        max = max.clamp(lo, hi);
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        self.episode_range = (min, max);
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NatTally {
    pub character: String,
    pub roll_type: RollType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeFrequency {
    pub episode: i64,
    pub rolls: usize,
    /// Centered rolling mean of `rolls`; `None` without a full window.
    pub rolling_avg: Option<f64>,
}

/// Roll counts per episode with every episode carrying every category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryDistribution {
    /// Every category of the filtered rows, sorted by name.
    pub categories: Vec<String>,
    pub episodes: Vec<EpisodeProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeProfile {
    pub episode: i64,
    /// One count per entry of [`CategoryDistribution::categories`].
    pub counts: Vec<usize>,
}

impl CategoryDistribution {
    pub fn count(&self, episode: i64, category: &str) -> Option<usize> {
        let col = self.categories.iter().position(|c| c == category)?;
        let profile = self.episodes.iter().find(|p| p.episode == episode)?;
        profile.counts.get(col).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterTotal {
    pub character: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSummary {
    pub character: String,
    pub total_rolls: usize,
    /// Mean roll rounded to 2 decimals; `None` when there is nothing to average.
    pub avg_roll: Option<f64>,
    pub nat1s: usize,
    pub nat20s: usize,
    pub total_damage: f64,
    pub kills: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_rolls: usize,
    pub total_damage: i64,
    pub top_killer: Option<String>,
}

/// Everything the front end renders for one set of controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewBundle {
    pub state: DashboardState,
    pub filtered_rolls: usize,
    pub roll_breakdown: Vec<CategoryCount>,
    pub nat_tally: Vec<NatTally>,
    pub roll_frequency: Vec<EpisodeFrequency>,
    pub category_distribution: CategoryDistribution,
    pub damage_by_character: Vec<CharacterTotal>,
    pub kills_by_character: Vec<CharacterTotal>,
    pub character_summary: Vec<CharacterSummary>,
    pub metrics: Metrics,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Filter + aggregation settings that stay fixed for a session.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub roster: Roster,
    pub rolling_window: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline {
            roster: Roster::default(),
            rolling_window: ROLLING_WINDOW,
        }
    }
}

impl Pipeline {
    /// Recompute every view for the given controls.
    ///
    /// The summary table and the metrics always cover the whole table; the
    /// other views follow the sidebar filters.
    pub fn compute_views(&self, table: &RollTable, state: &DashboardState) -> ViewBundle {
        let (min, max) = state.episode_range;
        let guest_filter = (!state.include_guests).then_some(&self.roster);
        let slice = filter(table, min, max, guest_filter);
        let main_cast = slice.clone().roster(&self.roster);

        let roll_breakdown = match &state.selected_character {
            Some(name) => roll_category_breakdown(&slice.clone().character(name)),
            None => Vec::new(),
        };
        let (damage_by_character, kills_by_character) = combat_totals(&main_cast);

        log::debug!(
            "Recomputed views for episodes {min}..={max} (guests: {}): {} rolls",
            state.include_guests,
            slice.len()
        );

        ViewBundle {
            state: state.clone(),
            filtered_rolls: slice.len(),
            roll_breakdown,
            nat_tally: nat_tally(&main_cast),
            roll_frequency: roll_frequency(&slice, self.rolling_window),
            category_distribution: category_distribution(&slice),
            damage_by_character,
            kills_by_character,
            character_summary: character_summary(table, &self.roster),
            metrics: metrics(table),
        }
    }
}

/// [`Pipeline::compute_views`] with the default rolling window.
pub fn compute_views(table: &RollTable, state: &DashboardState, roster: &Roster) -> ViewBundle {
    Pipeline {
        roster: roster.clone(),
        rolling_window: ROLLING_WINDOW,
    }
    .compute_views(table, state)
}

// ---------------------------------------------------------------------------
// Individual aggregations
// ---------------------------------------------------------------------------

/// Rolls per category, most frequent first (ties by category name).
pub fn roll_category_breakdown(selection: &Selection<'_>) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in selection.iter() {
        *counts.entry(rec.roll_category.as_str()).or_default() += 1;
    }
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Nat 1 and Nat 20 counts per character in long form: every character's
/// "Nat 1" row first, then every "Nat 20" row, characters in name order.
pub fn nat_tally(selection: &Selection<'_>) -> Vec<NatTally> {
    let mut per_char: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for rec in selection.iter() {
        let entry = per_char.entry(rec.character.as_str()).or_default();
        entry.0 += usize::from(rec.is_nat1);
        entry.1 += usize::from(rec.is_nat20);
    }

    [RollType::Nat1, RollType::Nat20]
        .into_iter()
        .flat_map(|roll_type| {
            per_char.iter().map(move |(character, (nat1, nat20))| NatTally {
                character: character.to_string(),
                roll_type,
                count: match roll_type {
                    RollType::Nat1 => *nat1,
                    RollType::Nat20 => *nat20,
                },
            })
        })
        .collect()
}

/// Rolls per episode in episode order, with a centered rolling mean.
pub fn roll_frequency(selection: &Selection<'_>, window: usize) -> Vec<EpisodeFrequency> {
    let mut per_episode: BTreeMap<i64, usize> = BTreeMap::new();
    for rec in selection.iter() {
        *per_episode.entry(rec.episode_num).or_default() += 1;
    }

    let counts: Vec<f64> = per_episode.values().map(|&c| c as f64).collect();
    let averages = centered_rolling_mean(&counts, window);

    per_episode
        .into_iter()
        .zip(averages)
        .map(|((episode, rolls), rolling_avg)| EpisodeFrequency {
            episode,
            rolls,
            rolling_avg,
        })
        .collect()
}

/// Mean over a window of `window` positions centered on each point.
///
/// Position `i` averages `i - window / 2 ..= i + (window - 1) / 2`, so an
/// odd window of 7 spans `i-3 ..= i+3` and an even window of 4 spans
/// `i-2 ..= i+1`. Positions whose window runs past either end get `None`.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let ahead = (window - 1) / 2;
    let behind = window / 2;

    (0..values.len())
        .map(|i| {
            let lo = i.checked_sub(behind)?;
            let hi = i + ahead;
            if hi >= values.len() {
                return None;
            }
            Some(values[lo..=hi].iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Counts per (episode, category), zero-filled so every episode carries the
/// full category set of the selection.
pub fn category_distribution(selection: &Selection<'_>) -> CategoryDistribution {
    let categories: BTreeSet<&str> = selection.iter().map(|r| r.roll_category.as_str()).collect();
    let column: BTreeMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, i))
        .collect();

    let mut episodes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for rec in selection.iter() {
        let counts = episodes
            .entry(rec.episode_num)
            .or_insert_with(|| vec![0; categories.len()]);
        counts[column[rec.roll_category.as_str()]] += 1;
    }

    CategoryDistribution {
        categories: categories.into_iter().map(str::to_string).collect(),
        episodes: episodes
            .into_iter()
            .map(|(episode, counts)| EpisodeProfile { episode, counts })
            .collect(),
    }
}

/// Damage and kill totals per character, each sorted descending on its own
/// metric. Ties keep character name order.
pub fn combat_totals(selection: &Selection<'_>) -> (Vec<CharacterTotal>, Vec<CharacterTotal>) {
    let mut per_char: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for rec in selection.iter() {
        let entry = per_char.entry(rec.character.as_str()).or_default();
        entry.0 += rec.damage;
        entry.1 += rec.kills;
    }

    let ranked = |pick: fn(&(f64, f64)) -> f64| {
        let mut out: Vec<CharacterTotal> = per_char
            .iter()
            .map(|(character, totals)| CharacterTotal {
                character: character.to_string(),
                total: pick(totals),
            })
            .collect();
        out.sort_by(|a, b| b.total.total_cmp(&a.total));
        out
    };

    (ranked(|t| t.0), ranked(|t| t.1))
}

/// Campaign-wide summary for each roster member, in name order.
///
/// Works on the whole table. Members without rolls still get a row, with
/// `avg_roll = None`.
pub fn character_summary(table: &RollTable, roster: &Roster) -> Vec<CharacterSummary> {
    let mut rows: BTreeMap<&str, (CharacterSummary, f64, usize)> = roster
        .members()
        .map(|name| {
            let empty = CharacterSummary {
                character: name.to_string(),
                total_rolls: 0,
                avg_roll: None,
                nat1s: 0,
                nat20s: 0,
                total_damage: 0.0,
                kills: 0.0,
            };
            (name, (empty, 0.0, 0))
        })
        .collect();

    for rec in table.records() {
        let Some((row, value_sum, value_count)) = rows.get_mut(rec.character.as_str()) else {
            continue;
        };
        row.total_rolls += 1;
        row.nat1s += usize::from(rec.is_nat1);
        row.nat20s += usize::from(rec.is_nat20);
        row.total_damage += rec.damage;
        row.kills += rec.kills;
        if let Some(v) = rec.total_value {
            *value_sum += v;
            *value_count += 1;
        }
    }

    rows.into_values()
        .map(|(mut row, value_sum, value_count)| {
            row.avg_roll = (value_count > 0).then(|| round2(value_sum / value_count as f64));
            row
        })
        .collect()
}

/// Headline numbers over the whole table.
///
/// The top killer is taken across every character, guests included; equal
/// totals go to the alphabetically first name.
pub fn metrics(table: &RollTable) -> Metrics {
    let mut kills: BTreeMap<&str, f64> = BTreeMap::new();
    let mut total_damage = 0.0;
    for rec in table.records() {
        *kills.entry(rec.character.as_str()).or_default() += rec.kills;
        total_damage += rec.damage;
    }

    let mut top_killer: Option<(&str, f64)> = None;
    for (name, total) in kills {
        if top_killer.map_or(true, |(_, best)| total > best) {
            top_killer = Some((name, total));
        }
    }

    Metrics {
        total_rolls: table.len(),
        total_damage: total_damage.trunc() as i64,
        top_killer: top_killer.map(|(name, _)| name.to_string()),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
