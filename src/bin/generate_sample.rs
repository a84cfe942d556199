//! Writes a synthetic campaign roll table as `sample_rolls.csv` and
//! `sample_rolls.parquet`, in the column layout the dashboard loads.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const EPISODES: i64 = 141;

const CAST: [&str; 8] = [
    "Beau", "Fjord", "Jester", "Veth", "Caleb", "Yasha", "Caduceus", "Molly",
];
const GUESTS: [&str; 4] = ["DM", "Reani", "Kiri", "Essek"];

/// Category and the chance a roll of that category deals damage.
const CATEGORIES: [(&str, f64); 6] = [
    ("Attack", 0.55),
    ("Spell Attack", 0.6),
    ("Damage", 1.0),
    ("Skill Check", 0.0),
    ("Saving Throw", 0.0),
    ("Initiative", 0.0),
];

#[derive(Debug, Serialize)]
struct SampleRow {
    #[serde(rename = "Episode_Num")]
    episode: i64,
    #[serde(rename = "Character")]
    character: String,
    #[serde(rename = "Roll Category")]
    category: String,
    #[serde(rename = "Total Value")]
    total: f64,
    #[serde(rename = "Is_Nat1")]
    nat1: bool,
    #[serde(rename = "Is_Nat20")]
    nat20: bool,
    #[serde(rename = "Damage")]
    damage: f64,
    #[serde(rename = "Kills")]
    kills: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `1..=sides`.
    fn die(&mut self, sides: u64) -> u64 {
        self.next_u64() % sides + 1
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn generate(rng: &mut SimpleRng) -> Vec<SampleRow> {
    let mut rows = Vec::new();
    let categories: Vec<&str> = CATEGORIES.iter().map(|(c, _)| *c).collect();

    for episode in 1..=EPISODES {
        // Arc finales roll a lot more.
        let busy = if episode % 20 == 0 { 2.0 } else { 1.0 };
        let n_rolls = ((40 + rng.die(60)) as f64 * busy) as usize;

        for _ in 0..n_rolls {
            let character = if rng.next_f64() < 0.85 {
                rng.pick(&CAST)
            } else {
                rng.pick(&GUESTS)
            };
            // Molly leaves the table early in the campaign.
            if character == "Molly" && episode > 26 {
                continue;
            }
            let category = rng.pick(&categories);
            let damage_chance = CATEGORIES
                .iter()
                .find(|(c, _)| *c == category)
                .map_or(0.0, |(_, p)| *p);

            let face = rng.die(20);
            let damage = if rng.next_f64() < damage_chance {
                (rng.die(10) + rng.die(10) + rng.die(6)) as f64
            } else {
                0.0
            };
            let kills = if damage > 0.0 && rng.next_f64() < 0.06 { 1.0 } else { 0.0 };

            rows.push(SampleRow {
                episode,
                character: character.to_string(),
                category: category.to_string(),
                total: (face + rng.die(8)) as f64,
                nat1: face == 1,
                nat20: face == 20,
                damage,
                kills,
            });
        }
    }
    rows
}

fn write_csv(rows: &[SampleRow], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(rows: &[SampleRow], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Episode_Num", DataType::Int64, false),
        Field::new("Character", DataType::Utf8, false),
        Field::new("Roll Category", DataType::Utf8, false),
        Field::new("Total Value", DataType::Float64, true),
        Field::new("Is_Nat1", DataType::Boolean, false),
        Field::new("Is_Nat20", DataType::Boolean, false),
        Field::new("Damage", DataType::Float64, true),
        Field::new("Kills", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.episode))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.character))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.category))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.total))),
            Arc::new(BooleanArray::from(rows.iter().map(|r| r.nat1).collect::<Vec<_>>())),
            Arc::new(BooleanArray::from(rows.iter().map(|r| r.nat20).collect::<Vec<_>>())),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.damage))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.kills))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    write_csv(&rows, "sample_rolls.csv")?;
    write_parquet(&rows, "sample_rolls.parquet")?;

    println!(
        "Wrote {} rolls over {EPISODES} episodes to sample_rolls.csv and sample_rolls.parquet",
        rows.len()
    );
    Ok(())
}
