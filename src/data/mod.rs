/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RollTable (memoized per location)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RollTable │  Vec<RollRecord>, character / category index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  episode range, roster, character → Selection
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  Selection → ViewBundle (charts + summary + metrics)
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
