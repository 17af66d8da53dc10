/// Data layer: table type, loading, filtering and statistics.
///
/// Architecture:
/// ```text
///      .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table, write Table → .csv
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  named columns of Values, shared row count
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  filter   │   │  stats    │  means, correlation, box/hist/KDE
///   └──────────┘   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
