//! makstat_rs
//!
//! A lightweight Rust library for retrieving, flattening, visualizing, and
//! analyzing statistical cubes from the MakStat PxWeb API (State Statistical
//! Office of North Macedonia). Pairs with the `makstat` CLI.
//!
//! ### Features
//! - Fetch any PxWeb table as a JSON-stat cube, with per-dimension category
//!   selections
//! - Validate and flatten the cube into labeled rows or nested hierarchies
//! - Save as CSV or JSON in a tidy, analysis-friendly schema
//! - Quick summary statistics (min, max, mean, median) per category
//! - Generate SVG/PNG bar, line, heatmap, treemap and flow charts
//!
//! ### Example
//! ```no_run
//! use makstat_rs::{Client, api::QueryClause};
//! use makstat_rs::viz::{ChartKind, ChartSpec};
//!
//! let client = Client::default();
//! let cube = client.fetch_table(
//!     "MakStat/Zemjodelstvo/Dobitok/175_ZemBroj_Reg_Dobitok_ml.px",
//!     &[QueryClause::items("Година", ["2023"])],
//! )?;
//! makstat_rs::storage::save_csv(&cube.rows(), "livestock_2023.csv")?;
//! let spec = ChartSpec::new(ChartKind::Treemap, "Региони")
//!     .series_dim("Добиток/живина/пчели")
//!     .fix("Година", "2023");
//! makstat_rs::viz::render_chart(&cube, &spec, "livestock.svg", 1000, 600)?;
//! let stats = makstat_rs::stats::grouped_summary(&cube.rows(), "Региони");
//! println!("{:#?}", stats);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod cube;
pub mod hierarchy;
pub mod models;
pub mod stats;
pub mod storage;
pub mod viz;

pub use api::{Client, RequestGeneration};
pub use cube::{Cube, Row};
pub use hierarchy::HierarchyNode;
pub use models::Dataset;
