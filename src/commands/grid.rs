//! Grid command implementation

use anyhow::{Context, Result};
use grid_trader::{Config, PriceGrid};
use itertools::Itertools;
use tracing::info;

const LEVELS_PER_LINE: usize = 8;

pub fn run(config_path: String, base_override: Option<f64>) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(base) = base_override {
        info!("Overriding base price to: {:.3}", base);
        config.grid.base_price = Some(base);
        config.grid.validate().context("Invalid base price override")?;
    }

    let base = config
        .grid
        .base_price
        .context("No base price configured; pass --base to preview the grid")?;

    let grid = PriceGrid::build(
        base,
        config.grid.min_price,
        config.grid.max_price,
        config.grid.width,
    )?;

    println!("\n{}", "=".repeat(72));
    println!("PRICE GRID: {}", config.symbol);
    println!("{}", "=".repeat(72));
    println!(
        "Base: {:.3}  Width: {:.2}%  Range: [{}, {}]  Levels: {}",
        grid.base_price(),
        grid.width() * 100.0,
        config.grid.min_price,
        config.grid.max_price,
        grid.len()
    );
    println!("{}", "-".repeat(72));

    for chunk in &grid.levels().iter().chunks(LEVELS_PER_LINE) {
        println!("{}", chunk.map(|level| format!("{:>8.3}", level)).join(" "));
    }
    println!("{}\n", "=".repeat(72));

    Ok(())
}
