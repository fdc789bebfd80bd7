//! # Virtex CLI
//!
//! Command-line interface for the Virtex virtual texture.
//!
//! ## Commands
//! - `demo` - Build a synthetic scene and resolve a grid of samples
//! - `inspect` - Print occupancy of a saved cache index
//! - `resolve` - Trace the level search for a single sample

pub mod demo;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec2;
use virtex_core::key::ORIGIN_BITS;
use virtex_core::VirtualTextureConfig;
use virtex_index::{CacheIndex, SubtableId};
use virtex_sampler::{resolve_levels, Found, Resolution, VirtualTexture};

use crate::demo::{build_scene, grid_queries, DemoImage};

/// Virtex sparse virtual texture tools
#[derive(Parser)]
#[command(name = "virtex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a grid of samples against a synthetic scene
    Demo {
        /// Grid width and height in samples
        #[arg(short, long, default_value = "256")]
        size: u32,

        /// Number of mip levels, starting at the configured minimum
        #[arg(short, long, default_value = "6", value_parser = clap::value_parser!(u32).range(1..=9))]
        levels: u32,

        /// Fraction of tiles made resident
        #[arg(short, long, default_value = "0.5")]
        residency: f32,

        /// Write the resolved image as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the generated index (`.json` or binary)
        #[arg(long)]
        save_index: Option<PathBuf>,
    },

    /// Print occupancy of a saved index
    Inspect {
        /// Index file
        index: PathBuf,
    },

    /// Trace the level search for one sample
    Resolve {
        /// Index file
        index: PathBuf,

        /// Horizontal coordinate in level-0 tile units
        #[arg(long)]
        u: f32,

        /// Vertical coordinate in level-0 tile units
        #[arg(long)]
        v: f32,

        /// Desired fractional level
        #[arg(long)]
        lod: f32,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo {
            size,
            levels,
            residency,
            output,
            save_index,
        } => {
            run_demo(&config, size, levels, residency, output.as_deref(), save_index.as_deref())?;
        }

        Commands::Inspect { index } => {
            let index = load_index(&index)?;
            print!("{}", inspect_report(&index));
        }

        Commands::Resolve { index, u, v, lod } => {
            let index = load_index(&index)?;
            let range = config.lod_range()?;
            let resolution = resolve_levels(&index, Vec2::new(u, v), lod, &range);
            print!("{}", resolution_report(&resolution));
        }
    }

    Ok(())
}

/// Load and validate a configuration, or use the defaults
pub fn load_config(path: Option<&Path>) -> Result<VirtualTextureConfig> {
    let Some(path) = path else {
        return Ok(VirtualTextureConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: VirtualTextureConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn load_index(path: &Path) -> Result<CacheIndex> {
    CacheIndex::load(path).with_context(|| format!("failed to load index {}", path.display()))
}

/// Build a scene, resolve a `size × size` grid and report
pub fn run_demo(
    config: &VirtualTextureConfig,
    size: u32,
    levels: u32,
    residency: f32,
    output: Option<&Path>,
    save_index: Option<&Path>,
) -> Result<DemoImage> {
    anyhow::ensure!(size > 0, "demo size must be non-zero");
    anyhow::ensure!(
        (0.0..=1.0).contains(&residency),
        "residency must be within 0..=1, got {}",
        residency
    );

    let config = VirtualTextureConfig {
        max_level: config.min_level + levels as i32 - 1,
        ..config.clone()
    };
    config.validate().context("invalid demo level range")?;
    anyhow::ensure!(
        config.max_level <= ORIGIN_BITS as i32,
        "demo levels {}..={} go past level {}",
        config.min_level,
        config.max_level,
        ORIGIN_BITS
    );

    log::info!("Building scene...");
    log::info!("  Levels: {}..={}", config.min_level, config.max_level);
    log::info!("  Residency: {:.0}%", residency * 100.0);
    let scene = build_scene(&config, residency)?;
    let stats = scene.index.stats();
    log::info!(
        "  Resident: {} tiles ({} skipped), load factor {:.2}",
        scene.resident,
        scene.skipped,
        stats.load_factor()
    );
    log::debug!(
        "  Atlas: {}x{} texels, {} tile addresses",
        scene.atlas.size().x,
        scene.atlas.size().y,
        scene.layout.capacity()
    );

    if let Some(path) = save_index {
        scene
            .index
            .save(path)
            .with_context(|| format!("failed to save index {}", path.display()))?;
        log::info!("  Index saved to {}", path.display());
    }

    let queries = grid_queries(size, config.max_level);
    let mut texture = VirtualTexture::with_index(config, scene.index, scene.atlas)?;
    log::info!("Resolving {} samples...", queries.len());
    let samples = texture.resolve_pass(&queries);
    let batch = texture.stats().batch;
    log::info!(
        "  Blended: {}, single: {}, miss: {} (hit rate {:.1}%)",
        batch.blended,
        batch.single,
        batch.miss,
        batch.hit_rate() * 100.0
    );

    let requests = texture.feedback(&queries);
    log::info!("  Feedback: {} missing tiles requested", requests.len());
    for request in requests.iter().take(5) {
        log::debug!("    {} x{} ({:?})", request.key, request.count, request.priority);
    }

    let image = DemoImage::from_samples(size, &samples);
    if let Some(path) = output {
        let json = serde_json::to_string(&image)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("  Image written to {}", path.display());
    }
    Ok(image)
}

/// Occupancy per subtable and per level
pub fn inspect_report(index: &CacheIndex) -> String {
    let stats = index.stats();
    let mut out = String::new();
    let _ = writeln!(out, "cache size: {}", index.cache_size());
    for id in SubtableId::ALL {
        let _ = writeln!(
            out,
            "subtable {}: seed {:#010x}, {}/{} occupied",
            id,
            index.seed(id),
            stats.occupied[id as usize],
            stats.cache_size
        );
    }
    let _ = writeln!(out, "resident: {} (load factor {:.3})", stats.resident(), stats.load_factor());
    for (level, count) in &stats.per_level {
        let _ = writeln!(out, "  level {:>2}: {}", level, count);
    }
    out
}

fn found_line(label: &str, found: Option<&Found>) -> String {
    match found {
        Some(found) => format!(
            "{}: {} in {} at ({:.4}, {:.4})..({:.4}, {:.4})",
            label,
            found.key,
            found.subtable,
            found.region.min.x,
            found.region.min.y,
            found.region.max.x,
            found.region.max.y
        ),
        None => format!("{}: none", label),
    }
}

/// Lower and upper findings plus the blend factor
pub fn resolution_report(resolution: &Resolution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "desired level: {:.3}", resolution.desired);
    let _ = writeln!(out, "{}", found_line("lower", resolution.lower.as_ref()));
    let _ = writeln!(out, "{}", found_line("upper", resolution.upper.as_ref()));
    let _ = writeln!(out, "blend factor: {:.3}", resolution.blend_factor());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec2;
    use virtex_core::{Rect, TileKey};

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["virtex", "demo"]);
        if let Commands::Demo { size, levels, residency, output, save_index } = cli.command {
            assert_eq!(size, 256);
            assert_eq!(levels, 6);
            assert_eq!(residency, 0.5);
            assert!(output.is_none());
            assert!(save_index.is_none());
        } else {
            panic!("Expected Demo command");
        }
    }

    #[test]
    fn test_resolve_command() {
        let cli = Cli::parse_from([
            "virtex", "-c", "vt.json", "resolve", "index.bin", "--u", "0.5", "--v", "0.25", "--lod", "2.3",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("vt.json")));
        if let Commands::Resolve { index, u, v, lod } = cli.command {
            assert_eq!(index, PathBuf::from("index.bin"));
            assert_eq!((u, v, lod), (0.5, 0.25, 2.3));
        } else {
            panic!("Expected Resolve command");
        }
    }

    #[test]
    fn test_levels_are_bounded() {
        assert!(Cli::try_parse_from(["virtex", "demo", "--levels", "0"]).is_err());
        assert!(Cli::try_parse_from(["virtex", "demo", "--levels", "12"]).is_err());
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), VirtualTextureConfig::default());

        let path = std::env::temp_dir().join("virtex_cli_config_test.json");
        fs::write(&path, r#"{ "cache_size": 64, "max_level": 5 }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.cache_size, 64);
        assert_eq!(config.max_level, 5);
        assert_eq!(config.tile_size, 128);

        fs::write(&path, r#"{ "seeds": [4, 4] }"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_run_demo_writes_outputs() {
        let dir = std::env::temp_dir();
        let image_path = dir.join("virtex_cli_demo_test.json");
        let index_path = dir.join("virtex_cli_demo_test_index.bin");
        let config = VirtualTextureConfig {
            cache_size: 128,
            ..Default::default()
        };

        let image = run_demo(&config, 8, 3, 1.0, Some(&image_path), Some(&index_path)).unwrap();
        assert_eq!(image.pixels.len(), 64);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&image_path).unwrap()).unwrap();
        assert_eq!(written["width"], 8);
        let index = CacheIndex::load(&index_path).unwrap();
        assert!(index.stats().resident() > 0);

        let _ = fs::remove_file(&image_path);
        let _ = fs::remove_file(&index_path);
    }

    #[test]
    fn test_run_demo_rejects_bad_input() {
        let config = VirtualTextureConfig::default();
        assert!(run_demo(&config, 0, 3, 0.5, None, None).is_err());
        assert!(run_demo(&config, 4, 3, 1.5, None, None).is_err());

        let deep = VirtualTextureConfig {
            min_level: 12,
            ..Default::default()
        };
        let err = run_demo(&deep, 4, 3, 0.5, None, None).unwrap_err();
        assert!(err.to_string().contains("go past level 13"));
    }

    #[test]
    fn test_reports() {
        let mut index = CacheIndex::new(8, [1, 2]).unwrap();
        let key = TileKey::new(UVec2::new(1, 1), 1).unwrap();
        index.place(SubtableId::B, key, Rect::new(Vec2::ZERO, Vec2::splat(0.5)));

        let report = inspect_report(&index);
        assert!(report.contains("cache size: 8"));
        assert!(report.contains("subtable B: seed 0x00000002, 1/8 occupied"));
        assert!(report.contains("level  1: 1"));

        let range = virtex_core::LodRange::new(0, 3).unwrap();
        let resolution = resolve_levels(&index, Vec2::new(0.75, 0.75), 1.0, &range);
        let report = resolution_report(&resolution);
        assert!(report.contains("lower: (1, 1)@1 in B"));
        assert!(report.contains("blend factor: 0.000"));
    }
}
