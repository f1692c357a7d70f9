//! BSP map command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use source_bsp::records::{Brush, BrushSide, LumpRecord, Node, Plane};
use source_bsp::{
    BrushShape, BspData, BspParser, Landmark, LoadOutcome, LoadedMap, LumpKind, MapOverlay,
    OverlayConfig,
};

use crate::utils::{add_table_row, create_spinner, create_table, format_bytes, format_vec3, format_volume};

#[derive(Subcommand)]
pub enum BspCommands {
    /// Display header information and the lump directory of a BSP file
    Info {
        /// Path to the BSP file
        file: PathBuf,

        /// Accept the vendor-packed version field
        #[arg(long)]
        packed: bool,
    },

    /// List the landmark entities of a BSP file
    Landmarks {
        /// Path to the BSP file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Accept the vendor-packed version field
        #[arg(long)]
        packed: bool,
    },

    /// Build the brush overlay for a map and summarise it
    Brushes {
        /// Map name, resolved as <maps-dir>/<map>.bsp
        map: String,

        /// Directory containing map files
        #[arg(long, env = "BSP_MAPS_DIR", default_value = "maps")]
        maps_dir: PathBuf,

        /// Draw the overlay through world geometry
        #[arg(long)]
        no_depth_test: bool,

        /// Accept the vendor-packed version field
        #[arg(long)]
        packed: bool,

        /// List every brush
        #[arg(long)]
        list: bool,

        /// Print the summary as JSON
        #[arg(long, conflicts_with = "list")]
        json: bool,
    },

    /// Compute the landmark offset that aligns one map to another
    Offset {
        /// Map whose geometry is being overlaid
        file: PathBuf,

        /// Map standing in for the one the engine is running
        #[arg(long)]
        current: PathBuf,

        /// Accept the vendor-packed version field
        #[arg(long)]
        packed: bool,
    },
}

pub fn execute(command: BspCommands) -> Result<()> {
    match command {
        BspCommands::Info { file, packed } => execute_info(&file, packed),
        BspCommands::Landmarks { file, json, packed } => execute_landmarks(&file, json, packed),
        BspCommands::Brushes {
            map,
            maps_dir,
            no_depth_test,
            packed,
            list,
            json,
        } => {
            let config = OverlayConfig::default()
                .with_maps_dir(maps_dir)
                .with_packed_version(packed);
            execute_brushes(config, &map, !no_depth_test, list, json)
        }
        BspCommands::Offset {
            file,
            current,
            packed,
        } => execute_offset(&file, &current, packed),
    }
}

fn parse_file(path: &Path, packed: bool) -> Result<BspData> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    BspParser::new()
        .with_packed_version(packed)
        .parse(&mut reader)
        .with_context(|| format!("Failed to parse BSP file: {}", path.display()))
}

fn execute_info(path: &Path, packed: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let header = BspParser::new()
        .with_packed_version(packed)
        .parse_header(&mut reader)
        .with_context(|| format!("Failed to read BSP header: {}", path.display()))?;

    println!("BSP File: {}", style(path.display()).cyan());
    println!("{}", "=".repeat(50));
    println!("Version: {}", style(header.version).yellow());
    println!("Map revision: {}", header.map_revision);
    println!("File size: {}", format_bytes(file_size));
    println!();

    let leaf_size = header.version.leaf_layout().record_size();
    let mut table = create_table(&["Lump", "Slot", "Offset", "Size", "Records"]);
    for kind in LumpKind::ALL {
        let lump = header.lump(kind);
        let record_size = match kind {
            LumpKind::Entities => None,
            LumpKind::Planes => Some(Plane::SIZE),
            LumpKind::Nodes => Some(Node::SIZE),
            LumpKind::Leaves => Some(leaf_size),
            LumpKind::LeafBrushes => Some(<u16 as LumpRecord>::SIZE),
            LumpKind::Brushes => Some(Brush::SIZE),
            LumpKind::BrushSides => Some(BrushSide::SIZE),
        };
        let length = lump.length.max(0) as usize;
        let records = record_size.map_or_else(
            || "-".to_string(),
            |size| {
                if length % size == 0 {
                    (length / size).to_string()
                } else {
                    style("misaligned").red().to_string()
                }
            },
        );
        add_table_row(
            &mut table,
            vec![
                kind.name().to_string(),
                kind.index().to_string(),
                lump.offset.to_string(),
                format_bytes(length as u64),
                records,
            ],
        );
    }
    table.printstd();

    Ok(())
}

fn execute_landmarks(path: &Path, json: bool, packed: bool) -> Result<()> {
    let data = parse_file(path, packed)?;
    let landmarks = data
        .landmarks()
        .with_context(|| format!("Failed to scan entities: {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&landmarks)?);
        return Ok(());
    }

    if landmarks.is_empty() {
        println!("No landmarks in {}", style(path.display()).cyan());
        return Ok(());
    }

    let mut table = create_table(&["Name", "Origin"]);
    for landmark in &landmarks {
        add_table_row(
            &mut table,
            vec![landmark.name.clone(), format_vec3(landmark.origin)],
        );
    }
    table.printstd();
    println!("{} landmark(s)", landmarks.len());

    Ok(())
}

#[derive(Serialize)]
struct BrushSummary<'a> {
    map: &'a str,
    depth_test: bool,
    brushes: usize,
    boxes: usize,
    complex: usize,
    vertices: usize,
    landmarks: Vec<Landmark>,
}

fn execute_brushes(
    config: OverlayConfig,
    map: &str,
    depth_test: bool,
    list: bool,
    json: bool,
) -> Result<()> {
    let path = config.map_path(map);
    let overlay = MapOverlay::with_config(config);

    let spinner = create_spinner(&format!("Building brushes for {}", map));
    let outcome = overlay.load(map, depth_test);
    spinner.finish_and_clear();
    outcome.with_context(|| format!("Failed to load map: {}", path.display()))?;

    let geometry = overlay.geometry();
    let boxes = geometry
        .iter()
        .filter(|g| g.shape == BrushShape::Box)
        .count();
    let summary = BrushSummary {
        map,
        depth_test,
        brushes: geometry.len(),
        boxes,
        complex: geometry.len() - boxes,
        vertices: geometry
            .iter()
            .map(|g| g.polyhedron.vertices().len())
            .sum(),
        landmarks: overlay.landmarks(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Map: {}", style(path.display()).cyan());
    println!("Depth test: {}", if depth_test { "on" } else { "off" });
    println!(
        "Brushes: {} ({} box, {} complex)",
        style(summary.brushes).yellow(),
        summary.boxes,
        summary.complex
    );
    println!("Vertices: {}", summary.vertices);
    println!("Landmarks: {}", summary.landmarks.len());

    if list {
        println!();
        let mut table = create_table(&[
            "Brush", "Shape", "Vertices", "Faces", "Edges", "Volume", "Mins", "Maxs",
        ]);
        for brush in geometry.iter() {
            let (mins, maxs) = brush.polyhedron.bounds();
            add_table_row(
                &mut table,
                vec![
                    brush.brush_index.to_string(),
                    format!("{:?}", brush.shape),
                    brush.polyhedron.vertices().len().to_string(),
                    brush.polyhedron.faces().len().to_string(),
                    brush.polyhedron.edges().len().to_string(),
                    format_volume(brush.polyhedron.volume()),
                    format_vec3(mins),
                    format_vec3(maxs),
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}

/// Split a map path into (directory, name, extension) for [`OverlayConfig`]
fn split_map_path(path: &Path) -> Result<(PathBuf, String, String)> {
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .with_context(|| format!("Not a map file name: {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("bsp");
    let dir = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
    Ok((dir, name.to_string(), extension.to_string()))
}

fn execute_offset(file: &Path, current: &Path, packed: bool) -> Result<()> {
    let (dir, name, extension) = split_map_path(file)?;
    let overlay = MapOverlay::with_config(
        OverlayConfig::default()
            .with_maps_dir(dir)
            .with_extension(extension)
            .with_packed_version(packed),
    );
    if let LoadOutcome::Loaded { landmarks, .. } = overlay
        .load(&name, true)
        .with_context(|| format!("Failed to load map: {}", file.display()))?
    {
        log::info!("{} has {} landmark(s)", name, landmarks);
    }

    let (_, current_name, _) = split_map_path(current)?;
    let current_landmarks = parse_file(current, packed)?
        .landmarks()
        .with_context(|| format!("Failed to scan entities: {}", current.display()))?;
    let engine = LoadedMap::new(current_name, current_landmarks);

    let offset = overlay.landmark_offset(&engine);
    let own = overlay.landmarks();
    let shared = engine
        .landmarks
        .iter()
        .find(|l| own.iter().any(|o| o.name == l.name));

    match shared {
        Some(landmark) => println!(
            "Shared landmark: {}",
            style(&landmark.name).yellow()
        ),
        None => println!("No shared landmark"),
    }
    println!("Offset: {}", format_vec3(offset));

    Ok(())
}
