//! CLI integration tests for bsp-overlay
//!
//! These run the binary against small map files written to a temporary
//! directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER_SIZE: usize = 1036;

/// A version 20 map with one solid 64-unit cube and the given landmarks
fn cube_map(landmarks: &[(&str, [f32; 3])]) -> Vec<u8> {
    let mut entities = String::from("{\n\"classname\" \"worldspawn\"\n}\n");
    for (name, origin) in landmarks {
        entities.push_str(&format!(
            "{{\n\"origin\" \"{} {} {}\"\n\"targetname\" \"{}\"\n\"classname\" \"info_landmark\"\n}}\n",
            origin[0], origin[1], origin[2], name
        ));
    }
    let mut entities = entities.into_bytes();
    entities.push(0);

    let mut planes = Vec::new();
    let mut sides = Vec::new();
    for axis in 0..3 {
        for (sign, dist) in [(1.0f32, 64.0f32), (-1.0, 0.0)] {
            let mut normal = [0.0f32; 3];
            normal[axis] = sign;
            for v in normal {
                planes.extend_from_slice(&v.to_le_bytes());
            }
            planes.extend_from_slice(&dist.to_le_bytes());
            planes.extend_from_slice(&(axis as i32).to_le_bytes());

            let plane_index = (sides.len() / 8) as u16;
            sides.extend_from_slice(&plane_index.to_le_bytes());
            sides.extend_from_slice(&[0, 0, 0xFF, 0xFF, 0, 0]);
        }
    }

    let mut nodes = Vec::new();
    nodes.extend_from_slice(&0i32.to_le_bytes());
    nodes.extend_from_slice(&(-1i32).to_le_bytes());
    nodes.extend_from_slice(&(-2i32).to_le_bytes());
    nodes.extend_from_slice(&[0u8; 20]);

    let mut leaves = Vec::new();
    for (first, count) in [(0u16, 0u16), (0, 1)] {
        leaves.extend_from_slice(&1u32.to_le_bytes());
        leaves.extend_from_slice(&[0u8; 20]);
        leaves.extend_from_slice(&first.to_le_bytes());
        leaves.extend_from_slice(&count.to_le_bytes());
        leaves.extend_from_slice(&[0xFF, 0xFF, 0, 0]);
    }

    let leaf_brushes = 0u16.to_le_bytes().to_vec();

    let mut brushes = Vec::new();
    brushes.extend_from_slice(&0i32.to_le_bytes());
    brushes.extend_from_slice(&6i32.to_le_bytes());
    brushes.extend_from_slice(&1u32.to_le_bytes());

    let lumps: [(usize, Vec<u8>); 7] = [
        (0, entities),
        (1, planes),
        (5, nodes),
        (10, leaves),
        (17, leaf_brushes),
        (18, brushes),
        (19, sides),
    ];

    let mut data = b"VBSP".to_vec();
    data.extend_from_slice(&20i32.to_le_bytes());
    data.resize(HEADER_SIZE, 0);
    for (slot, payload) in lumps {
        let at = 8 + slot * 16;
        let offset = data.len() as i32;
        data[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        data[at + 4..at + 8].copy_from_slice(&(payload.len() as i32).to_le_bytes());
        data.extend_from_slice(&payload);
    }
    data
}

fn write_map(dir: &Path, name: &str, landmarks: &[(&str, [f32; 3])]) {
    fs::write(dir.join(format!("{name}.bsp")), cube_map(landmarks)).unwrap();
}

fn bsp_overlay() -> Command {
    let mut cmd = Command::cargo_bin("bsp-overlay").unwrap();
    cmd.env_remove("BSP_MAPS_DIR");
    cmd
}

#[test]
fn test_info() {
    let dir = TempDir::new().unwrap();
    write_map(dir.path(), "cube", &[]);

    bsp_overlay()
        .arg("info")
        .arg(dir.path().join("cube.bsp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 20"))
        .stdout(predicate::str::contains("LUMP_BRUSHSIDES"));
}

#[test]
fn test_landmarks_json() {
    let dir = TempDir::new().unwrap();
    write_map(dir.path(), "cube", &[("lm_start", [8.0, 16.0, 32.0])]);

    bsp_overlay()
        .args(["landmarks", "--json"])
        .arg(dir.path().join("cube.bsp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lm_start\""))
        .stdout(predicate::str::contains("32.0"));
}

#[test]
fn test_brushes_from_maps_dir_env() {
    let dir = TempDir::new().unwrap();
    write_map(dir.path(), "cube", &[]);

    bsp_overlay()
        .env("BSP_MAPS_DIR", dir.path())
        .args(["brushes", "cube", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Brushes: "))
        .stdout(predicate::str::contains("1 box, 0 complex"))
        .stdout(predicate::str::contains("262144.0"));
}

#[test]
fn test_brushes_json() {
    let dir = TempDir::new().unwrap();
    write_map(dir.path(), "cube", &[]);

    bsp_overlay()
        .args(["brushes", "cube", "--json", "--no-depth-test", "--maps-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"depth_test\": false"))
        .stdout(predicate::str::contains("\"boxes\": 1"));
}

#[test]
fn test_offset_between_maps() {
    let dir = TempDir::new().unwrap();
    write_map(dir.path(), "d1_canals_01", &[("start", [0.0, 0.0, 0.0])]);
    write_map(dir.path(), "d1_canals_02", &[("start", [10.0, 0.0, 0.0])]);

    bsp_overlay()
        .arg("offset")
        .arg(dir.path().join("d1_canals_01.bsp"))
        .arg("--current")
        .arg(dir.path().join("d1_canals_02.bsp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Shared landmark: start"))
        .stdout(predicate::str::contains("Offset: 10 0 0"));
}

#[test]
fn test_missing_map_fails() {
    let dir = TempDir::new().unwrap();

    bsp_overlay()
        .args(["brushes", "nowhere", "--maps-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load map"));
}

#[test]
fn test_not_a_bsp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.bsp");
    fs::write(&path, vec![0u8; 2048]).unwrap();

    bsp_overlay()
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a bsp file"));
}

#[test]
fn test_completions() {
    bsp_overlay()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bsp-overlay"));
}
