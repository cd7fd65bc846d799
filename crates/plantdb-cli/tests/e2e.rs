use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};

fn plantdb(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_plantdb"));
    cmd.arg("--root").arg(root);
    cmd
}

fn run_ok(root: &Path, args: &[&str]) -> Output {
    let out = plantdb(root).args(args).output().expect("run plantdb");
    assert!(
        out.status.success(),
        "expected success\nargs={args:?}\nstatus={}\nstdout={}\nstderr={}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    out
}

fn run_err(root: &Path, args: &[&str]) -> Output {
    let out = plantdb(root).args(args).output().expect("run plantdb");
    assert!(
        !out.status.success(),
        "expected failure\nargs={args:?}\nstatus={}\nstdout={}\nstderr={}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    out
}

fn run_ok_json(root: &Path, args: &[&str]) -> Value {
    let mut args = args.to_vec();
    args.push("--json");
    let out = run_ok(root, &args);
    serde_json::from_slice(&out.stdout).expect("stdout is valid JSON")
}

fn plant_json(plant_id: u16, pack_id: u16, version: u16, name: &str) -> Value {
    json!({
        "plant_id": plant_id,
        "pack_id": pack_id,
        "version": version,
        "common_name": name,
        "scientific_name": "Hylocereus undatus",
        "kc": { "ini": 0.4, "dev": 0.7, "mid": 0.95, "end": 0.6 },
        "root_depth_min_m": 0.2,
        "root_depth_max_m": 0.6,
        "stage_days": { "ini": 20, "dev": 30, "mid": 60, "end": 20 },
        "depletion_fraction": 0.5
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn init_provisions_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");

    let first = run_ok_json(&root, &["init", "--options"]);
    assert_eq!(first["options_written"], true);
    assert_eq!(first["failed"], 0);
    let builtin = first["builtin_count"].as_u64().unwrap();
    assert!(builtin > 0);
    assert_eq!(first["provisioned"].as_u64().unwrap(), builtin);
    assert!(root.join("options.json").is_file());

    let again = run_ok_json(&root, &["provision"]);
    assert_eq!(again["provisioned"], 0);
    assert_eq!(again["skipped"].as_u64().unwrap(), builtin);

    let listed = run_ok_json(&root, &["list", "--pack", "0", "--limit", "100"]);
    assert_eq!(listed.as_array().unwrap().len() as u64, builtin);
}

#[test]
fn plant_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    run_ok(&root, &["init"]);
    let v1 = write_json(dir.path(), "v1.json", &plant_json(500, 7, 1, "Dragon Fruit"));
    let v2 = write_json(dir.path(), "v2.json", &plant_json(500, 7, 2, "Pitaya"));

    let installed = run_ok_json(&root, &["install", &v1]);
    assert_eq!(installed["outcome"], "installed");
    assert_eq!(installed["code"], 0);
    let current = run_ok_json(&root, &["install", &v1]);
    assert_eq!(current["outcome"], "already_current");
    assert_eq!(current["code"], 2);
    let updated = run_ok_json(&root, &["install", &v2]);
    assert_eq!(updated["outcome"], "updated");
    let downgrade = run_ok_json(&root, &["install", &v1]);
    assert_eq!(downgrade["outcome"], "already_current");

    let plant = run_ok_json(&root, &["get", "500"]);
    assert_eq!(plant["common_name"], "Pitaya");
    assert_eq!(plant["version"], 2);

    let custom = run_ok_json(&root, &["list", "--custom"]);
    assert_eq!(custom, json!([{ "plant_id": 500, "pack_id": 7, "version": 2, "name": "Pitaya" }]));

    let stats = run_ok_json(&root, &["stats"]);
    assert_eq!(stats["status"], "ok");
    assert_eq!(stats["custom_plant_count"], 1);
    let counter = stats["change_counter"].as_u64().unwrap();

    run_ok(&root, &["delete", "500"]);
    let err = run_err(&root, &["delete", "500"]);
    assert!(String::from_utf8_lossy(&err.stderr).contains("not found"));
    let stats = run_ok_json(&root, &["stats"]);
    assert_eq!(stats["change_counter"].as_u64().unwrap(), counter + 1);
    run_err(&root, &["get", "500"]);
}

#[test]
fn rejects_invalid_plant() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let mut bad = plant_json(500, 7, 1, "Dragon Fruit");
    bad["kc"]["mid"] = json!(3.5);
    let path = write_json(dir.path(), "bad.json", &bad);

    let err = run_err(&root, &["install", &path]);
    assert!(String::from_utf8_lossy(&err.stderr).contains("kc"));
    assert!(!root.join("plants").join("p_01F4.bin").exists());
}

#[test]
fn packs_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    run_ok(&root, &["init"]);
    let pack = json!({
        "pack": { "pack_id": 7, "version": 1, "name": "Tropical", "plant_ids": [500, 501] },
        "plants": [
            plant_json(500, 7, 1, "Dragon Fruit"),
            plant_json(501, 7, 1, "Passion Fruit"),
        ]
    });
    let path = write_json(dir.path(), "pack.json", &pack);

    let report = run_ok_json(&root, &["install-pack", &path]);
    assert_eq!(report["pack"], "installed");
    assert_eq!(report["installed"], 2);

    let packs = run_ok_json(&root, &["packs"]);
    let ids: Vec<u64> = packs
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["pack_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, [0, 7]);
    let detail = run_ok_json(&root, &["pack", "7"]);
    assert_eq!(detail["plant_ids"], json!([500, 501]));

    let written = run_ok_json(&root, &["manifest", "--write"]);
    assert!(written["entries"].as_u64().unwrap() > 2);
    run_ok(&root, &["manifest"]);

    let removed = run_ok_json(&root, &["delete-pack", "7", "--with-plants"]);
    assert_eq!(removed["pack_removed"], true);
    assert_eq!(removed["plants_removed"], 2);
    let out = run_err(&root, &["manifest"]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("missing"));
    run_err(&root, &["delete-pack", "0"]);
}

#[test]
fn validate_and_inspect_record_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let path = write_json(dir.path(), "p.json", &plant_json(500, 7, 3, "Dragon Fruit"));
    run_ok(&root, &["install", &path]);
    let record = root.join("plants").join("p_01F4.bin");
    let record = record.to_str().unwrap();

    let ok = run_ok_json(&root, &["validate", record]);
    assert_eq!(ok["ok"], true);
    assert_eq!(ok["kind"], "plant");

    let inspected = run_ok_json(&root, &["inspect", record]);
    assert_eq!(inspected["kind"], "plant");
    assert_eq!(inspected["header"]["payload_size"], 156);
    assert_eq!(inspected["record"]["version"], 3);

    let mut bytes = std::fs::read(record).unwrap();
    bytes[40] ^= 0xFF;
    std::fs::write(record, &bytes).unwrap();
    let err = run_err(&root, &["validate", record]);
    assert!(String::from_utf8_lossy(&err.stderr).contains("checksum"));
}

#[test]
fn derived_values_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    run_ok(&root, &["init"]);

    let kc = run_ok_json(&root, &["kc", "1", "10"]);
    assert_eq!(kc["defaulted"], false);
    assert!(kc["value"].as_f64().unwrap() > 0.0);

    let missing = run_ok_json(&root, &["kc", "4000", "10"]);
    assert_eq!(missing["defaulted"], true);
    assert_eq!(missing["value"], 1.0);
    assert_eq!(missing["code"], 7);

    let depth = run_ok_json(&root, &["root-depth", "4000", "10"]);
    assert_eq!(depth["value"], 300.0);
}
