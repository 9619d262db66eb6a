#![allow(dead_code)]

use std::fmt::Write;

use tabml_core::{Dataset, PlatformConfig, Record, Scalar};
use tabml_ml::loader::read_csv_bytes;
use tabml_workflow::{Platform, Stores};
use tempfile::TempDir;

pub fn platform() -> (TempDir, Platform) {
    platform_with(|_| {})
}

pub fn platform_with(adjust: impl FnOnce(&mut PlatformConfig)) -> (TempDir, Platform) {
    let dir = TempDir::new().unwrap();
    let mut config = PlatformConfig::default();
    config.storage.artifact_root = dir.path().join("artifacts").to_string_lossy().into_owned();
    config.training.n_trees = 20;
    config.training.boosting_rounds = 30;
    adjust(&mut config);
    let platform = Platform::new(config, Stores::in_memory()).unwrap();
    (dir, platform)
}

/// 100 rows with a yes/no target driven by `x1` and `x2`.
pub fn churn_csv() -> String {
    let mut csv = String::from("x1,x2,plan,churned\n");
    for i in 0..100 {
        let a = (i % 20) as f64;
        let b = ((i * 13) % 17) as f64;
        let plan = ["basic", "pro", "team"][i % 3];
        let label = if a + 0.5 * b > 13.0 { "yes" } else { "no" };
        writeln!(csv, "{},{},{},{}", a, b, plan, label).unwrap();
    }
    csv
}

/// 100 rows with a continuous target.
pub fn price_csv() -> String {
    let mut csv = String::from("area,rooms,price\n");
    for i in 0..100 {
        let area = 40.0 + (i % 25) as f64 * 3.5;
        let rooms = (1 + (i * 7) % 5) as f64;
        let wobble = ((i * 31) % 7) as f64 * 0.37;
        writeln!(csv, "{},{},{}", area, rooms, 1200.0 * area + 5000.0 * rooms + wobble).unwrap();
    }
    csv
}

pub fn dataset(csv: &str) -> Dataset {
    read_csv_bytes(csv.as_bytes()).unwrap()
}

pub fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

pub fn churn_record(x1: f64, x2: f64, plan: &str) -> Record {
    let mut record = Record::new();
    record.insert("x1".to_string(), Scalar::Number(x1));
    record.insert("x2".to_string(), Scalar::Number(x2));
    record.insert("plan".to_string(), Scalar::from(plan));
    record
}
