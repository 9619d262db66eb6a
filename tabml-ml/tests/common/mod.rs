#![allow(dead_code)]

use tabml_core::{Column, Dataset, Scalar};

/// 100 rows: two numeric features, one categorical feature and a yes/no target.
pub fn yes_no_dataset() -> Dataset {
    let n = 100;
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    let mut color = Vec::with_capacity(n);
    let mut label = Vec::with_capacity(n);
    for i in 0..n {
        let a = (i % 20) as f64;
        let b = ((i * 13) % 17) as f64;
        x1.push(Scalar::Number(a));
        x2.push(Scalar::Number(b));
        color.push(Scalar::from(["red", "green", "blue"][i % 3]));
        label.push(Scalar::from(if a + 0.5 * b > 13.0 { "yes" } else { "no" }));
    }
    Dataset::new(vec![
        Column::new("x1", x1),
        Column::new("x2", x2),
        Column::new("color", color),
        Column::new("label", label),
    ])
}

/// 100 rows of `y = 3·x1 − 2·x2 + 5` plus a small deterministic wobble.
pub fn linear_dataset() -> Dataset {
    let n = 100;
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let a = (i % 10) as f64 + 0.25 * (i % 4) as f64;
        let b = ((i * 7) % 13) as f64;
        let wobble = ((i * 31) % 7) as f64 * 0.1 - 0.3;
        x1.push(Scalar::Number(a));
        x2.push(Scalar::Number(b));
        y.push(Scalar::Number(3.0 * a - 2.0 * b + 5.0 + wobble));
    }
    Dataset::new(vec![
        Column::new("x1", x1),
        Column::new("x2", x2),
        Column::new("y", y),
    ])
}

/// 90 rows, three balanced classes separable on `x`.
pub fn three_class_dataset() -> Dataset {
    let n = 90;
    let mut x = Vec::with_capacity(n);
    let mut noise = Vec::with_capacity(n);
    let mut species = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 3;
        x.push(Scalar::Number(class as f64 * 10.0 + (i % 5) as f64));
        noise.push(Scalar::Number(((i * 17) % 11) as f64));
        species.push(Scalar::from(["setosa", "versicolor", "virginica"][class]));
    }
    Dataset::new(vec![
        Column::new("x", x),
        Column::new("noise", noise),
        Column::new("species", species),
    ])
}

pub fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
