use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tabml_core::{CoreError, Result};

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Test rows are `ceil(n * test_fraction)`; both sides must keep at least one row.
fn test_size(n: usize, test_fraction: f64) -> Result<usize> {
    let n_test = (n as f64 * test_fraction - 1e-9).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(CoreError::Validation(format!(
            "cannot split {} rows with test fraction {}",
            n, test_fraction
        )));
    }
    Ok(n_test)
}

/// Seeded shuffle split of `n` rows.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Split> {
    let n_test = test_size(n, test_fraction)?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    Ok(Split { train, test })
}

/// Seeded split that preserves class proportions.
///
/// `classes[i]` is the encoded class of row `i`. Every class needs at least
/// two members so it can appear on both sides, and each side needs room for
/// one row per class.
pub fn stratified_split(classes: &[usize], test_fraction: f64, seed: u64) -> Result<Split> {
    let n = classes.len();
    let n_test = test_size(n, test_fraction)?;

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &class) in classes.iter().enumerate() {
        members.entry(class).or_default().push(row);
    }

    if let Some((class, rows)) = members.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(CoreError::InsufficientClassSamples(format!(
            "class {} has {} member(s); at least 2 are required",
            class,
            rows.len()
        )));
    }
    let n_classes = members.len();
    if n_test < n_classes || n - n_test < n_classes {
        return Err(CoreError::InsufficientClassSamples(format!(
            "{} classes do not fit a split of {} train / {} test rows",
            n_classes,
            n - n_test,
            n_test
        )));
    }

    let allocation = allocate(&members, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for ((_, rows), take) in members.into_iter().zip(allocation) {
        let mut rows = rows;
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    test.sort_unstable();
    train.sort_unstable();
    Ok(Split { train, test })
}

/// Largest-remainder allocation of `n_test` rows across classes, keeping at
/// least one row of every class on each side.
fn allocate(members: &BTreeMap<usize, Vec<usize>>, n: usize, n_test: usize) -> Vec<usize> {
    let sizes: Vec<usize> = members.values().map(Vec::len).collect();
    let exact: Vec<f64> = sizes.iter().map(|&s| s as f64 * n_test as f64 / n as f64).collect();

    let mut take: Vec<usize> = exact
        .iter()
        .zip(&sizes)
        .map(|(&e, &s)| (e.floor() as usize).clamp(1, s - 1))
        .collect();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut assigned: usize = take.iter().sum();
    while assigned < n_test {
        let before = assigned;
        for &class in &order {
            if assigned == n_test {
                break;
            }
            if take[class] < sizes[class] - 1 {
                take[class] += 1;
                assigned += 1;
            }
        }
        if assigned == before {
            break;
        }
    }
    while assigned > n_test {
        let before = assigned;
        for &class in order.iter().rev() {
            if assigned == n_test {
                break;
            }
            if take[class] > 1 {
                take[class] -= 1;
                assigned -= 1;
            }
        }
        if assigned == before {
            break;
        }
    }
    take
}
