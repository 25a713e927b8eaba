use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mlquery::{
    KernelType, LabelMatrix, LabelPair, LabelRankingModel, MultiLabelQuery, QuireSelector,
    RandomQuery, RankingConfig,
};

fn read_matrix_csv(path: &str) -> Result<Array2<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path))?;

    let mut data = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Vec<f64> = record
            .iter()
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("Non-numeric field in {}", path))?;
        data.push(row);
    }

    let n_rows = data.len();
    let n_cols = data.first().map(|r| r.len()).unwrap_or(0);
    Array2::from_shape_vec((n_rows, n_cols), data.into_iter().flatten().collect())
        .map_err(|e| anyhow!("Ragged rows in {}: {}", path, e))
}

/// Uniform features in [-1, 1) with three labels given by the sign of linear scores.
fn synthetic_dataset(n: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n, 5), |_| rng.gen_range(-1.0f64..1.0));
    let y = Array2::from_shape_fn((n, 3), |(i, c)| {
        let score = match c {
            0 => x[[i, 0]] + 0.5 * x[[i, 1]],
            1 => x[[i, 2]] - x[[i, 3]],
            _ => x[[i, 4]],
        };
        if score >= 0.0 {
            1.0
        } else {
            -1.0
        }
    });
    (x, y)
}

/// Ask `strategy` for `rounds` pairs, revealing each answer from `truth`.
fn run_queries(
    strategy: &mut dyn MultiLabelQuery,
    truth: &Array2<f64>,
    labeled: &mut Vec<LabelPair>,
    unlabeled: &mut Vec<LabelPair>,
    rounds: usize,
) -> Result<Array2<f64>> {
    let mut observed = Array2::<f64>::zeros(truth.dim());
    for pair in labeled.iter() {
        observed[[pair.instance, pair.class]] = truth[[pair.instance, pair.class]];
    }

    for round in 0..rounds {
        if unlabeled.is_empty() {
            break;
        }
        let picked = strategy
            .select(labeled, unlabeled)
            .with_context(|| format!("{} failed in round {}", strategy.name(), round))?;
        for pair in picked {
            observed[[pair.instance, pair.class]] = truth[[pair.instance, pair.class]];
            unlabeled.retain(|p| *p != pair);
            labeled.push(pair);
        }
    }
    Ok(observed)
}

fn ranking_accuracy(x: &Array2<f64>, observed: &Array2<f64>, truth: &Array2<f64>) -> Result<f64> {
    let config = RankingConfig {
        n_features: 100,
        ..RankingConfig::default()
    }
    .with_seed(7);
    let mut model = LabelRankingModel::new(x, observed, config)?;
    let targets = LabelMatrix::new(observed)?;
    for _ in 0..5 {
        model.train(x, &targets, None)?;
    }
    let (_, labels) = model.predict(x)?;
    let correct = labels
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

fn main() -> Result<()> {
    env_logger::init();

    // usage: quire_active_learning [features.csv labels.csv]
    let args: Vec<String> = std::env::args().collect();
    let (x, truth) = if args.len() >= 3 {
        (read_matrix_csv(&args[1])?, read_matrix_csv(&args[2])?)
    } else {
        synthetic_dataset(60, 42)
    };
    log::info!("Dataset: {} instances, {} features, {} labels", x.nrows(), x.ncols(), truth.ncols());

    let all_pairs: Vec<LabelPair> = (0..x.nrows())
        .flat_map(|i| (0..truth.ncols()).map(move |c| LabelPair::new(i, c)))
        .collect();
    let seed_labeled: Vec<LabelPair> = all_pairs.iter().copied().filter(|p| p.instance < 5).collect();
    let seed_unlabeled: Vec<LabelPair> = all_pairs.iter().copied().filter(|p| p.instance >= 5).collect();
    let rounds = 30;

    let mut quire = QuireSelector::new(&x, &truth, KernelType::Rbf { gamma: 0.5 }, 1.0)
        .context("Failed to build the QUIRE selector")?;
    let (mut labeled, mut unlabeled) = (seed_labeled.clone(), seed_unlabeled.clone());
    let quire_observed = run_queries(&mut quire, &truth, &mut labeled, &mut unlabeled, rounds)?;

    let mut random = RandomQuery::new(x.nrows(), truth.ncols()).with_seed(42);
    let (mut labeled, mut unlabeled) = (seed_labeled, seed_unlabeled);
    let random_observed = run_queries(&mut random, &truth, &mut labeled, &mut unlabeled, rounds)?;

    println!(
        "QUIRE  accuracy after {} queries: {:.3}",
        rounds,
        ranking_accuracy(&x, &quire_observed, &truth)?
    );
    println!(
        "Random accuracy after {} queries: {:.3}",
        rounds,
        ranking_accuracy(&x, &random_observed, &truth)?
    );

    Ok(())
}
