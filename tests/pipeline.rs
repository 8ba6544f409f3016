//! End-to-end pipeline tests: synthetic listings through feature
//! assembly, splitting, preprocessing, tier modeling, and artifact
//! round-trip.

use mongkol::artifact::{ArtifactMetadata, ModelArtifact};
use mongkol::features::FeatureAssembler;
use mongkol::market::{combine_weights, progressive_weights, sample_weights, MarketStatistics};
use mongkol::model_selection::stratified_split_indices;
use mongkol::phone::PhoneNumber;
use mongkol::preprocessing::GroupedPreprocessor;
use mongkol::primitives::{Matrix, Vector};
use mongkol::scoring::ScoringTables;
use mongkol::tier::{TierBoundaries, TierExpertConfig, TierPredictor, TierRouter};
use mongkol::tree::{BoosterParams, GrowthPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic marketplace: numbers with more repeats and lucky digits
/// list higher, with a wide luxury tail.
fn synthetic_listings(n: usize, seed: u64) -> Vec<(PhoneNumber, f32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    while rows.len() < n {
        let mut digits = String::from("08");
        // a fraction of listings are runs of one digit, the luxury stock
        if rng.gen_bool(0.1) {
            let d = rng.gen_range(0u8..10);
            for _ in 0..8 {
                digits.push(char::from(b'0' + d));
            }
        } else {
            for _ in 0..8 {
                digits.push(char::from(b'0' + rng.gen_range(0u8..10)));
            }
        }
        let phone = match PhoneNumber::parse(&digits) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let d = phone.digits();
        let repeats = d.windows(2).filter(|w| w[0] == w[1]).count() as f32;
        let lucky = d.iter().filter(|&&x| x == 8 || x == 9).count() as f32;
        let noise = rng.gen_range(0.9f32..1.1);
        let price = (800.0 + lucky * 600.0) * (1.0 + repeats * repeats * 8.0) * noise;
        rows.push((phone, price));
    }
    rows
}

struct TrainedPipeline {
    artifact: ModelArtifact,
    r2: f32,
}

fn train_pipeline(seed: u64) -> TrainedPipeline {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let rows = synthetic_listings(240, seed);
    let phones: Vec<PhoneNumber> = rows.iter().map(|(p, _)| p.clone()).collect();
    let prices: Vec<f32> = rows.iter().map(|(_, v)| *v).collect();
    let y = Vector::from_vec(prices.clone());

    let (train_idx, test_idx) = stratified_split_indices(&y, 0.2, 10, seed).expect("split");

    // market statistics come from the training partition only
    let train_rows: Vec<(PhoneNumber, f32)> =
        train_idx.iter().map(|&i| rows[i].clone()).collect();
    let market = MarketStatistics::fit(&train_rows).expect("market");
    let tables = ScoringTables::default();

    let assembler = FeatureAssembler::new()
        .with_tables(tables.clone())
        .with_market_stats(market.clone());
    let frame = assembler.assemble(&phones).expect("assemble");
    let names = frame.names().to_vec();
    let raw_x = frame.to_matrix().expect("matrix");

    let select = |idx: &[usize]| -> (Matrix<f32>, Vec<f32>) {
        (raw_x.select_rows(idx), idx.iter().map(|&i| prices[i]).collect())
    };
    let (raw_train, y_train) = select(&train_idx);
    let (raw_test, y_test) = select(&test_idx);

    let mut preprocessor = GroupedPreprocessor::new();
    let x_train = preprocessor
        .fit_transform(&raw_train, &names)
        .expect("preprocess");
    let x_test = preprocessor.transform(&raw_test).expect("preprocess");

    let boundaries = TierBoundaries::discover(&y_train, seed).expect("boundaries");
    let configs: Vec<TierExpertConfig> = (0..boundaries.n_tiers())
        .map(|_| TierExpertConfig {
            params: BoosterParams {
                n_estimators: 60,
                learning_rate: 0.15,
                ..BoosterParams::default()
            },
            policy: GrowthPolicy::Depthwise { max_depth: 4 },
        })
        .collect();
    let router = TierRouter::new().with_booster(
        BoosterParams {
            n_estimators: 40,
            learning_rate: 0.2,
            ..BoosterParams::default()
        },
        GrowthPolicy::Depthwise { max_depth: 3 },
    );
    let mut predictor = TierPredictor::new(boundaries)
        .with_router(router)
        .with_expert_configs(configs)
        .with_min_tier_samples(8);
    let weights = combine_weights(&sample_weights(&y_train), &progressive_weights(&y_train));
    predictor
        .fit(&x_train, &y_train, Some(weights.as_slice()))
        .expect("fit");

    let r2 = predictor.score(&x_test, &y_test);
    let test_preds = predictor.predict(&x_test).expect("predict");
    let mae = mongkol::metrics::mae(&test_preds, &Vector::from_vec(y_test.clone()));
    let metadata = ArtifactMetadata::new("tier_predictor", train_idx.len(), names.len(), r2, mae);
    let artifact = ModelArtifact::new(names, tables, market, preprocessor, predictor, metadata);
    TrainedPipeline { artifact, r2 }
}

#[test]
fn test_pipeline_learns_the_market() {
    let pipeline = train_pipeline(7);
    assert!(
        pipeline.r2 > 0.3,
        "holdout r2 too low: {}",
        pipeline.r2
    );
}

#[test]
fn test_split_partitions_are_disjoint_and_complete() {
    let y = Vector::from_vec((0..200).map(|i| (i as f32) * 37.0 % 9000.0 + 100.0).collect());
    let (train, test) = stratified_split_indices(&y, 0.25, 10, 3).expect("split");
    let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 200);
    assert_eq!(train.len() + test.len(), 200);
    assert!(!test.is_empty() && !train.is_empty());
}

#[test]
fn test_quad_number_quotes_above_plain_number() {
    let pipeline = train_pipeline(11);
    let fancy = pipeline.artifact.quote("0888888888").expect("quote");
    let plain = pipeline.artifact.quote("0812345678").expect("quote");
    assert!(
        fancy.estimated_price > plain.estimated_price,
        "fancy {} <= plain {}",
        fancy.estimated_price,
        plain.estimated_price
    );
}

#[test]
fn test_training_is_deterministic() {
    let a = train_pipeline(42);
    let b = train_pipeline(42);
    let qa = a.artifact.quote_batch(&["0899999999", "0861110423"]).expect("quote");
    let qb = b.artifact.quote_batch(&["0899999999", "0861110423"]).expect("quote");
    assert_eq!(qa, qb);
    assert_eq!(a.r2.to_bits(), b.r2.to_bits());
}

#[test]
fn test_artifact_survives_disk_round_trip() {
    let pipeline = train_pipeline(5);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("market.mgkl");
    pipeline.artifact.save(&path).expect("save");
    let loaded = ModelArtifact::load(&path).expect("load");

    let before = pipeline.artifact.quote("0888811442").expect("quote");
    let after = loaded.quote("0888811442").expect("quote");
    assert_eq!(before, after);
    assert_eq!(
        pipeline.artifact.to_bytes().expect("bytes"),
        loaded.to_bytes().expect("bytes")
    );
}

#[test]
fn test_quotes_carry_tier_and_band() {
    let pipeline = train_pipeline(19);
    let quotes = pipeline
        .artifact
        .quote_batch(&["0888888888", "0812345678", "66812345678"])
        .expect("quotes");
    assert_eq!(quotes.len(), 3);
    // +66 form canonicalizes to the local form
    assert_eq!(quotes[2].phone_number, "0812345678");
    for q in &quotes {
        assert!(q.estimated_price >= 0.0);
        assert!(q.price_band.0 <= q.estimated_price);
        assert!(q.price_band.1 >= q.estimated_price);
        assert!(!q.tier.is_empty());
    }
}

#[test]
fn test_market_statistics_ignore_unseen_rows() {
    let rows = synthetic_listings(120, 23);
    let market_small = MarketStatistics::fit(&rows[..60]).expect("market");
    let market_small_again = MarketStatistics::fit(&rows[..60]).expect("market");
    // adding held-out rows must not leak into an already fitted estimate
    assert_eq!(market_small.n_train_samples(), 60);
    assert_eq!(
        market_small.global_median(),
        market_small_again.global_median()
    );
}
