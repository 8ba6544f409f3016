//! Trained model persistence and the pricing interface.
//!
//! An artifact bundles everything inference needs: the ordered feature
//! name list frozen at training time, the scoring tables and market
//! statistics the features were built with, the fitted preprocessor, and
//! the tier predictor. Files carry a magic header and a format version so
//! stale or foreign blobs are rejected before deserialization.

use crate::error::{MongkolError, Result};
use crate::features::FeatureAssembler;
use crate::market::MarketStatistics;
use crate::phone::PhoneNumber;
use crate::preprocessing::GroupedPreprocessor;
use crate::scoring::ScoringTables;
use crate::tier::TierPredictor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// File magic for serialized artifacts.
pub const MAGIC: &[u8; 4] = b"MGKL";
/// Current artifact format version.
pub const FORMAT_VERSION: u16 = 1;

/// Half-width of the quoted price band, as a fraction of the estimate.
pub const PRICE_BAND: f32 = 0.2;

const MAX_KEY_DRIVERS: usize = 3;

/// Training-run metadata carried inside the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created_at: DateTime<Utc>,
    pub library_version: String,
    pub model_name: String,
    pub n_train_samples: usize,
    pub n_features: usize,
    /// Validation R² recorded at training time.
    pub validation_r2: f32,
    /// Validation mean absolute error in the price currency.
    pub validation_mae: f32,
}

impl ArtifactMetadata {
    #[must_use]
    pub fn new(
        model_name: impl Into<String>,
        n_train_samples: usize,
        n_features: usize,
        validation_r2: f32,
        validation_mae: f32,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            model_name: model_name.into(),
            n_train_samples,
            n_features,
            validation_r2,
            validation_mae,
        }
    }
}

/// A complete price estimate for one number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Canonical phone number the quote is for.
    pub phone_number: String,
    pub estimated_price: f32,
    /// (low, high) band around the estimate.
    pub price_band: (f32, f32),
    /// Market tier label, e.g. "premium".
    pub tier: String,
    /// Short notes on the patterns driving the price.
    pub key_drivers: Vec<String>,
}

/// Everything needed to price numbers, frozen at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    feature_names: Vec<String>,
    tables: ScoringTables,
    market: MarketStatistics,
    preprocessor: GroupedPreprocessor,
    predictor: TierPredictor,
    metadata: ArtifactMetadata,
}

impl ModelArtifact {
    #[must_use]
    pub fn new(
        feature_names: Vec<String>,
        tables: ScoringTables,
        market: MarketStatistics,
        preprocessor: GroupedPreprocessor,
        predictor: TierPredictor,
        metadata: ArtifactMetadata,
    ) -> Self {
        Self {
            feature_names,
            tables,
            market,
            preprocessor,
            predictor,
            metadata,
        }
    }

    /// Feature columns in the exact order the model was trained on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn predictor(&self) -> &TierPredictor {
        &self.predictor
    }

    /// Serializes to the framed wire format: magic, version, payload.
    ///
    /// # Errors
    ///
    /// Fails when the payload cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(self).map_err(|e| MongkolError::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(payload.len() + 6);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserializes from the framed wire format.
    ///
    /// # Errors
    ///
    /// Fails on a wrong magic header, an unsupported version, or a corrupt
    /// payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 6 || &bytes[..4] != MAGIC {
            return Err(MongkolError::FormatError {
                message: "not a model artifact (bad magic)".to_string(),
            });
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version > FORMAT_VERSION {
            return Err(MongkolError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        bincode::deserialize(&bytes[6..]).map_err(|e| MongkolError::Serialization(e.to_string()))
    }

    /// Writes the artifact to disk.
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O errors.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path)?;
        file.write_all(&bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "artifact saved");
        Ok(())
    }

    /// Reads an artifact from disk.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a malformed file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Training-run metadata as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Fails when the metadata cannot be encoded.
    pub fn metadata_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.metadata)
            .map_err(|e| MongkolError::Serialization(e.to_string()))
    }

    /// Builds the aligned, preprocessed feature matrix for a batch.
    ///
    /// Unknown columns from newer feature code are dropped; columns the
    /// model expects but the assembler no longer produces are zero-filled.
    fn feature_matrix(&self, phones: &[PhoneNumber]) -> Result<crate::primitives::Matrix<f32>> {
        let assembler = FeatureAssembler::new()
            .with_tables(self.tables.clone())
            .with_market_stats(self.market.clone());
        let frame = assembler.assemble(phones)?;
        let aligned = frame.align_to(&self.feature_names)?;
        self.preprocessor.transform(&aligned)
    }

    /// Human-readable notes on what makes this number worth its price.
    fn key_drivers(&self, phone: &PhoneNumber) -> Vec<String> {
        use crate::features::patterns;
        let t = &self.tables;
        let mut drivers = Vec::new();

        if patterns::quad_repeat_flag(phone) > 0.0 {
            drivers.push("four identical digits in a row".to_string());
        } else if patterns::triple_repeat_flag(phone) > 0.0 {
            drivers.push("three identical digits in a row".to_string());
        }
        if patterns::famous_sequence_score(phone, t) > 0.0 {
            drivers.push("well-known digit sequence".to_string());
        } else if patterns::ascending_count(phone) >= 4.0 {
            drivers.push("long ascending run".to_string());
        }
        if patterns::ending_score(phone, t) > 0.0 {
            drivers.push("premium ending".to_string());
        }
        if patterns::good_digit_count(phone, t) >= 6.0 {
            drivers.push("dominated by lucky digits".to_string());
        }
        if patterns::mirror_flag(phone) > 0.0 {
            drivers.push("mirrored digits".to_string());
        }

        drivers.truncate(MAX_KEY_DRIVERS);
        drivers
    }

    /// Prices a batch of raw phone number strings.
    ///
    /// # Errors
    ///
    /// Fails when any number fails validation or the pipeline errors.
    pub fn quote_batch(&self, raw_numbers: &[&str]) -> Result<Vec<PriceQuote>> {
        if raw_numbers.is_empty() {
            return Err(MongkolError::empty_input("quote batch"));
        }
        let phones: Vec<PhoneNumber> = raw_numbers
            .iter()
            .map(|raw| PhoneNumber::parse(raw))
            .collect::<Result<_>>()?;
        let x = self.feature_matrix(&phones)?;
        let prices = self.predictor.predict(&x)?;
        let tiers = self.predictor.predict_tier(&x);

        let boundaries = self.predictor.boundaries();
        Ok(phones
            .iter()
            .enumerate()
            .map(|(i, phone)| {
                let price = prices[i];
                PriceQuote {
                    phone_number: phone.as_str().to_string(),
                    estimated_price: price,
                    price_band: (price * (1.0 - PRICE_BAND), price * (1.0 + PRICE_BAND)),
                    tier: boundaries.label(tiers[i]).to_string(),
                    key_drivers: self.key_drivers(phone),
                }
            })
            .collect())
    }

    /// Prices a single raw phone number string.
    ///
    /// # Errors
    ///
    /// Fails when the number fails validation or the pipeline errors.
    pub fn quote(&self, raw_number: &str) -> Result<PriceQuote> {
        self.quote_batch(&[raw_number])?
            .pop()
            .ok_or_else(|| MongkolError::from("empty quote batch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{TierBoundaries, TierExpertConfig, TierRouter};
    use crate::tree::{BoosterParams, GrowthPolicy};

    /// Trains a tiny but real artifact on synthetic listings.
    fn fixture() -> ModelArtifact {
        let mut phones = Vec::new();
        let mut prices = Vec::new();
        for a in 0..10u8 {
            for b in 0..8u8 {
                let raw = format!("08{a}{b}2345{}{}", a % 10, (a + b) % 10);
                let phone = PhoneNumber::parse(&raw).expect("phone");
                // repeat-heavy numbers priced higher
                let repeats = phone
                    .digits()
                    .windows(2)
                    .filter(|w| w[0] == w[1])
                    .count() as f32;
                phones.push(phone);
                prices.push(900.0 + repeats * 40_000.0 + f32::from(a) * 500.0);
            }
        }

        let rows: Vec<(PhoneNumber, f32)> = phones
            .iter()
            .cloned()
            .zip(prices.iter().copied())
            .collect();
        let market = MarketStatistics::fit(&rows).expect("market");
        let tables = ScoringTables::default();
        let assembler = FeatureAssembler::new()
            .with_tables(tables.clone())
            .with_market_stats(market.clone());
        let frame = assembler.assemble(&phones).expect("assemble");
        let names = frame.names().to_vec();
        let raw_x = frame.to_matrix().expect("matrix");

        let mut preprocessor = GroupedPreprocessor::new();
        let x = preprocessor.fit_transform(&raw_x, &names).expect("fit");

        let boundaries =
            TierBoundaries::from_edges(vec![0.0, 20_000.0, f32::INFINITY]).expect("edges");
        let configs = vec![
            TierExpertConfig {
                params: BoosterParams {
                    n_estimators: 30,
                    learning_rate: 0.2,
                    ..BoosterParams::default()
                },
                policy: GrowthPolicy::Depthwise { max_depth: 3 },
            };
            2
        ];
        let router = TierRouter::new().with_booster(
            BoosterParams {
                n_estimators: 25,
                learning_rate: 0.3,
                ..BoosterParams::default()
            },
            GrowthPolicy::Depthwise { max_depth: 3 },
        );
        let mut predictor = TierPredictor::new(boundaries)
            .with_router(router)
            .with_expert_configs(configs)
            .with_min_tier_samples(5);
        predictor.fit(&x, &prices, None).expect("fit");

        let metadata = ArtifactMetadata::new("tier_predictor", phones.len(), names.len(), 0.9, 150.0);
        ModelArtifact::new(names, tables, market, preprocessor, predictor, metadata)
    }

    #[test]
    fn test_round_trip_is_bit_identical() {
        let artifact = fixture();
        let bytes = artifact.to_bytes().expect("to_bytes");
        let restored = ModelArtifact::from_bytes(&bytes).expect("from_bytes");
        let bytes_again = restored.to_bytes().expect("to_bytes");
        assert_eq!(bytes, bytes_again);
    }

    #[test]
    fn test_save_load_preserves_quotes() {
        let artifact = fixture();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.mgkl");
        artifact.save(&path).expect("save");
        let loaded = ModelArtifact::load(&path).expect("load");
        let a = artifact.quote("0881234567").expect("quote");
        let b = loaded.quote("0881234567").expect("quote");
        assert_eq!(a, b);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let artifact = fixture();
        let mut bytes = artifact.to_bytes().expect("to_bytes");
        bytes[0] = b'X';
        match ModelArtifact::from_bytes(&bytes) {
            Err(MongkolError::FormatError { .. }) => {}
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_future_version_rejected() {
        let artifact = fixture();
        let mut bytes = artifact.to_bytes().expect("to_bytes");
        bytes[4] = 0xFF;
        bytes[5] = 0xFF;
        match ModelArtifact::from_bytes(&bytes) {
            Err(MongkolError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, 0xFFFF);
                assert_eq!(supported, FORMAT_VERSION);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn test_quote_band_is_twenty_percent() {
        let artifact = fixture();
        let quote = artifact.quote("0899999999").expect("quote");
        assert!(quote.estimated_price > 0.0);
        let (low, high) = quote.price_band;
        assert!((low - quote.estimated_price * 0.8).abs() < 1.0);
        assert!((high - quote.estimated_price * 1.2).abs() < 1.0);
        assert!(!quote.tier.is_empty());
    }

    #[test]
    fn test_quad_number_beats_plain_number() {
        let artifact = fixture();
        let fancy = artifact.quote("0888888888").expect("quote");
        let plain = artifact.quote("0812345678").expect("quote");
        assert!(
            fancy.estimated_price > plain.estimated_price,
            "fancy {} <= plain {}",
            fancy.estimated_price,
            plain.estimated_price
        );
    }

    #[test]
    fn test_invalid_number_rejected() {
        let artifact = fixture();
        assert!(artifact.quote("12ab").is_err());
    }

    #[test]
    fn test_key_drivers_flag_repetition() {
        let artifact = fixture();
        let quote = artifact.quote("0888888888").expect("quote");
        assert!(quote
            .key_drivers
            .iter()
            .any(|d| d.contains("identical digits")));
        assert!(quote.key_drivers.len() <= 3);

        let plain = artifact.quote("0810436275").expect("quote");
        assert!(!plain
            .key_drivers
            .iter()
            .any(|d| d.contains("identical digits")));
    }

    #[test]
    fn test_metadata_json_contains_version() {
        let artifact = fixture();
        let json = artifact.metadata_json().expect("json");
        assert!(json.contains("library_version"));
        assert!(json.contains("n_train_samples"));
    }
}
