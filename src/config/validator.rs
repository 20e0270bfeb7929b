use crate::config::Config;
use crate::embedding::is_supported_model;
use crate::error::{Result, TermweaveError, ValidationError};
use crate::retrieval::{FusionMethod, HybridSearchConfig, MAX_K};
use crate::store::schema::HNSW_MAX_M;

const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_store(config, &mut errors);
        Self::validate_terms(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_ingest(config, &mut errors);
        Self::validate_retrieval("retrieval", &config.retrieval, &mut errors);
        Self::validate_profiles(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TermweaveError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_store(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.store.hnsw_m == 0 || config.store.hnsw_m > HNSW_MAX_M {
            errors.push(ValidationError::new(
                "store.hnsw_m",
                format!(
                    "HNSW M must be between 1 and {}, got {}",
                    HNSW_MAX_M, config.store.hnsw_m
                ),
            ));
        }

        if config.store.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "store.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.store.persist_max_attempts == 0 {
            errors.push(ValidationError::new(
                "store.persist_max_attempts",
                "At least one persistence check is required",
            ));
        }
    }

    fn validate_terms(config: &Config, errors: &mut Vec<ValidationError>) {
        let terms = &config.terms;
        if terms.chunk_size == 0 {
            errors.push(ValidationError::new(
                "terms.chunk_size",
                "Chunk size must be greater than 0",
            ));
        } else if terms.overlap >= terms.chunk_size {
            errors.push(ValidationError::new(
                "terms.overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    terms.overlap, terms.chunk_size
                ),
            ));
        }

        if terms.max_candidates == 0 {
            errors.push(ValidationError::new(
                "terms.max_candidates",
                "Max candidates must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        let model = &config.embedding.model;
        if model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        } else if !is_supported_model(model) {
            errors.push(ValidationError::new(
                "embedding.model",
                format!("Unsupported model: {}", model),
            ));
        }
    }

    fn validate_ingest(config: &Config, errors: &mut Vec<ValidationError>) {
        let name = &config.ingest.collection;
        let valid = !name.is_empty()
            && name.len() <= MAX_COLLECTION_NAME_LEN
            && name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            errors.push(ValidationError::new(
                "ingest.collection",
                format!(
                    "Collection name must start with a letter or underscore and contain only \
                     letters, digits and underscores, got '{}'",
                    name
                ),
            ));
        }
    }

    fn validate_retrieval(
        prefix: &str,
        retrieval: &HybridSearchConfig,
        errors: &mut Vec<ValidationError>,
    ) {
        for (key, top_k) in [
            ("vector_search.top_k", retrieval.vector_search.top_k),
            ("keyword_search.top_k", retrieval.keyword_search.top_k),
            ("final_top_k", retrieval.final_top_k),
        ] {
            if top_k == 0 || top_k > MAX_K {
                errors.push(ValidationError::new(
                    format!("{}.{}", prefix, key),
                    format!("Must be between 1 and {}, got {}", MAX_K, top_k),
                ));
            }
        }

        if retrieval.vector_search.ef == 0 {
            errors.push(ValidationError::new(
                format!("{}.vector_search.ef", prefix),
                "ef must be greater than 0",
            ));
        }

        let boost = retrieval.keyword_search.boost_factor;
        if boost.is_nan() || boost <= 0.0 {
            errors.push(ValidationError::new(
                format!("{}.keyword_search.boost_factor", prefix),
                format!("Boost factor must be positive, got {}", boost),
            ));
        }

        if let Some(fusion) = &retrieval.fusion_strategy {
            Self::validate_fusion(&format!("{}.fusion_strategy", prefix), fusion, errors);
        }
    }

    fn validate_fusion(prefix: &str, fusion: &FusionMethod, errors: &mut Vec<ValidationError>) {
        match fusion {
            FusionMethod::WeightedSum { weights } => {
                let (v, k) = (weights.vector_weight, weights.keyword_weight);
                if v.is_nan() || k.is_nan() || v < 0.0 || k < 0.0 || v + k == 0.0 {
                    errors.push(ValidationError::new(
                        format!("{}.weights", prefix),
                        format!(
                            "Weights must be non-negative and not both zero, got {} / {}",
                            v, k
                        ),
                    ));
                }
            }
            FusionMethod::RankFusion | FusionMethod::Concatenate => {}
            FusionMethod::ReciprocalRankFusion { rank_fusion } => {
                if rank_fusion.k.is_nan() || rank_fusion.k < 0.0 {
                    errors.push(ValidationError::new(
                        format!("{}.rank_fusion.k", prefix),
                        format!("RRF k must be non-negative, got {}", rank_fusion.k),
                    ));
                }
            }
        }
    }

    fn validate_profiles(config: &Config, errors: &mut Vec<ValidationError>) {
        for (name, overrides) in &config.profiles {
            if let Some(fusion) = &overrides.fusion_strategy {
                Self::validate_fusion(&format!("profiles.{}.fusion_strategy", name), fusion, errors);
            }
            if let Some(top_k) = overrides.final_top_k {
                if top_k == 0 || top_k > MAX_K {
                    errors.push(ValidationError::new(
                        format!("profiles.{}.final_top_k", name),
                        format!("Must be between 1 and {}, got {}", MAX_K, top_k),
                    ));
                }
            }
        }
    }
}
