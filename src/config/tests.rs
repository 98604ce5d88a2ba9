use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
    assert_eq!(config.store_path, PathBuf::from("./.data/blocks.json"));
    assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
    assert_eq!(config.blocks_collection, BLOCKS_COLLECTION_NAME);
    assert_eq!(config.answers_collection, ANSWERS_COLLECTION_NAME);
    assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(
        config.session_ttl,
        Duration::from_secs(DEFAULT_SESSION_TTL_SECS)
    );
    assert_eq!(
        config.op_timeout,
        Duration::from_secs(DEFAULT_OP_TIMEOUT_SECS)
    );
}

#[test]
fn test_default_config_validates() {
    assert!(Config::default().validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    let config = with_env_vars(
        &[
            ("THREADLENS_QDRANT_URL", "http://qdrant:7000"),
            ("THREADLENS_EMBEDDING_DIM", "384"),
            ("THREADLENS_SIMILARITY_THRESHOLD", "0.9"),
            ("THREADLENS_SESSION_TTL_SECS", "60"),
        ],
        || Config::from_env().expect("config should parse"),
    );

    assert_eq!(config.qdrant_url, "http://qdrant:7000");
    assert_eq!(config.embedding_dim, 384);
    assert_eq!(config.similarity_threshold, 0.9);
    assert_eq!(config.session_ttl, Duration::from_secs(60));
}

#[test]
#[serial]
fn test_from_env_invalid_dim() {
    let result = with_env_vars(&[("THREADLENS_EMBEDDING_DIM", "not-a-number")], || {
        Config::from_env()
    });

    assert!(matches!(result, Err(ConfigError::IntParseError { .. })));
}

#[test]
#[serial]
fn test_from_env_invalid_threshold() {
    let result = with_env_vars(&[("THREADLENS_SIMILARITY_THRESHOLD", "high")], || {
        Config::from_env()
    });

    assert!(matches!(result, Err(ConfigError::FloatParseError { .. })));
}

#[test]
fn test_validate_threshold_out_of_range() {
    let config = Config {
        similarity_threshold: 1.5,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ThresholdOutOfRange { .. })
    ));

    let config = Config {
        similarity_threshold: 0.0,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ThresholdOutOfRange { .. })
    ));
}

#[test]
fn test_validate_zero_ttl() {
    let config = Config {
        session_ttl: Duration::ZERO,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroValue { .. })
    ));
}

#[test]
fn test_validate_same_collection() {
    let config = Config {
        blocks_collection: "shared".to_string(),
        answers_collection: "shared".to_string(),
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::SameCollection { .. })
    ));
}

#[test]
fn test_validate_store_path_is_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        store_path: dir.path().to_path_buf(),
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotAFile { .. })
    ));
}
