//! Integration tests for configuration types and error reporting.

use mlquery::{KernelType, LabelPair, QueryError, QuireConfig, RankingConfig};

// ---------------------------------------------------------------------------
// RankingConfig
// ---------------------------------------------------------------------------

#[test]
fn ranking_config_defaults() {
    let cfg = RankingConfig::default();
    assert_eq!(cfg.n_features, 200);
    assert_eq!(cfg.num_sub, 5);
    assert_eq!(cfg.norm_up, None);
    assert_eq!(cfg.lambda, 0.0);
    assert!((cfg.step_size0 - 0.05).abs() < 1e-12);
    assert_eq!(cfg.average_begin, 10);
    assert_eq!(cfg.average_size, 5);
    assert_eq!(cfg.n_repeat, 10);
    assert_eq!(cfg.seed, None);
}

#[test]
fn ranking_config_round_trips_json() {
    let cfg = RankingConfig {
        norm_up: Some(2.5),
        ..RankingConfig::default()
    }
    .with_seed(99);
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("step_size0"));
    let back: RankingConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

// ---------------------------------------------------------------------------
// QuireConfig / KernelType
// ---------------------------------------------------------------------------

#[test]
fn quire_config_default_is_rbf() {
    let cfg = QuireConfig::default();
    assert_eq!(cfg.lambda, 1.0);
    assert_eq!(cfg.kernel, KernelType::Rbf { gamma: 1.0 });
}

#[test]
fn kernel_type_from_str() {
    assert_eq!("linear".parse::<KernelType>().unwrap(), KernelType::Linear);
    assert_eq!(
        "POLY".parse::<KernelType>().unwrap(),
        KernelType::Poly {
            gamma: 1.0,
            coef0: 1.0,
            degree: 3
        }
    );
    assert!("sigmoid".parse::<KernelType>().is_err());
}

#[test]
fn quire_config_round_trips_json() {
    let cfg = QuireConfig::new(
        0.5,
        KernelType::Poly {
            gamma: 0.1,
            coef0: 0.0,
            degree: 2,
        },
    );
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("Poly"));
    let back: QuireConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);

    let linear: QuireConfig = serde_json::from_str(r#"{"lambda": 2.0, "kernel": "Linear"}"#).unwrap();
    assert_eq!(linear.kernel, KernelType::Linear);
}

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

#[test]
fn error_messages_name_the_problem() {
    let err = QueryError::UnsupportedKernel("sigmoid".to_string());
    assert!(err.to_string().contains("sigmoid"));

    let err = QueryError::OverlappingPartition(LabelPair::new(3, 1));
    assert!(err.to_string().contains("(3, 1)"));

    let err = QueryError::ShapeMismatch {
        context: "kernel matrix",
        expected: (3, 3),
        found: (3, 5),
    };
    assert_eq!(
        err.to_string(),
        "kernel matrix: expected shape (3, 3), found (3, 5)"
    );

    let err = QueryError::InvalidConfig("num_sub must be at least 1".to_string());
    assert_eq!(err.to_string(), "Invalid configuration: num_sub must be at least 1");

    let boxed: Box<dyn std::error::Error> = Box::new(QueryError::EmptyCandidateSet);
    assert!(!boxed.to_string().is_empty());
}
