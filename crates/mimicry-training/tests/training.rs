use mimicry_data::episode::{Episode, Frame};
use mimicry_training::{DenseTrainer, StopReason, config::TrainingConfig};

fn constant_episode(len: usize, action: [f32; 2]) -> Episode {
    let frames = (0..len)
        .map(|_| Frame::new(vec![0.0; 130], action).unwrap())
        .collect();
    Episode::new(frames)
}

#[test]
fn test_dense_converges_on_constant_action() {
    let config = TrainingConfig {
        epochs: 200,
        learning_rate: 0.01,
        patience: 1000,
        augment_noise_std: 0.0,
        seed: Some(42),
        ..TrainingConfig::default()
    };
    let mut trainer = DenseTrainer::new(config).unwrap();
    let outcome = trainer.train_from_data(&[constant_episode(20, [1.0, 0.0])]).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::EpochsExhausted);

    let raw = trainer.network().forward(&[0.0; 130]).unwrap();
    assert!((raw[0] - 1.0).abs() < 0.1, "raw output {raw:?}");
    assert!(raw[1].abs() < 0.1, "raw output {raw:?}");
    assert_eq!(trainer.predict(&[0.0; 130]).unwrap(), [1.0, 0.0]);
}

#[test]
fn test_default_patience_stops_and_keeps_best_model() {
    let config = TrainingConfig {
        learning_rate: 0.01,
        seed: Some(11),
        ..TrainingConfig::default()
    };
    let defaults = TrainingConfig::default();
    let mut trainer = DenseTrainer::new(config).unwrap();
    let outcome = trainer.train_from_data(&[constant_episode(20, [1.0, 0.0])]).unwrap();
    let stats = &outcome.stats;

    assert_eq!(outcome.stop_reason, StopReason::EarlyStopped);
    let best_epoch = stats.best_epoch.unwrap();
    assert_eq!(stats.epochs_completed, best_epoch + defaults.patience + 1);
    assert!(stats.epochs_completed < defaults.epochs);
    assert_eq!(Some(stats.validation_loss), stats.best_validation_loss);
    assert_eq!(stats.history[best_epoch].validation_loss, stats.validation_loss);
    assert_eq!(trainer.predict(&[0.0; 130]).unwrap(), [1.0, 0.0]);
}

#[test]
fn test_early_stopping_when_validation_never_improves() {
    let patience = 4;
    let config = TrainingConfig {
        epochs: 100,
        // a zero learning rate leaves the validation loss constant
        learning_rate: 0.0,
        patience,
        seed: Some(5),
        ..TrainingConfig::default()
    };
    let mut trainer = DenseTrainer::new(config).unwrap();
    let before = trainer.network().parameters().clone();
    let outcome = trainer.train_from_data(&[constant_episode(10, [1.0, 0.0])]).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::EarlyStopped);
    assert_eq!(outcome.stats.best_epoch, Some(0));
    assert_eq!(outcome.stats.epochs_completed, patience + 1);
    assert_eq!(trainer.network().parameters(), &before);
}

#[test]
fn test_checkpoints_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainingConfig {
        epochs: 5,
        learning_rate: 0.0,
        patience: 100,
        checkpoint_interval: 2,
        checkpoint_dir: Some(dir.path().join("checkpoints")),
        seed: Some(6),
        ..TrainingConfig::default()
    };
    let mut trainer = DenseTrainer::new(config).unwrap();
    trainer.train_from_data(&[constant_episode(10, [0.0, 1.0])]).unwrap();

    let checkpoints = dir.path().join("checkpoints");
    assert!(checkpoints.join("best_model.bin").exists());
    assert!(checkpoints.join("intermediate_model_epoch_2.bin").exists());
    assert!(checkpoints.join("intermediate_model_epoch_4.bin").exists());
    assert!(!checkpoints.join("intermediate_model_epoch_0.bin").exists());

    let mut restored = DenseTrainer::new(TrainingConfig {
        seed: Some(7),
        ..TrainingConfig::default()
    })
    .unwrap();
    restored.load(&checkpoints.join("best_model.bin")).unwrap();
    assert_eq!(restored.network().parameters(), trainer.network().parameters());
}

#[test]
fn test_trained_model_roundtrips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = TrainingConfig {
        epochs: 3,
        seed: Some(8),
        ..TrainingConfig::default()
    };
    let mut trainer = DenseTrainer::new(config.clone()).unwrap();
    let episodes = [constant_episode(12, [-1.0, 1.0])];
    trainer.train_from_data(&episodes).unwrap();
    trainer.save(&path).unwrap();

    let mut loaded = DenseTrainer::new(TrainingConfig {
        seed: Some(9),
        ..config
    })
    .unwrap();
    loaded.load(&path).unwrap();
    assert_eq!(
        loaded.evaluate(&episodes).unwrap(),
        trainer.evaluate(&episodes).unwrap()
    );
}

#[test]
fn test_stats_serialize_for_reports() {
    let config = TrainingConfig {
        epochs: 2,
        seed: Some(10),
        ..TrainingConfig::default()
    };
    let mut trainer = DenseTrainer::new(config).unwrap();
    trainer.train_from_data(&[constant_episode(10, [1.0, 1.0])]).unwrap();
    let json = serde_json::to_value(trainer.stats()).unwrap();
    assert_eq!(json["epochs_completed"], 2);
    assert_eq!(json["history"].as_array().unwrap().len(), 2);
}
