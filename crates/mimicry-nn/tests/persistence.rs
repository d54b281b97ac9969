use mimicry_nn::{
    DenseNetwork, SequenceArchitecture, SequenceNetwork,
    persist::{self, PersistError},
};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

#[test]
fn test_dense_save_load_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dense.bin");

    let mut trained = DenseNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(1));
    let states = [vec![0.5; 130]];
    let actions = [[1.0, 0.0]];
    trained.train(&states, &actions, 0.01, 0).unwrap();
    trained.save(&path).unwrap();

    let mut fresh = DenseNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(2));
    assert_ne!(fresh.parameters(), trained.parameters());
    fresh.load(&path).unwrap();
    assert_eq!(fresh.parameters(), trained.parameters());
    assert_eq!(
        fresh.forward(&states[0]).unwrap(),
        trained.forward(&states[0]).unwrap()
    );
}

#[test]
fn test_sequence_save_load_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sequence.bin");

    let network = SequenceNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(3)).unwrap();
    network.save(&path).unwrap();

    let mut fresh = SequenceNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(4)).unwrap();
    fresh.load(&path).unwrap();
    assert_eq!(fresh.parameters(), network.parameters());
}

#[test]
fn test_shape_mismatch_keeps_current_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.bin");

    let small = DenseNetwork::new(&[130, 8, 2], &mut Pcg32::seed_from_u64(5)).unwrap();
    small.save(&path).unwrap();

    let mut network = DenseNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(6));
    let before = network.parameters().clone();
    let err = network.load(&path).unwrap_err();
    assert!(matches!(err, PersistError::ShapeMismatch { block: 0, .. }));
    assert!(err.to_string().contains("model shape mismatch"));
    assert_eq!(network.parameters(), &before);
}

#[test]
fn test_dense_model_cannot_load_into_sequence_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dense.bin");
    DenseNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(7))
        .save(&path)
        .unwrap();

    let architecture = SequenceArchitecture::default();
    let mut network = SequenceNetwork::new(architecture, &mut Pcg32::seed_from_u64(8)).unwrap();
    assert!(network.load(&path).is_err());
}

#[test]
fn test_block_count_covers_weights_and_biases() {
    let network = DenseNetwork::behavior_cloning(&mut Pcg32::seed_from_u64(9));
    assert_eq!(persist::block_count(network.parameters()), 12);
}
