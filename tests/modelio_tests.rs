use dae::modelio::{load_model, save_model};
use dae::{Adam, Config, DenoisingAutoencoder, Error};

fn config() -> Config {
    Config {
        max_trial: 30,
        adam: Adam {
            alpha: 0.01,
            ..Adam::default()
        },
        num_threads: Some(2),
        seed: 21,
        ..Config::default()
    }
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let clean = vec![vec![1.0, 0.0, 0.5], vec![0.0, 1.0, 0.5]];
    let noisy = vec![vec![0.9, 0.1, 0.4], vec![0.1, 0.8, 0.6]];
    let mut ae = DenoisingAutoencoder::with_config(3, 0.7, config()).unwrap();
    ae.learn(&clean, &noisy).unwrap();

    save_model(&path, &ae).unwrap();
    let loaded = load_model(&path, config()).unwrap();

    assert_eq!(loaded.current_middle_neuron_num(), ae.current_middle_neuron_num());
    for (a, b) in ae.middle_neurons().iter().zip(loaded.middle_neurons()) {
        assert_eq!(a.state(), b.state());
    }
    for (a, b) in ae.output_neurons().iter().zip(loaded.output_neurons()) {
        assert_eq!(a.state(), b.state());
    }
    for x in &noisy {
        assert_eq!(ae.out(x, false).unwrap(), loaded.out(x, false).unwrap());
    }
}

#[test]
fn test_resumed_training_continues_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.json");

    let data = vec![vec![0.2, 0.8]];
    let mut ae = DenoisingAutoencoder::with_config(2, 0.5, config()).unwrap();
    let first = ae.learn(&data, &data).unwrap();
    save_model(&path, &ae).unwrap();

    let mut resumed = load_model(&path, config()).unwrap();
    let second = resumed.learn(&data, &data).unwrap();

    let expected = (first.trials + second.trials) as u64;
    assert!(resumed.output_neurons().iter().all(|n| n.iteration() == expected));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_model(dir.path().join("absent.json"), Config::default());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_load_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, b"bpat\x01not json").unwrap();

    assert!(matches!(
        load_model(&path, Config::default()),
        Err(Error::Serialization(_))
    ));
}
