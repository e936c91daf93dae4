//! End-to-end runs of the `tonegraph` binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn tonegraph(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tonegraph"));
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn write_tone(path: &Path, channels: u16, frames: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 48000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for n in 0..frames {
        let s = (0.3 * (2.0 * std::f32::consts::PI * 220.0 * n as f32 / 48000.0).sin()
            * f32::from(i16::MAX)) as i16;
        for _ in 0..channels {
            writer.write_sample(s).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn processors_lists_registry() {
    let home = TempDir::new().unwrap();
    let output = tonegraph(home.path()).arg("processors").output().unwrap();
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("diode_clipper"));
    assert!(stdout.contains("cry_baby"));
}

#[test]
fn processors_shows_parameters() {
    let home = TempDir::new().unwrap();
    let output = tonegraph(home.path())
        .args(["processors", "diode_clipper"])
        .output()
        .unwrap();
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["on_off", "cutoff", "drive", "diode", "num_diodes"] {
        assert!(stdout.contains(id), "missing {id}");
    }
    assert!(stdout.contains("1N4148"));

    let output = tonegraph(home.path())
        .args(["processors", "plate_reverb"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn process_chain_and_reload_saved_state() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");
    let state = dir.path().join("chain.json");
    write_tone(&input, 2, 9600);

    let output = tonegraph(home.path())
        .arg("process")
        .arg(&input)
        .arg(&first)
        .args(["--chain", "diode_clipper:drive=0.9,diode=1N34|cry_baby:control_freq=0.2"])
        .args(["--block-size", "256"])
        .arg("--save-state")
        .arg(&state)
        .output()
        .unwrap();
    assert_success(&output);
    assert!(state.is_file());

    let reader = hound::WavReader::open(&first).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.duration(), 9600);
    let rendered: Vec<f32> = reader.into_samples::<f32>().map(Result::unwrap).collect();
    assert!(rendered.iter().all(|s| s.is_finite()));
    assert!(rendered.iter().any(|s| s.abs() > 1e-3));

    let output = tonegraph(home.path())
        .arg("process")
        .arg(&input)
        .arg(&second)
        .arg("--state")
        .arg(&state)
        .args(["--block-size", "256"])
        .output()
        .unwrap();
    assert_success(&output);
    let replay: Vec<f32> = hound::WavReader::open(&second)
        .unwrap()
        .into_samples::<f32>()
        .map(Result::unwrap)
        .collect();
    assert_eq!(replay, rendered);
}

#[test]
fn process_writes_mono_pcm_for_mono_input() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let out = dir.path().join("out.wav");
    write_tone(&input, 1, 4800);

    let output = tonegraph(home.path())
        .arg("process")
        .arg(&input)
        .arg(&out)
        .args(["--chain", "cry_baby", "--bit-depth", "24"])
        .output()
        .unwrap();
    assert_success(&output);
    let spec = hound::WavReader::open(&out).unwrap().spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 24);
}

#[test]
fn tuning_file_is_applied() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let out = dir.path().join("out.wav");
    let tuning = dir.path().join("tuning.toml");
    write_tone(&input, 1, 2400);
    std::fs::write(&tuning, "[cry_baby]\nmax_iterations = 20\n").unwrap();

    let output = tonegraph(home.path())
        .arg("process")
        .arg(&input)
        .arg(&out)
        .args(["--chain", "cry_baby"])
        .arg("--tuning")
        .arg(&tuning)
        .output()
        .unwrap();
    assert_success(&output);

    std::fs::write(&tuning, "[cry_baby]\nmax_iterations = \"lots\"\n").unwrap();
    let output = tonegraph(home.path())
        .arg("process")
        .arg(&input)
        .arg(&out)
        .args(["--chain", "cry_baby"])
        .arg("--tuning")
        .arg(&tuning)
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn process_rejects_bad_chains() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    write_tone(&input, 1, 480);

    for chain in ["", "fuzz", "diode_clipper:gain=2", "diode_clipper:drive"] {
        let output = tonegraph(home.path())
            .arg("process")
            .arg(&input)
            .arg(dir.path().join("out.wav"))
            .args(["--chain", chain])
            .output()
            .unwrap();
        assert!(!output.status.success(), "chain {chain:?} was accepted");
    }
}
