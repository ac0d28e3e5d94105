//! Integration tests for the `ipni` binary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ipni_ad::{Advertisement, Codec, Identity, KeyAlgorithm};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get the path to the ipni binary.
fn cli_bin() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // Go up to workspace root
    path.pop();
    path.push("target");
    path.push("debug");
    path.push("ipni");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(cli_bin())
        .args(args)
        .output()
        .expect("failed to execute ipni")
}

fn provider_block(identity: &Identity, address: &str) -> String {
    format!(
        "\n[[providers]]\npeer_id = \"{}\"\nprivate_key = \"{}\"\naddresses = [\"{}\"]\nmetadata = \"gBI\"\n",
        identity.peer_id(),
        STANDARD.encode(identity.to_protobuf_encoding().unwrap()),
        address
    )
}

/// Write a fixture config with two fresh Ed25519 providers.
fn write_config(dir: &TempDir) -> (PathBuf, Identity) {
    let publisher = Identity::generate(KeyAlgorithm::Ed25519).unwrap();
    let other = Identity::generate(KeyAlgorithm::Ed25519).unwrap();

    let mut config = String::from(
        "context_id = \"Y3R4MQ==\"\nentries = \"bafybeiczsscdsbs7ffqz55asqdf3smv6klcw3gofszvwlyarci47bgf354\"\noverride = false\n",
    );
    config.push_str(&provider_block(&publisher, "/ip4/12.34.56.78/tcp/999/ws"));
    config.push_str(&provider_block(&other, "/ip4/12.34.56.78/tcp/999/ws"));

    let path = dir.path().join("fixture.toml");
    fs::write(&path, config).unwrap();
    (path, publisher)
}

#[test]
fn test_keygen() {
    let output = run(&["keygen"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generated ed25519 Keypair"));
    assert!(stdout.contains("Peer ID"));
    assert!(stdout.contains("Private Key"));
}

#[test]
fn test_keygen_to_file() {
    let dir = TempDir::new().unwrap();
    let key_path = dir.path().join("key.json");

    let output = run(&[
        "keygen",
        "--algorithm",
        "secp256k1",
        "--out",
        key_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&key_path).unwrap()).unwrap();
    assert_eq!(json["algorithm"], "secp256k1");

    let key = STANDARD
        .decode(json["private_key"].as_str().unwrap())
        .unwrap();
    let identity = Identity::from_protobuf_encoding(&key).unwrap();
    assert_eq!(
        identity.peer_id().to_string(),
        json["peer_id"].as_str().unwrap()
    );
}

#[test]
fn test_keygen_rejects_unknown_algorithm() {
    let output = run(&["keygen", "--algorithm", "dsa"]);
    assert!(!output.status.success());
}

#[test]
fn test_fixture_then_verify() {
    let dir = TempDir::new().unwrap();
    let (config, publisher) = write_config(&dir);
    let ad_path = dir.path().join("ad.cbor");

    let output = run(&[
        "fixture",
        config.to_str().unwrap(),
        "--out",
        ad_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let ad = Advertisement::decode(&fs::read(&ad_path).unwrap()).unwrap();
    assert_eq!(ad.provider(), &publisher.peer_id());
    assert_eq!(ad.context_id(), b"ctx1");
    assert_eq!(ad.extended_providers().unwrap().providers().len(), 2);

    let output = run(&["verify", ad_path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Valid! Signed by {}", publisher.peer_id())));
}

#[test]
fn test_fixture_summary_to_stdout() {
    let dir = TempDir::new().unwrap();
    let (config, publisher) = write_config(&dir);

    let output = run(&["fixture", config.to_str().unwrap()]);
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["provider"], publisher.peer_id().to_string());
    assert_eq!(summary["metadata"], "gBI=");
    assert_eq!(summary["extended_providers"]["override"], false);
}

#[test]
fn test_verify_tampered_file() {
    let dir = TempDir::new().unwrap();
    let (config, _) = write_config(&dir);
    let ad_path = dir.path().join("ad.cbor");
    run(&[
        "fixture",
        config.to_str().unwrap(),
        "--out",
        ad_path.to_str().unwrap(),
    ]);

    let mut bytes = fs::read(&ad_path).unwrap();
    let at = bytes
        .windows(4)
        .position(|w| w == b"ctx1")
        .unwrap();
    bytes[at + 3] = b'2';
    fs::write(&ad_path, bytes).unwrap();

    let output = run(&["verify", ad_path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed verification"));
}

#[test]
fn test_verify_nonexistent_file() {
    let output = run(&["verify", "/nonexistent/ad.cbor"]);
    assert!(!output.status.success());
}

#[test]
fn test_show() {
    let dir = TempDir::new().unwrap();
    let (config, publisher) = write_config(&dir);
    let ad_path = dir.path().join("ad.cbor");
    run(&[
        "fixture",
        config.to_str().unwrap(),
        "--out",
        ad_path.to_str().unwrap(),
    ]);

    let output = run(&["show", ad_path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Advertisement"));
    assert!(stdout.contains(&publisher.peer_id().to_string()));
    assert!(stdout.contains("bitswap"));
    assert!(stdout.contains("Signer"));

    let output = run(&["show", "--json", ad_path.to_str().unwrap()]);
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["context_id"], "Y3R4MQ==");
    let file_link = Codec::DagCbor.link(&fs::read(&ad_path).unwrap());
    assert_eq!(summary["link"], file_link.to_string());
}

#[test]
fn test_dag_json_fixture_then_verify() {
    let dir = TempDir::new().unwrap();
    let (config, publisher) = write_config(&dir);
    let ad_path = dir.path().join("ad.json");

    let output = run(&[
        "fixture",
        config.to_str().unwrap(),
        "--out",
        ad_path.to_str().unwrap(),
        "--codec",
        "dag-json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let bytes = fs::read(&ad_path).unwrap();
    assert_eq!(bytes.first(), Some(&b'{'));

    let output = run(&["verify", "--codec", "json", ad_path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Valid! Signed by {}", publisher.peer_id())));

    // The default codec cannot read it.
    let output = run(&["verify", ad_path.to_str().unwrap()]);
    assert!(!output.status.success());

    let output = run(&["show", "--json", "--codec", "dag-json", ad_path.to_str().unwrap()]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["link"], Codec::DagJson.link(&bytes).to_string());
}

#[test]
fn test_demo_fixture_with_rsa_providers() {
    let mut config = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    config.pop();
    config.pop();
    config.push("demos");
    config.push("fixture.toml");

    let dir = TempDir::new().unwrap();
    let ad_path = dir.path().join("ad.cbor");
    let output = run(&[
        "fixture",
        config.to_str().unwrap(),
        "--out",
        ad_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run(&["verify", ad_path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Valid! Signed by QmdZre8ojuCjqQMgfryVF7uXAz5kWFD1uzY5jiNfFrVUMP"));
}
