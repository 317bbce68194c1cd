use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_voxpack").to_string()
}

const MAP: &str = r#"{"0,0,0":1,"0,0,1":1,"1,0,0":2,"-4,70,12":7}"#;

fn map_value(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn cli_encode_decode_roundtrip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("map.json");
    let artifact = dir.path().join("map.vxp");
    let output = dir.path().join("restored.json");
    std::fs::write(&input, MAP).unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&input)
        .arg(&artifact)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(std::fs::read(&artifact).unwrap().starts_with(b"VXPK"));

    let st = Command::new(bin())
        .arg("decode")
        .arg(&artifact)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        map_value(&std::fs::read_to_string(&output).unwrap()),
        map_value(MAP)
    );
}

#[test]
fn cli_json_document_with_tuning_flags() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("map.json");
    let blocks = dir.path().join("blocks.json");
    let artifact = dir.path().join("map.vxp.json");
    let output = dir.path().join("restored.json");
    std::fs::write(&input, MAP).unwrap();
    std::fs::write(&blocks, r#"{"1":"stone","2":"dirt","7":"ore"}"#).unwrap();

    let st = Command::new(bin())
        .args(["encode", "-a", "gzip", "-l", "6", "--no-varint", "--blocks"])
        .arg(&blocks)
        .arg(&input)
        .arg(&artifact)
        .status()
        .unwrap();
    assert!(st.success());

    let doc = map_value(&std::fs::read_to_string(&artifact).unwrap());
    assert_eq!(doc["algorithm"], "gzip");
    assert_eq!(doc["options"]["useVarint"], false);
    assert_eq!(doc["blocks"]["7"], "ore");

    let st = Command::new(bin())
        .arg("decode")
        .arg(&artifact)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        map_value(&std::fs::read_to_string(&output).unwrap()),
        map_value(MAP)
    );
}

#[test]
fn cli_inspect_json_reports_metadata() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("map.json");
    let artifact = dir.path().join("map.vxp");
    std::fs::write(&input, MAP).unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&input)
        .arg(&artifact)
        .status()
        .unwrap();
    assert!(st.success());

    let out = Command::new(bin())
        .args(["--json", "inspect", "--source"])
        .arg(&input)
        .arg(&artifact)
        .output()
        .unwrap();
    assert!(out.status.success());
    let summary = map_value(&String::from_utf8(out.stdout).unwrap());
    assert_eq!(summary["recordCount"], 4);
    assert_eq!(summary["algorithm"], "brotli");
    assert_eq!(summary["bounds"]["minX"], -4);
    assert_eq!(summary["fresh"], true);
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("map.json");
    let artifact = dir.path().join("map.vxp");
    std::fs::write(&input, MAP).unwrap();
    std::fs::write(&artifact, b"keep me").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&input)
        .arg(&artifact)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&artifact).unwrap(), b"keep me");

    let st = Command::new(bin())
        .args(["-f", "encode"])
        .arg(&input)
        .arg(&artifact)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(std::fs::read(&artifact).unwrap().starts_with(b"VXPK"));
}

#[test]
fn cli_rejects_malformed_inputs() {
    let dir = tempdir().unwrap();
    let bad_map = dir.path().join("bad.json");
    let bad_artifact = dir.path().join("bad.vxp");
    std::fs::write(&bad_map, r#"{"1,2":3}"#).unwrap();
    std::fs::write(&bad_artifact, b"VXPK\x01\x09").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&bad_map)
        .arg(dir.path().join("out.vxp"))
        .status()
        .unwrap();
    assert!(!st.success());

    let st = Command::new(bin())
        .arg("decode")
        .arg(&bad_artifact)
        .arg(dir.path().join("out.json"))
        .status()
        .unwrap();
    assert!(!st.success());
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stderr).unwrap();
    assert!(text.contains("ARTIFACT_VERSION=1"));
}
