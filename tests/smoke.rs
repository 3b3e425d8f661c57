use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn cli(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("faers-signal").expect("binary exists");
    cmd.env("DATA_DIR", dir.join("data"))
        .env("OUTPUTS_DIR", dir.join("outputs"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn cli_help_runs() {
    let dir = tempdir().unwrap();
    cli(dir.path()).arg("--help").assert().success();
}

#[test]
fn signal_command_writes_table() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("cases.csv"),
        "case_id,drug_id,rxn_id,event_date\n\
         1,x,hepatitis,20200101\n\
         2,x,headache,20200201\n\
         3,y,hepatitis,20200301\n\
         4,y,headache,20200401\n\
         5,y,headache,20200501\n\
         6,z,nausea,20200601\n",
    )
    .unwrap();
    fs::write(
        data.join("meddra.csv"),
        "PT,HLT,HLGT,SOC\n\
         hepatitis,hepatocellular damage,hepatic disorders,hepatobiliary disorders\n\
         headache,headaches nec,headaches,nervous system disorders\n\
         nausea,nausea and vomiting symptoms,gastrointestinal signs,gastrointestinal disorders\n",
    )
    .unwrap();

    cli(dir.path())
        .args(["signal", "--category", "hepatobiliary disorders"])
        .assert()
        .success();

    let out = fs::read_to_string(dir.path().join("outputs").join("signals.csv")).unwrap();
    let mut lines = out.lines();
    assert!(lines.next().unwrap().starts_with("drug,n11,n12"));
    assert_eq!(lines.count(), 3);
    assert!(dir.path().join("outputs").join("signals.parquet").exists());
}

#[test]
fn unknown_category_fails() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("cases.csv"),
        "case_id,drug_id,rxn_id\n1,x,hepatitis\n",
    )
    .unwrap();
    fs::write(
        data.join("meddra.csv"),
        "PT,HLT,HLGT,SOC\nhepatitis,a,b,hepatobiliary disorders\n",
    )
    .unwrap();
    cli(dir.path())
        .args(["signal", "--category", "cardiac disorders"])
        .assert()
        .failure();
}
