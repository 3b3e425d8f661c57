use faers_signal::{
    api::types::SignalDto,
    data::dictionary::{DrugDictionary, DrugEntry},
    signals::{
        table::{COLUMNS, DEFAULT_INTEGRATED_NAME},
        ContingencyCounts, ContingencyRow, SignalTable, SortKey, StatsOptions,
    },
    SignalError,
};
use tempfile::tempdir;

fn row(drug: &str, n11: i64, n1p: i64, np1: i64, npp: i64) -> ContingencyRow {
    ContingencyRow {
        drug: drug.to_string(),
        counts: ContingencyCounts::from_margins(n11, n1p, np1, npp),
    }
}

/// A and B are ordinary; C has no reports (NaN ROR); D never appears
/// without the focus reaction (infinite ROR).
fn sample_table() -> SignalTable {
    SignalTable::build(
        vec![
            row("A", 20, 100, 150, 1000),
            row("B", 10, 50, 150, 1000),
            row("C", 0, 0, 150, 1000),
            row("D", 5, 5, 150, 1000),
        ],
        StatsOptions::default(),
    )
    .unwrap()
}

#[test]
fn build_attaches_statistics() {
    let table = sample_table();
    assert_eq!(table.len(), 4);
    let a = table.get("A").unwrap();
    assert!((a.ror - 1.480_769).abs() < 1e-5);
    assert!((a.lower_ci - 0.876_780).abs() < 1e-5);
    assert!(a.chi_square.is_some() && a.q_bh.is_some() && a.ic_lower.is_some());

    let c = table.get("C").unwrap();
    assert!(c.ror.is_nan());
    assert!(!c.is_finite());
    let d = table.get("D").unwrap();
    assert!(d.ror.is_infinite());
    assert_eq!(table.finite_rows().count(), 2);
}

#[test]
fn switched_off_tests_leave_columns_empty() {
    let options = StatsOptions {
        chi_square: false,
        information_component: false,
        ..StatsOptions::default()
    };
    let table = SignalTable::build(vec![row("A", 20, 100, 150, 1000)], options).unwrap();
    let a = table.get("A").unwrap();
    assert!(a.chi_square.is_none() && a.p_value.is_none() && a.ic_lower.is_none());
    assert!(a.ror.is_finite());
}

#[test]
fn duplicate_drugs_are_rejected() {
    let err = SignalTable::build(
        vec![row("A", 1, 10, 5, 100), row("A", 2, 10, 5, 100)],
        StatsOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SignalError::DuplicateDrug(d) if d == "A"));
}

#[test]
fn default_order_is_lower_ci_descending_with_nan_last() {
    let table = sample_table();
    let drugs: Vec<&str> = table.drugs().map(String::as_str).collect();
    assert_eq!(drugs.first(), Some(&"A"));
    let nan_positions: Vec<usize> = table
        .rows()
        .enumerate()
        .filter(|(_, r)| r.lower_ci.is_nan())
        .map(|(i, _)| i)
        .collect();
    let finite = table.rows().filter(|r| !r.lower_ci.is_nan()).count();
    assert!(nan_positions.iter().all(|&i| i >= finite));
}

#[test]
fn ascending_sort_still_puts_nan_last() {
    let table = sample_table().to_sorted(SortKey::Ror, true);
    let rors: Vec<f64> = table.rows().map(|r| r.ror).collect();
    assert!(rors.last().unwrap().is_nan());
    let finite: Vec<f64> = rors.iter().copied().filter(|v| !v.is_nan()).collect();
    assert!(finite.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn sort_keys_parse_from_column_names() {
    assert_eq!("lower_CI".parse::<SortKey>().unwrap(), SortKey::LowerCi);
    assert_eq!("IC_lowerCI".parse::<SortKey>().unwrap(), SortKey::IcLower);
    assert_eq!("q-holm".parse::<SortKey>().unwrap(), SortKey::QHolm);
    assert!(matches!(
        "median".parse::<SortKey>(),
        Err(SignalError::UnknownSortKey(_))
    ));
}

#[test]
fn integrate_merges_counts_and_rederives() {
    let table = sample_table().integrate("AB", &["A", "B"]).unwrap();
    assert_eq!(table.len(), 3);
    assert!(table.get("A").is_none() && table.get("B").is_none());

    let merged = table.get("AB").unwrap();
    assert_eq!(
        merged.counts,
        ContingencyCounts {
            n11: 30,
            n12: 120,
            n21: 120,
            n22: 730,
            n1p: 150,
            n2p: 850,
            np1: 150,
            np2: 850,
            npp: 1000,
        }
    );
    assert!(merged.counts.is_consistent());
    let expected = (30.0 * 730.0) / (120.0 * 120.0);
    assert!((merged.ror - expected).abs() < 1e-12);
    assert!(merged.ic_lower.is_some_and(f64::is_finite));
}

#[test]
fn integrate_without_name_uses_default() {
    let table = sample_table().integrate("", &["A", "B"]).unwrap();
    assert!(table.get(DEFAULT_INTEGRATED_NAME).is_some());
}

#[test]
fn integrate_needs_two_ids() {
    let err = sample_table().integrate("X", &["A"]).unwrap_err();
    assert!(matches!(err, SignalError::TooFewDrugs { given: 1 }));
}

#[test]
fn integrate_with_absent_members_is_a_no_op() {
    let before: Vec<String> = sample_table().drugs().cloned().collect();
    let table = sample_table().integrate("X", &["A", "missing"]).unwrap();
    let after: Vec<String> = table.drugs().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn integrate_rejects_name_collision() {
    let err = sample_table().integrate("C", &["A", "B"]).unwrap_err();
    assert!(matches!(err, SignalError::DuplicateDrug(d) if d == "C"));
}

#[test]
fn integrate_rejects_rows_from_different_scopes() {
    let table = SignalTable::build(
        vec![row("A", 20, 100, 150, 1000), row("E", 5, 50, 100, 900)],
        StatsOptions::default(),
    )
    .unwrap();
    let err = table.integrate("AE", &["A", "E"]).unwrap_err();
    assert!(matches!(err, SignalError::IncompatibleScopes { .. }));
}

#[test]
fn decoding_renames_rows() {
    let dictionary = DrugDictionary::new([
        DrugEntry {
            drug_id: "A".into(),
            drug_name: "Aspirin".into(),
            representative: true,
        },
        DrugEntry {
            drug_id: "A".into(),
            drug_name: "acetylsalicylic acid".into(),
            representative: false,
        },
        DrugEntry {
            drug_id: "B".into(),
            drug_name: "warfarin".into(),
            representative: true,
        },
    ]);
    let table = SignalTable::build(
        vec![row("A", 20, 100, 150, 1000), row("B", 10, 50, 150, 1000)],
        StatsOptions::default(),
    )
    .unwrap()
    .decoded(&dictionary)
    .unwrap();
    assert!(table.get("Aspirin").is_some());
    assert!(table.get("warfarin").is_some());

    let err = sample_table().decoded(&dictionary).unwrap_err();
    assert!(matches!(err, SignalError::MissingDecoding(_)));
}

#[test]
fn export_columns_are_stable() {
    insta::assert_snapshot!(
        COLUMNS.join(","),
        @"drug,n11,n12,n21,n22,n1p,n2p,np1,np2,npp,ROR,lower_CI,upper_CI,chi_square,p_value,q_BH,q_Holm,IC_lowerCI"
    );
}

#[test]
fn dataframe_follows_column_order() {
    let df = sample_table().to_dataframe().unwrap();
    assert_eq!(df.height(), 4);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, COLUMNS);
}

#[test]
fn csv_export_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("signals.csv");
    sample_table().write_csv(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next().unwrap(), COLUMNS.join(","));

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<SignalDto> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 4);
    let a = rows.iter().find(|r| r.drug == "A").unwrap();
    assert_eq!((a.n11, a.n12, a.n21, a.n22), (20, 80, 130, 770));
    assert!((a.ror - 1.480_769).abs() < 1e-5);
    assert!(a.is_finite());
}

#[test]
fn parquet_export_is_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("signals.parquet");
    sample_table().write_parquet(&path).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
