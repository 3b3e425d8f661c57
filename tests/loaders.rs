use std::fs;

use chrono::NaiveDate;
use faers_signal::{
    data::{
        load,
        meddra::{Layer, ReactionCriteria, ReactionResolver},
    },
    signals::Policy,
    SignalAnalysis, SignalError,
};
use tempfile::tempdir;

const CASES: &str = "\
case_id,drug_id,rxn_id,event_date,qualification
1,aspirin,Hepatitis,20200101,3
1,warfarin,Hepatitis,20200101,3
2,aspirin,Headache,0,1
3,warfarin,Nausea,20210315,2
3,warfarin,Jaundice,20210315,2
";

const MEDDRA: &str = "\
PT,HLT,HLGT,SOC
Hepatitis,Hepatocellular damage,Hepatic disorders,Hepatobiliary disorders
Jaundice,Cholestasis and jaundice,Hepatic disorders,Hepatobiliary disorders
Headache,Headaches NEC,Headaches,Nervous system disorders
Device failure,Device issues,Device issues NEC,Product issues
Cleft lip,Cleft anomalies,Mouth anomalies,\"Congenital, familial and genetic disorders\"
";

const DICTIONARY: &str = "\
drug_id,drug_name,representative
aspirin,Aspirin,1
aspirin,acetylsalicylic acid,0
warfarin,Warfarin,1
warfarin,Coumadin,0
";

#[test]
fn parses_both_date_layouts() {
    let expected = NaiveDate::from_ymd_opt(2021, 3, 15);
    assert_eq!(load::parse_event_date("20210315"), expected);
    assert_eq!(load::parse_event_date("2021-03-15"), expected);
    assert_eq!(load::parse_event_date("0"), None);
    assert_eq!(load::parse_event_date(""), None);
}

#[test]
fn loads_long_format_cases() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cases.csv");
    fs::write(&path, CASES).unwrap();

    let corpus = load::load_cases(&path).unwrap();
    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus.dated_len(), 2);
    assert_eq!(
        corpus.drugs().cloned().collect::<Vec<_>>(),
        ["aspirin", "warfarin"]
    );
    assert_eq!(corpus.reaction_postings("hepatitis").len(), 1);
    assert_eq!(corpus.drug_postings("warfarin").len(), 2);
    assert_eq!(
        corpus.first_occurrence("warfarin"),
        NaiveDate::from_ymd_opt(2020, 1, 1)
    );
    // undated case sorts last
    assert_eq!(corpus.record(2).unwrap().case_id, "2");

    let qualified = corpus.retain_qualified(2);
    assert_eq!(qualified.len(), 2);
    assert!(qualified.records().iter().all(|r| r.case_id != "2"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cases.json");
    fs::write(&path, "{}").unwrap();
    assert!(load::load_cases(&path).is_err());
}

#[test]
fn meddra_ignore_list_applies_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("meddra.csv");
    fs::write(&path, MEDDRA).unwrap();

    let full = load::load_meddra(&path, false).unwrap();
    assert_eq!(full.len(), 5);
    let filtered = load::load_meddra(&path, true).unwrap();
    assert_eq!(filtered.len(), 3);

    let focus = filtered
        .resolve(&ReactionCriteria::labels(
            Layer::Soc,
            ["Hepatobiliary disorders"],
        ))
        .unwrap();
    assert!(focus.contains("hepatitis") && focus.contains("jaundice"));
}

#[test]
fn dictionary_encodes_decodes_and_suggests() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("drugs.csv");
    fs::write(&path, DICTIONARY).unwrap();

    let dictionary = load::load_drug_dictionary(&path).unwrap();
    assert_eq!(dictionary.len(), 2);
    // display keeps the dictionary's own spelling
    assert_eq!(dictionary.decode("warfarin").unwrap(), "Warfarin");
    assert_eq!(dictionary.decode("aspirin").unwrap(), "Aspirin");

    let ids = dictionary.encode(&["Coumadin", "ASPIRIN"]).unwrap();
    assert_eq!(ids.len(), 2);

    let err = dictionary.encode(&["warfarn"]).unwrap_err();
    match err {
        SignalError::UnknownDrug { suggestion, .. } => {
            assert_eq!(suggestion.as_deref(), Some("warfarin"));
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert_eq!(dictionary.search("acid"), ["acetylsalicylic acid"]);
}

#[test]
fn first_occurrence_file_overrides_derived_dates() {
    let dir = tempdir().unwrap();
    let cases = dir.path().join("cases.csv");
    let dates = dir.path().join("first.csv");
    fs::write(&cases, CASES).unwrap();
    fs::write(&dates, "drug_id,date\naspirin,2019-06-30\n").unwrap();

    let corpus = load::load_cases(&cases)
        .unwrap()
        .with_first_occurrence(load::load_first_occurrence(&dates).unwrap());
    assert_eq!(
        corpus.first_occurrence("aspirin"),
        NaiveDate::from_ymd_opt(2019, 6, 30)
    );
}

#[test]
fn one_unknown_name_fails_the_whole_lookup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("drugs.csv");
    fs::write(&path, DICTIONARY).unwrap();
    let dictionary = load::load_drug_dictionary(&path).unwrap();

    let err = dictionary.encode(&["aspirin", "warfarn"]).unwrap_err();
    match err {
        SignalError::UnknownDrug { name, suggestion } => {
            assert_eq!(name, "warfarn");
            assert_eq!(suggestion.as_deref(), Some("warfarin"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn coded_reaction_ids_match_between_cases_and_meddra() {
    let dir = tempdir().unwrap();
    let cases = dir.path().join("cases.csv");
    let meddra = dir.path().join("meddra.csv");
    fs::write(
        &cases,
        "case_id,drug_id,rxn_id\n1,x,R10\n2,x,R20\n3,y,R10\n4,y,R20\n5,y,R20\n",
    )
    .unwrap();
    fs::write(
        &meddra,
        "id,PT,HLT,HLGT,SOC\n\
         R10,Hepatitis,Hepatocellular damage,Hepatic disorders,Hepatobiliary disorders\n\
         R20,Headache,Headaches NEC,Headaches,Nervous system disorders\n",
    )
    .unwrap();

    let corpus = load::load_cases(&cases).unwrap();
    let hierarchy = load::load_meddra(&meddra, true).unwrap();
    let focus = SignalAnalysis::new(&hierarchy)
        .select_reactions(&ReactionCriteria::labels(
            Layer::Soc,
            ["Hepatobiliary disorders"],
        ))
        .unwrap();
    assert_eq!(corpus.focus_postings(&focus).len(), 2);

    let table = SignalAnalysis::new(&hierarchy)
        .run(&corpus, &focus, &Policy::whole_corpus(), None)
        .unwrap();
    let x = table.get("x").unwrap();
    assert_eq!((x.counts.n11, x.counts.np1, x.counts.npp), (1, 2, 5));
    assert!(x.ror.is_finite());
}
