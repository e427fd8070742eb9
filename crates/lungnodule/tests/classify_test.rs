mod common;

use common::*;
use lungnodule_lib::report::to_csv;
use lungnodule_lib::{
    run_batch, scan_directory, Algorithm, BatchOptions, DecodeErrorPolicy, ExtractOptions,
    Extractor, MemorySink, ScanOptions, SearchConfig, SearchMethod, SizeScope,
};

#[test]
fn test_negative_report_default_config() {
    let corpus = ReportCorpus::new().unwrap().report("a.txt", NEGATIVE_REPORT);
    let results = classify_dir(corpus.path(), ExtractOptions::default());

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].file, "a.txt");
    assert_eq!(results[0].decision.label(), "negative");
    assert_eq!(results[0].max_nodule_size, None);
}

#[test]
fn test_suspicious_report_with_size() {
    let corpus = ReportCorpus::new().unwrap().report("b.txt", SUSPICIOUS_REPORT);
    let results = classify_dir(
        corpus.path(),
        ExtractOptions {
            extract_size: true,
            ..Default::default()
        },
    );

    assert_eq!(results[0].decision.label(), "suspicious");
    assert_eq!(results[0].max_nodule_size, Some(23.0));
}

#[test]
fn test_rule_six_search_override() {
    let corpus = ReportCorpus::new().unwrap().report("c.txt", GROWTH_REPORT);

    let override_tokens = classify_dir(
        corpus.path(),
        ExtractOptions {
            search: SearchConfig::new(SearchMethod::String, Some(SearchMethod::Tokens)),
            ..Default::default()
        },
    );
    assert_eq!(labels(&override_tokens), vec!["interval_growth"]);

    let all_string = classify_dir(
        corpus.path(),
        ExtractOptions {
            search: SearchConfig::new(SearchMethod::String, Some(SearchMethod::String)),
            ..Default::default()
        },
    );
    assert_eq!(labels(&all_string), vec!["indeterminate"]);
}

#[test]
fn test_malformed_encoding_does_not_stop_batch() {
    let corpus = reference_corpus();
    let results = classify_dir(
        corpus.path(),
        ExtractOptions {
            extract_size: true,
            search: SearchConfig::new(SearchMethod::String, Some(SearchMethod::Tokens)),
            ..Default::default()
        },
    );

    insta::assert_snapshot!(to_csv(&results).unwrap(), @r###"
    File,Decision,MaxNoduleSize
    report1.txt,negative,
    report2.txt,suspicious,23
    report3.txt,interval_growth,
    report4.txt,error:decode,
    "###);
}

#[test]
fn test_skip_policy_omits_undecodable_rows() {
    let corpus = reference_corpus();
    let extractor = Extractor::new(&ExtractOptions::default()).unwrap();
    let (files, _) = scan_directory(corpus.path(), &ScanOptions::default(), &MemorySink::new()).unwrap();
    let results = run_batch(
        &extractor,
        &files,
        &BatchOptions {
            jobs: 1,
            on_decode_error: DecodeErrorPolicy::Skip,
        },
        &MemorySink::new(),
        None,
    )
    .unwrap();

    let files: Vec<&str> = results.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["report1.txt", "report2.txt", "report3.txt"]);
}

#[test]
fn test_parallel_output_equals_sequential() {
    let mut corpus = ReportCorpus::new().unwrap();
    let texts = [
        NEGATIVE_REPORT,
        SUSPICIOUS_REPORT,
        GROWTH_REPORT,
        "A 7 mm noncalcified nodule. Recommend follow-up CT in 6 months.",
        "Calcified granuloma nodule, benign.",
    ];
    for i in 0..60 {
        corpus = corpus.report(&format!("r{:03}.txt", i), texts[i % texts.len()]);
    }

    let extractor = Extractor::new(&ExtractOptions {
        extract_size: true,
        ..Default::default()
    })
    .unwrap();
    let (files, _) = scan_directory(corpus.path(), &ScanOptions::default(), &MemorySink::new()).unwrap();

    let sequential = run_batch(&extractor, &files, &BatchOptions::default(), &MemorySink::new(), None).unwrap();
    let parallel = run_batch(
        &extractor,
        &files,
        &BatchOptions {
            jobs: 4,
            ..Default::default()
        },
        &MemorySink::new(),
        None,
    )
    .unwrap();

    assert_eq!(to_csv(&sequential).unwrap(), to_csv(&parallel).unwrap());
}

#[test]
fn test_custom_rule_table() {
    let corpus = ReportCorpus::new()
        .unwrap()
        .report("a.txt", "Small nodule. Otherwise clear.")
        .report("b.txt", "Lungs clear.")
        .report(
            "rules/custom.toml",
            r#"
            name = "mention"
            default_label = "absent"

            [phrases]
            nodule = ["nodule"]

            [[rules]]
            id = 1
            label = "present"
            when = { any_sentence = { phrase = "nodule" } }
            "#,
        );

    let results = classify_dir(
        corpus.path(),
        ExtractOptions {
            rules_path: Some(corpus.file("rules/custom.toml")),
            use_base_splitter: true,
            ..Default::default()
        },
    );
    assert_eq!(labels(&results), vec!["present", "absent"]);
}

#[test]
fn test_fleischner_with_matched_size_scope() {
    let corpus = ReportCorpus::new().unwrap().report(
        "a.txt",
        "The ascending aorta measures 4.1 cm. A 5 mm nodule in the right middle lobe.",
    );

    let results = classify_dir(
        corpus.path(),
        ExtractOptions {
            algorithm: Algorithm::Fleischner,
            extract_size: true,
            size_scope: SizeScope::Matched,
            ..Default::default()
        },
    );
    assert_eq!(results[0].decision.label(), "no_routine_follow_up");
    assert_eq!(results[0].max_nodule_size, Some(5.0));
}

#[test]
fn test_latin1_codec() {
    let corpus = ReportCorpus::new()
        .unwrap()
        .bytes("a.txt", b"Nodule measuring 9 mm, suspicious for malignancy. Caf\xe9.");

    let utf8 = classify_dir(corpus.path(), ExtractOptions::default());
    assert_eq!(labels(&utf8), vec!["error:decode"]);

    let latin1 = classify_dir(
        corpus.path(),
        ExtractOptions {
            encoding: "latin1".to_string(),
            ..Default::default()
        },
    );
    assert_eq!(labels(&latin1), vec!["suspicious"]);
}
