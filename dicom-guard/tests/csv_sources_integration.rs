//! Conformance runs over CSV exports.

use datafusion::prelude::SessionContext;
use dicom_guard::analyzers::ConformanceEngine;
use dicom_guard::config::EvaluatorConfig;
use dicom_guard::sources::{CsvOptions, CsvSource, TableSource};
use dicom_guard::types::Metric;
use std::io::Write;
use tempfile::TempDir;

const CATALOG_CSV: &str = "\
Tag,IOD,Attribute Name,VR,Standard Terms
\"(0008,0060)\",CT Image,Modality,CS,\"{'Enumerated Values': ['CT', 'MR']}\"
\"(0018,0015)\",CT Image,Body Part Examined,CS,\"{'Defined Terms': ['HEAD', 'CHEST']}\"
\"(0010,0010)\",CT Image,Patient's Name,PN,
";

fn write_file(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path.to_str().unwrap().to_string()
}

/// Two site exports with numeric study and file identifiers.
fn write_exports(dir: &TempDir) {
    write_file(
        dir,
        "site_a.csv",
        "\
IOD,study_global,file_global,Tag,Value
CT Image,1,10,\"(0008,0060)\",CT
CT Image,1,10,\"(0018,0015)\",\"['HEAD', 'NECK']\"
CT Image,1,11,\"(0008,0060)\",ct
CT Image,1,11,\"(0010,0010)\",DOE^JOHN
",
    );
    write_file(
        dir,
        "site_b.csv",
        "\
IOD,study_global,file_global,Tag,Value
CT Image,2,20,\"(0008,0060)\",MR
CT Image,2,20,\"(0018,0015)\",[]
",
    );
}

async fn create_context(dir: &TempDir) -> SessionContext {
    let catalog = write_file(dir, "standard.csv", CATALOG_CSV);
    write_exports(dir);

    let ctx = SessionContext::new();
    CsvSource::new(catalog).register(&ctx, "standard").await.unwrap();
    let pattern = format!("{}/site_*.csv", dir.path().display());
    CsvSource::from_glob(pattern)
        .unwrap()
        .register(&ctx, "metadata")
        .await
        .unwrap();
    ctx
}

#[tokio::test]
async fn test_glob_of_exports_is_one_population() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = create_context(&dir).await;

    let report = ConformanceEngine::new(EvaluatorConfig::default())
        .unwrap()
        .run(&ctx)
        .await
        .unwrap();

    assert_eq!(report.metadata.metadata_records, 6);
    assert_eq!(report.metadata.catalog_entries, 3);
    assert_eq!(report.metadata.total_groups, 2);
    assert_eq!(report.rates.len(), 6);
    // The exports carry no VR column.
    assert_eq!(report.metadata.vr_merged, 6);

    let modality = report
        .rates
        .iter()
        .find(|row| row.group.get("study_global") == Some("1") && row.tag == "(0008,0060)")
        .unwrap();
    assert_eq!(modality.total_files, 2);
    assert_eq!(modality.tag_existence_rate, 1.0);
    // "ct" is not a legal term; matching is case sensitive.
    assert_eq!(modality.value_standardization_rate, Some(0.5));
    assert_eq!(modality.value_diversity, Some(2));

    let body_part = report
        .rates
        .iter()
        .find(|row| row.group.get("study_global") == Some("1") && row.tag == "(0018,0015)")
        .unwrap();
    assert_eq!(body_part.value_standardization_rate, Some(0.5));
}

#[tokio::test]
async fn test_non_coded_string_attributes_have_no_standardization_rate() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = create_context(&dir).await;

    let report = ConformanceEngine::new(EvaluatorConfig::default())
        .unwrap()
        .run(&ctx)
        .await
        .unwrap();

    let name = report
        .rates
        .iter()
        .find(|row| row.group.get("study_global") == Some("1") && row.tag == "(0010,0010)")
        .unwrap();
    assert_eq!(name.files_with_value, 1);
    assert_eq!(name.files_with_cs_vr, Some(0));
    assert_eq!(name.value_standardization_rate, None);

    let stat = report
        .statistic("CT Image", "(0010,0010)", Metric::ValueStandardizationRate)
        .unwrap();
    assert_eq!(stat.group_count, 2);
    assert_eq!(stat.mean, None);
    assert_eq!(stat.range, None);
}

#[tokio::test]
async fn test_empty_list_marker_in_csv_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = create_context(&dir).await;

    let report = ConformanceEngine::new(EvaluatorConfig::default())
        .unwrap()
        .run(&ctx)
        .await
        .unwrap();

    let body_part = report
        .rates
        .iter()
        .find(|row| row.group.get("study_global") == Some("2") && row.tag == "(0018,0015)")
        .unwrap();
    assert_eq!(body_part.files_with_tag, 1);
    assert_eq!(body_part.files_with_value, 0);
    assert_eq!(body_part.value_existence_rate, 0.0);
    assert_eq!(body_part.value_standardization_rate, None);
}

#[tokio::test]
async fn test_semicolon_delimited_export() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = write_file(&dir, "standard.csv", CATALOG_CSV);
    let metadata = write_file(
        &dir,
        "export.csv",
        "IOD;Manufacturer;file_global;Tag;Value\nCT Image;ACME;a;(0008,0060);CT\n",
    );

    let ctx = SessionContext::new();
    CsvSource::new(catalog).register(&ctx, "standard").await.unwrap();
    CsvSource::new(metadata)
        .with_options(CsvOptions {
            delimiter: b';',
            ..CsvOptions::default()
        })
        .register(&ctx, "metadata")
        .await
        .unwrap();

    let config = EvaluatorConfig::default().with_group_columns(["IOD", "Manufacturer"]);
    let report = ConformanceEngine::new(config).unwrap().run(&ctx).await.unwrap();

    let modality = report
        .rates
        .iter()
        .find(|row| row.tag == "(0008,0060)")
        .unwrap();
    assert_eq!(modality.group.get("Manufacturer"), Some("ACME"));
    assert_eq!(modality.value_standardization_rate, Some(1.0));
}
