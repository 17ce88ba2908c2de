//! End-to-end pipeline tests against in-memory collaborators.
//!
//! Run with: `cargo test -p trapline-ingest --test pipeline_test`

mod helpers;

use std::time::Duration;

use bytes::Bytes;
use image::ImageFormat;

use helpers::{
    base_tags, encode_test_image, harness, test_config, CatalogMode, ExtractorMode, FakeCatalog,
    FakeExtractor,
};
use trapline_core::IngestEvent;
use trapline_ingest::{CatalogError, RecordOutcome};

fn event(key: &str) -> IngestEvent {
    IngestEvent {
        bucket: "staging".to_string(),
        key: key.to_string(),
    }
}

#[tokio::test]
async fn happy_path_registers_and_fans_out() {
    let mut tags = base_tags();
    tags.insert("Make".to_string(), "BuckEyeCam".to_string());
    tags.insert("Comment".to_string(), "SN=123\nTEXT1=a\nTEXT2=b".to_string());

    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(tags)),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/IMG_0001.JPG",
            Bytes::from(encode_test_image(ImageFormat::Jpeg)),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/IMG_0001.JPG")])
        .await
        .unwrap();

    let RecordOutcome::Ingested {
        content_hash,
        distribution_failures,
    } = &outcomes[0]
    else {
        panic!("expected Ingested, got {:?}", outcomes[0]);
    };
    assert_eq!(*distribution_failures, 0);

    // The catalog saw the enriched record once, quirk serial included.
    assert_eq!(h.catalog.call_count(), 1);
    let record = h.catalog.records.lock().unwrap()[0].clone();
    assert_eq!(record.serial_number, "123");
    assert_eq!(record.file_name, "IMG_0001.jpg");
    assert_eq!(record.date_time_original, "2021-06-01T04:30:00");
    assert_eq!(&record.content_hash, content_hash);

    // One serving object per variant, keyed by hash.
    let serving = h.store.keys_in("serving").await;
    assert_eq!(
        serving,
        vec![
            format!("medium/{}-medium.jpg", content_hash),
            format!("original/{}-original.jpg", content_hash),
            format!("small/{}-small.jpg", content_hash),
        ]
    );

    // Archive copy preserves provenance: serial prefix + original basename.
    let archive = h.store.keys_in("archive").await;
    assert_eq!(archive, vec![format!("123/IMG_0001_{}.jpg", content_hash)]);

    // Staging object deleted, nothing dead-lettered.
    assert!(h.store.keys_in("staging").await.is_empty());
    assert!(h.store.keys_in("dead-letter").await.is_empty());
}

#[tokio::test]
async fn registration_failure_dead_letters_without_fan_out() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Reject(vec![CatalogError {
            message: "duplicate".to_string(),
            code: Some("DUPLICATE_IMAGE".to_string()),
        }])),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/dupe.jpg",
            Bytes::from(encode_test_image(ImageFormat::Jpeg)),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/dupe.jpg")])
        .await
        .unwrap();

    assert!(matches!(
        &outcomes[0],
        RecordOutcome::Quarantined { dead_letter_key } if dead_letter_key == "DUPLICATE_IMAGE/dupe.jpg"
    ));

    // Zero archive/serving writes, exactly one dead-letter write.
    assert!(h.store.keys_in("serving").await.is_empty());
    assert!(h.store.keys_in("archive").await.is_empty());
    assert_eq!(
        h.store.keys_in("dead-letter").await,
        vec!["DUPLICATE_IMAGE/dupe.jpg".to_string()]
    );
    assert!(h.store.keys_in("staging").await.is_empty());
}

#[tokio::test]
async fn mixed_batch_splits_image_and_zip_paths() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/shot.jpg",
            Bytes::from(encode_test_image(ImageFormat::Jpeg)),
            "image/jpeg",
        )
        .await;
    h.store
        .seed(
            "staging",
            "uploads/bundle.zip",
            Bytes::from_static(b"PK\x03\x04fake"),
            "application/zip",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/shot.jpg"), event("uploads/bundle.zip")])
        .await
        .unwrap();

    assert!(matches!(&outcomes[0], RecordOutcome::Ingested { .. }));
    assert!(matches!(&outcomes[1], RecordOutcome::Enqueued));

    // The zip was forwarded verbatim, no extraction or registration for it.
    let payloads = h.queue.payloads.lock().unwrap().clone();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["Bucket"], "staging");
    assert_eq!(payloads[0]["Key"], "uploads/bundle.zip");
    assert_eq!(payloads[0]["FileName"], "bundle.zip");
    assert_eq!(h.catalog.call_count(), 1);

    // Both staging objects deleted.
    assert!(h.store.keys_in("staging").await.is_empty());
}

#[tokio::test]
async fn extraction_failure_dead_letters_before_registration() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Fail),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/corrupt.jpg",
            Bytes::from_static(b"not really a jpeg"),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/corrupt.jpg")])
        .await
        .unwrap();

    assert!(matches!(
        &outcomes[0],
        RecordOutcome::Quarantined { dead_letter_key } if dead_letter_key == "EXTRACTION_FAILED/corrupt.jpg"
    ));
    assert_eq!(h.catalog.call_count(), 0);
    assert!(h.store.keys_in("serving").await.is_empty());
    assert!(h.store.keys_in("archive").await.is_empty());
    assert!(h.store.keys_in("staging").await.is_empty());
}

#[tokio::test]
async fn undecodable_image_fails_enrichment_into_dead_letter() {
    // Extraction "succeeds" but the pixel hash cannot decode the bytes.
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/garbled.jpg",
            Bytes::from_static(b"garbage bytes"),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/garbled.jpg")])
        .await
        .unwrap();

    assert!(matches!(
        &outcomes[0],
        RecordOutcome::Quarantined { dead_letter_key } if dead_letter_key == "ENRICHMENT_FAILED/garbled.jpg"
    ));
    assert_eq!(h.catalog.call_count(), 0);
    assert!(h.store.keys_in("staging").await.is_empty());
}

#[tokio::test]
async fn unsupported_file_is_rejected_but_cleaned_up() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    h.store
        .seed(
            "staging",
            "cam1/notes.txt",
            Bytes::from_static(b"field notes"),
            "text/plain",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/notes.txt")])
        .await
        .unwrap();

    assert!(matches!(&outcomes[0], RecordOutcome::Rejected));
    assert_eq!(h.catalog.call_count(), 0);
    assert!(h.store.keys_in("staging").await.is_empty());
    assert!(h.store.keys_in("dead-letter").await.is_empty());
}

#[tokio::test]
async fn identical_pixels_overwrite_the_same_serving_keys() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );

    // Byte-different containers, identical pixel data. Both carry an image
    // extension so they take the image path; decoding goes by content.
    h.store
        .seed(
            "staging",
            "cam1/a.png",
            Bytes::from(encode_test_image(ImageFormat::Png)),
            "image/png",
        )
        .await;
    h.store
        .seed(
            "staging",
            "cam1/b.png",
            Bytes::from(encode_test_image(ImageFormat::Bmp)),
            "image/png",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/a.png"), event("cam1/b.png")])
        .await
        .unwrap();

    let hashes: Vec<&String> = outcomes
        .iter()
        .map(|o| match o {
            RecordOutcome::Ingested { content_hash, .. } => content_hash,
            other => panic!("expected Ingested, got {:?}", other),
        })
        .collect();
    assert_eq!(hashes[0], hashes[1]);

    // Second ingestion overwrote the same three serving keys.
    assert_eq!(h.store.keys_in("serving").await.len(), 3);
    // Archive keeps both provenance copies.
    assert_eq!(h.store.keys_in("archive").await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pathological_record_hits_the_per_record_timeout() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Delay(Duration::from_secs(10))),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(1),
    );
    h.store
        .seed(
            "staging",
            "cam1/slow.jpg",
            Bytes::from(encode_test_image(ImageFormat::Jpeg)),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/slow.jpg")])
        .await
        .unwrap();

    assert!(matches!(
        &outcomes[0],
        RecordOutcome::Failed { stage: "timeout", .. }
    ));
    // Cleanup still ran.
    assert!(h.store.keys_in("staging").await.is_empty());
}

#[tokio::test]
async fn one_bad_record_does_not_abort_its_siblings() {
    let h = harness(
        FakeExtractor::new(ExtractorMode::Tags(base_tags())),
        FakeCatalog::new(CatalogMode::Succeed),
        test_config(300),
    );
    // First record's object is missing entirely; second is fine.
    h.store
        .seed(
            "staging",
            "cam1/ok.jpg",
            Bytes::from(encode_test_image(ImageFormat::Jpeg)),
            "image/jpeg",
        )
        .await;

    let outcomes = h
        .pipeline
        .process_batch(vec![event("cam1/gone.jpg"), event("cam1/ok.jpg")])
        .await
        .unwrap();

    assert!(matches!(
        &outcomes[0],
        RecordOutcome::Failed { stage: "fetch", .. }
    ));
    assert!(matches!(&outcomes[1], RecordOutcome::Ingested { .. }));
    assert_eq!(h.catalog.call_count(), 1);
}
