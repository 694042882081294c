use std::collections::HashMap;
use std::sync::{Arc, Barrier};

use faceid_gallery::{
    Config, DirBackend, EmbeddingVector, ExtractError, Extractor, FaceService, GalleryError,
    KvBackend, MemoryBackend, Payload, Source,
};
use faceid_kv::MemoryStore;

/// Extractor backed by a lookup table of image bytes to vectors.
struct TableExtractor {
    table: HashMap<Vec<u8>, Result<Vec<f32>, ExtractError>>,
}

impl TableExtractor {
    fn new() -> Self {
        let mut table = HashMap::new();
        // Unit vectors in the xy-plane at a chosen cosine distance from [1, 0].
        for (name, d) in [("a", 0.2f64), ("b", 0.5), ("c", 0.8), ("probe", 0.0)] {
            let theta = (1.0 - d).acos();
            table.insert(
                name.as_bytes().to_vec(),
                Ok(vec![theta.cos() as f32, theta.sin() as f32, 0.0]),
            );
        }
        table.insert(b"other".to_vec(), Ok(vec![0.0, 0.0, 1.0]));
        table.insert(b"blank".to_vec(), Err(ExtractError::NoFaceDetected));
        table.insert(b"timeout".to_vec(), Err(ExtractError::Unavailable("timeout".into())));
        Self { table }
    }
}

impl Extractor for TableExtractor {
    fn extract(&self, image: &[u8]) -> Result<Vec<f32>, ExtractError> {
        self.table
            .get(image)
            .cloned()
            .unwrap_or(Err(ExtractError::NoFaceDetected))
    }

    fn dimension(&self) -> usize {
        3
    }
}

fn service() -> FaceService {
    FaceService::new(Config::new(3), Box::new(MemoryBackend), Arc::new(TableExtractor::new())).unwrap()
}

fn img(name: &str) -> Payload {
    Payload::Image(name.as_bytes().to_vec())
}

fn enroll_abc(svc: &FaceService) {
    for (who, image) in [("A", "a"), ("B", "b"), ("C", "c")] {
        svc.enroll(who, vec![Source::image(format!("{image}.jpg"), image.as_bytes().to_vec())])
            .unwrap();
    }
}

#[test]
fn verify_on_empty_gallery_is_no_match() {
    let svc = service();
    let res = svc.verify(&img("probe"), None).unwrap();
    assert!(!res.matched);
    assert!(res.identity.is_none());
}

#[test]
fn verify_picks_nearest_within_threshold() {
    let svc = service();
    enroll_abc(&svc);

    let res = svc.verify(&img("probe"), None).unwrap();
    assert!(res.matched);
    assert_eq!(res.identity.as_deref(), Some("A"));
    assert!((res.distance.unwrap() - 0.2).abs() < 1e-4);
    assert_eq!(res.source_ref.as_deref(), Some("a.jpg"));

    let res = svc.verify_with_threshold(&img("probe"), None, 0.1).unwrap();
    assert!(!res.matched);
}

#[test]
fn verify_scoped() {
    let svc = service();
    enroll_abc(&svc);

    let res = svc.verify(&img("probe"), Some("B")).unwrap();
    assert!(res.matched);
    assert_eq!(res.identity.as_deref(), Some("B"));

    let res = svc.verify(&img("probe"), Some("C")).unwrap();
    assert!(!res.matched);

    assert!(matches!(
        svc.verify(&img("probe"), Some("nobody")),
        Err(GalleryError::NotFound(_))
    ));
}

#[test]
fn verify_distinguishes_no_face_from_no_match() {
    let svc = service();
    enroll_abc(&svc);

    assert!(matches!(
        svc.verify(&img("blank"), None),
        Err(GalleryError::NoFaceDetected)
    ));
    assert!(matches!(
        svc.verify(&img("timeout"), None),
        Err(GalleryError::ExtractorUnavailable(_))
    ));
    let res = svc.verify(&img("other"), None).unwrap();
    assert!(!res.matched);
}

#[test]
fn verify_with_raw_vector() {
    let svc = service();
    enroll_abc(&svc);
    let probe = EmbeddingVector::new(vec![1.0, 0.0, 0.0]).unwrap();
    let res = svc.verify(&Payload::Vector(probe), None).unwrap();
    assert_eq!(res.identity.as_deref(), Some("A"));
}

#[test]
fn reenroll_replaces_records() {
    let svc = service();
    svc.enroll(
        "X",
        vec![
            Source::image("1.jpg", b"a".to_vec()),
            Source::image("2.jpg", b"b".to_vec()),
        ],
    )
    .unwrap();
    svc.enroll("X", vec![Source::image("3.jpg", b"c".to_vec())]).unwrap();

    let entry = svc.store().get("X").unwrap();
    let refs: Vec<&str> = entry.records().iter().map(|r| r.source_ref.as_str()).collect();
    assert_eq!(refs, vec!["3.jpg"]);

    // The old, closer records no longer match.
    let res = svc.verify(&img("probe"), Some("X")).unwrap();
    assert!(!res.matched);
}

#[test]
fn failed_enrollment_keeps_prior_state() {
    let svc = service();
    svc.enroll("X", vec![Source::image("1.jpg", b"a".to_vec())]).unwrap();

    let err = svc
        .enroll(
            "X",
            vec![
                Source::image("2.jpg", b"b".to_vec()),
                Source::image("3.jpg", b"blank".to_vec()),
            ],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GalleryError::ExtractionFailed { ref source_ref, .. } if source_ref == "3.jpg"
    ));

    let entry = svc.store().get("X").unwrap();
    assert_eq!(entry.len(), 1);
    assert_eq!(entry.records()[0].source_ref, "1.jpg");
}

#[test]
fn delete_then_get_is_not_found() {
    let svc = service();
    assert!(matches!(svc.delete_identity("X"), Err(GalleryError::NotFound(_))));

    svc.enroll(
        "X",
        vec![
            Source::image("1.jpg", b"a".to_vec()),
            Source::image("2.jpg", b"b".to_vec()),
        ],
    )
    .unwrap();
    assert_eq!(svc.delete_identity("X").unwrap(), 2);
    assert!(matches!(svc.store().get("X"), Err(GalleryError::NotFound(_))));
    assert!(svc.list_identities().is_empty());
}

#[test]
fn enroll_paths_like_folder_upload() {
    let svc = service();
    let receipt = svc
        .enroll_paths(vec![
            Source::image("face_data/timothy/image1.jpg", b"a".to_vec()),
            Source::image("face_data/timothy/image2.jpg", b"b".to_vec()),
        ])
        .unwrap();
    assert_eq!(receipt.identity, "timothy");
    assert_eq!(receipt.records, 2);
    assert_eq!(svc.list_identities(), vec!["timothy"]);

    assert!(svc
        .enroll_paths(vec![Source::image("image1.jpg", b"a".to_vec())])
        .unwrap_err()
        .is_invalid_input());
}

#[test]
fn search_lists_candidates() {
    let svc = service();
    enroll_abc(&svc);
    let hits = svc.search(&img("probe"), 0.6, 0).unwrap();
    let names: Vec<&str> = hits.iter().map(|c| c.identity.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn nearest_ignores_threshold() {
    let svc = service();
    assert!(svc.nearest(&img("probe"), None).unwrap().is_none());

    enroll_abc(&svc);
    assert!(!svc.verify_with_threshold(&img("probe"), None, 0.1).unwrap().matched);
    let c = svc.nearest(&img("probe"), None).unwrap().unwrap();
    assert_eq!(c.identity, "A");
    assert!((c.distance - 0.2).abs() < 1e-4);

    let c = svc.nearest(&img("probe"), Some("C")).unwrap().unwrap();
    assert_eq!(c.source_ref, "c.jpg");
    assert!((c.distance - 0.8).abs() < 1e-4);
    assert!(matches!(svc.nearest(&img("probe"), Some("Z")), Err(GalleryError::NotFound(_))));
}

#[test]
fn concurrent_enrollments_of_different_identities() {
    let svc = service();
    let barrier = Barrier::new(2);
    std::thread::scope(|s| {
        for (who, image) in [("left", "a"), ("right", "b")] {
            let svc = &svc;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                svc.enroll(who, vec![Source::image("1.jpg", image.as_bytes().to_vec())])
                    .unwrap();
            });
        }
    });
    assert_eq!(svc.list_identities(), vec!["left", "right"]);
}

#[test]
fn concurrent_verify_during_reenrollment() {
    let svc = service();
    enroll_abc(&svc);
    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..100 {
                let image = if i % 2 == 0 { "c" } else { "a" };
                svc.enroll("A", vec![Source::image("x.jpg", image.as_bytes().to_vec())])
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..100 {
                let res = svc.verify(&img("probe"), None).unwrap();
                // A is either at 0.2 or 0.8; B at 0.5 wins in the latter case.
                let who = res.identity.as_deref().unwrap();
                assert!(who == "A" || who == "B", "unexpected {who}");
            }
        });
    });
}

#[test]
fn persistent_backends_share_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<Box<dyn faceid_gallery::StoreBackend>> = vec![
        Box::new(KvBackend::new(Box::new(MemoryStore::new())).unwrap()),
        Box::new(DirBackend::open(dir.path()).unwrap()),
    ];
    for backend in backends {
        let svc = FaceService::new(Config::new(3), backend, Arc::new(TableExtractor::new())).unwrap();
        enroll_abc(&svc);
        svc.enroll("A", vec![Source::image("again.jpg", b"c".to_vec())]).unwrap();
        assert_eq!(svc.delete_identity("C").unwrap(), 1);
        assert_eq!(svc.list_identities(), vec!["A", "B"]);
        let res = svc.verify(&img("probe"), None).unwrap();
        assert_eq!(res.identity.as_deref(), Some("B"));
    }
}

#[test]
fn dir_backend_reopens_with_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let svc = FaceService::new(
            Config::new(3),
            Box::new(DirBackend::open(dir.path()).unwrap()),
            Arc::new(TableExtractor::new()),
        )
        .unwrap();
        enroll_abc(&svc);
    }
    let svc = FaceService::new(
        Config::new(3),
        Box::new(DirBackend::open(dir.path()).unwrap()),
        Arc::new(TableExtractor::new()),
    )
    .unwrap();
    assert_eq!(svc.list_identities(), vec!["A", "B", "C"]);
    assert_eq!(
        svc.verify(&img("probe"), None).unwrap().identity.as_deref(),
        Some("A")
    );
}

#[test]
fn service_rejects_mismatched_extractor() {
    let result = FaceService::new(Config::new(512), Box::new(MemoryBackend), Arc::new(TableExtractor::new()));
    assert!(matches!(
        result,
        Err(GalleryError::DimensionMismatch { expected: 512, got: 3 })
    ));
}
