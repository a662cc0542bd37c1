use std::io::Write;

use tempfile::{tempdir, NamedTempFile};

use traffyx::detect::{MotionBackend, ReplayBackend};
use traffyx::metrics::{read_jsonl, MetricsSummary};
use traffyx::{
    run_video, CancelToken, ContractViolation, FileSource, InMemoryMetricsSink, PipelineConfig,
    PipelineError, PipelineRunner, RunState,
};

fn quiet_config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.performance.measure_memory = false;
    cfg
}

fn replay_file(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".jsonl")
        .tempfile()
        .expect("temp replay");
    for line in lines {
        writeln!(file, "{}", line).expect("write replay");
    }
    file.flush().expect("flush replay");
    file
}

#[test]
fn synthetic_stream_with_motion_detector_drains() {
    let source = FileSource::open("stub://road?frames=12&width=96&height=72").unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let report = PipelineRunner::new(&quiet_config(), MotionBackend::new(0.3), &mut sink)
        .run(source)
        .unwrap();

    assert_eq!(report.final_state, RunState::Drained);
    assert_eq!(report.frames_seen, 12);
    assert_eq!(report.frames_processed, 12);
    assert_eq!(sink.records().len(), 12);

    // The square moves every frame, so one track follows it once motion appears.
    let last = sink.records()[11].as_processed().unwrap();
    assert_eq!(last.detections, 1);
    assert_eq!(last.tracks, 1);
}

#[test]
fn dropped_frames_emit_markers_and_advance_index() {
    let source = FileSource::open("stub://road?frames=10&width=64&height=48&drop_every=5").unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let report = PipelineRunner::new(&quiet_config(), MotionBackend::default(), &mut sink)
        .run(source)
        .unwrap();

    assert_eq!(report.frames_seen, 10);
    assert_eq!(report.frames_dropped, 2);
    assert_eq!(report.frames_processed, 8);

    let dropped: Vec<u64> = sink
        .records()
        .iter()
        .filter(|r| r.is_dropped())
        .map(|r| r.frame())
        .collect();
    assert_eq!(dropped, vec![4, 9]);
    let frames: Vec<u64> = sink.records().iter().map(|r| r.frame()).collect();
    assert_eq!(frames, (0..10).collect::<Vec<_>>());
}

#[test]
fn replayed_detections_keep_identity_across_frames() {
    let replay = replay_file(&[
        r#"[{"bbox":[10,10,50,50],"confidence":0.9,"class_id":2,"class_name":"car"},{"bbox":[100,100,150,150],"confidence":0.8,"class_id":0,"class_name":"person"}]"#,
        r#"[{"bbox":[12,12,52,52],"confidence":0.9,"class_id":2,"class_name":"car"}]"#,
        r#"[]"#,
    ]);
    let source = FileSource::open("stub://road?frames=3&width=32&height=32").unwrap();
    let detector = ReplayBackend::open(replay.path(), 0.5).unwrap();
    let mut sink = InMemoryMetricsSink::new();
    PipelineRunner::new(&quiet_config(), detector, &mut sink)
        .run(source)
        .unwrap();

    let counts: Vec<(usize, usize)> = sink
        .records()
        .iter()
        .map(|r| {
            let m = r.as_processed().unwrap();
            (m.detections, m.tracks)
        })
        .collect();
    // Unmatched tracks linger until they exceed max_age.
    assert_eq!(counts, vec![(2, 2), (1, 2), (0, 2)]);
}

#[test]
fn confidence_above_one_aborts_with_contract_violation() {
    let replay = replay_file(&[
        r#"[{"bbox":[0,0,10,10],"confidence":0.9,"class_id":0}]"#,
        r#"[{"bbox":[0,0,10,10],"confidence":1.5,"class_id":0}]"#,
    ]);
    let source = FileSource::open("stub://road?frames=5&width=32&height=32").unwrap();
    let detector = ReplayBackend::open(replay.path(), 0.5).unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let err = PipelineRunner::new(&quiet_config(), detector, &mut sink)
        .run(source)
        .unwrap_err();

    assert!(err.is_contract_violation());
    assert_eq!(err.frame_index(), Some(1));
    assert_eq!(sink.records().len(), 1);
    assert!(sink.is_closed());
}

#[test]
fn negative_confidence_aborts_with_contract_violation() {
    let replay = replay_file(&[r#"[{"bbox":[0,0,4,4],"confidence":-0.7,"class_id":0}]"#]);
    let source = FileSource::open("stub://road?frames=3&width=32&height=32").unwrap();
    let detector = ReplayBackend::open(replay.path(), 0.5).unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let err = PipelineRunner::new(&quiet_config(), detector, &mut sink)
        .run(source)
        .unwrap_err();

    assert!(err.is_contract_violation());
    assert_eq!(err.frame_index(), Some(0));
    assert!(sink.records().is_empty());
}

#[test]
fn three_coordinate_box_aborts_with_contract_violation() {
    let replay = replay_file(&[
        r#"[{"bbox":[0,0,4,4],"confidence":0.9,"class_id":0}]"#,
        r#"[{"bbox":[0,0,4],"confidence":0.9,"class_id":0}]"#,
    ]);
    let source = FileSource::open("stub://road?frames=3&width=32&height=32").unwrap();
    let detector = ReplayBackend::open(replay.path(), 0.5).unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let err = PipelineRunner::new(&quiet_config(), detector, &mut sink)
        .run(source)
        .unwrap_err();

    match err {
        PipelineError::ContractViolation {
            frame_index,
            violation: ContractViolation::MalformedBBox { index, bbox },
        } => {
            assert_eq!(frame_index, 1);
            assert_eq!(index, 0);
            assert_eq!(bbox, vec![0.0, 0.0, 4.0]);
        }
        other => panic!("expected malformed bbox violation, got {other}"),
    }
    assert_eq!(sink.records().len(), 1);
    assert!(sink.is_closed());
}

#[test]
fn cancelled_before_start_is_clean_interruption() {
    let source = FileSource::open("stub://road?frames=5").unwrap();
    let mut sink = InMemoryMetricsSink::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = PipelineRunner::new(&quiet_config(), MotionBackend::default(), &mut sink)
        .with_cancel(cancel)
        .run(source)
        .unwrap();

    assert_eq!(report.final_state, RunState::Interrupted);
    assert_eq!(report.frames_seen, 0);
    assert!(sink.records().is_empty());
    assert!(sink.is_closed());
}

#[test]
fn missing_video_is_source_unavailable_and_writes_no_log() {
    let dir = tempdir().unwrap();
    let mut cfg = quiet_config();
    cfg.device = "cpu".to_string();
    cfg.metrics.dir = dir.path().join("logs");

    let missing = dir.path().join("nope.mp4");
    let err = run_video(missing.to_str().unwrap(), &cfg, CancelToken::new()).unwrap_err();

    assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    assert!(!cfg.metrics.dir.exists());
}

#[test]
fn cuda_device_fails_at_init() {
    let dir = tempdir().unwrap();
    let mut cfg = quiet_config();
    cfg.device = "cuda".to_string();
    cfg.metrics.dir = dir.path().to_path_buf();

    let err = run_video("stub://road?frames=3", &cfg, CancelToken::new()).unwrap_err();
    assert!(matches!(err, PipelineError::DetectorInit(_)));
}

#[test]
fn full_run_writes_jsonl_log() {
    let dir = tempdir().unwrap();
    let mut cfg = PipelineConfig::default();
    cfg.device = "cpu".to_string();
    cfg.performance.log_every_n_frames = 2;
    cfg.metrics.path = Some(dir.path().join("metrics").join("run.jsonl"));

    let report = run_video(
        "stub://road?frames=6&width=64&height=48&drop_every=3",
        &cfg,
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.final_state, RunState::Drained);

    let records = read_jsonl(cfg.metrics_path()).unwrap();
    assert_eq!(records.len(), 6);
    assert!(records[2].is_dropped());

    let summary = MetricsSummary::from_records(&records);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.dropped, 2);
    assert!(summary.avg_fps > 0.0);
    if cfg!(target_os = "linux") {
        assert!(summary.peak_memory_mb.is_some());
    }
}
