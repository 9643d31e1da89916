use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use video_analyzer_client::error::MALFORMED_RESPONSE_MESSAGE;
use video_analyzer_client::infrastructure::{RawResponse, RequestContext, ResponseInterceptor};
use video_analyzer_client::workflow::PollOutcome;
use video_analyzer_client::{
    AnalysisSession, ApiError, CancellationToken, Config, FailureKind, HttpTransport, JobState,
    JobStatus, PollDriver, ProgressAnomaly, Role, StartError, VideoFile,
};

fn config_for(server: &MockServer) -> Config {
    Config {
        server_url: server.base_url(),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

fn session_for(server: &MockServer) -> AnalysisSession {
    AnalysisSession::from_config(&config_for(server)).unwrap()
}

fn video(name: &str) -> VideoFile {
    VideoFile::new(name, b"\x00\x00\x00\x18ftypmp42fake-video".to_vec())
}

fn upload_body(filename: &str, size: u64, role: &str) -> Value {
    json!({
        "success": true,
        "message": "视频上传成功",
        "filename": filename,
        "size": size,
        "preview_url": format!("/api/videos/{}.mp4", role)
    })
}

fn status_body(teacher: Option<(&str, u64)>, student: Option<(&str, u64)>) -> Value {
    let file = |f: Option<(&str, u64)>, role: &str| match f {
        Some((name, size)) => json!({
            "filename": name,
            "filepath": format!("uploads/{}.mp4", role),
            "size": size
        }),
        None => Value::Null,
    };
    json!({
        "teacher_uploaded": teacher.is_some(),
        "student_uploaded": student.is_some(),
        "can_analyze": teacher.is_some() && student.is_some(),
        "files": {
            "teacher": file(teacher, "teacher"),
            "student": file(student, "student")
        }
    })
}

fn progress_body(status: &str, progress: u32, step: &str) -> Value {
    json!({
        "status": status,
        "progress": progress,
        "current_step": step,
        "include_device_detection": true,
        "created_at": "",
        "error": null
    })
}

fn result_body() -> Value {
    json!({
        "analysis_time": "2024-06-01 10:00:00",
        "analysis_type": "实验步骤AI分析（老师示范 + 学生操作）",
        "videos_analyzed": {"teacher_video": "teacher.mp4", "student_video": "student.mp4"},
        "teacher_analysis": {
            "video_type": "老师示范",
            "total_steps_identified": 2,
            "analysis_summary": "LGS-7A精密干涉仪实验步骤 - 老师示范",
            "steps": [
                {"step_id": 1, "step_name": "打开激光器", "timestamp": 30, "time_str": "00:30",
                 "description": ["打开激光器电源"], "formatted_output": "步骤1"},
                {"step_id": 2, "step_name": "调节反射镜", "timestamp": 60, "time_str": "01:00",
                 "description": ["调节 M1 反射镜"], "formatted_output": "步骤2"}
            ]
        },
        "student_analysis": {
            "video_type": "学生操作",
            "total_steps_identified": 1,
            "analysis_summary": "LGS-7A精密干涉仪实验步骤 - 学生操作",
            "steps": [
                {"step_id": 1, "step_name": "打开激光器", "timestamp": 45, "time_str": "00:45",
                 "description": ["打开激光器电源"], "formatted_output": "步骤1", "confidence": 0.9}
            ]
        },
        "screenshot_explanations": {
            "teacher_step_01_t30s.png": {
                "type": "老师示范", "step_id": 1, "step_name": "打开激光器",
                "timestamp": 30, "time_str": "00:30", "description": ["打开激光器电源"],
                "explanation": "老师打开激光器"
            },
            "student_correct_01_t45s.png": {
                "type": "学生操作", "step_id": 1, "step_name": "打开激光器",
                "timestamp": 45, "time_str": "00:45", "description": ["打开激光器电源"],
                "explanation": "学生正确打开激光器", "confidence": 0.9
            }
        },
        "output_format_example": {"description": "示例", "format": "步骤 N: ..."},
        "device_detection": {"enabled": true, "detection_rate": 0.83, "components_detected": 5}
    })
}

async fn upload_both(server: &MockServer, session: &mut AnalysisSession) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/upload/teacher");
            then.status(200)
                .json_body(upload_body("demo_teacher.mp4", 2048, "teacher"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/upload/student");
            then.status(200)
                .json_body(upload_body("demo_student.mp4", 4096, "student"));
        })
        .await;

    let uploads = session.uploads_mut();
    uploads
        .upload_file(Role::Teacher, &video("demo_teacher.mp4"))
        .await
        .unwrap();
    uploads
        .upload_file(Role::Student, &video("demo_student.mp4"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_status_is_stable_across_reloads() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload/teacher")
                .header_exists("content-type");
            then.status(200)
                .json_body(upload_body("demo_teacher.mp4", 2048, "teacher"));
        })
        .await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/upload/status");
            then.status(200)
                .json_body(status_body(Some(("demo_teacher.mp4", 2048)), None));
        })
        .await;

    let slot = session
        .uploads_mut()
        .upload_file(Role::Teacher, &video("demo_teacher.mp4"))
        .await
        .unwrap();
    assert_eq!(slot.filename, "demo_teacher.mp4");
    assert_eq!(slot.size_bytes, 2048);
    assert_eq!(
        slot.preview_url,
        format!("{}/api/upload/videos/teacher", server.base_url())
    );
    upload.assert_async().await;

    // 模拟页面刷新：新会话只能从后端拿状态
    let mut reloaded = session_for(&server);
    for _ in 0..3 {
        let state = reloaded.uploads_mut().get_status().await.unwrap();
        let teacher = state.slot(Role::Teacher).unwrap();
        assert_eq!(teacher.filename, "demo_teacher.mp4");
        assert_eq!(teacher.size_bytes, 2048);
        assert!(state.student.is_none());
        assert!(!state.can_analyze());
    }
    status.assert_calls_async(3).await;
}

#[tokio::test]
async fn test_upload_failure_keeps_previous_slot_and_uses_server_detail() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    let mut ok = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/upload/student");
            then.status(200)
                .json_body(upload_body("first.mp4", 100, "student"));
        })
        .await;
    session
        .uploads_mut()
        .upload_file(Role::Student, &video("first.mp4"))
        .await
        .unwrap();
    ok.delete_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/upload/student");
            then.status(400)
                .json_body(json!({"detail": "Invalid file format"}));
        })
        .await;

    let failure = session
        .uploads_mut()
        .upload_file(Role::Student, &video("notes.txt"))
        .await
        .unwrap_err();

    assert_eq!(failure.message, "Invalid file format");
    assert_eq!(failure.kind, FailureKind::Server { status: 400 });

    let state = session.uploads().state();
    assert_eq!(state.slot(Role::Student).unwrap().filename, "first.mp4");
    assert!(state.teacher.is_none());
}

#[tokio::test]
async fn test_server_error_without_detail_uses_status_message() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/upload/status");
            then.status(500).body("Internal Server Error");
        })
        .await;

    let failure = session.uploads_mut().get_status().await.unwrap_err();
    assert_eq!(failure.message, "Request failed with status code 500");
    assert_eq!(failure.status(), Some(500));
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    upload_both(&server, &mut session).await;
    assert!(session.uploads().can_analyze());

    let start = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/analysis/start")
                .query_param("include_device_detection", "true");
            then.status(200).json_body(json!({
                "success": true,
                "analysis_id": "job-123",
                "message": "分析已开始，请查询进度"
            }));
        })
        .await;

    let job_id = session.start(true).await.unwrap();
    start.assert_async().await;
    assert_eq!(job_id, "job-123");
    match session.jobs().state() {
        JobState::Running(job) => {
            assert_eq!(job.id, "job-123");
            assert_eq!(job.progress_percent, 0);
        }
        other => panic!("expected running, got {:?}", other),
    }

    let steps = [
        ("running", 10, "分析老师示范视频..."),
        ("running", 45, "分析学生实验视频..."),
        ("completed", 100, "分析完成!"),
    ];
    let mut observed = Vec::new();
    for (status, progress, step) in steps {
        let mut mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/analysis/progress/job-123");
                then.status(200)
                    .json_body(progress_body(status, progress, step));
            })
            .await;
        let job = session.jobs_mut().poll_progress("job-123").await.unwrap();
        observed.push((job.status, job.progress_percent));
        mock.delete_async().await;
    }

    assert_eq!(
        observed,
        vec![
            (JobStatus::Running, 10),
            (JobStatus::Running, 45),
            (JobStatus::Completed, 100)
        ]
    );
    let completed = match session.jobs().state() {
        JobState::Completed(job) => job.clone(),
        other => panic!("expected completed, got {:?}", other),
    };
    assert!(completed.created_at.is_none());

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/results/job-123");
            then.status(200).json_body(result_body());
        })
        .await;

    let result = session
        .results()
        .get_completed_result(&completed)
        .await
        .unwrap();

    // 学生步骤一定有置信度，老师步骤一定没有
    let body = result_body();
    let raw_student = body["student_analysis"]["steps"].as_array().unwrap();
    assert_eq!(raw_student.len(), result.student_analysis.steps.len());
    for (raw, step) in raw_student.iter().zip(&result.student_analysis.steps) {
        assert_eq!(raw["confidence"].as_f64(), Some(step.confidence));
        assert!(step.confidence > 0.0 && step.confidence <= 1.0);
    }
    let raw_teacher = body["teacher_analysis"]["steps"].as_array().unwrap();
    assert_eq!(raw_teacher.len(), result.teacher_analysis.steps.len());
    for raw in raw_teacher {
        assert!(raw.get("confidence").is_none());
    }
    assert_eq!(result.teacher_analysis.steps.len(), 2);
    assert_eq!(result.student_analysis.steps[0].step.step_name, "打开激光器");
    assert_eq!(result.device_detection.as_ref().unwrap().components_detected, 5);
    assert!(!result.is_degraded());

    let shots = session.results().screenshots(&result);
    assert_eq!(shots.len(), 2);
    assert_eq!(shots[0].filename, "student_correct_01_t45s.png");
    assert_eq!(
        shots[0].url,
        format!(
            "{}/api/analysis/screenshots/student_correct_01_t45s.png",
            server.base_url()
        )
    );
    assert_eq!(shots[1].explanation.confidence, None);
}

#[tokio::test]
async fn test_terminal_state_is_not_overwritten() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);
    upload_both(&server, &mut session).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "job-9", "message": ""}));
        })
        .await;
    session.start(true).await.unwrap();

    let mut failed = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-9");
            then.status(200).json_body(json!({
                "status": "error",
                "progress": 30,
                "current_step": "分析失败: 视频解码失败",
                "include_device_detection": true,
                "created_at": "",
                "error": "视频解码失败"
            }));
        })
        .await;

    let first = session.jobs_mut().poll_progress("job-9").await.unwrap();
    let second = session.jobs_mut().poll_progress("job-9").await.unwrap();
    assert_eq!(first.status, JobStatus::Error);
    assert_eq!(first.error_message.as_deref(), Some("视频解码失败"));
    assert_eq!(first.status, second.status);
    assert_eq!(first.error_message, second.error_message);
    failed.delete_async().await;

    // 服务端翻转回 running，客户端跟踪的快照保持终态
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-9");
            then.status(200)
                .json_body(progress_body("running", 40, "分析学生实验视频..."));
        })
        .await;
    let flapped = session.jobs_mut().poll_progress("job-9").await.unwrap();
    assert_eq!(flapped.status, JobStatus::Running);

    let tracked = session.jobs().tracked_job().unwrap();
    assert_eq!(tracked.status, JobStatus::Error);
    assert!(matches!(
        session.jobs().anomalies(),
        [ProgressAnomaly::LeftTerminal { .. }]
    ));
    assert_eq!(tracked.error_message.as_deref(), Some("视频解码失败"));
}

#[tokio::test]
async fn test_progress_regression_on_direct_polls_is_reported() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "job-1", "message": ""}));
        })
        .await;
    let jobs = session.jobs_mut();
    jobs.start(true).await.unwrap();

    for progress in [40, 30] {
        let mut mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/analysis/progress/job-1");
                then.status(200)
                    .json_body(progress_body("running", progress, "分析学生实验视频..."));
            })
            .await;
        let job = jobs.poll_progress("job-1").await.unwrap();
        assert_eq!(job.progress_percent, progress as u8);
        mock.delete_async().await;
    }

    // 倒退的快照照常接受，但会留下诊断
    assert_eq!(jobs.tracked_job().unwrap().progress_percent, 30);
    assert_eq!(
        jobs.anomalies(),
        &[ProgressAnomaly::Regressed {
            job_id: "job-1".to_string(),
            previous: 40,
            current: 30,
        }]
    );

    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/analysis/clear");
            then.status(200)
                .json_body(json!({"success": true, "message": "所有分析记录已清空"}));
        })
        .await;
    jobs.clear().await.unwrap();
    assert!(jobs.anomalies().is_empty());
}

#[tokio::test]
async fn test_poll_driver_with_job_client_stops_at_terminal() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    let progress = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-7");
            then.status(200)
                .json_body(progress_body("completed", 100, "分析完成!"));
        })
        .await;

    let report = PollDriver::new(Duration::from_millis(5))
        .run(
            session.jobs_mut(),
            "job-7",
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(report.attempts, 1);
    assert!(matches!(report.outcome, PollOutcome::Completed(_)));
    progress.assert_async().await;
}

#[tokio::test]
async fn test_clear_resets_state() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);
    upload_both(&server, &mut session).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "job-123", "message": ""}));
        })
        .await;
    session.start(true).await.unwrap();

    let clear = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/analysis/clear");
            then.status(200)
                .json_body(json!({"success": true, "message": "所有分析记录已清空"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/upload/status");
            then.status(200).json_body(status_body(None, None));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-123");
            then.status(404).json_body(json!({"detail": "分析任务不存在"}));
        })
        .await;

    assert_ok!(session.clear().await);
    clear.assert_async().await;
    assert_eq!(session.jobs().state(), JobState::Idle);
    assert!(!session.uploads().can_analyze());

    let state = session.uploads_mut().get_status().await.unwrap();
    assert!(state.teacher.is_none() && state.student.is_none());
    assert!(!state.can_analyze());

    let failure = assert_err!(session.jobs_mut().poll_progress("job-123").await);
    assert!(failure.is_server_error());
    assert_eq!(failure.status(), Some(404));
    assert_eq!(failure.message, "分析任务不存在");
}

#[tokio::test]
async fn test_start_requires_both_uploads() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    let start = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "x", "message": ""}));
        })
        .await;

    let err = session.start(true).await.unwrap_err();
    assert_eq!(
        err,
        StartError::NotReady {
            missing: vec![Role::Teacher, Role::Student]
        }
    );
    start.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_restart_orphans_previous_job_and_guard_rejects() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    let mut first = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/analysis/start")
                .query_param("include_device_detection", "false");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "job-a", "message": ""}));
        })
        .await;
    let jobs = session.jobs_mut();
    assert_eq!(jobs.start(false).await.unwrap(), "job-a");
    assert!(!jobs.tracked_job().unwrap().include_device_detection);
    first.delete_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(200)
                .json_body(json!({"success": true, "analysis_id": "job-b", "message": ""}));
        })
        .await;

    let err = jobs.start_guarded(true).await.unwrap_err();
    assert_eq!(
        err,
        StartError::AlreadyRunning {
            job_id: "job-a".to_string()
        }
    );
    assert_eq!(jobs.tracked_id(), Some("job-a"));

    assert_eq!(jobs.start(true).await.unwrap(), "job-b");
    assert_eq!(jobs.tracked_id(), Some("job-b"));
}

#[tokio::test]
async fn test_start_rejected_by_backend() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/analysis/start");
            then.status(400)
                .json_body(json!({"detail": "请先上传老师示范视频和学生实验视频"}));
        })
        .await;

    let failure = session.jobs_mut().start(true).await.unwrap_err();
    assert_eq!(failure.message, "请先上传老师示范视频和学生实验视频");
    assert_eq!(session.jobs().state(), JobState::Idle);
}

#[tokio::test]
async fn test_malformed_success_body_is_protocol_error() {
    let server = MockServer::start_async().await;
    let mut session = session_for(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-1");
            then.status(200).json_body(json!({"state": "done"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/job-2");
            then.status(200)
                .json_body(progress_body("running", 250, "???"));
        })
        .await;

    let missing = session.jobs_mut().poll_progress("job-1").await.unwrap_err();
    assert_eq!(missing.kind, FailureKind::Protocol);
    assert_eq!(missing.message, MALFORMED_RESPONSE_MESSAGE);

    let out_of_range = session.jobs_mut().poll_progress("job-2").await.unwrap_err();
    assert_eq!(out_of_range.kind, FailureKind::Protocol);
    assert_eq!(out_of_range.message, MALFORMED_RESPONSE_MESSAGE);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let config = Config {
        server_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 2,
        ..Config::default()
    };
    let mut session = AnalysisSession::from_config(&config).unwrap();

    let failure = session.uploads_mut().get_status().await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(!failure.message.is_empty());
}

#[tokio::test]
async fn test_list_report_and_system_endpoints() {
    let server = MockServer::start_async().await;
    let session = session_for(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/list");
            then.status(200)
                .json_body(json!({"analyses": ["job-1", "job-2"], "count": 2}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/reports/experiment_steps_analysis.json");
            then.status(200).json_body(json!({"analysis_time": "2024-06-01"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(json!({"status": "healthy"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "message": "迈克尔逊干涉实验 AI 分析系统 API",
                "version": "1.0.0",
                "docs": "/docs"
            }));
        })
        .await;

    let list = session.jobs().list().await.unwrap();
    assert_eq!(list.count, 2);
    assert_eq!(list.analyses, vec!["job-1", "job-2"]);

    let report = session
        .results()
        .get_report("experiment_steps_analysis.json")
        .await
        .unwrap();
    assert_eq!(report["analysis_time"], "2024-06-01");

    assert!(session.health().await.unwrap().is_healthy());
    assert_eq!(session.service_info().await.unwrap().version, "1.0.0");
}

/// 记录经过拦截点的结果
#[derive(Clone, Default)]
struct RecordingInterceptor {
    seen: Arc<Mutex<Vec<(String, Option<ApiError>)>>>,
}

impl ResponseInterceptor for RecordingInterceptor {
    fn intercept(
        &self,
        ctx: &RequestContext,
        result: Result<RawResponse, ApiError>,
    ) -> Result<RawResponse, ApiError> {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.url.clone(), result.as_ref().err().cloned()));
        result
    }
}

#[tokio::test]
async fn test_interceptor_sees_failures_unchanged() {
    let server = MockServer::start_async().await;
    let interceptor = RecordingInterceptor::default();
    let transport = HttpTransport::new(&config_for(&server))
        .unwrap()
        .with_interceptor(interceptor.clone());
    let mut session = AnalysisSession::new(transport);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/analysis/progress/gone");
            then.status(404).json_body(json!({"detail": "分析任务不存在"}));
        })
        .await;

    let failure = session.jobs_mut().poll_progress("gone").await.unwrap_err();
    assert_eq!(failure.message, "分析任务不存在");

    let seen = interceptor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].0,
        format!("{}/api/analysis/progress/gone", server.base_url())
    );
    assert_eq!(
        seen[0].1,
        Some(ApiError::Server {
            endpoint: "/analysis/progress/gone".to_string(),
            status: 404,
            detail: Some("分析任务不存在".to_string()),
            message: "Request failed with status code 404".to_string(),
        })
    );
}
