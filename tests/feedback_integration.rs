//! End-to-end tests for feedback: rank-score deltas, audit logging, and
//! response-cache invalidation.

use std::sync::Arc;

use tempfile::TempDir;

use collegium::cache::MemoryStore;
use collegium::config::Config;
use collegium::error::CollegiumError;
use collegium::feedback::FeedbackAction;
use collegium::pipeline::response::ApiResponse;
use collegium::pipeline::{ChatRequest, ClientInfo, FeedbackPayload, SearchPipeline};
use collegium::storage::{Database, NewQa, NewRecord, NewTenant};

struct Fixture {
    _dir: TempDir,
    db: Arc<Database>,
    pipeline: SearchPipeline,
    qa_id: i64,
}

fn fixture(config: Config) -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("test.db")).unwrap();

    db.insert_tenant(&NewTenant {
        id: "abc".into(),
        name: "ABC College".into(),
        contact_email: None,
        contact_phone: None,
        auth_token: "tok-abc".into(),
        is_active: true,
    })
    .unwrap();

    db.insert_record(&NewRecord {
        tenant_id: "abc".into(),
        data_type: "COURSES".into(),
        title: None,
        payload: None,
        search_text: "placement statistics and recruiters".into(),
        keywords: None,
        status: "PUBLISHED".into(),
    })
    .unwrap();

    let qa_id = db
        .insert_qa(&NewQa {
            tenant_id: "abc".into(),
            question: "What are the hostel fees?".into(),
            answer: "See the fee schedule on the website.".into(),
            tags: vec!["hostel".into()],
            rank_score: 0.0,
        })
        .unwrap();

    let db = Arc::new(db);
    let pipeline = SearchPipeline::new(db.clone(), Arc::new(MemoryStore::new()), config);
    Fixture {
        _dir: dir,
        db,
        pipeline,
        qa_id,
    }
}

fn feedback_request(target_id: i64, action: FeedbackAction, query: &str) -> ChatRequest {
    ChatRequest {
        token: "tok-abc".into(),
        query: query.into(),
        limit: None,
        feedback: Some(FeedbackPayload { target_id, action }),
        client: ClientInfo {
            ip: "1.2.3.4".into(),
            user_agent: Some("test-agent".into()),
        },
    }
}

fn score(fx: &Fixture) -> f64 {
    fx.db.qa_rank_score("abc", fx.qa_id).unwrap().unwrap()
}

#[test]
fn deltas_accumulate_per_action() {
    let fx = fixture(Config::default());

    for _ in 0..3 {
        fx.pipeline
            .handle(&feedback_request(fx.qa_id, FeedbackAction::Click, ""))
            .unwrap();
    }
    assert!((score(&fx) - 1.5).abs() < 1e-9);

    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Upvote, ""))
        .unwrap();
    assert!((score(&fx) - 3.0).abs() < 1e-9);

    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Downvote, ""))
        .unwrap();
    assert!((score(&fx) - 2.0).abs() < 1e-9);
}

#[test]
fn feedback_acknowledgement_shape() {
    let fx = fixture(Config::default());

    let response = fx
        .pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Upvote, "hostel fees"))
        .unwrap();

    match response {
        ApiResponse::Feedback(body) => {
            assert_eq!(body.status, "ok");
            assert_eq!(body.target_id, fx.qa_id);
            assert_eq!(body.action, "upvote");
        }
        other => panic!("expected feedback response, got {other:?}"),
    }
}

#[test]
fn unknown_target_is_bad_input() {
    let fx = fixture(Config::default());

    let err = fx
        .pipeline
        .handle(&feedback_request(99_999, FeedbackAction::Click, ""))
        .unwrap_err();
    assert!(matches!(err, CollegiumError::BadInput(_)));

    let err = fx
        .pipeline
        .handle(&feedback_request(-1, FeedbackAction::Click, ""))
        .unwrap_err();
    assert!(matches!(err, CollegiumError::BadInput(_)));

    // Nothing changed and nothing was logged for the bad targets.
    assert_eq!(score(&fx), 0.0);
}

#[test]
fn interactions_are_logged() {
    let fx = fixture(Config::default());

    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Click, "hostel"))
        .unwrap();
    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Downvote, "hostel"))
        .unwrap();

    assert_eq!(fx.db.stats().unwrap().log_count, 2);
}

#[test]
fn rank_score_clamp_from_config() {
    let mut config = Config::default();
    config.ranking.rank_score_min = Some(-1.0);
    config.ranking.rank_score_max = Some(1.0);
    let fx = fixture(config);

    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Upvote, ""))
        .unwrap();
    assert!((score(&fx) - 1.0).abs() < 1e-9);

    for _ in 0..5 {
        fx.pipeline
            .handle(&feedback_request(fx.qa_id, FeedbackAction::Downvote, ""))
            .unwrap();
    }
    assert!((score(&fx) + 1.0).abs() < 1e-9);
}

#[test]
fn feedback_invalidates_cached_response() {
    let fx = fixture(Config::default());

    let search = ChatRequest {
        token: "tok-abc".into(),
        query: "placement".into(),
        limit: None,
        feedback: None,
        client: ClientInfo::default(),
    };

    let first = match fx.pipeline.handle(&search).unwrap() {
        ApiResponse::Search(body) => *body,
        other => panic!("expected search response, got {other:?}"),
    };
    assert_eq!(first.results_count, 1);

    // New record would be invisible while the response stays cached.
    fx.db
        .insert_record(&NewRecord {
            tenant_id: "abc".into(),
            data_type: "COURSES".into(),
            title: None,
            payload: None,
            search_text: "placement drive schedule".into(),
            keywords: None,
            status: "PUBLISHED".into(),
        })
        .unwrap();

    // Feedback for the same (query, limit) drops the cached entry.
    fx.pipeline
        .handle(&feedback_request(fx.qa_id, FeedbackAction::Click, "placement"))
        .unwrap();

    let second = match fx.pipeline.handle(&search).unwrap() {
        ApiResponse::Search(body) => *body,
        other => panic!("expected search response, got {other:?}"),
    };
    assert_eq!(second.results_count, 2);
}
