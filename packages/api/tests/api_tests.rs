//! Router tests: predict envelope contract and the student store
//!
//! Uses an in-memory SQLite database, a local image host and a stub classifier.
//!
//! Run: cargo test --package lens-api --test api_tests

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lens_api::{
    construct_router,
    repository::StudentRepository,
    sea_orm::{ConnectOptions, Database},
    state::State,
};
use lens_inference::{
    Classifier, InferenceError, LabelTable, Pipeline, PreprocessedTensor, ProbabilityDistribution,
    decode::DecodeConfig,
    fetch::{FetchConfig, ImageFetcher},
};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Fixtures
// ============================================================================

struct FixedClassifier;

impl Classifier for FixedClassifier {
    fn num_classes(&self) -> usize {
        1000
    }

    fn infer(&self, _tensor: &PreprocessedTensor) -> Result<ProbabilityDistribution, InferenceError> {
        let logits: Vec<f32> = (0..1000).map(|i| ((i * 13) % 17) as f32).collect();
        ProbabilityDistribution::from_logits(&logits)
    }
}

async fn image_host() -> String {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 240, Rgb([30, 160, 90])))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode");
    let png = buf.into_inner();

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_fn(100, 1, |x, _| Rgb([(x * 2) as u8, 40, 200])))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode");
    let strip = buf.into_inner();

    let router = Router::new()
        .route(
            "/cat.png",
            get(move || {
                let png = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], png) }
            }),
        )
        .route(
            "/strip.png",
            get(move || {
                let strip = strip.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], strip) }
            }),
        )
        .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .route(
            "/paper.pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.7") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn app_with_labels(labels: usize) -> Router {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("sqlite");
    let students = StudentRepository::new(db);
    students.ensure_schema().await.expect("schema");

    let fetcher = ImageFetcher::new(&FetchConfig::default()).expect("fetcher");
    let labels = LabelTable::new((0..labels).map(|i| format!("label {i}")).collect());
    let pipeline = Pipeline::new(
        fetcher,
        DecodeConfig::default(),
        Arc::new(labels),
        Arc::new(FixedClassifier),
    );

    construct_router(Arc::new(State::new(Arc::new(pipeline), students)))
}

async fn app() -> Router {
    app_with_labels(1000).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

// ============================================================================
// Root and health
// ============================================================================

#[tokio::test]
async fn root_says_hello() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hello World"}));
}

#[tokio::test]
async fn health_probes_report_version() {
    let app = app().await;
    for (path, expected) in [
        ("/health/live", "healthy"),
        ("/health/ready", "ready"),
        ("/health/startup", "started"),
    ] {
        let (status, body) = send(&app, Method::GET, path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], expected);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}

#[tokio::test]
async fn unknown_route_is_a_404_envelope() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/classify", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "No route for /classify");
}

// ============================================================================
// Predict
// ============================================================================

#[tokio::test]
async fn predict_returns_five_ranked_results() {
    let app = app().await;
    let base = image_host().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"url": format!("{base}/cat.png")})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().expect("results array");
    assert_eq!(results.len(), 5);
    let probs: Vec<f64> = results
        .iter()
        .map(|r| r["probability"].as_f64().unwrap())
        .collect();
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(probs.windows(2).all(|w| w[0] >= w[1]));
    for r in results {
        let label = r["label"].as_str().unwrap();
        assert!(label.starts_with("label "));
        assert_eq!(r.as_object().unwrap().len(), 2, "only label and probability");
    }
}

#[tokio::test]
async fn predict_classifies_a_one_pixel_high_strip() {
    let app = app().await;
    let base = image_host().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"url": format!("{base}/strip.png")})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none(), "{body}");
    assert_eq!(body["results"].as_array().expect("results array").len(), 5);
}

#[tokio::test]
async fn predict_http_failure_is_a_200_envelope() {
    let app = app().await;
    let base = image_host().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"url": format!("{base}/gone")})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("404"), "{message}");
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn predict_pdf_names_the_content_type() {
    let app = app().await;
    let base = image_host().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"url": format!("{base}/paper.pdf")})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("Content-Type: application/pdf"), "{message}");
}

#[tokio::test]
async fn predict_is_idempotent() {
    let app = app().await;
    let base = image_host().await;
    let request = json!({"url": format!("{base}/cat.png")});

    let (_, first) = send(&app, Method::POST, "/predict", Some(request.clone())).await;
    let (_, second) = send(&app, Method::POST, "/predict", Some(request)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn predict_label_mismatch_is_not_a_200() {
    let app = app_with_labels(10).await;
    let base = image_host().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"url": format!("{base}/cat.png")})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "MISCONFIGURED");
    assert!(body["error"].as_str().unwrap().contains("label table"));
}

#[tokio::test]
async fn predict_requires_a_url_field() {
    let app = app().await;
    let (status, _) = send(&app, Method::POST, "/predict", Some(json!({"link": "x"}))).await;
    assert!(status.is_client_error());
}

// ============================================================================
// Students
// ============================================================================

#[tokio::test]
async fn create_and_fetch_student() {
    let app = app().await;
    let (status, created) = send(
        &app,
        Method::POST,
        "/students/",
        Some(json!({"name": "Alice", "student_id": 1001})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Alice");
    assert_eq!(created["student_id"], 1001);
    assert!(created["id"].is_number());

    let (status, fetched) = send(&app, Method::GET, "/students/1001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn missing_student_is_an_error_envelope() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/students/9999", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Student not found"}));
}

#[tokio::test]
async fn list_returns_students_in_creation_order() {
    let app = app().await;
    for (name, id) in [("Bob", 1003), ("Carol", 1004), ("Dave", 1005)] {
        send(
            &app,
            Method::POST,
            "/students",
            Some(json!({"name": name, "student_id": id})),
        )
        .await;
    }

    let (status, body) = send(&app, Method::GET, "/students", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob", "Carol", "Dave"]);
}

#[tokio::test]
async fn duplicate_student_id_conflicts() {
    let app = app().await;
    let student = json!({"name": "Erin", "student_id": 2001});
    send(&app, Method::POST, "/students", Some(student.clone())).await;

    let (status, body) = send(&app, Method::POST, "/students", Some(student)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn blank_name_is_a_bad_request() {
    let app = app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/students",
        Some(json!({"name": "   ", "student_id": 2002})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_student_changes_fields() {
    let app = app().await;
    send(
        &app,
        Method::POST,
        "/students",
        Some(json!({"name": "Frank", "student_id": 3001})),
    )
    .await;

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/students/3001",
        Some(json!({"name": "Franklin", "student_id": 3002})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Franklin");
    assert_eq!(updated["student_id"], 3002);

    let (_, old) = send(&app, Method::GET, "/students/3001", None).await;
    assert_eq!(old, json!({"error": "Student not found"}));
    let (_, new) = send(&app, Method::GET, "/students/3002", None).await;
    assert_eq!(new["name"], "Franklin");
}

#[tokio::test]
async fn update_onto_taken_student_id_conflicts() {
    let app = app().await;
    for (name, id) in [("Gina", 4001), ("Hank", 4002)] {
        send(
            &app,
            Method::POST,
            "/students",
            Some(json!({"name": name, "student_id": id})),
        )
        .await;
    }
    let (status, _) = send(
        &app,
        Method::PUT,
        "/students/4001",
        Some(json!({"name": "Gina", "student_id": 4002})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_missing_student_is_an_error_envelope() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::PUT,
        "/students/5001",
        Some(json!({"name": "Ivy", "student_id": 5001})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Student not found"}));
}

#[tokio::test]
async fn delete_student_removes_it() {
    let app = app().await;
    send(
        &app,
        Method::POST,
        "/students",
        Some(json!({"name": "Jack", "student_id": 6001})),
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, "/students/6001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Student deleted"}));

    let (_, again) = send(&app, Method::DELETE, "/students/6001", None).await;
    assert_eq!(again, json!({"error": "Student not found"}));
}
