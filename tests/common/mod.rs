//! In-process stand-in for the story generation backend.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::{ImageBuffer, ImageFormat, Rgb};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct Backend {
    pub hits: Arc<AtomicUsize>,
}

impl Backend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn png() -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(8, 8, Rgb([30, 160, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

pub fn public_stories() -> Value {
    json!([
        {
            "id": "1",
            "title": "The Enchanted Library",
            "genre": "fantasy-art",
            "tone": "adventurous",
            "targetAudience": "children",
            "initialPrompt": "A young wizard discovers a hidden library",
            "characters": [],
            "artStyle": "fantasy-art",
            "createdAt": "2025-09-07T15:51:09Z",
            "author": "Emma Chen",
            "currentSceneId": "s1",
            "scenes": [
                {
                    "id": "s1",
                    "title": "Scene 1",
                    "content": "The young wizard cautiously steps into a vast, mysterious library."
                },
                {
                    "id": "s2",
                    "title": "Scene 2",
                    "content": "A large, leather-bound book suddenly lifts into the air.",
                    "imageUrl": "/static/library_book.png"
                }
            ]
        },
        {
            "id": "2",
            "title": "Robot's First Day",
            "genre": "comic-book",
            "tone": "lighthearted",
            "targetAudience": "children",
            "author": "Alex Rodriguez",
            "currentSceneId": "s5",
            "scenes": [
                {
                    "id": "s5",
                    "title": "Scene 1",
                    "content": "The classroom door creaked open as a shiny, silver robot rolled inside."
                }
            ]
        }
    ])
}

async fn generate_story(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    Json(json!({
        "title": "AI Generated Story",
        "genre": body["genre"],
        "tone": body["tone"],
        "targetAudience": body["targetAudience"],
        "scenes": [
            {
                "id": "a",
                "title": "Scene 1",
                "content": format!("It began with {}.", body["prompt"].as_str().unwrap_or("")),
                "sceneType": "introduction",
                "imageUrl": null,
                "choices": [{"id": "c1", "text": "Continue adventure", "nextSceneId": "b"}]
            },
            {
                "id": "b",
                "title": "Scene 2",
                "content": "And it ended well.",
                "sceneType": "resolution",
                "imageUrl": null,
                "choices": [{"id": "c2", "text": "Take a rest", "nextSceneId": ""}]
            }
        ]
    }))
}

async fn generate_image(State(b): State<Backend>, Json(body): Json<Value>) -> Response {
    b.hit();
    if body["prompt"].as_str().unwrap_or("").is_empty() {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    Json(json!({"image_url": "/static/generated_1.png"})).into_response()
}

async fn regenerate_scene(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    let tone = body["tone"].as_str().unwrap_or("");
    let content = body["content"].as_str().unwrap_or("");
    Json(json!({
        "id": body["sceneId"],
        "content": format!("Rewritten in a {tone} tone: {content}")
    }))
}

async fn edit_scene(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    Json(json!({"id": body["sceneId"], "content": body["content"]}))
}

async fn regenerate_image(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    Json(json!({"id": body["sceneId"], "imageUrl": "/static/regenerated.png"}))
}

async fn save_story(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    Json(body)
}

async fn get_story(State(b): State<Backend>, Path(id): Path<String>) -> Response {
    b.hit();
    let stories = public_stories();
    match stories.as_array().and_then(|all| all.iter().find(|s| s["id"] == id.as_str())) {
        Some(story) => Json(story.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_public(State(b): State<Backend>) -> Json<Value> {
    b.hit();
    Json(public_stories())
}

async fn upscale(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    let image_url = body["imageUrl"].as_str().unwrap_or("");
    Json(json!({"upscaledImageUrl": format!("{image_url}?upscaled=1")}))
}

async fn narration(State(b): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    b.hit();
    let voice = body["voice"].as_str().unwrap_or("");
    Json(json!({"audioUrl": format!("https://audio.example/{voice}.mp3")}))
}

async fn static_image() -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png()).into_response()
}

pub fn backend_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/generate-story", post(generate_story))
        .route("/api/generate-image", post(generate_image))
        .route("/api/regenerate-scene", post(regenerate_scene))
        .route("/api/edit-scene", post(edit_scene))
        .route("/api/regenerate-image", post(regenerate_image))
        .route("/api/stories", post(save_story))
        .route("/api/stories/public", get(list_public))
        .route("/api/stories/:id", get(get_story))
        .route("/api/upscale-image", post(upscale))
        .route("/api/generate-narration", post(narration))
        .route("/static/:file", get(static_image))
        .with_state(backend)
}

/// A backend that answers 500 to everything.
pub fn broken_router() -> Router {
    Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR })
}

/// A backend whose story generation takes far longer than any test waits.
pub fn slow_router() -> Router {
    Router::new().route(
        "/api/generate-story",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT
        }),
    )
}

/// Serves `router` on an ephemeral port and returns its `/api` base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}/api")
}

pub async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let url = spawn(backend_router(backend.clone())).await;
    (url, backend)
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/api")
}
