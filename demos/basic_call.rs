//! Basic example demonstrating GET and POST requests with hooks.
//!
//! This example shows how to:
//! - Configure settings with a before-send and an exception hook
//! - Make GET requests that decode JSON
//! - Make POST requests with a JSON body
//! - Inspect the structured result of a failed call
//!
//! Run with: `cargo run --example basic_call`

use httpcall::{Error, Settings};
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("httpcall=debug,basic_call=info")
        .init();

    let settings = Arc::new(
        Settings::builder()
            .user_agent("httpcall-demo/1.0")
            .default_timeout(Duration::from_secs(10))?
            .on_before_send(|req| {
                req.headers_mut()
                    .insert("x-request-source", HeaderValue::from_static("basic_call"));
            })
            .on_exception(|args| {
                eprintln!("Exception hook: {} -> {}", args.request.uri(), args.error);
            })
            .build(),
    );
    let base = "https://jsonplaceholder.typicode.com";

    println!("=== GET Request Example ===");
    let result = httpcall::request_with(format!("{}/posts/1", base), settings.clone())?
        .expect_json::<Post>()
        .get()
        .await;

    if let Some(post) = &result.data {
        println!("Post ID: {}", post.id);
        println!("Title: {}", post.title);
    }
    println!("Status: {:?}", result.status);
    println!("Latency: {:?}", result.latency);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let result = httpcall::request_with(format!("{}/posts", base), settings.clone())?
        .send_json(&new_post)?
        .expect_json::<Post>()
        .post()
        .await;

    match result.into_result() {
        Ok(Some(post)) => println!("Created post ID: {}", post.id),
        Ok(None) => println!("Created, no body"),
        Err(e) => println!("Create failed: {}", e),
    }
    println!();

    println!("=== Expected Failure Example ===");
    let result = httpcall::request_with(format!("{}/posts/999999", base), settings)?
        .without_logging([StatusCode::NOT_FOUND])
        .expect_json::<Post>()
        .get()
        .await;

    println!("Success: {}", result.success);
    println!("Status: {:?}", result.status);
    if let Some(error) = &result.error {
        println!("Error: {}", error);
        println!("Raw response: {:?}", error.raw_response());
    }

    Ok(())
}
