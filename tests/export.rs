//! PDF export with images fetched over real HTTP.

mod common;

use pretty_assertions::assert_eq;
use storyweaver::api::StoryApi;
use storyweaver::export::{export_story, layout_story};
use storyweaver::images::HttpImageSource;
use storyweaver::models::{Scene, Story};

fn story(image_urls: &[&str]) -> Story {
    Story {
        title: "The Enchanted Library".into(),
        genre: "fantasy-art".into(),
        tone: "mysterious".into(),
        target_audience: "children".into(),
        scenes: image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| Scene {
                id: format!("s{}", i + 1),
                title: format!("Scene {}", i + 1),
                content: format!("Chapter {} of the library.", i + 1),
                image_url: Some(url.to_string()),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn unreachable_images_are_left_out() {
    let dead = common::dead_url().await;
    let images = HttpImageSource::new(&StoryApi::new(dead.clone()));
    let story = story(&["/static/one.png", &format!("{dead}/static/two.png")]);

    let document = layout_story(&story, &images).await;
    assert_eq!(document.image_count(), 0);
    let text: Vec<_> = document.pages.iter().flat_map(|p| p.text_lines()).collect();
    assert!(text.contains(&"Chapter 1 of the library."));
    assert!(text.contains(&"Chapter 2 of the library."));

    let exported = export_story(&story, &images).await.unwrap();
    assert_eq!(exported.filename, "The_Enchanted_Library.pdf");
    assert!(exported.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn backend_images_are_embedded() {
    let (url, _backend) = common::spawn_backend().await;
    let images = HttpImageSource::new(&StoryApi::new(url));
    let story = story(&["/static/one.png", "/static/two.png"]);

    let document = layout_story(&story, &images).await;

    assert_eq!(document.image_count(), 2);
    let first = document.pages[0].images().next().unwrap();
    assert_eq!((first.image.width, first.image.height), (8, 8));
}
