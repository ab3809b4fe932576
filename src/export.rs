use crate::images::{preview, EmbeddedImage, ImageError, ImageSource};
use crate::models::Story;
use crate::pdf::{self, ExportError};
use crate::text::wrap_text;
use tracing::{info, warn};

// Layout units are PDF points on an A4 portrait page, measured from the top.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 40.0;

pub const TITLE_FONT_SIZE: f32 = 20.0;
pub const TITLE_ADVANCE: f32 = 30.0;
pub const META_FONT_SIZE: f32 = 12.0;
pub const META_LINE_HEIGHT: f32 = 20.0;
pub const META_TRAILING: f32 = 20.0;
pub const HEADING_FONT_SIZE: f32 = 16.0;
pub const HEADING_ADVANCE: f32 = 25.0;
pub const BODY_FONT_SIZE: f32 = 12.0;
pub const BODY_LINE_HEIGHT: f32 = 15.0;
pub const BODY_TRAILING: f32 = 10.0;
pub const IMAGE_HEIGHT: f32 = 200.0;
pub const IMAGE_PADDING: f32 = 20.0;
pub const SCENE_TRAILING: f32 = 20.0;

pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One or more lines of text. `y` is the baseline of the first line;
/// with [`Align::Center`] `x` is the horizontal center.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub align: Align,
}

/// An image force-fit into a `width` x `height` box whose top-left corner is (`x`, `y`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub source: String,
    pub image: EmbeddedImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().flat_map(|b| match b {
            Block::Text(t) => t.lines.iter().map(String::as_str).collect::<Vec<_>>(),
            Block::Image(_) => Vec::new(),
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(i) => Some(i),
            Block::Text(_) => None,
        })
    }
}

/// A laid-out story, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub title: String,
    pub pages: Vec<Page>,
}

impl ExportDocument {
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images().count()).sum()
    }
}

/// The finished download.
#[derive(Debug, Clone)]
pub struct ExportedStory {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `My  Story` -> `My_Story.pdf`: every whitespace run becomes one underscore.
pub fn export_filename(title: &str) -> String {
    let mut name = String::with_capacity(title.len() + 4);
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    name.push_str(".pdf");
    name
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self { pages: vec![Page::default()], y: MARGIN }
    }

    fn push(&mut self, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    fn text(&mut self, lines: Vec<String>, x: f32, font_size: f32, line_height: f32, align: Align) {
        let y = self.y;
        self.push(Block::Text(TextBlock { lines, x, y, font_size, line_height, align }));
    }

    fn line(&mut self, text: impl Into<String>, font_size: f32, advance: f32) {
        self.text(vec![text.into()], MARGIN, font_size, advance, Align::Left);
        self.y += advance;
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN;
    }
}

/// Lays out `story` page by page. Scenes are processed strictly in order and
/// each image is fetched before moving on; an image that cannot be fetched or
/// decoded is logged and left out.
pub async fn layout_story(story: &Story, images: &dyn ImageSource) -> ExportDocument {
    let mut cursor = Cursor::new();

    let title = vec![story.title.clone()];
    cursor.text(title, PAGE_WIDTH / 2.0, TITLE_FONT_SIZE, TITLE_ADVANCE, Align::Center);
    cursor.y += TITLE_ADVANCE;

    cursor.line(format!("Genre: {}", story.genre), META_FONT_SIZE, META_LINE_HEIGHT);
    cursor.line(format!("Tone: {}", story.tone), META_FONT_SIZE, META_LINE_HEIGHT);
    cursor.line(format!("Target Audience: {}", story.target_audience), META_FONT_SIZE, META_LINE_HEIGHT);
    cursor.y += META_TRAILING;

    for (index, scene) in story.scenes.iter().enumerate() {
        if index > 0 && cursor.y > PAGE_HEIGHT - MARGIN {
            cursor.new_page();
        }

        cursor.line(scene.title.clone(), HEADING_FONT_SIZE, HEADING_ADVANCE);

        let lines = wrap_text(&scene.content, BODY_FONT_SIZE, CONTENT_WIDTH);
        let line_count = lines.len() as f32;
        cursor.text(lines, MARGIN, BODY_FONT_SIZE, BODY_LINE_HEIGHT, Align::Left);
        cursor.y += line_count * BODY_LINE_HEIGHT + BODY_TRAILING;

        if let Some(url) = scene.image_url.as_deref().filter(|u| !u.is_empty()) {
            match fetch_embedded(images, url).await {
                Ok(image) => {
                    let y = cursor.y;
                    cursor.push(Block::Image(ImageBlock {
                        x: MARGIN,
                        y,
                        width: CONTENT_WIDTH,
                        height: IMAGE_HEIGHT,
                        source: url.to_string(),
                        image,
                    }));
                    cursor.y += IMAGE_HEIGHT + IMAGE_PADDING;
                }
                Err(e) => {
                    warn!("⚠️ Skipping image of scene '{}' ({}): {}", scene.title, preview(url), e)
                }
            }
        }

        cursor.y += SCENE_TRAILING;
    }

    ExportDocument { title: story.title.clone(), pages: cursor.pages }
}

async fn fetch_embedded(images: &dyn ImageSource, url: &str) -> Result<EmbeddedImage, ImageError> {
    let bytes = images.fetch(url).await?;
    EmbeddedImage::decode(&bytes)
}

/// Lays out and renders `story` to PDF bytes named after its title.
pub async fn export_story(
    story: &Story,
    images: &dyn ImageSource,
) -> Result<ExportedStory, ExportError> {
    if story.title.trim().is_empty() {
        return Err(ExportError::EmptyTitle);
    }
    let document = layout_story(story, images).await;
    let bytes = pdf::render(&document)?;
    let filename = export_filename(&story.title);
    info!(
        "📄 Exported '{}' as {} ({} pages, {} images, {} bytes)",
        story.title,
        filename,
        document.pages.len(),
        document.image_count(),
        bytes.len()
    );
    Ok(ExportedStory { filename, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scene;
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use pretty_assertions::assert_eq;
    use std::io::Cursor as IoCursor;

    /// Serves a tiny PNG for `ok://` URLs and fails everything else.
    struct FakeImages;

    #[async_trait]
    impl ImageSource for FakeImages {
        async fn fetch(&self, url: &str) -> Result<Bytes, ImageError> {
            if url.starts_with("ok://") {
                let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_pixel(4, 4, Rgb([0, 128, 255]));
                let mut out = IoCursor::new(Vec::new());
                img.write_to(&mut out, ImageFormat::Png).map_err(|e| ImageError::Decode(e.to_string()))?;
                Ok(Bytes::from(out.into_inner()))
            } else if url.starts_with("garbage://") {
                Ok(Bytes::from_static(b"definitely not a png"))
            } else {
                Err(ImageError::Http("connection refused".into()))
            }
        }
    }

    fn story(scenes: Vec<Scene>) -> Story {
        Story {
            title: "Test".into(),
            genre: "fantasy-art".into(),
            tone: "adventurous".into(),
            target_audience: "children".into(),
            scenes,
            ..Default::default()
        }
    }

    fn scene(n: usize, content: &str, image_url: Option<&str>) -> Scene {
        Scene {
            id: format!("s{n}"),
            title: format!("Scene {n}"),
            content: content.into(),
            image_url: image_url.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn zero_scenes_yield_title_and_metadata_only() {
        let doc = layout_story(&story(vec![]), &FakeImages).await;
        assert_eq!(doc.pages.len(), 1);
        let lines: Vec<_> = doc.pages[0].text_lines().collect();
        assert_eq!(
            lines,
            vec!["Test", "Genre: fantasy-art", "Tone: adventurous", "Target Audience: children"]
        );
        assert_eq!(doc.image_count(), 0);
    }

    #[tokio::test]
    async fn single_text_scene_lands_on_first_page() {
        let doc = layout_story(&story(vec![scene(1, "Once upon a time...", None)]), &FakeImages).await;
        assert_eq!(doc.pages.len(), 1);
        let lines: Vec<_> = doc.pages[0].text_lines().collect();
        assert_eq!(
            lines,
            vec![
                "Test",
                "Genre: fantasy-art",
                "Tone: adventurous",
                "Target Audience: children",
                "Scene 1",
                "Once upon a time...",
            ]
        );
        assert_eq!(doc.image_count(), 0);
    }

    #[tokio::test]
    async fn block_positions_follow_fixed_advances() {
        let story = story(vec![scene(1, "Once upon a time...", Some("ok://a.png"))]);
        let doc = layout_story(&story, &FakeImages).await;
        let ys: Vec<f32> = doc.pages[0]
            .blocks
            .iter()
            .map(|b| match b {
                Block::Text(t) => t.y,
                Block::Image(i) => i.y,
            })
            .collect();
        // title, 3 metadata lines, heading, body, image
        assert_eq!(ys, vec![40.0, 70.0, 90.0, 110.0, 150.0, 175.0, 200.0]);
        match &doc.pages[0].blocks[0] {
            Block::Text(t) => {
                assert_eq!(t.align, Align::Center);
                assert_eq!(t.x, PAGE_WIDTH / 2.0);
            }
            other => panic!("expected title text, got {other:?}"),
        }
        let image = doc.pages[0].images().next().unwrap();
        assert_eq!((image.width, image.height), (CONTENT_WIDTH, IMAGE_HEIGHT));
        assert_eq!((image.image.width, image.image.height), (4, 4));
    }

    #[tokio::test]
    async fn failed_images_are_skipped_but_text_survives() {
        let scenes = vec![
            scene(1, "First scene text.", Some("https://unreachable.invalid/1.png")),
            scene(2, "Second scene text.", Some("garbage://2.png")),
            scene(3, "Third scene text.", Some("https://unreachable.invalid/3.png")),
        ];
        let doc = layout_story(&story(scenes), &FakeImages).await;
        assert_eq!(doc.image_count(), 0);
        let all: Vec<&str> = doc.pages.iter().flat_map(|p| p.text_lines()).collect();
        let expected_lines = [
            "Scene 1",
            "First scene text.",
            "Scene 2",
            "Second scene text.",
            "Scene 3",
            "Third scene text.",
        ];
        for expected in expected_lines {
            assert!(all.contains(&expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn breaks_pages_between_scenes() {
        let scenes: Vec<_> = (1..=6).map(|n| scene(n, "Short text.", Some("ok://img.png"))).collect();
        let doc = layout_story(&story(scenes), &FakeImages).await;
        // Each scene needs 25 + 15 + 10 + 220 + 20 = 290pt.
        // Page 1 starts scenes at 150, 440, 730 (overflows), page 2 at 40, 330, 620.
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.image_count(), 6);
        let first_on_page_two = doc.pages[1].text_lines().next();
        assert_eq!(first_on_page_two, Some("Scene 4"));
        match &doc.pages[1].blocks[0] {
            Block::Text(t) => assert_eq!(t.y, MARGIN),
            other => panic!("expected heading, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_trailing_blank_page_after_last_scene() {
        let scenes: Vec<_> = (1..=3).map(|n| scene(n, "Short text.", Some("ok://img.png"))).collect();
        let doc = layout_story(&story(scenes), &FakeImages).await;
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages.iter().all(|p| !p.blocks.is_empty()));
    }

    #[tokio::test]
    async fn export_renders_pdf_with_derived_filename() {
        let mut s = story(vec![scene(1, "Once upon a time...", Some("ok://a.png"))]);
        s.title = "The Enchanted  Library".into();
        let exported = export_story(&s, &FakeImages).await.unwrap();
        assert_eq!(exported.filename, "The_Enchanted_Library.pdf");
        assert!(exported.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn export_requires_a_title() {
        let mut s = story(vec![]);
        s.title = "   ".into();
        assert!(matches!(export_story(&s, &FakeImages).await, Err(ExportError::EmptyTitle)));
    }

    #[test]
    fn filename_replaces_whitespace_runs() {
        assert_eq!(export_filename("Robot's First Day"), "Robot's_First_Day.pdf");
        assert_eq!(export_filename("a \t b\nc"), "a_b_c.pdf");
        assert_eq!(export_filename("Test"), "Test.pdf");
    }
}
