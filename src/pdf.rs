use crate::export::{Align, Block, ExportDocument, ImageBlock, TextBlock, PAGE_HEIGHT, PAGE_WIDTH};
use crate::text::text_width;
use printpdf::*;
use std::io::BufWriter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("story has no title")] EmptyTitle,
    #[error("PDF error: {0}")] Pdf(String),
}

/// Resolution images are embedded at before scaling into their box.
const IMAGE_DPI: f32 = 300.0;

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Renders a laid-out document with the built-in Helvetica font, one layer per page.
pub fn render(document: &ExportDocument) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        document.title.clone(),
        mm(PAGE_WIDTH),
        mm(PAGE_HEIGHT),
        "Page 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let name = format!("Page {}", index + 1);
            let (page_idx, layer_idx) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), name);
            doc.get_page(page_idx).get_layer(layer_idx)
        };

        for block in &page.blocks {
            match block {
                Block::Text(text) => draw_text(&layer, &font, text),
                Block::Image(image) => draw_image(&layer, image),
            }
        }
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).map_err(|e| ExportError::Pdf(e.to_string()))?;
    }
    Ok(buf)
}

fn draw_text(layer: &PdfLayerReference, font: &IndirectFontRef, text: &TextBlock) {
    for (i, line) in text.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let x = match text.align {
            Align::Left => text.x,
            Align::Center => text.x - text_width(line, text.font_size) / 2.0,
        };
        let baseline = text.y + i as f32 * text.line_height;
        layer.use_text(line.as_str(), text.font_size, mm(x), mm(PAGE_HEIGHT - baseline), font);
    }
}

fn draw_image(layer: &PdfLayerReference, block: &ImageBlock) {
    let source = &block.image;
    if source.width == 0 || source.height == 0 {
        return;
    }
    let xobject = ImageXObject {
        width: Px(source.width as usize),
        height: Px(source.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: source.rgb.clone(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    };
    // Natural size at IMAGE_DPI, stretched to the box regardless of aspect ratio.
    let natural_w = source.width as f32 * 72.0 / IMAGE_DPI;
    let natural_h = source.height as f32 * 72.0 / IMAGE_DPI;
    Image::from(xobject).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(block.x)),
            translate_y: Some(mm(PAGE_HEIGHT - block.y - block.height)),
            scale_x: Some(block.width / natural_w),
            scale_y: Some(block.height / natural_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}
