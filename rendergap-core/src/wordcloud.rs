//! Word-cloud rendering for the report.
//!
//! Words are drawn with a built-in 5x7 bitmap font, scaled by an integer
//! factor per weight, and flowed left to right in rows. The result is a PNG.

use crate::diff::WordEntry;
use crate::error::Result;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgb, RgbImage};

/// Whether the non-scripting render contains the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTag {
    Visible,
    Hidden,
}

impl ColorTag {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            ColorTag::Visible => Rgb([0x2e, 0x7d, 0x32]),
            ColorTag::Hidden => Rgb([0xc6, 0x28, 0x28]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudWord {
    pub word: String,
    pub weight: usize,
    pub tag: ColorTag,
}

impl From<&WordEntry> for CloudWord {
    fn from(entry: &WordEntry) -> Self {
        Self {
            word: entry.word.clone(),
            weight: entry.weight,
            tag: if entry.visible_to_no_script {
                ColorTag::Visible
            } else {
                ColorTag::Hidden
            },
        }
    }
}

pub trait WordCloudRenderer: Send + Sync {
    /// Render the words into an encoded raster image.
    fn render(&self, words: &[CloudWord]) -> Result<Vec<u8>>;

    /// MIME type of the bytes `render` returns.
    fn mime_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;
}

/// Where one word lands on the canvas, top-left corner in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub word: String,
    pub x: u32,
    pub y: u32,
    pub scale: u32,
    pub tag: ColorTag,
}

impl Placement {
    pub fn width(&self) -> u32 {
        text_width(&self.word, self.scale)
    }

    pub fn height(&self) -> u32 {
        GLYPH_HEIGHT * self.scale
    }
}

#[derive(Debug, Clone)]
pub struct PngWordCloud {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    /// Pixel size of one font dot for the lightest word.
    pub min_scale: u32,
    /// Pixel size of one font dot for the heaviest word.
    pub max_scale: u32,
}

impl Default for PngWordCloud {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            max_words: 100,
            min_scale: 2,
            max_scale: 8,
        }
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const PADDING: u32 = 8;
const BACKGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

fn text_width(word: &str, scale: u32) -> u32 {
    let chars = word.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    // one dot of spacing between glyphs
    (chars * (GLYPH_WIDTH + 1) - 1) * scale
}

impl PngWordCloud {
    fn scale(&self, weight: usize, max_weight: usize) -> u32 {
        if max_weight <= 1 {
            return self.max_scale;
        }
        let span = self.max_scale.saturating_sub(self.min_scale) as f64;
        let share = weight.saturating_sub(1) as f64 / (max_weight - 1) as f64;
        self.min_scale + (span * share).round() as u32
    }

    /// Heaviest words first, ties alphabetical. Stops at `max_words` or when
    /// the next word no longer fits below the last row.
    pub fn layout(&self, words: &[CloudWord]) -> Vec<Placement> {
        let mut sorted: Vec<&CloudWord> = words.iter().filter(|w| w.weight > 0).collect();
        sorted.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.word.cmp(&b.word)));
        sorted.truncate(self.max_words);

        let max_weight = sorted.first().map(|w| w.weight).unwrap_or(0);
        let mut placements = Vec::new();
        let mut x = PADDING;
        let mut y = PADDING;
        let mut row_height = 0;

        for word in sorted {
            let scale = self.scale(word.weight, max_weight);
            let width = text_width(&word.word, scale);
            let height = GLYPH_HEIGHT * scale;

            if x + width > self.width.saturating_sub(PADDING) && x > PADDING {
                x = PADDING;
                y += row_height + PADDING;
                row_height = 0;
            }
            if y + row_height.max(height) > self.height.saturating_sub(PADDING) {
                break;
            }
            row_height = row_height.max(height);

            placements.push(Placement {
                word: word.word.clone(),
                x,
                y,
                scale,
                tag: word.tag,
            });
            x += width + PADDING;
        }

        placements
    }

    pub fn draw(&self, placements: &[Placement]) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        for placement in placements {
            draw_word(&mut canvas, placement);
        }
        canvas
    }
}

impl WordCloudRenderer for PngWordCloud {
    fn render(&self, words: &[CloudWord]) -> Result<Vec<u8>> {
        let canvas = self.draw(&self.layout(words));

        let mut buf = Vec::new();
        let encoder = PngEncoder::new(&mut buf);
        DynamicImage::ImageRgb8(canvas).write_with_encoder(encoder)?;
        Ok(buf)
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

fn draw_word(canvas: &mut RgbImage, placement: &Placement) {
    let color = placement.tag.rgb();
    let scale = placement.scale;
    let mut origin_x = placement.x;

    for c in placement.word.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = origin_x + col * scale;
                    let py = placement.y + row as u32 * scale;
                    fill_dot(canvas, px, py, scale, color);
                }
            }
        }
        origin_x += (GLYPH_WIDTH + 1) * scale;
    }
}

fn fill_dot(canvas: &mut RgbImage, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    for dy in 0..scale {
        for dx in 0..scale {
            let (px, py) = (x + dx, y + dy);
            if px < canvas.width() && py < canvas.height() {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

/// 5x7 dot rows, leftmost dot in the high bit. Unknown characters are blank.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c.to_ascii_lowercase() {
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'b' => [0b10000, 0b10000, 0b10110, 0b11001, 0b10001, 0b10001, 0b11110],
        'c' => [0b00000, 0b00000, 0b01110, 0b10000, 0b10000, 0b10001, 0b01110],
        'd' => [0b00001, 0b00001, 0b01101, 0b10011, 0b10001, 0b10001, 0b01111],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        'f' => [0b00110, 0b01001, 0b01000, 0b11100, 0b01000, 0b01000, 0b01000],
        'g' => [0b00000, 0b01111, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'h' => [0b10000, 0b10000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'i' => [0b00100, 0b00000, 0b01100, 0b00100, 0b00100, 0b00100, 0b01110],
        'j' => [0b00010, 0b00000, 0b00110, 0b00010, 0b00010, 0b10010, 0b01100],
        'k' => [0b10000, 0b10000, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010],
        'l' => [0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'm' => [0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10001, 0b10001],
        'n' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'o' => [0b00000, 0b00000, 0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
        'p' => [0b00000, 0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000],
        'q' => [0b00000, 0b01111, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001],
        'r' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10000, 0b10000, 0b10000],
        's' => [0b00000, 0b00000, 0b01111, 0b10000, 0b01110, 0b00001, 0b11110],
        't' => [0b01000, 0b01000, 0b11100, 0b01000, 0b01000, 0b01001, 0b00110],
        'u' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10001, 0b10011, 0b01101],
        'v' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'w' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10101, 0b10101, 0b01010],
        'x' => [0b00000, 0b00000, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001],
        'y' => [0b00000, 0b10001, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'z' => [0b00000, 0b00000, 0b11111, 0b00010, 0b00100, 0b01000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        _ => return None,
    };
    Some(rows)
}
