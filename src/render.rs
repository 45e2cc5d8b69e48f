//! Chart rendering for the sentiment summary
//!
//! Both charts are drawn with plotters into an in-memory RGB bitmap and
//! encoded as PNG; the classifier base64-encodes the bytes for transport.
//! Labels use 8x8 bitmap glyphs, so no system fonts are needed.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use regex::Regex;
use stop_words::{get, LANGUAGE};

use crate::error::{InsightError, Result};
use crate::models::WordFrequency;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const GLYPH: i32 = 8;
const MAX_GLYPH_SCALE: i32 = 6;
const SPIRAL_STEPS: usize = 4000;
const INK: RGBColor = RGBColor(33, 33, 33);
const PIE_COLORS: [RGBColor; 3] = [
    RGBColor(76, 175, 80),
    RGBColor(158, 158, 158),
    RGBColor(244, 67, 54),
];

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Draws the two sentiment charts
pub trait ChartRenderer: Send + Sync {
    /// Lay out a word-frequency cloud
    fn word_cloud(&self, words: &[WordFrequency]) -> Result<Vec<u8>>;

    /// Draw a labeled pie chart
    fn pie_chart(&self, slices: &[(String, usize)]) -> Result<Vec<u8>>;
}

/// Counts words across comment texts, skipping stop words
pub struct WordCounter {
    stopwords: HashSet<String>,
    word_regex: Regex,
}

impl WordCounter {
    /// Create a counter with the English stop-word list
    pub fn new() -> Result<Self> {
        let word_regex = Regex::new(r"[\p{L}][\p{L}']+")
            .map_err(|e| InsightError::Other(format!("Failed to compile word regex: {e}")))?;

        // Initialize stopwords for English
        let mut stopwords: HashSet<String> = get(LANGUAGE::English)
            .iter()
            .map(ToString::to_string)
            .collect();
        // Comment boilerplate that carries no topic
        for extra in ["video", "videos", "https", "http", "www", "com"] {
            stopwords.insert(extra.to_string());
        }

        Ok(Self {
            stopwords,
            word_regex,
        })
    }

    /// Most frequent words, ties in alphabetical order
    #[must_use]
    pub fn top_words<'a>(&self, texts: impl IntoIterator<Item = &'a str>, max_words: usize) -> Vec<WordFrequency> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for m in self.word_regex.find_iter(text) {
                let word = m.as_str().to_lowercase();
                if word.chars().count() < 3 || self.stopwords.contains(&word) {
                    continue;
                }
                *counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<WordFrequency> = counts
            .into_iter()
            .map(|(word, count)| WordFrequency { word, count })
            .collect();
        words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        words.truncate(max_words);
        words
    }
}

/// Renders charts as 800x400 PNG images
#[derive(Debug, Clone, Copy, Default)]
pub struct PngChartRenderer;

impl ChartRenderer for PngChartRenderer {
    fn word_cloud(&self, words: &[WordFrequency]) -> Result<Vec<u8>> {
        let max = words
            .iter()
            .map(|w| w.count)
            .max()
            .ok_or_else(|| InsightError::Rendering("no words to draw".to_string()))?;
        if max == 0 {
            return Err(InsightError::Rendering("no words to draw".to_string()));
        }

        render_png(|canvas| {
            // Archimedean spiral placement, heaviest word nearest the middle
            let mut placed: Vec<Bounds> = Vec::with_capacity(words.len());
            for word in words {
                let weight = word.count as f64 / max as f64;
                let chars = word.word.chars().count().max(1) as i32;
                let fits = WIDTH as i32 / (chars * GLYPH);
                let scale = (1 + (weight * f64::from(MAX_GLYPH_SCALE - 1)).round() as i32).min(fits);
                if scale < 1 {
                    continue;
                }

                let (w, h) = (chars * GLYPH * scale, GLYPH * scale);
                let Some(slot) = find_slot(&placed, w, h) else {
                    tracing::debug!(word = %word.word, "No room left in word cloud");
                    continue;
                };
                placed.push(slot);

                let shade = (180.0 * (1.0 - weight)) as u8;
                draw_text(canvas, &word.word, (slot.left, slot.top), scale, RGBColor(shade, shade, 160))?;
            }
            Ok(())
        })
    }

    fn pie_chart(&self, slices: &[(String, usize)]) -> Result<Vec<u8>> {
        let total: usize = slices.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return Err(InsightError::Rendering("pie chart has no data".to_string()));
        }

        render_png(|canvas| {
            let center = (WIDTH as i32 / 3, HEIGHT as i32 / 2);
            let radius = f64::from(HEIGHT) / 2.5;
            let legend_x = WIDTH as i32 * 62 / 100;
            let mut start = -PI / 2.0;

            for (i, (label, count)) in slices.iter().enumerate() {
                if *count == 0 {
                    continue;
                }
                let share = *count as f64 / total as f64;
                let sweep = share * 2.0 * PI;
                let color = PIE_COLORS[i % PIE_COLORS.len()];

                canvas
                    .draw(&Polygon::new(sector(center, radius, start, sweep), color.filled()))
                    .map_err(rendering)?;

                let legend_y = 60 + i as i32 * 30;
                canvas
                    .draw(&Rectangle::new(
                        [(legend_x, legend_y), (legend_x + 17, legend_y + 17)],
                        color.filled(),
                    ))
                    .map_err(rendering)?;
                draw_text(
                    canvas,
                    &format!("{label} {:.1}%", share * 100.0),
                    (legend_x + 26, legend_y + 1),
                    2,
                    INK,
                )?;

                start += sweep;
            }
            Ok(())
        })
    }
}

fn rendering(e: impl std::fmt::Display) -> InsightError {
    InsightError::Rendering(e.to_string())
}

/// Draw onto a white canvas and encode the bitmap as PNG
fn render_png(draw: impl FnOnce(&Canvas<'_>) -> Result<()>) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(rendering)?;
        draw(&root)?;
        root.present().map_err(rendering)?;
    }

    let bitmap = RgbImage::from_raw(WIDTH, HEIGHT, buffer)
        .ok_or_else(|| InsightError::Rendering("bitmap size mismatch".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    bitmap.write_to(&mut png, ImageFormat::Png).map_err(rendering)?;
    Ok(png.into_inner())
}

/// Pixel box taken by a placed word
#[derive(Debug, Clone, Copy)]
struct Bounds {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Bounds {
    const fn overlaps(&self, other: &Self) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// First free `w` x `h` box along a spiral out of the canvas centre
fn find_slot(placed: &[Bounds], w: i32, h: i32) -> Option<Bounds> {
    let (cx, cy) = (f64::from(WIDTH) / 2.0, f64::from(HEIGHT) / 2.0);
    (0..SPIRAL_STEPS).find_map(|step| {
        let t = step as f64 * 0.1;
        let r = 1.5 * t;
        let left = (cx + r * t.cos()) as i32 - w / 2;
        let top = (cy + r * t.sin() * 0.6) as i32 - h / 2;
        let candidate = Bounds {
            left,
            top,
            right: left + w,
            bottom: top + h,
        };
        let inside = left >= 0 && top >= 0 && candidate.right <= WIDTH as i32 && candidate.bottom <= HEIGHT as i32;
        (inside && !placed.iter().any(|p| p.overlaps(&candidate))).then_some(candidate)
    })
}

/// Outline of a pie slice, centre first
fn sector(center: (i32, i32), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = (sweep.to_degrees().ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for k in 0..=steps {
        let angle = start + sweep * k as f64 / steps as f64;
        points.push((
            center.0 + (radius * angle.cos()).round() as i32,
            center.1 + (radius * angle.sin()).round() as i32,
        ));
    }
    points
}

/// Draw `text` from its top-left corner, each glyph pixel a `scale` square
fn draw_text(canvas: &Canvas<'_>, text: &str, origin: (i32, i32), scale: i32, color: RGBColor) -> Result<()> {
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = BASIC_FONTS.get(c).or_else(|| LATIN_FONTS.get(c)) else {
            continue;
        };
        let left = origin.0 + i as i32 * GLYPH * scale;
        for (row, bits) in rows.iter().enumerate() {
            let y = origin.1 + row as i32 * scale;
            for col in 0..GLYPH {
                if (bits >> col) & 1 == 1 {
                    let x = left + col * scale;
                    canvas
                        .draw(&Rectangle::new([(x, y), (x + scale - 1, y + scale - 1)], color.filled()))
                        .map_err(rendering)?;
                }
            }
        }
    }
    Ok(())
}
