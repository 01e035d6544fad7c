use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba32FImage, RgbaImage, imageops};
use image::imageops::FilterType;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fraction of each dimension removed from the visible content, in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding(f64);

impl Padding {
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&value) {
            return Err(anyhow!(
                "Padding must be in the range [0, 1), got {}",
                value
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for Padding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid padding: {}", s))?;
        Padding::new(value)
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a single `pad` invocation.
#[derive(Debug)]
pub enum PadOutcome {
    Written(PathBuf),
    MissingInput(PathBuf),
    Failed(anyhow::Error),
}

/// The `Padder` shrinks image content and centers it on a transparent canvas
/// of the original size.
#[derive(Debug, Clone, Copy)]
pub struct Padder {
    padding: Padding,
}

impl Padder {
    pub fn new(padding: Padding) -> Self {
        Self { padding }
    }

    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = 1.0 - self.padding.value();
        (
            (width as f64 * scale).floor() as u32,
            (height as f64 * scale).floor() as u32,
        )
    }

    pub fn offset(&self, width: u32, height: u32) -> (u32, u32) {
        let (target_width, target_height) = self.target_dimensions(width, height);
        ((width - target_width) / 2, (height - target_height) / 2)
    }

    /// Pads an already decoded image. The result always has the source dimensions.
    pub fn pad(&self, img: &DynamicImage) -> RgbaImage {
        let (width, height) = img.dimensions();
        let (target_width, target_height) = self.target_dimensions(width, height);
        let mut canvas = RgbaImage::new(width, height);

        if target_width == 0 || target_height == 0 {
            return canvas;
        }

        let content = resize_premultiplied(img, target_width, target_height);
        let (x, y) = self.offset(width, height);
        imageops::overlay(&mut canvas, &content, i64::from(x), i64::from(y));
        canvas
    }

    /// Loads `input`, pads it and writes the result to `output`.
    ///
    /// The output format follows the extension of `output`. Nothing is written
    /// unless encoding succeeds.
    pub fn pad_file(&self, input: &Path, output: &Path) -> Result<()> {
        let format = ImageFormat::from_path(output)
            .with_context(|| format!("Unsupported output format for {}", output.display()))?;
        let img = image::open(input)
            .with_context(|| format!("Failed to load image {}", input.display()))?;

        let (width, height) = img.dimensions();
        tracing::debug!(
            "Padding {} ({}x{}) by {}",
            input.display(),
            width,
            height,
            self.padding
        );
        let padded = self.pad(&img);

        let mut buf = Cursor::new(Vec::new());
        padded
            .write_to(&mut buf, format)
            .with_context(|| format!("Failed to encode {:?} image", format))?;
        fs::write(output, buf.into_inner())
            .with_context(|| format!("Failed to save image {}", output.display()))?;
        Ok(())
    }

    /// Runs the padder, converting every failure into a reported outcome.
    pub fn run(&self, input: &Path, output: &Path) -> PadOutcome {
        if !input.exists() {
            tracing::warn!("Source image not found: {}", input.display());
            return PadOutcome::MissingInput(input.to_path_buf());
        }

        match self.pad_file(input, output) {
            Ok(()) => {
                tracing::info!("Padded image saved to {}", output.display());
                PadOutcome::Written(output.to_path_buf())
            }
            Err(e) => {
                tracing::error!("Error processing image: {:#}", e);
                PadOutcome::Failed(e)
            }
        }
    }
}

/// Lanczos3 resize on premultiplied alpha, so transparent pixels do not bleed
/// their color into their neighbours.
fn resize_premultiplied(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let mut source: Rgba32FImage = img.to_rgba32f();
    for pixel in source.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [r * a, g * a, b * a, a];
    }

    let mut resized = imageops::resize(&source, width, height, FilterType::Lanczos3);
    for pixel in resized.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = if a <= 0.0 {
            [0.0; 4]
        } else {
            [
                (r / a).clamp(0.0, 1.0),
                (g / a).clamp(0.0, 1.0),
                (b / a).clamp(0.0, 1.0),
                a.min(1.0),
            ]
        };
    }

    DynamicImage::ImageRgba32F(resized).into_rgba8()
}
