//! Telegram's `.tgs` stickers: gzip-compressed lottie animations.
//!
//! The animation is rasterized by a [`LottieRenderer`] into a sequence of
//! PNG frames at its native size. From there it goes through the same ffmpeg
//! pipeline as any other animation.

use crate::prelude::*;
use flate2::read::GzDecoder;
use image::RgbaImage;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

/// Telegram limits `.tgs` to 64 KiB compressed, this is way more than
/// any real sticker unpacks to
const MAX_JSON_BYTES: u64 = 16 * 1024 * 1024;

/// 10 seconds at 60 fps
const MAX_FRAMES: usize = 600;

/// Unpacked lottie animation along with the header fields the conversion needs
#[derive(Debug, Clone)]
pub(crate) struct Lottie {
    pub(crate) json: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) frame_rate: f64,
    pub(crate) frame_count: usize,
}

/// The part of the lottie document we look at. The rest is up to the renderer.
#[derive(Deserialize)]
struct Header {
    #[serde(rename = "w")]
    width: f64,

    #[serde(rename = "h")]
    height: f64,

    #[serde(rename = "fr")]
    frame_rate: f64,

    #[serde(rename = "ip")]
    in_point: f64,

    #[serde(rename = "op")]
    out_point: f64,
}

impl Lottie {
    pub(crate) fn from_tgs(tgs: &[u8]) -> Result<Self> {
        let mut json = String::new();

        GzDecoder::new(tgs)
            .take(MAX_JSON_BYTES + 1)
            .read_to_string(&mut json)
            .context("The sticker is not a gzip-compressed lottie animation")?;

        ensure!(
            json.len() as u64 <= MAX_JSON_BYTES,
            "Lottie animation unpacks to more than {MAX_JSON_BYTES} bytes"
        );

        let header: Header = serde_json::from_str(&json).context("Invalid lottie animation")?;

        ensure!(
            header.frame_rate.is_finite() && header.frame_rate > 0.0,
            "Lottie frame rate must be positive, but got {}",
            header.frame_rate,
        );

        let frames = (header.out_point - header.in_point).round();

        ensure!(
            (1.0..=MAX_FRAMES as f64).contains(&frames),
            "Lottie animation must have from 1 to {MAX_FRAMES} frames, but got {frames} \
            (in point {}, out point {})",
            header.in_point,
            header.out_point,
        );

        let side = |value: f64| {
            let value = value.round();
            ensure!(
                (1.0..=f64::from(u16::MAX)).contains(&value),
                "Invalid lottie canvas size {}x{}",
                header.width,
                header.height,
            );
            Ok(value as u32)
        };

        Ok(Self {
            width: side(header.width)?,
            height: side(header.height)?,
            frame_rate: header.frame_rate,
            frame_count: frames as usize,
            json,
        })
    }
}

/// Rasterizes lottie animations. It's CPU-bound, so it's called on a
/// blocking thread.
pub(crate) trait LottieRenderer: fmt::Debug + Send + Sync {
    /// Passes every frame in order to `sink` as straight (not premultiplied) RGBA
    fn render(&self, lottie: &Lottie, sink: &mut dyn FnMut(RgbaImage) -> Result) -> Result;
}

/// Renders the animation into `dir` as `0001.png`, `0002.png` and so on.
/// Returns the number of frames.
pub(crate) fn render_to_dir(
    renderer: &dyn LottieRenderer,
    lottie: &Lottie,
    dir: &Utf8Path,
) -> Result<usize> {
    let mut count = 0;

    renderer.render(lottie, &mut |frame: RgbaImage| {
        count += 1;
        save_frame(&dir.join(format!("{count:04}.png")), &frame)
    })?;

    ensure!(count > 0, "The renderer produced no frames");

    Ok(count)
}

fn save_frame(path: &Utf8Path, frame: &RgbaImage) -> Result {
    frame
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to save the rendered frame at `{path}`"))
}

/// The renderer available in this build, if any
pub(crate) fn renderer() -> Option<std::sync::Arc<dyn LottieRenderer>> {
    #[cfg(feature = "lottie")]
    return Some(std::sync::Arc::new(rlottie_renderer::Rlottie));

    #[cfg(not(feature = "lottie"))]
    None
}

#[cfg(feature = "lottie")]
mod rlottie_renderer {
    use super::{Lottie, LottieRenderer};
    use crate::prelude::*;
    use image::RgbaImage;

    #[derive(Debug)]
    pub(crate) struct Rlottie;

    impl LottieRenderer for Rlottie {
        fn render(&self, lottie: &Lottie, sink: &mut dyn FnMut(RgbaImage) -> Result) -> Result {
            // Empty cache key disables rlottie's internal cache
            let mut animation = rlottie::Animation::from_data(lottie.json.clone(), "", "")
                .context("rlottie failed to load the animation")?;

            let size = animation.size();
            let mut surface = rlottie::Surface::new(size);

            let width = u32::try_from(size.width)?;
            let height = u32::try_from(size.height)?;

            for index in 0..animation.totalframe() {
                animation.render(index, &mut surface);

                // rlottie produces premultiplied BGRA
                let pixels = surface
                    .data()
                    .iter()
                    .flat_map(|pixel| unpremultiply([pixel.r, pixel.g, pixel.b], pixel.a))
                    .collect();

                let frame = RgbaImage::from_raw(width, height, pixels)
                    .context("BUG: rlottie surface doesn't match its size")?;

                sink(frame)?;
            }

            Ok(())
        }
    }

    fn unpremultiply(rgb: [u8; 3], alpha: u8) -> [u8; 4] {
        if alpha == 0 {
            return [0; 4];
        }

        let channel = |value: u8| {
            let value = u16::from(value) * 255 / u16::from(alpha);
            value.min(255) as u8
        };

        [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), alpha]
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{header, tgs};
    use super::*;
    use crate::util::path::Utf8TempDir;
    use expect_test::expect;

    #[test]
    fn smoke_from_tgs() {
        let lottie = Lottie::from_tgs(&tgs(&header(512, 60.0, 180))).unwrap();

        assert_eq!((lottie.width, lottie.height), (512, 512));
        assert_eq!(lottie.frame_rate, 60.0);
        assert_eq!(lottie.frame_count, 180);
        assert!(lottie.json.contains(r#""layers":[]"#));
    }

    #[test]
    fn invalid_tgs_is_rejected() {
        let render = |bytes: &[u8]| format!("{:#}", Lottie::from_tgs(bytes).unwrap_err());

        // Plain json that wasn't gzipped
        let plain = render(header(512, 60.0, 180).as_bytes());
        assert!(plain.starts_with("The sticker is not a gzip-compressed lottie"), "{plain}");

        let actual = [
            render(&tgs("not json")),
            render(&tgs(&header(512, 0.0, 180))),
            render(&tgs(&header(512, 60.0, 0))),
            render(&tgs(&header(0, 60.0, 180))),
        ]
        .join("\n");

        expect![[r#"
            Invalid lottie animation: expected ident at line 1 column 2
            Lottie frame rate must be positive, but got 0
            Lottie animation must have from 1 to 600 frames, but got 0 (in point 0, out point 0)
            Invalid lottie canvas size 0x0"#]]
        .assert_eq(&actual);
    }

    #[derive(Debug)]
    struct Gradient;

    impl LottieRenderer for Gradient {
        fn render(&self, lottie: &Lottie, sink: &mut dyn FnMut(RgbaImage) -> Result) -> Result {
            for i in 0..lottie.frame_count {
                let pixel = image::Rgba([255, 0, 0, (i * 20) as u8]);
                sink(RgbaImage::from_pixel(lottie.width, lottie.height, pixel))?;
            }
            Ok(())
        }
    }

    #[test]
    fn frames_are_saved_as_a_png_sequence() {
        let dir = Utf8TempDir::new("wastick-test").unwrap();
        let lottie = Lottie::from_tgs(&tgs(&header(3, 30.0, 12))).unwrap();

        let count = render_to_dir(&Gradient, &lottie, dir.path()).unwrap();
        assert_eq!(count, 12);

        let names = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .sorted()
            .collect_vec();

        assert_eq!(names.len(), 12);
        assert_eq!(names.first().map(String::as_str), Some("0001.png"));
        assert_eq!(names.last().map(String::as_str), Some("0012.png"));

        let last = image::open(dir.join("0012.png")).unwrap().into_rgba8();
        assert_eq!(last, RgbaImage::from_pixel(3, 3, image::Rgba([255, 0, 0, 220])));
    }
}
