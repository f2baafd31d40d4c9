//! Write a [`MotionScene`] to an animated GIF or an MP4 video.
//!
//! Frames are drawn with a fixed orthographic camera: bones as thick black
//! strokes, the head joint as a filled disc. Panels sit side by side, ground
//! truth on the left, each captioned with its title and the frame's time label.

use std::f64::consts::SQRT_2;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use ab_glyph::{point, Font, FontRef, PxScale, ScaleFont};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};

use crate::config::ViewConfig;
use crate::error::ExportError;
use crate::scene::{to_plot, MotionScene, PlotBounds};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// DejaVu Sans, see `assets/fonts/LICENSE-DejaVu.txt`.
const FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Distance of captions from the panel border, pixels.
const TEXT_PADDING: f32 = 6.0;
/// Upper bound on samples along one stroke.
const MAX_STROKE_STEPS: f32 = 65_536.0;

/// Output container, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Gif,
    Mp4,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gif") => Ok(ExportFormat::Gif),
            Some("mp4") => Ok(ExportFormat::Mp4),
            _ => Err(ExportError::UnsupportedExtension(path.to_path_buf())),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Orthographic camera looking at the center of the plot bounds.
///
/// Azimuth turns around the vertical plot axis, elevation tilts the view
/// above the ground plane.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    right: [f64; 3],
    up: [f64; 3],
    center: [f64; 3],
    pixels_per_unit: f64,
    panel_size: u32,
}

impl Camera {
    pub fn new(bounds: PlotBounds, config: &ViewConfig) -> Self {
        let azim = config.azimuth_deg.to_radians();
        let elev = config.elevation_deg.to_radians();
        let right = [-azim.sin(), azim.cos(), 0.0];
        let up = [-elev.sin() * azim.cos(), -elev.sin() * azim.sin(), elev.cos()];
        let panel_size = even(config.panel_size);
        // a cube's face diagonal fits the panel from any turn about the vertical axis
        let pixels_per_unit = panel_size as f64 / (bounds.extent() * SQRT_2);
        Camera {
            right,
            up,
            center: bounds.center(),
            pixels_per_unit,
            panel_size,
        }
    }

    /// Pixel coordinates of a plot-space point inside a panel.
    pub fn project(&self, point: [f64; 3]) -> (f32, f32) {
        let d = [0, 1, 2].map(|a| point[a] - self.center[a]);
        let sx = d[0] * self.right[0] + d[1] * self.right[1] + d[2] * self.right[2];
        let sy = d[0] * self.up[0] + d[1] * self.up[1] + d[2] * self.up[2];
        let half = self.panel_size as f64 / 2.0;
        (
            (half + sx * self.pixels_per_unit) as f32,
            (half - sy * self.pixels_per_unit) as f32,
        )
    }
}

/// H.264 with yuv420p wants even dimensions.
fn even(n: u32) -> u32 {
    n.max(2).saturating_add(1) & !1
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Mix `color` into the pixel at `(x, y)` with the given coverage; off-image pixels are skipped.
fn blend(image: &mut RgbaImage, x: i64, y: i64, coverage: f32, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let c = coverage.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for ch in 0..3 {
        let mixed = pixel.0[ch] as f32 * (1.0 - c) + color.0[ch] as f32 * c;
        pixel.0[ch] = mixed.round() as u8;
    }
}

fn fill_disc(image: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let r = radius.max(0.5);
    let x0 = (cx - r).floor().max(0.0) as i64;
    let y0 = (cy - r).floor().max(0.0) as i64;
    let x1 = ((cx + r).ceil() as i64).min(image.width() as i64 - 1);
    let y1 = ((cy + r).ceil() as i64).min(image.height() as i64 - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn stroke(image: &mut RgbaImage, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if !length.is_finite() {
        return;
    }
    let steps = (length * 2.0).ceil().clamp(1.0, MAX_STROKE_STEPS) as usize;
    for i in 0..=steps {
        let s = i as f32 / steps as f32;
        fill_disc(image, from.0 + dx * s, from.1 + dy * s, width / 2.0, color);
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Horizontal advance of `text`, pixels.
fn text_width(font: &FontRef<'_>, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Draw `text` with its top-left corner at `(x, top)`.
fn draw_text(image: &mut RgbaImage, font: &FontRef<'_>, scale: PxScale, x: f32, top: f32, text: &str, color: Rgba<u8>) {
    let scaled = font.as_scaled(scale);
    let mut caret = point(x, top + scaled.ascent());
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret.x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);
        previous = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + gx as i64;
                let py = bounds.min.y as i64 + gy as i64;
                blend(image, px, py, coverage, color);
            });
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Rasterizes scene frames: stick figures, panel titles and time labels.
pub struct FrameRenderer<'a> {
    camera: Camera,
    font: FontRef<'static>,
    config: &'a ViewConfig,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(bounds: PlotBounds, config: &'a ViewConfig) -> Result<Self, ExportError> {
        Ok(FrameRenderer {
            camera: Camera::new(bounds, config),
            font: FontRef::try_from_slice(FONT)?,
            config,
        })
    }

    /// Rasterize frame `t` of every panel into one image.
    pub fn render(&self, scene: &MotionScene, t: usize) -> RgbaImage {
        let panels = scene.panels();
        let size = self.camera.panel_size;
        let mut image = RgbaImage::from_pixel(size * panels.len() as u32, size, BACKGROUND);
        let scale = PxScale::from(self.config.font_size.max(1.0));
        let time_label = scene.time_label(t);

        for (i, panel) in panels.iter().enumerate() {
            let shift = (i as u32 * size) as f32;
            let frame = panel.positions.frame(t);
            let at = |joint: usize| {
                let (x, y) = self.camera.project(to_plot(frame[joint]));
                (x + shift, y)
            };

            for bone in scene.bones() {
                stroke(&mut image, at(bone.parent), at(bone.child), self.config.line_width, INK);
            }
            let (hx, hy) = at(scene.head());
            fill_disc(&mut image, hx, hy, self.config.head_radius, INK);

            // title centered on top, time label in the bottom-left corner
            let title_x = shift + (size as f32 - text_width(&self.font, scale, panel.title)) / 2.0;
            draw_text(&mut image, &self.font, scale, title_x, TEXT_PADDING, panel.title, INK);
            let label_top = size as f32 - TEXT_PADDING - scale.y;
            draw_text(&mut image, &self.font, scale, shift + TEXT_PADDING, label_top, &time_label, INK);
        }
        image
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Raw RGBA frames streamed into an external encoder's stdin.
///
/// The encoder's stderr is drained on a separate thread, so a chatty process
/// cannot stall on a full pipe, and is reported when the process fails.
struct EncoderPipe {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl EncoderPipe {
    fn spawn(mut command: Command) -> Result<Self, ExportError> {
        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Ffmpeg(format!("could not start {program}: {e}")))?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                // keep partial output on a read error
                let _ = stderr.read_to_end(&mut bytes);
                bytes
            })
        });
        Ok(EncoderPipe { child, stdin, stderr })
    }

    fn write_frame(&mut self, image: &RgbaImage) -> Result<(), ExportError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ExportError::Ffmpeg("encoder stdin unavailable".to_string()));
        };
        if let Err(write_error) = stdin.write_all(image.as_raw()) {
            // the encoder quit early, report its exit status and stderr
            self.close()?;
            return Err(ExportError::Io(write_error));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(), ExportError> {
        self.close()
    }

    /// Close stdin, wait for the process and turn a failed exit into an error.
    fn close(&mut self) -> Result<(), ExportError> {
        // closing stdin ends the stream
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(ExportError::Ffmpeg(format!("{status}: {}", stderr.trim())));
        }
        Ok(())
    }
}

fn ffmpeg_command(path: &Path, fps: u32, width: u32, height: u32) -> Command {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
        .args(["-s", &format!("{width}x{height}")])
        .args(["-r", &fps.to_string()])
        .args(["-i", "-", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-b:v", "1800k"])
        .arg(path);
    command
}

fn export_gif(scene: &MotionScene, renderer: &FrameRenderer, fps: u32, path: &Path) -> Result<(), ExportError> {
    let delay = Delay::from_numer_denom_ms(1000, fps);
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite)?;
        for t in 0..scene.num_frames() {
            encoder.encode_frame(Frame::from_parts(renderer.render(scene, t), 0, 0, delay))?;
        }
        // dropping the encoder writes the trailer into memory, which cannot fail
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn export_mp4(scene: &MotionScene, renderer: &FrameRenderer, fps: u32, path: &Path) -> Result<(), ExportError> {
    let size = renderer.camera.panel_size;
    let width = size * scene.panels().len() as u32;
    let mut pipe = EncoderPipe::spawn(ffmpeg_command(path, fps, width, size))?;
    for t in 0..scene.num_frames() {
        pipe.write_frame(&renderer.render(scene, t))?;
    }
    pipe.finish()
}

/// Render every frame of `scene` to `path`. The format follows the extension.
pub fn export(scene: &MotionScene, config: &ViewConfig, path: impl Into<PathBuf>) -> Result<ExportFormat, ExportError> {
    let path = path.into();
    let format = ExportFormat::from_path(&path)?;
    let fps = config.fps();
    let renderer = FrameRenderer::new(scene.bounds(), config)?;

    log::info!(
        "exporting {} frames ({}x{}, {fps} fps) to {}",
        scene.num_frames(),
        renderer.camera.panel_size * scene.panels().len() as u32,
        renderer.camera.panel_size,
        path.display()
    );

    match format {
        ExportFormat::Gif => export_gif(scene, &renderer, fps, &path)?,
        ExportFormat::Mp4 => export_mp4(scene, &renderer, fps, &path)?,
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{contiguous_rotations, Skeleton};
    use crate::types::{Channels, Position};

    fn scene(with_gt: bool) -> MotionScene {
        let skeleton = Skeleton::new(
            &[-1, 0, 1],
            vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(0.0, 1.0, 0.0),
                Position::new(0.0, 1.0, 0.0),
            ],
            contiguous_rotations(3, 0),
        )
        .unwrap();
        let rows = (0..3).map(|t| {
            let mut row = vec![0.0; 9];
            row[2] = 0.2 * t as f64;
            row
        });
        let channels = Channels::from_rows(rows.collect()).unwrap();
        let gt = with_gt.then(|| channels.clone());
        MotionScene::new(&skeleton, &channels, gt.as_ref(), &ViewConfig::default()).unwrap()
    }

    fn has_ink(image: &RgbaImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        xs.into_iter()
            .any(|x| ys.clone().any(|y| *image.get_pixel(x, y) != BACKGROUND))
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.gif")).unwrap(), ExportFormat::Gif);
        assert_eq!(ExportFormat::from_path(Path::new("clip.MP4")).unwrap(), ExportFormat::Mp4);
        for bad in ["clip.avi", "clip", "gif"] {
            assert!(matches!(
                ExportFormat::from_path(Path::new(bad)),
                Err(ExportError::UnsupportedExtension(_))
            ));
        }
    }

    #[test]
    fn test_unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.webm");
        let err = export(&scene(false), &ViewConfig::default(), &path).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedExtension(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_camera_centers_bounds() {
        let bounds = PlotBounds::equal_aspect([[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]], 0.2);
        let camera = Camera::new(bounds, &ViewConfig::default());
        let (x, y) = camera.project(bounds.center());
        assert!((x - 160.0).abs() < 1e-3 && (y - 160.0).abs() < 1e-3);
        // higher points are drawn nearer the top of the image
        let (_, y_top) = camera.project([1.0, 1.0, 2.0]);
        assert!(y_top < y);
    }

    #[test]
    fn test_render_frame_layout() {
        let config = ViewConfig::default();
        let single = scene(false);
        let renderer = FrameRenderer::new(single.bounds(), &config).unwrap();
        let image = renderer.render(&single, 0);
        assert_eq!(image.dimensions(), (320, 320));
        assert!(image.pixels().any(|p| *p == INK));

        let paired = scene(true);
        let renderer = FrameRenderer::new(paired.bounds(), &config).unwrap();
        let image = renderer.render(&paired, 2);
        assert_eq!(image.dimensions(), (640, 320));
        let left = (0..320).any(|x| (0..320).any(|y| *image.get_pixel(x, y) == INK));
        let right = (320..640).any(|x| (0..320).any(|y| *image.get_pixel(x, y) == INK));
        assert!(left && right);
    }

    #[test]
    fn test_panels_carry_title_and_time_label() {
        let config = ViewConfig::default();
        let paired = scene(true);
        let renderer = FrameRenderer::new(paired.bounds(), &config).unwrap();
        let image = renderer.render(&paired, 1);

        // the figure stays inside the middle of each panel, so ink in the
        // top and bottom bands comes from the captions
        let band = (TEXT_PADDING + config.font_size) as u32 + 2;
        for shift in [0, 320] {
            assert!(has_ink(&image, shift..shift + 320, 0..band), "no title in panel at {shift}");
            assert!(
                has_ink(&image, shift..shift + 160, 320 - band..320),
                "no time label in panel at {shift}"
            );
        }

        // the label changes with the frame
        let first = renderer.render(&paired, 0);
        let bottom = |img: &RgbaImage| -> Vec<Rgba<u8>> {
            (320 - band..320)
                .flat_map(|y| (0..160).map(move |x| (x, y)))
                .map(|(x, y)| *img.get_pixel(x, y))
                .collect()
        };
        assert_ne!(bottom(&first), bottom(&image));
    }

    #[test]
    fn test_text_width_grows_with_text() {
        let font = FontRef::try_from_slice(FONT).unwrap();
        let scale = PxScale::from(16.0);
        let short = text_width(&font, scale, "Prediction");
        let long = text_width(&font, scale, "Ground Truth");
        assert!(short > 0.0 && long > short);
    }

    #[test]
    fn test_export_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.gif");
        let format = export(&scene(true), &ViewConfig::default(), &path).unwrap();
        assert_eq!(format, ExportFormat::Gif);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        // complete file, trailer included
        assert_eq!(bytes.last(), Some(&0x3B));
    }

    #[test]
    fn test_gif_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("walk.gif");
        let err = export(&scene(false), &ViewConfig::default(), &path).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)), "{err}");
    }

    #[test]
    fn test_even_dimensions() {
        assert_eq!(even(321), 322);
        assert_eq!(even(320), 320);
        assert_eq!(even(1), 2);
        assert_eq!(even(0), 2);
        assert_eq!(even(u32::MAX) % 2, 0);
    }

    #[test]
    fn test_collapsed_bounds_render_without_hanging() {
        let mut config = ViewConfig::default();
        config.margin = -0.5;
        let single = scene(false);
        let bounds = PlotBounds::equal_aspect(single.prediction().iter().map(|&p| to_plot(p)), config.margin);
        assert!(bounds.extent() <= 0.0);
        let renderer = FrameRenderer::new(bounds, &config).unwrap();
        let image = renderer.render(&single, 0);
        assert_eq!(image.dimensions(), (320, 320));
    }

    #[test]
    fn test_stroke_skips_non_finite_endpoints() {
        let mut image = RgbaImage::from_pixel(8, 8, BACKGROUND);
        stroke(&mut image, (1.0, 1.0), (f32::INFINITY, 4.0), 2.0, INK);
        stroke(&mut image, (f32::NAN, 1.0), (4.0, 4.0), 2.0, INK);
        assert!(image.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_failed_encoder_reports_its_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'no encoder available' >&2; exit 3"]);
        let mut pipe = EncoderPipe::spawn(command).unwrap();
        // larger than a pipe buffer, so the write cannot complete before the process exits
        let frame = RgbaImage::from_pixel(320, 320, BACKGROUND);
        let err = match pipe.write_frame(&frame) {
            Err(err) => err,
            Ok(()) => pipe.finish().unwrap_err(),
        };
        match err {
            ExportError::Ffmpeg(message) => assert!(message.contains("no encoder available"), "{message}"),
            other => panic!("expected an encoder failure, got {other}"),
        }
    }

    #[test]
    fn test_missing_encoder_program() {
        let command = Command::new("expmap-skeleton-no-such-encoder");
        assert!(matches!(EncoderPipe::spawn(command), Err(ExportError::Ffmpeg(_))));
    }
}
