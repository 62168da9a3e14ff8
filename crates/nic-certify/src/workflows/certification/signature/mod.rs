//! Signature capture: free-hand drawing or an uploaded image, normalized into a
//! [`SignatureArtifact`] that can be previewed and uploaded.

mod png;
mod raster;

pub use raster::Point;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use raster::StrokeLayer;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const DRAWN_FILE_NAME: &str = "signature.png";

/// Surface and upload limits for the capture widget.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSettings {
    pub width: u32,
    pub height: u32,
    pub pen_width: f32,
    pub max_upload_bytes: u64,
}

impl Default for SignatureSettings {
    fn default() -> Self {
        Self {
            width: 500,
            height: 200,
            pen_width: 2.5,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Input mode of the widget. Only one mode holds input at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Draw,
    Upload,
}

/// Binary payload ready for multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A finished capture: a data URL for previews plus the bytes to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArtifact {
    pub preview: String,
    pub file: Option<SignatureFile>,
}

impl SignatureArtifact {
    fn from_file(file: SignatureFile) -> Self {
        let preview = data_url(&file.content_type, &file.bytes);
        Self {
            preview,
            file: Some(file),
        }
    }
}

pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UploadedImage {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("please draw or upload a signature first")]
    Empty,
    #[error("please upload an image file (received {0})")]
    NotAnImage(String),
    #[error("signature image must be {max} bytes or smaller (received {actual})")]
    TooLarge { max: u64, actual: u64 },
    #[error("unable to render signature: {0}")]
    Render(String),
}

/// Capture widget state.
#[derive(Debug, Clone)]
pub struct SignatureCapture {
    settings: SignatureSettings,
    mode: CaptureMode,
    strokes: Vec<Vec<Point>>,
    drawing: bool,
    upload: Option<UploadedImage>,
    error: Option<String>,
}

impl SignatureCapture {
    pub fn new(settings: SignatureSettings) -> Self {
        Self {
            settings,
            mode: CaptureMode::Draw,
            strokes: Vec::new(),
            drawing: false,
            upload: None,
            error: None,
        }
    }

    pub fn settings(&self) -> &SignatureSettings {
        &self.settings
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Switch input mode, discarding whatever the other mode held.
    pub fn switch_mode(&mut self, mode: CaptureMode) {
        if self.mode == mode {
            return;
        }
        self.clear();
        self.mode = mode;
    }

    pub fn begin_stroke(&mut self, at: Point) {
        self.switch_mode(CaptureMode::Draw);
        self.strokes.push(vec![at]);
        self.drawing = true;
        self.error = None;
    }

    pub fn line_to(&mut self, at: Point) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(at);
        }
    }

    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Record a whole stroke at once.
    pub fn add_stroke(&mut self, points: impl IntoIterator<Item = Point>) {
        let mut points = points.into_iter();
        if let Some(first) = points.next() {
            self.begin_stroke(first);
            for point in points {
                self.line_to(point);
            }
            self.end_stroke();
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn uploaded_file_name(&self) -> Option<&str> {
        self.upload.as_ref().map(|upload| upload.file_name.as_str())
    }

    /// Last user-visible validation message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Accept an image file for upload mode.
    ///
    /// A rejected file only sets the error notice; strokes, mode and any
    /// previously accepted file stay as they were.
    pub fn select_file(
        &mut self,
        file_name: impl Into<String>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), SignatureError> {
        if let Err(err) = validate_upload(content_type, bytes.len() as u64, &self.settings) {
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.switch_mode(CaptureMode::Upload);
        self.upload = Some(UploadedImage {
            file_name: file_name.into(),
            content_type: content_type.to_string(),
            bytes,
        });
        self.error = None;
        Ok(())
    }

    /// Discard every pending input and notice.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
        self.upload = None;
        self.error = None;
    }

    /// Produce the artifact for the current mode.
    ///
    /// Drawn signatures are rendered on a blocking task; the returned artifact
    /// always carries both the preview and the PNG bytes.
    pub async fn finalize(&self) -> Result<SignatureArtifact, SignatureError> {
        match self.mode {
            CaptureMode::Draw => {
                if self.strokes.iter().all(|stroke| stroke.is_empty()) {
                    return Err(SignatureError::Empty);
                }
                let strokes = self.strokes.clone();
                let settings = self.settings.clone();
                let bytes = tokio::task::spawn_blocking(move || render_png(&strokes, &settings))
                    .await
                    .map_err(|err| SignatureError::Render(err.to_string()))??;
                debug!(bytes = bytes.len(), "rendered drawn signature");
                Ok(SignatureArtifact::from_file(SignatureFile {
                    file_name: DRAWN_FILE_NAME.to_string(),
                    content_type: mime::IMAGE_PNG.to_string(),
                    bytes,
                }))
            }
            CaptureMode::Upload => {
                let upload = self.upload.as_ref().ok_or(SignatureError::Empty)?;
                Ok(SignatureArtifact::from_file(SignatureFile {
                    file_name: upload.file_name.clone(),
                    content_type: upload.content_type.clone(),
                    bytes: upload.bytes.clone(),
                }))
            }
        }
    }
}

impl Default for SignatureCapture {
    fn default() -> Self {
        Self::new(SignatureSettings::default())
    }
}

fn validate_upload(
    content_type: &str,
    size: u64,
    settings: &SignatureSettings,
) -> Result<(), SignatureError> {
    // Literal prefix match: `IMAGE/PNG` is not an image here.
    if !content_type.starts_with("image/") {
        return Err(SignatureError::NotAnImage(content_type.to_string()));
    }
    if size > settings.max_upload_bytes {
        return Err(SignatureError::TooLarge {
            max: settings.max_upload_bytes,
            actual: size,
        });
    }
    Ok(())
}

fn render_png(
    strokes: &[Vec<Point>],
    settings: &SignatureSettings,
) -> Result<Vec<u8>, SignatureError> {
    if settings.width == 0 || settings.height == 0 {
        return Err(SignatureError::Render("signing surface has no area".to_string()));
    }
    let mut layer = StrokeLayer::new(settings.width, settings.height);
    for stroke in strokes {
        layer.draw_stroke(stroke, settings.pen_width);
    }
    if layer.is_blank() {
        return Err(SignatureError::Empty);
    }
    png::encode_rgb(settings.width, settings.height, &layer.composite_on_white())
        .map_err(|err| SignatureError::Render(err.to_string()))
}

/// Whether `bytes` start with the PNG magic number.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&png::PNG_MAGIC)
}
