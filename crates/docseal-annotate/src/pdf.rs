//! # PDF Stamping
//!
//! PDFs are stamped by rasterizing each page, drawing the same banner and
//! QR code used for images, and rebuilding the document from the stamped
//! page images:
//!
//! 1. page geometry is read from the original (`CropBox` clipped to
//!    `MediaBox`, both inherited through the page tree, with `Rotate`
//!    90/270 swapping width and height);
//! 2. a [`PageRasterizer`] renders every page at the configured DPI;
//! 3. each page is stamped and written as a quality-90 JPEG into a scratch
//!    directory next to the file;
//! 4. a new PDF is assembled with one full-page image per page, keeping the
//!    page count and page size of the original;
//! 5. the result is written to `<name>.signed.pdf` and renamed over the
//!    original. The scratch directory is removed on every path.
//!
//! Text, links and form fields of the original are flattened into the
//! page images.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docseal_core::DocumentId;
use image::{ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::AnnotationError;
use crate::stamp::{encode, ImageStamper};

/// Letter size, used when a page declares no usable page box.
const FALLBACK_PAGE: PageBox = PageBox {
    width: 612.0,
    height: 792.0,
};

/// Page tree depth limit when resolving inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Renders every page of a PDF to an RGBA bitmap.
pub trait PageRasterizer: Send + Sync {
    /// Render all pages in order at `dpi` dots per inch.
    fn rasterize(&self, pdf: &Path, dpi: f32) -> Result<Vec<RgbaImage>, AnnotationError>;

    fn name(&self) -> &str;
}

/// Visible page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub width: f32,
    pub height: f32,
}

/// Display size of every page, in page order.
pub fn page_boxes(doc: &Document) -> Vec<PageBox> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_box(doc, page_id))
        .collect()
}

fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media = inherited(doc, page_id, b"MediaBox").and_then(|obj| rect(doc, obj));
    // Renderers draw the CropBox region, clipped to the MediaBox.
    let crop = inherited(doc, page_id, b"CropBox").and_then(|obj| rect(doc, obj));
    let visible = match (crop, media) {
        (Some(crop), Some(media)) => crop.intersect(&media).or(Some(media)),
        (crop, media) => crop.or(media),
    };
    let size = visible.and_then(|r| r.size()).unwrap_or(FALLBACK_PAGE);
    let rotate = inherited(doc, page_id, b"Rotate")
        .and_then(|obj| number(doc, obj))
        .unwrap_or(0.0) as i64;
    if rotate.rem_euclid(180) == 90 {
        PageBox {
            width: size.height,
            height: size.width,
        }
    } else {
        size
    }
}

/// A normalized PDF rectangle: lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    llx: f32,
    lly: f32,
    urx: f32,
    ury: f32,
}

impl Rect {
    fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            llx: self.llx.max(other.llx),
            lly: self.lly.max(other.lly),
            urx: self.urx.min(other.urx),
            ury: self.ury.min(other.ury),
        };
        r.size().map(|_| r)
    }

    fn size(&self) -> Option<PageBox> {
        let width = self.urx - self.llx;
        let height = self.ury - self.lly;
        (width > 0.0 && height > 0.0).then_some(PageBox { width, height })
    }
}

/// Look up `key` on the page, walking `Parent` links for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn rect(doc: &Document, obj: &Object) -> Option<Rect> {
    let values = resolve(doc, obj)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let c: Vec<f32> = values
        .iter()
        .map(|v| number(doc, v))
        .collect::<Option<_>>()?;
    Some(Rect {
        llx: c[0].min(c[2]),
        lly: c[1].min(c[3]),
        urx: c[0].max(c[2]),
        ury: c[1].max(c[3]),
    })
}

/// A stamped page waiting to be assembled.
struct StampedPage {
    jpeg: PathBuf,
    pixels: (u32, u32),
    size: PageBox,
}

/// Rasterize, stamp and reassemble PDFs in place.
#[derive(Clone)]
pub struct PdfAnnotator {
    rasterizer: Arc<dyn PageRasterizer>,
    dpi: f32,
}

impl std::fmt::Debug for PdfAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfAnnotator")
            .field("rasterizer", &self.rasterizer.name())
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl PdfAnnotator {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, dpi: f32) -> Self {
        Self { rasterizer, dpi }
    }

    pub fn rasterizer_name(&self) -> &str {
        self.rasterizer.name()
    }

    /// Stamp every page of the PDF at `path` and replace it.
    pub fn annotate(
        &self,
        path: &Path,
        stamper: &ImageStamper,
        id: &DocumentId,
    ) -> Result<(), AnnotationError> {
        let original = Document::load(path)?;
        let boxes = page_boxes(&original);
        drop(original);
        if boxes.is_empty() {
            return Err(AnnotationError::Pdf("document has no pages".into()));
        }

        let rasters = self.rasterizer.rasterize(path, self.dpi)?;
        if rasters.len() != boxes.len() {
            return Err(AnnotationError::PageCountMismatch {
                expected: boxes.len(),
                actual: rasters.len(),
            });
        }

        let dir = parent_dir(path);
        let scratch = tempfile::Builder::new()
            .prefix("pages-")
            .tempdir_in(dir)?;

        let mut pages = Vec::with_capacity(rasters.len());
        for (index, (mut img, size)) in rasters.into_iter().zip(boxes).enumerate() {
            stamper.stamp(&mut img, id)?;
            let jpeg = scratch.path().join(format!("page-{:04}.jpg", index + 1));
            std::fs::write(&jpeg, encode(&img, ImageFormat::Jpeg)?)?;
            pages.push(StampedPage {
                jpeg,
                pixels: img.dimensions(),
                size,
            });
        }

        let mut rebuilt = assemble(&pages)?;
        let signed = signed_path(path);
        if let Err(err) = rebuilt.save(&signed).and_then(|_| std::fs::rename(&signed, path)) {
            let _ = std::fs::remove_file(&signed);
            return Err(err.into());
        }
        tracing::debug!(path = %path.display(), pages = pages.len(), dpi = self.dpi, "stamped PDF");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn signed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!("{name}.signed.pdf"))
}

/// Build a PDF with one full-page JPEG image per page.
fn assemble(pages: &[StampedPage]) -> Result<Document, AnnotationError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let jpeg = std::fs::read(&page.jpeg)?;
        let (px_w, px_h) = page.pixels;
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(px_w),
                "Height" => i64::from(px_h),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let PageBox { width, height } = page.size;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0_i64.into(),
                        0_i64.into(),
                        height.into(),
                        0_i64.into(),
                        0_i64.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), width.into(), height.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

// ─── pdfium ─────────────────────────────────────────────────────────

#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use std::path::{Path, PathBuf};
    use std::sync::{mpsc, Mutex};

    use image::RgbaImage;
    use pdfium_render::prelude::*;

    use super::PageRasterizer;
    use crate::error::AnnotationError;

    type RenderResult = Result<Vec<RgbaImage>, AnnotationError>;

    struct Job {
        path: PathBuf,
        dpi: f32,
        reply: mpsc::Sender<RenderResult>,
    }

    /// Rasterizer backed by the pdfium library.
    ///
    /// The library handle lives on a dedicated worker thread; requests are
    /// queued to it and served one at a time.
    pub struct PdfiumRasterizer {
        jobs: Mutex<mpsc::Sender<Job>>,
    }

    impl PdfiumRasterizer {
        /// Bind pdfium from `library_dir`, or from the system search path
        /// when `None`, and start the worker thread.
        pub fn spawn(library_dir: Option<&Path>) -> Result<Self, AnnotationError> {
            let library = library_dir.map(|dir| dir.join(Pdfium::pdfium_platform_library_name()));
            let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
            let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

            std::thread::Builder::new()
                .name("pdfium".into())
                .spawn(move || {
                    let bindings = match &library {
                        Some(path) => Pdfium::bind_to_library(path),
                        None => Pdfium::bind_to_system_library(),
                    };
                    let pdfium = match bindings {
                        Ok(bindings) => Pdfium::new(bindings),
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("{e:?}")));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    for job in jobs_rx {
                        let result = render(&pdfium, &job.path, job.dpi);
                        let _ = job.reply.send(result);
                    }
                })?;

            match ready_rx.recv() {
                Ok(Ok(())) => {
                    tracing::info!("pdfium rasterizer ready");
                    Ok(Self {
                        jobs: Mutex::new(jobs_tx),
                    })
                }
                Ok(Err(msg)) => Err(AnnotationError::RasterizerUnavailable(msg)),
                Err(_) => Err(AnnotationError::RasterizerUnavailable(
                    "pdfium worker exited during startup".into(),
                )),
            }
        }
    }

    fn render(pdfium: &Pdfium, path: &Path, dpi: f32) -> RenderResult {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| AnnotationError::Pdf(format!("{e:?}")))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(dpi / 72.0);
        let mut pages = Vec::new();
        for page in document.pages().iter() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| AnnotationError::Pdf(format!("{e:?}")))?;
            let (width, height) = (bitmap.width().max(0) as u32, bitmap.height().max(0) as u32);
            let img = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
                AnnotationError::Pdf(format!("page bitmap does not match {width}x{height}"))
            })?;
            pages.push(img);
        }
        Ok(pages)
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn rasterize(&self, pdf: &Path, dpi: f32) -> RenderResult {
            let (reply, response) = mpsc::channel();
            let job = Job {
                path: pdf.to_path_buf(),
                dpi,
                reply,
            };
            let sent = self
                .jobs
                .lock()
                .map_err(|_| AnnotationError::RasterizerUnavailable("worker lock poisoned".into()))?
                .send(job);
            if sent.is_err() {
                return Err(AnnotationError::RasterizerUnavailable(
                    "pdfium worker has stopped".into(),
                ));
            }
            response.recv().map_err(|_| {
                AnnotationError::RasterizerUnavailable("pdfium worker dropped the request".into())
            })?
        }

        fn name(&self) -> &str {
            "pdfium"
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::AnnotationConfig;
    use crate::stamp::tests::test_stamper;
    use image::Rgba;

    /// Renders white pages sized from the document's page boxes.
    pub(crate) struct BlankRasterizer;

    impl PageRasterizer for BlankRasterizer {
        fn rasterize(&self, pdf: &Path, dpi: f32) -> Result<Vec<RgbaImage>, AnnotationError> {
            let doc = Document::load(pdf)?;
            Ok(page_boxes(&doc)
                .into_iter()
                .map(|b| {
                    let w = (b.width * dpi / 72.0).round() as u32;
                    let h = (b.height * dpi / 72.0).round() as u32;
                    RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
                })
                .collect())
        }

        fn name(&self) -> &str {
            "blank"
        }
    }

    struct ShortRasterizer;

    impl PageRasterizer for ShortRasterizer {
        fn rasterize(&self, _: &Path, _: f32) -> Result<Vec<RgbaImage>, AnnotationError> {
            Ok(vec![RgbaImage::new(10, 10)])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    /// Write a PDF whose pages have the given `(width, height, rotate)`.
    /// The first page inherits its `MediaBox` from the page tree root.
    pub(crate) fn write_pdf(path: &Path, pages: &[(i64, i64, i64)]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for (index, &(w, h, rotate)) in pages.iter().enumerate() {
            let content = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m".to_vec()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
                "Rotate" => rotate,
            };
            if index > 0 {
                page.set("MediaBox", vec![0_i64.into(), 0_i64.into(), w.into(), h.into()]);
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }
        let (w0, h0, _) = pages[0];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages.len() as i64,
                "MediaBox" => vec![0_i64.into(), 0_i64.into(), w0.into(), h0.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc.save(path).unwrap();
    }

    #[test]
    fn page_boxes_follow_inheritance_and_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        write_pdf(&path, &[(612, 792, 0), (842, 595, 90), (300, 400, 180)]);
        let doc = Document::load(&path).unwrap();
        assert_eq!(
            page_boxes(&doc),
            vec![
                PageBox { width: 612.0, height: 792.0 },
                PageBox { width: 595.0, height: 842.0 },
                PageBox { width: 300.0, height: 400.0 },
            ]
        );
    }

    #[test]
    fn crop_box_wins_over_media_box() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropped.pdf");
        write_pdf(&path, &[(612, 792, 0), (612, 792, 90), (612, 792, 0), (612, 792, 0)]);
        let mut doc = Document::load(&path).unwrap();
        let ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let crops: [Vec<Object>; 4] = [
            // Inside the MediaBox.
            vec![36_i64.into(), 36_i64.into(), 576_i64.into(), 756_i64.into()],
            // Same crop on a rotated page.
            vec![36_i64.into(), 36_i64.into(), 576_i64.into(), 756_i64.into()],
            // Partly outside: clipped to the MediaBox, corners given reversed.
            vec![700_i64.into(), 900_i64.into(), 100_i64.into(), 0_i64.into()],
            // Disjoint: ignored.
            vec![1000_i64.into(), 1000_i64.into(), 1200_i64.into(), 1200_i64.into()],
        ];
        for (id, crop) in ids.iter().zip(crops) {
            doc.get_dictionary_mut(*id).unwrap().set("CropBox", crop);
        }
        doc.save(&path).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(
            page_boxes(&doc),
            vec![
                PageBox { width: 540.0, height: 720.0 },
                PageBox { width: 720.0, height: 540.0 },
                PageBox { width: 512.0, height: 792.0 },
                PageBox { width: 612.0, height: 792.0 },
            ]
        );
    }

    #[test]
    fn cropped_pages_keep_their_visible_size() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, &[(612, 792, 0)]);
        let mut doc = Document::load(&path).unwrap();
        let page = *doc.get_pages().values().next().unwrap();
        doc.get_dictionary_mut(page)
            .unwrap()
            .set("CropBox", vec![0_i64.into(), 0_i64.into(), 300_i64.into(), 400_i64.into()]);
        doc.save(&path).unwrap();

        PdfAnnotator::new(Arc::new(BlankRasterizer), 72.0)
            .annotate(&path, &stamper, &DocumentId::new())
            .unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(page_boxes(&doc), vec![PageBox { width: 300.0, height: 400.0 }]);
    }

    #[test]
    fn annotate_preserves_page_count_and_size() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, &[(612, 792, 0), (595, 842, 0)]);

        let annotator = PdfAnnotator::new(Arc::new(BlankRasterizer), 72.0);
        annotator
            .annotate(&path, &stamper, &DocumentId::new())
            .unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(
            page_boxes(&doc),
            vec![
                PageBox { width: 612.0, height: 792.0 },
                PageBox { width: 595.0, height: 842.0 },
            ]
        );
        // Only the rebuilt PDF remains; scratch pages and the .signed.pdf are gone.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc.pdf")]);
    }

    #[test]
    fn rebuilt_pages_carry_jpeg_images() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, &[(612, 792, 0)]);
        PdfAnnotator::new(Arc::new(BlankRasterizer), 72.0)
            .annotate(&path, &stamper, &DocumentId::new())
            .unwrap();

        let doc = Document::load(&path).unwrap();
        let images: Vec<_> = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]))
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Width").unwrap().as_i64().unwrap(), 612);
        assert!(images[0].content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn page_count_mismatch_leaves_original_untouched() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, &[(612, 792, 0), (612, 792, 0)]);
        let before = std::fs::read(&path).unwrap();

        let err = PdfAnnotator::new(Arc::new(ShortRasterizer), 72.0)
            .annotate(&path, &stamper, &DocumentId::new())
            .unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::PageCountMismatch { expected: 2, actual: 1 }
        ));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn non_pdf_input_is_a_pdf_error() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = PdfAnnotator::new(Arc::new(BlankRasterizer), 72.0)
            .annotate(&path, &stamper, &DocumentId::new())
            .unwrap_err();
        assert!(matches!(err, AnnotationError::Pdf(_)));
    }

    #[test]
    fn signed_path_appends_suffix() {
        assert_eq!(
            signed_path(Path::new("/tmp/x/upload.pdf")),
            PathBuf::from("/tmp/x/upload.pdf.signed.pdf")
        );
    }
}
