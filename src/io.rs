use image::codecs::png::PngEncoder;
use image::{ImageError, Rgba, RgbaImage};
use rayon::prelude::*;
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::log_warn;
use crate::palette::{self, Palette};
use crate::scene::{SceneObject, SurfaceStore};
use crate::surface::Surface;

// ============================================================================
// PIXELPAD DOCUMENT FORMAT (.pixelpad.json)
// ============================================================================

/// Current document schema version.
const PAD_FORMAT_VERSION: u32 = 1;

/// Maximum surface dimension accepted from a document file (per axis).
/// Keeps a crafted file from allocating the machine away.
const MAX_SURFACE_DIM: u32 = 4096;
/// Maximum number of objects in a document file.
const MAX_OBJECTS: usize = 256;

/// On-disk document. Pixels are stored as `[index, count]` runs per object;
/// colors never appear in pixel data, only in the palette list.
#[derive(Serialize, Deserialize)]
struct PadFile {
    version: u32,
    /// Packed RGBA colors, slot 0 transparent.
    palette: Vec<u32>,
    active_object: usize,
    objects: Vec<PadObjectData>,
}

#[derive(Serialize, Deserialize)]
struct PadObjectData {
    x: i32,
    y: i32,
    tint: [f32; 4],
    width: u32,
    height: u32,
    /// Run-length encoded palette indices, row-major.
    runs: Vec<(u8, u32)>,
}

/// One document object decoded from disk, not yet registered with a store.
pub struct LoadedObject {
    pub x: i32,
    pub y: i32,
    pub tint: [f32; 4],
    pub surface: Surface,
}

/// A fully validated document, ready for the editor to adopt.
pub struct LoadedDocument {
    pub palette: Palette,
    pub active_object: usize,
    pub objects: Vec<LoadedObject>,
}

/// Error type for document and image file operations.
#[derive(Debug)]
pub enum PadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Image(ImageError),
    InvalidFormat(String),
}

impl std::fmt::Display for PadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PadError::Io(e) => write!(f, "I/O error: {}", e),
            PadError::Json(e) => write!(f, "JSON error: {}", e),
            PadError::Image(e) => write!(f, "Image error: {}", e),
            PadError::InvalidFormat(e) => write!(f, "Invalid document: {}", e),
        }
    }
}

impl std::error::Error for PadError {}

impl From<std::io::Error> for PadError {
    fn from(e: std::io::Error) -> Self {
        PadError::Io(e)
    }
}

impl From<serde_json::Error> for PadError {
    fn from(e: serde_json::Error) -> Self {
        PadError::Json(e)
    }
}

impl From<ImageError> for PadError {
    fn from(e: ImageError) -> Self {
        PadError::Image(e)
    }
}

/// Save the current scene as a .pixelpad.json document.
pub fn save_document(
    path: &Path,
    palette: &Palette,
    objects: &[SceneObject],
    store: &SurfaceStore,
    active_object: usize,
) -> Result<(), PadError> {
    let document = build_document(palette, objects, store, active_object);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, &document)?;
    Ok(())
}

/// Build the serializable document from live editor state. Copies all pixel
/// data, so the result can be handed to a background thread for writing.
fn build_document(
    palette: &Palette,
    objects: &[SceneObject],
    store: &SurfaceStore,
    active_object: usize,
) -> PadFile {
    let mut out = Vec::with_capacity(objects.len());
    for object in objects {
        let Some(surface) = store.get(object.surface) else {
            log_warn!("skipping object with missing surface {:?}", object.surface);
            continue;
        };
        out.push(PadObjectData {
            x: object.x,
            y: object.y,
            tint: object.tint,
            width: surface.width(),
            height: surface.height(),
            runs: encode_runs(surface.pixels()),
        });
    }
    PadFile {
        version: PAD_FORMAT_VERSION,
        palette: palette.colors().to_vec(),
        active_object: active_object.min(out.len().saturating_sub(1)),
        objects: out,
    }
}

/// Load and validate a .pixelpad.json document.
pub fn load_document(path: &Path) -> Result<LoadedDocument, PadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let document: PadFile = serde_json::from_reader(reader)?;
    realize_document(document)
}

fn realize_document(document: PadFile) -> Result<LoadedDocument, PadError> {
    if document.version != PAD_FORMAT_VERSION {
        return Err(PadError::InvalidFormat(format!(
            "unsupported document version {}",
            document.version
        )));
    }
    if document.objects.is_empty() {
        return Err(PadError::InvalidFormat("document contains no objects".into()));
    }
    if document.objects.len() > MAX_OBJECTS {
        return Err(PadError::InvalidFormat(format!(
            "document contains {} objects, maximum is {}",
            document.objects.len(),
            MAX_OBJECTS
        )));
    }

    let mut objects = Vec::with_capacity(document.objects.len());
    for (i, data) in document.objects.into_iter().enumerate() {
        if data.width == 0 || data.height == 0 {
            return Err(PadError::InvalidFormat(format!(
                "object {} has zero dimension ({}x{})",
                i, data.width, data.height
            )));
        }
        if data.width > MAX_SURFACE_DIM || data.height > MAX_SURFACE_DIM {
            return Err(PadError::InvalidFormat(format!(
                "object {} is {}x{}, maximum is {}x{}",
                i, data.width, data.height, MAX_SURFACE_DIM, MAX_SURFACE_DIM
            )));
        }
        let len = data.width as usize * data.height as usize;
        let pixels = decode_runs(&data.runs, len).map_err(|e| {
            PadError::InvalidFormat(format!("object {}: {}", i, e))
        })?;
        let Some(surface) = Surface::from_pixels(data.width, data.height, pixels) else {
            return Err(PadError::InvalidFormat(format!(
                "object {} pixel data does not match its dimensions",
                i
            )));
        };
        objects.push(LoadedObject {
            x: data.x,
            y: data.y,
            tint: data.tint,
            surface,
        });
    }

    Ok(LoadedDocument {
        palette: Palette::from_colors(&document.palette),
        active_object: document.active_object.min(objects.len() - 1),
        objects,
    })
}

/// Run-length encode a pixel buffer as `(palette index, count)` pairs.
fn encode_runs(pixels: &[u32]) -> Vec<(u8, u32)> {
    let mut runs = Vec::new();
    let mut iter = pixels.iter();
    let Some(&first) = iter.next() else {
        return runs;
    };
    let mut index = palette::pixel_index(first);
    let mut count: u32 = 1;
    for &px in iter {
        let i = palette::pixel_index(px);
        if i == index {
            count += 1;
        } else {
            runs.push((index, count));
            index = i;
            count = 1;
        }
    }
    runs.push((index, count));
    runs
}

/// Expand runs back into index-encoded pixels; `len` is the expected pixel
/// count and any mismatch is an error.
fn decode_runs(runs: &[(u8, u32)], len: usize) -> Result<Vec<u32>, String> {
    let mut pixels = Vec::with_capacity(len);
    for &(index, count) in runs {
        if pixels.len() + count as usize > len {
            return Err(format!(
                "pixel runs cover more than {} pixels",
                len
            ));
        }
        pixels.extend(std::iter::repeat(palette::index_color(index)).take(count as usize));
    }
    if pixels.len() != len {
        return Err(format!(
            "pixel runs cover {} of {} pixels",
            pixels.len(),
            len
        ));
    }
    Ok(pixels)
}

// ============================================================================
// IMAGE EXPORT / IMPORT
// ============================================================================

/// Resolve index pixels through the palette into a true-color image.
pub fn resolve_to_rgba(surface: &Surface, palette: &Palette) -> RgbaImage {
    let mut img = RgbaImage::new(surface.width(), surface.height());
    for (&px, out) in surface.pixels().iter().zip(img.pixels_mut()) {
        *out = Rgba(palette::unpack(palette.resolve(palette::pixel_index(px))));
    }
    img
}

/// Export one surface as a PNG with palette colors baked in.
pub fn export_png(path: &Path, surface: &Surface, palette: &Palette) -> Result<(), PadError> {
    let img = resolve_to_rgba(surface, palette);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

/// Decode any raster image the `image` crate understands and quantize it
/// into index pixels against the given palette.
pub fn import_image(path: &Path, palette: &Palette) -> Result<Surface, PadError> {
    let img = image::open(path)?.to_rgba8();
    if img.width() > MAX_SURFACE_DIM || img.height() > MAX_SURFACE_DIM {
        return Err(PadError::InvalidFormat(format!(
            "image is {}x{}, maximum is {}x{}",
            img.width(),
            img.height(),
            MAX_SURFACE_DIM,
            MAX_SURFACE_DIM
        )));
    }
    quantize_image(&img, palette).ok_or_else(|| {
        PadError::InvalidFormat("decoded image does not match its dimensions".into())
    })
}

/// Map an RGBA image onto the palette: one nearest-color search per distinct
/// color (searches run in parallel), then a table lookup per pixel. Imports
/// of already-indexed art cost one search per palette color.
pub fn quantize_image(img: &RgbaImage, palette: &Palette) -> Option<Surface> {
    let mut seen = HashSet::new();
    let mut distinct = Vec::new();
    for px in img.pixels() {
        let color = u32::from_le_bytes(px.0);
        if seen.insert(color) {
            distinct.push(color);
        }
    }

    let table: HashMap<u32, u32> = distinct
        .par_iter()
        .map(|&color| (color, palette::index_color(palette.nearest_index(color))))
        .collect();

    let pixels: Vec<u32> = img
        .pixels()
        .map(|px| table.get(&u32::from_le_bytes(px.0)).copied().unwrap_or(0))
        .collect();
    Surface::from_pixels(img.width(), img.height(), pixels)
}

// ============================================================================
// FILE DIALOGS
// ============================================================================

pub fn is_document_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

pub fn pick_open_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter(
            "All Supported",
            &["json", "png", "bmp", "gif", "jpg", "jpeg", "webp", "tga", "tiff"],
        )
        .add_filter("PixelPad document", &["json"])
        .add_filter(
            "Images",
            &["png", "bmp", "gif", "jpg", "jpeg", "webp", "tga", "tiff"],
        )
        .pick_file()
}

pub fn pick_save_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PixelPad document", &["json"])
        .set_file_name("untitled.pixelpad.json")
        .save_file()
}

pub fn pick_import_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter(
            "Images",
            &["png", "bmp", "gif", "jpg", "jpeg", "webp", "tga", "tiff"],
        )
        .pick_file()
}

pub fn pick_export_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name("export.png")
        .save_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{index_color, pack};
    use crate::scene::SceneObject;

    fn checker_surface() -> Surface {
        let mut surface = Surface::new(4, 2);
        surface.with_pixels(|px| {
            for (i, p) in px.iter_mut().enumerate() {
                *p = index_color(((i % 2) + 1) as u8);
            }
        });
        surface
    }

    #[test]
    fn runs_round_trip() {
        let surface = checker_surface();
        let runs = encode_runs(surface.pixels());
        let decoded = decode_runs(&runs, surface.pixels().len()).unwrap();
        assert_eq!(decoded, surface.pixels());
    }

    #[test]
    fn runs_collapse_uniform_buffers() {
        let pixels = vec![index_color(7); 4096];
        let runs = encode_runs(&pixels);
        assert_eq!(runs, vec![(7, 4096)]);
    }

    #[test]
    fn decode_rejects_short_and_long_runs() {
        assert!(decode_runs(&[(1, 3)], 4).is_err());
        assert!(decode_runs(&[(1, 5)], 4).is_err());
        assert!(decode_runs(&[(1, 2), (2, 2)], 4).is_ok());
    }

    #[test]
    fn document_round_trips_through_json() {
        let mut store = SurfaceStore::new();
        let id = store.insert(checker_surface());
        let objects = vec![SceneObject::new(id, 3, -2).with_tint([1.0, 0.5, 0.5, 1.0])];
        let palette = Palette::starter();

        let document = build_document(&palette, &objects, &store, 0);
        let text = serde_json::to_string(&document).unwrap();
        let parsed: PadFile = serde_json::from_str(&text).unwrap();
        let loaded = realize_document(parsed).unwrap();

        assert_eq!(loaded.palette.colors(), palette.colors());
        assert_eq!(loaded.objects.len(), 1);
        assert_eq!(loaded.objects[0].x, 3);
        assert_eq!(loaded.objects[0].y, -2);
        assert_eq!(loaded.objects[0].tint, [1.0, 0.5, 0.5, 1.0]);
        assert_eq!(loaded.objects[0].surface.pixels(), store.get(id).unwrap().pixels());
    }

    #[test]
    fn realize_rejects_bad_documents() {
        let empty = PadFile {
            version: PAD_FORMAT_VERSION,
            palette: vec![0],
            active_object: 0,
            objects: Vec::new(),
        };
        assert!(realize_document(empty).is_err());

        let future = PadFile {
            version: PAD_FORMAT_VERSION + 1,
            palette: vec![0],
            active_object: 0,
            objects: Vec::new(),
        };
        assert!(matches!(
            realize_document(future),
            Err(PadError::InvalidFormat(_))
        ));

        let zero_dim = PadFile {
            version: PAD_FORMAT_VERSION,
            palette: vec![0],
            active_object: 0,
            objects: vec![PadObjectData {
                x: 0,
                y: 0,
                tint: [1.0; 4],
                width: 0,
                height: 4,
                runs: Vec::new(),
            }],
        };
        assert!(realize_document(zero_dim).is_err());
    }

    #[test]
    fn active_object_is_clamped_on_load() {
        let mut store = SurfaceStore::new();
        let id = store.insert(Surface::new(2, 2));
        let objects = vec![SceneObject::new(id, 0, 0)];
        let document = build_document(&Palette::starter(), &objects, &store, 40);
        let loaded = realize_document(document).unwrap();
        assert_eq!(loaded.active_object, 0);
    }

    #[test]
    fn quantize_maps_exact_palette_colors_to_their_slots() {
        let palette = Palette::from_colors(&[
            0,
            pack(255, 0, 0, 255),
            pack(0, 255, 0, 255),
            pack(0, 0, 255, 255),
        ]);
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(2, 0, Rgba([0, 0, 255, 40])); // translucent -> erased

        let surface = quantize_image(&img, &palette).unwrap();
        assert_eq!(surface.pixels()[0], index_color(1));
        assert_eq!(surface.pixels()[1], index_color(2));
        assert_eq!(surface.pixels()[2], 0);
    }

    #[test]
    fn resolve_bakes_palette_colors() {
        let palette = Palette::from_colors(&[0, pack(10, 20, 30, 255)]);
        let mut surface = Surface::new(2, 1);
        surface.put(0, 0, index_color(1));

        let img = resolve_to_rgba(&surface, &palette);
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn document_paths_detected_by_extension() {
        assert!(is_document_path(Path::new("art.pixelpad.json")));
        assert!(is_document_path(Path::new("ART.JSON")));
        assert!(!is_document_path(Path::new("art.png")));
    }
}
