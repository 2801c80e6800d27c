//! Texture file resolution and decoding.
//!
//! Paths are filesystem paths, optionally prefixed with `file://`. Relative paths are tried
//! against the working directory first and then the crate root, so running from `target/`
//! still finds `assets/`.

use std::path::{Path, PathBuf};

/// Decoded image, tightly packed RGBA8, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("'{uri}' not found (tried: {})", display_paths(.tried))]
    NotFound { uri: String, tried: Vec<PathBuf> },

    #[error("read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode: {0}")]
    Decode(#[from] image::ImageError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find the file a texture URI refers to.
pub fn resolve_path(uri: &str) -> Result<PathBuf, TextureError> {
    let raw = Path::new(uri.strip_prefix("file://").unwrap_or(uri));

    let candidates: Vec<PathBuf> = if raw.is_absolute() {
        vec![raw.to_path_buf()]
    } else {
        let mut c = Vec::with_capacity(2);
        if let Ok(cwd) = std::env::current_dir() {
            c.push(cwd.join(raw));
        }
        c.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(raw));
        c
    };

    if let Some(found) = candidates.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    Err(TextureError::NotFound {
        uri: uri.to_string(),
        tried: candidates,
    })
}

/// Resolve, read and decode a texture.
pub fn load(uri: &str) -> Result<RgbaTexture, TextureError> {
    let path = resolve_path(uri)?;
    let bytes = std::fs::read(&path).map_err(|source| TextureError::Read {
        path: path.clone(),
        source,
    })?;
    decode(&bytes)
}

/// Decode any format the `image` features enable; the format is sniffed from the bytes.
pub fn decode(bytes: &[u8]) -> Result<RgbaTexture, TextureError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(RgbaTexture {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(w, h, |x, y| image::Rgba([x as u8, y as u8, 7, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let RgbaTexture {
            width,
            height,
            pixels,
        } = decode(&png_bytes(3, 2)).unwrap();
        assert_eq!((width, height), (3, 2));
        assert_eq!(pixels.len(), 3 * 2 * 4);
        // Pixel (2, 1).
        assert_eq!(&pixels[(1 * 3 + 2) * 4..(1 * 3 + 2) * 4 + 4], &[2, 1, 7, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode(b"not an image").unwrap_err();
        assert!(matches!(err, TextureError::Decode(_)));

        // DDS is not among the enabled image formats.
        let err = decode(b"DDS \x7c\0\0\0").unwrap_err();
        assert!(matches!(err, TextureError::Decode(_)));
    }

    #[test]
    fn missing_file_reports_tried_paths() {
        let err = load("definitely/not/here.png").unwrap_err();
        match err {
            TextureError::NotFound { uri, tried } => {
                assert_eq!(uri, "definitely/not/here.png");
                assert!(!tried.is_empty());
                assert!(tried.iter().all(|p| p.ends_with("definitely/not/here.png")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn format_comes_from_contents_not_extension() {
        let path = std::env::temp_dir().join(format!("scroll-scene-{}-tex.dds", std::process::id()));
        std::fs::write(&path, png_bytes(2, 2)).unwrap();

        let decoded = load(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);

        let tex = decoded.unwrap();
        assert_eq!((tex.width, tex.height), (2, 2));
    }
}
