//! Image decoding and EXIF extraction

use crate::error::{Error, Result};
use crate::hypothesis::ImageMetadata;
use crate::provider::{ImageInput, ImageInspector};
use chrono::NaiveDateTime;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Reads image headers with `image` and EXIF tags with `kamadak-exif`
#[derive(Debug, Clone)]
pub struct ExifInspector {
    max_bytes: usize,
}

impl ExifInspector {
    /// Create an inspector rejecting images larger than `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for ExifInspector {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl ImageInspector for ExifInspector {
    fn inspect(&self, image: &ImageInput) -> Result<ImageMetadata> {
        if image.bytes.is_empty() {
            return Err(Error::InvalidImage("Image is empty".to_string()));
        }
        if image.bytes.len() > self.max_bytes {
            return Err(Error::InvalidImage(format!(
                "Image is {} bytes, limit is {}",
                image.bytes.len(),
                self.max_bytes
            )));
        }

        let reader = ImageReader::new(Cursor::new(&image.bytes))
            .with_guessed_format()
            .map_err(|e| Error::InvalidImage(e.to_string()))?;

        let format = match reader.format() {
            Some(f @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff)) => f,
            Some(other) => {
                return Err(Error::InvalidImage(format!(
                    "Unsupported image format: {:?}",
                    other
                )))
            }
            None => {
                return Err(Error::InvalidImage(
                    "Unrecognised image format".to_string(),
                ))
            }
        };

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| Error::InvalidImage(format!("Cannot decode image: {}", e)))?;

        let mut metadata = ImageMetadata {
            filename: image.filename.clone(),
            size_bytes: image.bytes.len(),
            width,
            height,
            format: format_name(format).to_string(),
            ..Default::default()
        };

        match exif::Reader::new().read_from_container(&mut Cursor::new(&image.bytes)) {
            Ok(exif) => {
                metadata.has_exif = true;
                read_exif_fields(&exif, &mut metadata);
            }
            Err(e) => debug!(filename = %image.filename, error = %e, "No EXIF data"),
        }

        Ok(metadata)
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

fn read_exif_fields(exif: &exif::Exif, metadata: &mut ImageMetadata) {
    metadata.camera_make = ascii_field(exif, exif::Tag::Make);
    metadata.camera_model = ascii_field(exif, exif::Tag::Model);
    metadata.datetime_taken = ascii_field(exif, exif::Tag::DateTimeOriginal)
        .or_else(|| ascii_field(exif, exif::Tag::DateTime))
        .and_then(|s| parse_exif_datetime(&s));

    let latitude = gps_axis(exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef, 'S');
    let longitude = gps_axis(exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef, 'W');
    if let (Some(lat), Some(lng)) = (latitude, longitude) {
        metadata.has_gps = true;
        metadata.latitude = Some(lat);
        metadata.longitude = Some(lng);
    }
}

/// First ASCII value of a tag, trimmed of padding
fn ascii_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(values) => {
            let raw = values.first()?;
            let s = String::from_utf8_lossy(raw)
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string();
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

/// Signed decimal degrees from a GPS rational triple and its reference tag
fn gps_axis(
    exif: &exif::Exif,
    value_tag: exif::Tag,
    ref_tag: exif::Tag,
    negative_ref: char,
) -> Option<f64> {
    let value = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let reference = ascii_field(exif, ref_tag)?;
    let degrees = parse_gps_coordinate(&value.value)?;
    Some(if reference.contains(negative_ref) {
        -degrees
    } else {
        degrees
    })
}

/// Degrees + minutes/60 + seconds/3600 from three rationals
fn parse_gps_coordinate(value: &exif::Value) -> Option<f64> {
    match value {
        exif::Value::Rational(r) if r.len() >= 3 => {
            let decimal = r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0;
            decimal.is_finite().then_some(decimal)
        }
        _ => None,
    }
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_inspect_png_without_exif() {
        let input = ImageInput::new("blank.png", png_bytes(8, 6));
        let meta = ExifInspector::default().inspect(&input).unwrap();

        assert_eq!(meta.filename, "blank.png");
        assert_eq!(meta.width, 8);
        assert_eq!(meta.height, 6);
        assert_eq!(meta.format, "png");
        assert!(!meta.has_exif);
        assert!(!meta.has_gps);
        assert!(meta.gps().is_none());
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let input = ImageInput::new("fake.jpg", b"definitely not an image".to_vec());
        let err = ExifInspector::default().inspect(&input).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_inspect_rejects_empty() {
        let input = ImageInput::new("empty.jpg", Vec::new());
        assert!(ExifInspector::default().inspect(&input).is_err());
    }

    #[test]
    fn test_inspect_rejects_oversized() {
        let input = ImageInput::new("big.png", png_bytes(8, 8));
        let inspector = ExifInspector::new(16);
        assert!(matches!(
            inspector.inspect(&input),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn test_parse_gps_coordinate() {
        let value = exif::Value::Rational(vec![
            exif::Rational { num: 48, denom: 1 },
            exif::Rational { num: 51, denom: 1 },
            exif::Rational { num: 3024, denom: 100 },
        ]);
        assert_relative_eq!(parse_gps_coordinate(&value).unwrap(), 48.8584, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_gps_coordinate_rejects_short_or_zero_denominator() {
        let short = exif::Value::Rational(vec![exif::Rational { num: 48, denom: 1 }]);
        assert!(parse_gps_coordinate(&short).is_none());

        let zero = exif::Value::Rational(vec![
            exif::Rational { num: 48, denom: 0 },
            exif::Rational { num: 0, denom: 1 },
            exif::Rational { num: 0, denom: 1 },
        ]);
        assert!(parse_gps_coordinate(&zero).is_none());
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2023:07:14 18:30:05").unwrap();
        assert_eq!(dt.to_string(), "2023-07-14 18:30:05");
        assert!(parse_exif_datetime("yesterday").is_none());
    }
}
