//! EXIF metadata extraction from images.

use exif::{Context, Field, In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::types::{ExifData, ExifValue};

/// Extracts EXIF metadata into a flat, serializable map.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract EXIF data from an in-memory image.
    ///
    /// Images without an EXIF block, or with one that cannot be parsed,
    /// yield an empty map. Individual fields that have no scalar form are
    /// skipped without affecting the rest.
    pub fn extract_from_bytes(bytes: &[u8]) -> ExifData {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::trace!("No usable EXIF block: {e}");
                return ExifData::default();
            }
        };

        let mut tags = BTreeMap::new();
        let mut gps = BTreeMap::new();

        for field in exif.fields() {
            if field.ifd_num != In::PRIMARY {
                continue;
            }
            let Some(value) = normalize_value(field) else {
                continue;
            };
            match field.tag.context() {
                Context::Tiff | Context::Exif => {
                    tags.insert(tag_name(field.tag), value);
                }
                Context::Gps => {
                    gps.insert(tag_name(field.tag), value);
                }
                _ => {}
            }
        }

        ExifData {
            tags,
            gps: (!gps.is_empty()).then_some(gps),
        }
    }
}

/// Standard tag name, or the decimal tag number for tags the reader doesn't know.
fn tag_name(tag: Tag) -> String {
    if tag.description().is_some() {
        tag.to_string()
    } else {
        tag.number().to_string()
    }
}

/// Map one EXIF field onto a number or text, or drop it.
///
/// Single integers and finite floats stay numeric; ASCII becomes text;
/// rationals and multi-valued fields use their display form. Binary
/// (`UNDEFINED`) and unknown-typed values are dropped.
fn normalize_value(field: &Field) -> Option<ExifValue> {
    let display = || ExifValue::text(field.display_value().to_string());

    match &field.value {
        Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Some(ExifValue::text(text.trim()))
        }
        Value::Byte(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::Short(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::Long(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::SByte(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::SShort(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::SLong(v) => single_or_display(v, |x| i64::from(*x), display),
        Value::Float(v) if v.len() == 1 => Some(ExifValue::float(f64::from(v[0]))),
        Value::Double(v) if v.len() == 1 => Some(ExifValue::float(v[0])),
        Value::Float(v) if v.is_empty() => None,
        Value::Double(v) if v.is_empty() => None,
        Value::Rational(v) if v.is_empty() => None,
        Value::SRational(v) if v.is_empty() => None,
        Value::Float(_) | Value::Double(_) | Value::Rational(_) | Value::SRational(_) => {
            Some(display())
        }
        Value::Undefined(..) | Value::Unknown(..) => None,
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn single_or_display<T>(
    values: &[T],
    to_i64: impl Fn(&T) -> i64,
    display: impl Fn() -> ExifValue,
) -> Option<ExifValue> {
    match values {
        [] => None,
        [single] => Some(ExifValue::integer(to_i64(single))),
        _ => Some(display()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::Rational;
    use image::{DynamicImage, ImageFormat, RgbImage};

    /// Encode EXIF fields as a TIFF structure.
    fn exif_tiff(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut buffer = Cursor::new(Vec::new());
        writer.write(&mut buffer, false).unwrap();
        buffer.into_inner()
    }

    /// A JPEG with an APP1 EXIF segment spliced in after SOI.
    pub(crate) fn jpeg_with_exif(width: u32, height: u32, fields: &[Field]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([50, 200, 100]),
        ));
        let mut jpeg = Cursor::new(Vec::new());
        img.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();
        let jpeg = jpeg.into_inner();

        let tiff = exif_tiff(fields);
        let segment_len = (2 + 6 + tiff.len()) as u16;
        let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    pub(crate) fn ascii(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    #[test]
    fn test_no_exif_is_empty() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png).unwrap();

        let data = MetadataExtractor::extract_from_bytes(&png.into_inner());
        assert!(data.is_empty());
    }

    #[test]
    fn test_garbage_is_empty() {
        let data = MetadataExtractor::extract_from_bytes(b"not an image at all");
        assert!(data.is_empty());
    }

    #[test]
    fn test_make_and_model_are_text() {
        let bytes = jpeg_with_exif(
            16,
            16,
            &[
                ascii(Tag::Make, "TestCamera"),
                ascii(Tag::Model, "Model X"),
                ascii(Tag::Software, "TestSuite 1.0"),
            ],
        );
        let data = MetadataExtractor::extract_from_bytes(&bytes);
        assert_eq!(data.get("Make"), Some(&ExifValue::text("TestCamera")));
        assert_eq!(data.get("Model"), Some(&ExifValue::text("Model X")));
        assert_eq!(data.get("Software"), Some(&ExifValue::text("TestSuite 1.0")));
        assert!(data.gps.is_none());
    }

    #[test]
    fn test_scalars_rationals_and_binary() {
        let fields = [
            Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![6]),
            },
            Field {
                tag: Tag::XResolution,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![Rational { num: 72, denom: 1 }]),
            },
            Field {
                tag: Tag::ExifVersion,
                ifd_num: In::PRIMARY,
                value: Value::Undefined(b"0230".to_vec(), 0),
            },
        ];
        let data = MetadataExtractor::extract_from_bytes(&jpeg_with_exif(8, 8, &fields));

        assert_eq!(data.get("Orientation"), Some(&ExifValue::integer(6)));
        assert!(matches!(data.get("XResolution"), Some(ExifValue::Text(_))));
        assert!(data.get("ExifVersion").is_none());
    }

    #[test]
    fn test_gps_is_nested() {
        let fields = [
            ascii(Tag::Make, "TestCamera"),
            ascii(Tag::GPSLatitudeRef, "N"),
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![
                    Rational { num: 52, denom: 1 },
                    Rational { num: 30, denom: 1 },
                    Rational { num: 0, denom: 1 },
                ]),
            },
        ];
        let data = MetadataExtractor::extract_from_bytes(&jpeg_with_exif(8, 8, &fields));

        let gps = data.gps.as_ref().expect("GPS block should be present");
        assert_eq!(gps.get("GPSLatitudeRef"), Some(&ExifValue::text("N")));
        assert!(matches!(gps.get("GPSLatitude"), Some(ExifValue::Text(_))));
        assert!(data.get("GPSLatitudeRef").is_none());
    }
}
