//! Export a volume as a series of single-frame Secondary Capture DICOM files.
use dicom::core::dictionary::DataDictionary;
use dicom::core::value::{PrimitiveValue, C};
use dicom::core::{DataElement, Tag, VR};
use dicom::dictionary_std::{tags, uids, StandardDataDictionary};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use indicatif::{ProgressBar, ProgressIterator};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::errors::series::*;
use crate::volume::Volume;

/// A user supplied `GGGG|EEEE,value` tag override
#[derive(Debug, Clone, PartialEq)]
pub struct TagAssignment {
    pub tag: Tag,
    pub value: String,
}

impl FromStr for TagAssignment {
    type Err = DicomError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (key, value) = input.split_once(',').context(InvalidTagSnafu {
            input,
            reason: "expected GGGG|EEEE,value",
        })?;
        let (group, element) = key.trim().split_once('|').context(InvalidTagSnafu {
            input,
            reason: "expected '|' between group and element",
        })?;
        let parse_hex = |part: &str| {
            let part = part.trim();
            match part.len() {
                4 => u16::from_str_radix(part, 16).ok(),
                _ => None,
            }
        };
        let group = parse_hex(group).context(InvalidTagSnafu {
            input,
            reason: "group must be four hexadecimal digits",
        })?;
        let element = parse_hex(element).context(InvalidTagSnafu {
            input,
            reason: "element must be four hexadecimal digits",
        })?;
        Ok(TagAssignment {
            tag: Tag(group, element),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for TagAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}|{:04x},{}",
            self.tag.group(),
            self.tag.element(),
            self.value
        )
    }
}

impl TagAssignment {
    /// Value representation from the standard dictionary. Unknown and private tags are LO.
    pub fn vr(&self) -> VR {
        StandardDataDictionary
            .by_tag(self.tag)
            .map(|entry| entry.vr.relaxed())
            .unwrap_or(VR::LO)
    }

    pub fn to_element(&self) -> Result<DataElement<InMemDicomObject>, DicomError> {
        let vr = self.vr();
        let value = parse_value(self.tag, vr, &self.value)?;
        Ok(DataElement::new(self.tag, vr, value))
    }
}

fn parse_numbers<T: FromStr>(tag: Tag, vr: VR, value: &str) -> Result<C<T>, DicomError> {
    value
        .split('\\')
        .map(|v| {
            v.trim().parse::<T>().ok().context(ParseValueSnafu {
                tag: tag.to_string(),
                vr: vr.to_string(),
                value,
            })
        })
        .collect()
}

/// Binary numeric VRs are parsed, any other VR keeps the text. Backslashes separate values.
pub fn parse_value(tag: Tag, vr: VR, value: &str) -> Result<PrimitiveValue, DicomError> {
    let value = match vr {
        VR::US => PrimitiveValue::U16(parse_numbers(tag, vr, value)?),
        VR::SS => PrimitiveValue::I16(parse_numbers(tag, vr, value)?),
        VR::UL => PrimitiveValue::U32(parse_numbers(tag, vr, value)?),
        VR::SL => PrimitiveValue::I32(parse_numbers(tag, vr, value)?),
        VR::FL => PrimitiveValue::F32(parse_numbers(tag, vr, value)?),
        VR::FD => PrimitiveValue::F64(parse_numbers(tag, vr, value)?),
        _ if value.contains('\\') => PrimitiveValue::Strs(value.split('\\').map(String::from).collect()),
        _ => PrimitiveValue::from(value),
    };
    Ok(value)
}

/// A new UID under the `2.25` root, derived from a random 128-bit number
pub fn generate_uid() -> String {
    format!("2.25.{}", rand::random::<u128>())
}

/// Decimal string within the 16 character limit of DS
fn format_ds(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        text => text.to_string(),
    }
}

fn ds_values(values: &[f64]) -> PrimitiveValue {
    PrimitiveValue::Strs(values.iter().map(|v| format_ds(*v)).collect())
}

/// Writes one file per z slice, named `<dir>/<prefix><index>.dcm` with a four digit index
#[derive(Debug, Clone)]
pub struct SeriesWriter {
    dir: PathBuf,
    prefix: String,
    tags: Vec<TagAssignment>,
}

impl SeriesWriter {
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> Self {
        SeriesWriter {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<TagAssignment>) -> Self {
        self.tags = tags;
        self
    }

    pub fn file_name(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{:04}.dcm", self.prefix, index))
    }

    fn slice_object(
        &self,
        volume: &Volume<i16>,
        z: usize,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> InMemDicomObject {
        let [width, height, _] = volume.size();
        let geometry = volume.geometry;
        let [sx, sy, sz] = geometry.spacing;
        let position = geometry.physical_point([0, 0, z as i64]);
        let pixels = volume
            .slice(z)
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<u8>>();

        let mut obj = InMemDicomObject::new_empty();
        let mut put = |tag: Tag, vr: VR, value: PrimitiveValue| {
            obj.put(DataElement::new(tag, vr, value));
        };
        put(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE));
        put(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(sop_uid));
        put(tags::STUDY_INSTANCE_UID, VR::UI, PrimitiveValue::from(study_uid));
        put(tags::SERIES_INSTANCE_UID, VR::UI, PrimitiveValue::from(series_uid));
        put(
            tags::IMAGE_TYPE,
            VR::CS,
            PrimitiveValue::Strs(["DERIVED".to_string(), "SECONDARY".to_string()].into()),
        );
        put(tags::MODALITY, VR::CS, PrimitiveValue::from("OT"));
        put(tags::CONVERSION_TYPE, VR::CS, PrimitiveValue::from("WSD"));
        put(tags::INSTANCE_NUMBER, VR::IS, PrimitiveValue::from((z + 1).to_string()));
        put(tags::IMAGE_POSITION_PATIENT, VR::DS, ds_values(&position));
        put(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            ds_values(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        );
        put(tags::SLICE_THICKNESS, VR::DS, PrimitiveValue::from(format_ds(sz)));
        // Pixel Spacing is (row, column)
        put(tags::PIXEL_SPACING, VR::DS, ds_values(&[sy, sx]));
        put(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1u16));
        put(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, PrimitiveValue::from("MONOCHROME2"));
        put(tags::ROWS, VR::US, PrimitiveValue::from(height as u16));
        put(tags::COLUMNS, VR::US, PrimitiveValue::from(width as u16));
        put(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16u16));
        put(tags::BITS_STORED, VR::US, PrimitiveValue::from(16u16));
        put(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15u16));
        put(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(1u16));
        put(tags::PIXEL_DATA, VR::OW, PrimitiveValue::from(pixels));
        obj
    }

    /// Write every z slice, returning the written paths in slice order.
    pub fn write(&self, volume: &Volume<i16>, pb: ProgressBar) -> Result<Vec<PathBuf>, DicomError> {
        let [width, height, _] = volume.size();
        let limit = u16::MAX as usize;
        ensure!(width <= limit && height <= limit, ImageTooLargeSnafu { width, height });
        std::fs::create_dir_all(&self.dir).context(CreateDirSnafu { path: &self.dir })?;

        let overrides = self
            .tags
            .iter()
            .map(|assignment| {
                let element = assignment.to_element()?;
                debug!("Tag {} is written as {}", assignment.tag, element.vr());
                Ok(element)
            })
            .collect::<Result<Vec<_>, DicomError>>()?;

        let study_uid = generate_uid();
        let series_uid = generate_uid();
        debug!("Study UID {}, series UID {}", study_uid, series_uid);

        let [_, _, depth] = volume.size();
        let mut paths = Vec::with_capacity(depth);
        for z in (0..depth).progress_with(pb) {
            let sop_uid = generate_uid();
            let mut obj = self.slice_object(volume, z, &study_uid, &series_uid, &sop_uid);
            for element in overrides.iter() {
                obj.put(element.clone());
            }
            let obj = obj
                .with_meta(
                    FileMetaTableBuilder::new()
                        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                        .media_storage_sop_instance_uid(&sop_uid),
                )
                .context(BuildMetaSnafu { slice: z })?;
            let path = self.file_name(z);
            obj.write_to_file(&path).context(WriteSnafu { path: &path })?;
            debug!("Wrote slice {} to {}", z, path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}
