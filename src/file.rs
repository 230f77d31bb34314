use indicatif::{ProgressBar, ProgressStyle};
use rust_search::SearchBuilder;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub const DICM_PREFIX: &[u8; 4] = b"DICM";
pub const DICM_PREFIX_LOCATION: u64 = 128;

type IOResult<T> = Result<T, std::io::Error>;

const BAR_TEMPLATE: &str =
    "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta} @ {per_sec})";

pub fn default_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

pub fn default_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

/// On-disk formats recognised by the volume reader and writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Tiff,
    Png,
    Dicom,
    DicomSeries,
}

pub trait VolumeFileOperations
where
    Self: AsRef<Path>,
{
    fn has_tiff_extension(&self) -> bool {
        match self.as_ref().extension() {
            Some(ext) => ext == "tiff" || ext == "tif" || ext == "TIFF" || ext == "TIF",
            None => false,
        }
    }

    fn has_png_extension(&self) -> bool {
        match self.as_ref().extension() {
            Some(ext) => ext == "png" || ext == "PNG",
            None => false,
        }
    }

    fn has_dicom_extension(&self) -> bool {
        match self.as_ref().extension() {
            Some(ext) => ext == "dcm" || ext == "dicom" || ext == "DCM" || ext == "DICOM",
            None => false,
        }
    }

    /// Check if a file has a DICM prefix.
    /// This will only return an error if the file cannot be opened.
    fn has_dicm_prefix(&self) -> IOResult<bool> {
        let mut reader = File::open(self.as_ref())?;
        let mut buffer = [0; DICM_PREFIX.len()];
        reader
            .seek(SeekFrom::Start(DICM_PREFIX_LOCATION))
            .and_then(|_| reader.read_exact(&mut buffer))
            .map_or(Ok(false), |_| Ok(&buffer == DICM_PREFIX))
    }

    /// Extension first, then the DICM prefix for extensionless files.
    fn is_dicom_file(&self) -> IOResult<bool> {
        let path = self.as_ref();
        if self.has_dicom_extension() {
            Ok(path.is_file())
        } else if path.extension().is_some() || path.is_dir() {
            Ok(false)
        } else {
            self.has_dicm_prefix()
        }
    }

    fn is_dicom_file_or(&self, default: bool) -> bool {
        self.is_dicom_file().unwrap_or(default)
    }

    /// Find all DICOM files below a directory.
    fn find_dicoms(&self) -> IOResult<impl Iterator<Item = PathBuf>> {
        let dir = self.as_ref();
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Not a directory",
            ));
        }
        let result = SearchBuilder::default()
            .location(dir)
            .build()
            .map(PathBuf::from)
            .filter(|file| file.is_dicom_file_or(false));
        Ok(result)
    }

    /// Classify a path by extension. Directories are read as DICOM series.
    fn volume_format(&self) -> Option<VolumeFormat> {
        if self.as_ref().is_dir() {
            Some(VolumeFormat::DicomSeries)
        } else if self.has_tiff_extension() {
            Some(VolumeFormat::Tiff)
        } else if self.has_png_extension() {
            Some(VolumeFormat::Png)
        } else if self.has_dicom_extension() {
            Some(VolumeFormat::Dicom)
        } else {
            None
        }
    }
}

impl<P: AsRef<Path>> VolumeFileOperations for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    #[case::empty_file(vec![], false)]
    #[case::dicm_prefix(b"DICM".to_vec(), true)]
    #[case::wrong_prefix(b"NOT_DICM".to_vec(), false)]
    fn test_has_dicm_prefix(#[case] contents: Vec<u8>, #[case] expected: bool) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0; DICM_PREFIX_LOCATION as usize]).unwrap();
        file.write_all(&contents).unwrap();
        assert_eq!(path.has_dicm_prefix().unwrap(), expected);
    }

    #[test]
    fn test_has_dicm_prefix_real_dicom() {
        let path = dicom_test_files::path("pydicom/CT_small.dcm").unwrap();
        assert!(path.has_dicm_prefix().unwrap());
    }

    #[rstest]
    #[case::no_extension("test", None)]
    #[case::wrong_extension("test.txt", None)]
    #[case::tif("test.tif", Some(VolumeFormat::Tiff))]
    #[case::tiff_uppercase("test.TIFF", Some(VolumeFormat::Tiff))]
    #[case::png("test.png", Some(VolumeFormat::Png))]
    #[case::dcm("test.dcm", Some(VolumeFormat::Dicom))]
    #[case::dicom_uppercase("test.DICOM", Some(VolumeFormat::Dicom))]
    #[case::mixed_case("test.DiCoM", None)]
    fn test_volume_format(#[case] path: &str, #[case] expected: Option<VolumeFormat>) {
        assert_eq!(Path::new(path).volume_format(), expected);
    }

    #[test]
    fn test_directory_is_series() {
        let dir = tempdir().unwrap();
        assert_eq!(dir.path().volume_format(), Some(VolumeFormat::DicomSeries));
    }

    #[test]
    fn test_find_dicoms() {
        let dir = tempdir().unwrap();
        let source = dicom_test_files::path("pydicom/CT_small.dcm").unwrap();
        std::fs::copy(&source, dir.path().join("a.dcm")).unwrap();
        std::fs::copy(&source, dir.path().join("extensionless")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a dicom").unwrap();

        let mut found = dir
            .path()
            .find_dicoms()
            .unwrap()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["a.dcm", "extensionless"]);
    }

    #[test]
    fn test_find_dicoms_not_a_directory() {
        assert!(Path::new("missing-dir").find_dicoms().is_err());
    }
}
