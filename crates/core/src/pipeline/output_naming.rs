use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::shared::constants::{OUTPUT_EXTENSION, VIDEO_EXTENSIONS};

/// Whether `path` has one of the accepted input extensions (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}

/// `<output_dir>/<prefix><input stem>.avi`.
pub fn output_path_for(input: &Path, output_dir: &Path, prefix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(OsStr::new("video"));
    let mut name = OsString::from(prefix);
    name.push(stem);
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("clip.mp4", true)]
    #[case("clip.avi", true)]
    #[case("clip.mov", true)]
    #[case("CLIP.MP4", true)]
    #[case("archive.tar.Mov", true)]
    #[case("clip.mkv", false)]
    #[case("clip.mp4.txt", false)]
    #[case("clip", false)]
    #[case(".mp4", false)]
    fn test_is_supported_input(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_supported_input(Path::new(name)), expected);
    }

    #[rstest]
    #[case("/in/holiday.mp4", "/out/processed_holiday.avi")]
    #[case("/in/holiday.avi", "/out/processed_holiday.avi")]
    #[case("relative/a.b.mov", "/out/processed_a.b.avi")]
    fn test_output_path_for(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            output_path_for(Path::new(input), Path::new("/out"), "processed_"),
            PathBuf::from(expected)
        );
    }

    #[test]
    fn test_output_path_custom_prefix() {
        assert_eq!(
            output_path_for(Path::new("x.mp4"), Path::new("out"), "boxed-"),
            PathBuf::from("out/boxed-x.avi")
        );
    }
}
