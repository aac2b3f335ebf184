//! Format version sniffing for recorded game headers.
//!
//! The decompressed header region begins with a short fixed prefix that
//! determines every subsequent parsing branch:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 8 | ASCII version stamp, null padded (`VER 9.4`, `TRL 9.3`, ...) |
//! | 0x08 | 4 | f32 sub-version (absent in trial saves) |
//!
//! Several patch lines reuse the same printed stamp while laying out
//! different header bytes, so the sniffer applies secondary heuristics:
//! the plausibility of the sub-version float (trial saves omit it), the
//! numeric sub-version ranges that separate Conquerors saves from HD
//! Edition ones, and — for current HD saves — a save-metadata block that
//! must be skipped by length before structured parsing can begin.
//!
//! Unrecognized stamps are not fatal. Community mods frequently stamp
//! non-standard strings while keeping a compatible layout, so the sniffer
//! falls back to the closest known family by numeric comparison and marks
//! the result as unrecognized.

use serde::Serialize;

use crate::binary::SliceCursor;
use crate::error::Result;

/// Width of the ASCII version stamp at the start of the header.
pub const VERSION_STAMP_SIZE: usize = 8;

/// Sub-version at which `VER 9.4` saves switch from Conquerors to HD
/// Edition layout.
pub const HD_SUB_VERSION: f32 = 11.76;

/// Sub-version at which HD Edition saves start inserting a save-metadata
/// block before the structured header.
pub const HD_CURRENT_SUB_VERSION: f32 = 12.49;

/// The format family of a recorded game, in release order.
///
/// Fallback matching for unknown stamps compares the stamp's version
/// number against each family's numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Family {
    /// Age of Kings trial (`.mgl`, stamp `TRL 9.3`). No sub-version field.
    AokTrial,

    /// Age of Kings (stamp `VER 9.3`).
    Aok,

    /// The Conquerors expansion (stamp `VER 9.4`, sub-version below 11.76).
    Aoc,

    /// Community UserPatch 1.4 (stamps `VER 9.8` through `VER 9.A`).
    UserPatch14,

    /// Community UserPatch 1.5 (stamps `VER 9.B` through `VER 9.F`).
    UserPatch15,

    /// HD Edition (stamp `VER 9.4`, sub-version 11.76 and up).
    Hd,

    /// Current HD Edition builds (sub-version 12.49 and up) which prepend
    /// a save-metadata block to the structured header.
    HdCurrent,
}

impl Family {
    /// Returns a short human-stable label used in the game fingerprint.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Family::AokTrial => "AOK_TRIAL",
            Family::Aok => "AOK",
            Family::Aoc => "AOC",
            Family::UserPatch14 => "UP1.4",
            Family::UserPatch15 => "UP1.5",
            Family::Hd => "HD",
            Family::HdCurrent => "HD_CURRENT",
        }
    }
}

/// The detected format version of a recorded game.
///
/// Produced once by [`detect`] and never mutated afterwards; every
/// version-gated parse branch keys off this value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatVersion {
    /// The format family.
    pub family: Family,

    /// Numeric sub-version, 0.0 when the field is absent (trial saves).
    pub sub_version: f32,

    /// Byte offset in the decompressed header region where structured
    /// header parsing begins. Not always immediately after the stamp:
    /// current HD saves insert a save-metadata block skipped by length.
    pub header_start: usize,

    /// The raw stamp string, trimmed of null padding.
    pub stamp: String,

    /// Whether the stamp matched a known sub-version exactly. When false
    /// the facade surfaces an `UnknownFormatVersion` warning.
    pub recognized: bool,
}

impl FormatVersion {
    /// Whether the body stream ends with a post-game summary block.
    ///
    /// Only the UserPatch builds append one; there is no marker byte, so
    /// presence is decided here, by sub-version.
    #[must_use]
    pub fn has_postgame_summary(&self) -> bool {
        matches!(self.family, Family::UserPatch14 | Family::UserPatch15)
    }

    /// Whether the header carries the known stats-corruption flag.
    ///
    /// A specific UserPatch 1.5 build zeroes per-player age and
    /// civilization statistics; those headers carry a flag byte that the
    /// outcome resolver uses to prefer the post-game summary values.
    #[must_use]
    pub fn has_corruption_flag(&self) -> bool {
        self.family == Family::UserPatch15
    }

    /// Multiplier applied to the raw population-limit field.
    ///
    /// Older saves store the limit as a small multiplier (units of 25);
    /// later families store an absolute count.
    #[must_use]
    pub fn population_multiplier(&self) -> u32 {
        match self.family {
            Family::AokTrial | Family::Aok => 25,
            _ => 1,
        }
    }
}

/// Sniffs the format version from the decompressed header region.
///
/// Consumes the fixed prefix and computes the offset at which the header
/// decoder should begin. The returned [`FormatVersion`] is final: callers
/// seek their own cursor to `header_start`.
///
/// # Arguments
///
/// * `header` - The decompressed header region
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` only if the region is too short
/// to hold the version stamp. Unknown stamps are *not* errors.
pub fn detect(header: &[u8]) -> Result<FormatVersion> {
    let mut cursor = SliceCursor::new(header);
    let stamp_bytes = cursor.read_bytes(VERSION_STAMP_SIZE)?;
    let stamp: String = stamp_bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();

    // Trial saves omit the sub-version float entirely. For anything else,
    // sniff the next four bytes: a normal value in [1, 50) is a plausible
    // sub-version, anything else means the field is absent.
    let sub_version = match cursor.read_f32() {
        Ok(v) if plausible_sub_version(v) => v,
        _ => 0.0,
    };
    let after_stamp = VERSION_STAMP_SIZE;
    let after_sub_version = if sub_version > 0.0 {
        after_stamp + 4
    } else {
        after_stamp
    };

    let (family, recognized) = classify(&stamp, sub_version);

    // Current HD saves insert a length-prefixed save-metadata block before
    // the structured header. Skipped by length, not fixed offset.
    let header_start = if family == Family::HdCurrent {
        let mut meta = SliceCursor::new(header);
        meta.seek(after_sub_version);
        match meta.read_u32() {
            Ok(meta_len) => after_sub_version + 4 + meta_len as usize,
            Err(_) => after_sub_version,
        }
    } else {
        after_sub_version
    };

    Ok(FormatVersion {
        family,
        sub_version,
        header_start,
        stamp,
        recognized,
    })
}

/// Whether a sniffed float looks like a real sub-version field.
///
/// Real sub-versions run from 9.3 through the 12.x HD builds. When the
/// field is absent, the bytes here are the first structured header field
/// instead; small integers reinterpreted as f32 are subnormal (a u32 of 1
/// reads as 1e-45), so requiring a normal value at least 1.0 keeps them
/// from being swallowed.
fn plausible_sub_version(v: f32) -> bool {
    v.is_normal() && v >= 1.0 && v < 50.0
}

/// Maps a stamp (plus sub-version for overloaded stamps) to a family.
///
/// Returns `(family, recognized)`; unrecognized stamps fall back to the
/// closest family by numeric comparison of the stamp's version number.
fn classify(stamp: &str, sub_version: f32) -> (Family, bool) {
    match stamp {
        "TRL 9.3" => (Family::AokTrial, true),
        "VER 9.3" => (Family::Aok, true),
        // Several HD patch lines reuse the Conquerors stamp with a
        // different layout; the sub-version float separates them.
        "VER 9.4" => {
            if sub_version >= HD_CURRENT_SUB_VERSION {
                (Family::HdCurrent, true)
            } else if sub_version >= HD_SUB_VERSION {
                (Family::Hd, true)
            } else {
                (Family::Aoc, true)
            }
        }
        "VER 9.8" | "VER 9.9" | "VER 9.A" => (Family::UserPatch14, true),
        "VER 9.B" | "VER 9.C" | "VER 9.D" | "VER 9.E" | "VER 9.F" => (Family::UserPatch15, true),
        other => (closest_family(other, sub_version), false),
    }
}

/// Picks the nearest known family for a non-standard stamp.
///
/// The stamp's trailing number (e.g. the `9.5` in `VER 9.5`) is compared
/// against the known stamp ranges; stamps with no parseable number fall
/// back on the sub-version float, and failing that on the most common
/// family in the wild (Conquerors).
fn closest_family(stamp: &str, sub_version: f32) -> Family {
    if let Some(number) = stamp_number(stamp) {
        return if number < 9.35 {
            Family::Aok
        } else if number < 9.6 {
            // The 9.4 range; disambiguate HD by sub-version as usual.
            if sub_version >= HD_CURRENT_SUB_VERSION {
                Family::HdCurrent
            } else if sub_version >= HD_SUB_VERSION {
                Family::Hd
            } else {
                Family::Aoc
            }
        } else if number < 10.05 {
            Family::UserPatch14
        } else {
            Family::UserPatch15
        };
    }

    if sub_version >= HD_SUB_VERSION {
        Family::Hd
    } else {
        Family::Aoc
    }
}

/// Parses the numeric portion of a version stamp (`VER 9.4` -> 9.4).
///
/// Hex-letter minor versions used by UserPatch (`VER 9.A`, `VER 9.B`)
/// are mapped to 10.0, 10.1, ... so they order after the decimal stamps.
fn stamp_number(stamp: &str) -> Option<f32> {
    let tail = stamp.split_whitespace().last()?;
    if let Ok(n) = tail.parse::<f32>() {
        return Some(n);
    }
    // "9.A".."9.F" style
    let (major, minor) = tail.split_once('.')?;
    let major: f32 = major.parse().ok()?;
    let minor_char = minor.chars().next()?;
    let minor_digit = minor_char.to_digit(16)? as f32;
    Some(major + 1.0 + (minor_digit - 10.0) / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp_header(stamp: &[u8], sub_version: Option<f32>) -> Vec<u8> {
        let mut header = vec![0u8; VERSION_STAMP_SIZE];
        header[..stamp.len()].copy_from_slice(stamp);
        if let Some(v) = sub_version {
            header.extend_from_slice(&v.to_le_bytes());
        }
        // Trailing structured-header bytes so reads past the prefix work
        header.extend_from_slice(&[0u8; 32]);
        header
    }

    #[test]
    fn test_detect_aoc() {
        let header = stamp_header(b"VER 9.4", Some(9.4));
        let version = detect(&header).unwrap();

        assert_eq!(version.family, Family::Aoc);
        assert!(version.recognized);
        assert_eq!(version.header_start, 12);
        assert_eq!(version.stamp, "VER 9.4");
        assert!((version.sub_version - 9.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_detect_aok() {
        let header = stamp_header(b"VER 9.3", Some(9.3));
        let version = detect(&header).unwrap();
        assert_eq!(version.family, Family::Aok);
        assert_eq!(version.population_multiplier(), 25);
    }

    #[test]
    fn test_detect_trial_without_sub_version() {
        // Trial saves go straight into the structured header; the bytes
        // after the stamp are the include_ai field (0 or 1), which is not
        // a plausible float.
        let mut header = vec![0u8; VERSION_STAMP_SIZE];
        header[..7].copy_from_slice(b"TRL 9.3");
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&[0u8; 32]);

        let version = detect(&header).unwrap();
        assert_eq!(version.family, Family::AokTrial);
        assert_eq!(version.header_start, 8);
        assert_eq!(version.sub_version, 0.0);
    }

    #[test]
    fn test_detect_trial_with_ai_flag_set() {
        // include_ai = 1 reinterpreted as f32 is subnormal (1e-45) and
        // must not be mistaken for a sub-version field
        let mut header = vec![0u8; VERSION_STAMP_SIZE];
        header[..7].copy_from_slice(b"TRL 9.3");
        header.extend_from_slice(&1u32.to_le_bytes());
        header.extend_from_slice(&[0u8; 32]);

        let version = detect(&header).unwrap();
        assert_eq!(version.family, Family::AokTrial);
        assert_eq!(version.sub_version, 0.0);
        assert_eq!(version.header_start, 8);
    }

    #[test]
    fn test_detect_hd_by_sub_version() {
        let header = stamp_header(b"VER 9.4", Some(11.9));
        let version = detect(&header).unwrap();
        assert_eq!(version.family, Family::Hd);
        assert_eq!(version.population_multiplier(), 1);
    }

    #[test]
    fn test_detect_hd_current_skips_metadata_block() {
        let mut header = stamp_header(b"VER 9.4", Some(12.5));
        header.truncate(12);
        // 16-byte save-metadata block, then the structured header
        header.extend_from_slice(&16u32.to_le_bytes());
        header.extend_from_slice(&[0xAA; 16]);
        header.extend_from_slice(&[0u8; 8]);

        let version = detect(&header).unwrap();
        assert_eq!(version.family, Family::HdCurrent);
        assert_eq!(version.header_start, 12 + 4 + 16);
    }

    #[test]
    fn test_detect_userpatch_stamps() {
        for stamp in [b"VER 9.8", b"VER 9.9", b"VER 9.A"] {
            let header = stamp_header(stamp, Some(12.97));
            let version = detect(&header).unwrap();
            assert_eq!(version.family, Family::UserPatch14, "{stamp:?}");
            assert!(version.has_postgame_summary());
            assert!(!version.has_corruption_flag());
        }
        for stamp in [b"VER 9.B", b"VER 9.F"] {
            let header = stamp_header(stamp, Some(12.97));
            let version = detect(&header).unwrap();
            assert_eq!(version.family, Family::UserPatch15, "{stamp:?}");
            assert!(version.has_postgame_summary());
            assert!(version.has_corruption_flag());
        }
    }

    #[test]
    fn test_detect_unknown_stamp_falls_back() {
        let header = stamp_header(b"VER 9.5", Some(9.5));
        let version = detect(&header).unwrap();

        assert!(!version.recognized);
        assert_eq!(version.family, Family::Aoc);
        assert_eq!(version.stamp, "VER 9.5");
    }

    #[test]
    fn test_detect_unknown_userpatch_like_stamp() {
        let header = stamp_header(b"VER 9.7", Some(12.97));
        let version = detect(&header).unwrap();
        assert!(!version.recognized);
        assert_eq!(version.family, Family::UserPatch14);
    }

    #[test]
    fn test_detect_garbage_stamp_uses_sub_version() {
        let header = stamp_header(b"MODDED!", Some(12.0));
        let version = detect(&header).unwrap();
        assert!(!version.recognized);
        assert_eq!(version.family, Family::Hd);
    }

    #[test]
    fn test_detect_too_short() {
        let result = detect(&[0x56, 0x45, 0x52]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stamp_number_hex_minor() {
        assert!(stamp_number("VER 9.A").unwrap() > 9.6);
        assert!(stamp_number("VER 9.B").unwrap() > stamp_number("VER 9.A").unwrap());
        assert_eq!(stamp_number("junk"), None);
    }

    #[test]
    fn test_family_labels_distinct() {
        let labels = [
            Family::AokTrial.label(),
            Family::Aok.label(),
            Family::Aoc.label(),
            Family::UserPatch14.label(),
            Family::UserPatch15.label(),
            Family::Hd.label(),
            Family::HdCurrent.label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
