//! Track identities. Tracks are numbered by the writer and rediscovered by
//! their upper-case name when parsing.

/// Track number constants assigned by the writer.
pub const TRACK_COLOR: u64 = 1;
pub const TRACK_DEPTH: u64 = 2;
pub const TRACK_AUDIO: u64 = 3;
pub const TRACK_ACCELERATION: u64 = 4;
pub const TRACK_ROTATION_RATE: u64 = 5;
pub const TRACK_MAGNETIC_FIELD: u64 = 6;
pub const TRACK_GRAVITY: u64 = 7;
pub const TRACK_TRANSLATION: u64 = 8;
pub const TRACK_ROTATION: u64 = 9;
pub const TRACK_CALIBRATION: u64 = 10;

/// Matroska TrackType values.
pub const MATROSKA_TRACK_TYPE_VIDEO: u64 = 1;
pub const MATROSKA_TRACK_TYPE_AUDIO: u64 = 2;
pub const MATROSKA_TRACK_TYPE_SUBTITLE: u64 = 17;

/// Track names written by older recorders and no longer carrying data.
pub const LEGACY_TRACK_NAMES: &[&str] = &["FLOOR", "SCALE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Color,
    Depth,
    Audio,
    Acceleration,
    RotationRate,
    MagneticField,
    Gravity,
    Translation,
    Rotation,
    Calibration,
}

pub const ALL_TRACK_KINDS: &[TrackKind] = &[
    TrackKind::Color,
    TrackKind::Depth,
    TrackKind::Audio,
    TrackKind::Acceleration,
    TrackKind::RotationRate,
    TrackKind::MagneticField,
    TrackKind::Gravity,
    TrackKind::Translation,
    TrackKind::Rotation,
    TrackKind::Calibration,
];

/// Tracks written together in one IMU cluster.
pub const IMU_TRACK_KINDS: &[TrackKind] = &[
    TrackKind::Acceleration,
    TrackKind::RotationRate,
    TrackKind::MagneticField,
    TrackKind::Gravity,
];

/// Tracks written together in one pose cluster.
pub const POSE_TRACK_KINDS: &[TrackKind] = &[TrackKind::Translation, TrackKind::Rotation];

impl TrackKind {
    /// Name stored in the track entry.
    pub fn name(self) -> &'static str {
        match self {
            TrackKind::Color => "COLOR",
            TrackKind::Depth => "DEPTH",
            TrackKind::Audio => "AUDIO",
            TrackKind::Acceleration => "ACCELERATION",
            TrackKind::RotationRate => "ROTATION_RATE",
            TrackKind::MagneticField => "MAGNETIC_FIELD",
            TrackKind::Gravity => "GRAVITY",
            TrackKind::Translation => "TRANSLATION",
            TrackKind::Rotation => "ROTATION",
            TrackKind::Calibration => "CALIBRATION",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TRACK_KINDS.iter().copied().find(|k| k.name() == name)
    }

    /// Track number the writer assigns to this kind.
    pub fn number(self) -> u64 {
        match self {
            TrackKind::Color => TRACK_COLOR,
            TrackKind::Depth => TRACK_DEPTH,
            TrackKind::Audio => TRACK_AUDIO,
            TrackKind::Acceleration => TRACK_ACCELERATION,
            TrackKind::RotationRate => TRACK_ROTATION_RATE,
            TrackKind::MagneticField => TRACK_MAGNETIC_FIELD,
            TrackKind::Gravity => TRACK_GRAVITY,
            TrackKind::Translation => TRACK_TRANSLATION,
            TrackKind::Rotation => TRACK_ROTATION,
            TrackKind::Calibration => TRACK_CALIBRATION,
        }
    }

    pub fn matroska_track_type(self) -> u64 {
        match self {
            TrackKind::Color | TrackKind::Depth => MATROSKA_TRACK_TYPE_VIDEO,
            TrackKind::Audio => MATROSKA_TRACK_TYPE_AUDIO,
            _ => MATROSKA_TRACK_TYPE_SUBTITLE,
        }
    }

    /// CodecID for auxiliary tracks (e.g. "S_ACCELERATION"). Color, depth and
    /// audio take their CodecID from the configured codec instead.
    pub fn auxiliary_codec_id(self) -> Option<String> {
        match self {
            TrackKind::Color | TrackKind::Depth | TrackKind::Audio => None,
            _ => Some(format!("S_{}", self.name())),
        }
    }

    pub fn is_imu(self) -> bool {
        IMU_TRACK_KINDS.contains(&self)
    }
}

/// Whether `name` belongs to a retired track that parsers should ignore silently.
pub fn is_legacy_track_name(name: &str) -> bool {
    LEGACY_TRACK_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for &kind in ALL_TRACK_KINDS {
            assert_eq!(TrackKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TrackKind::from_name("color"), None);
        assert_eq!(TrackKind::from_name("FLOOR"), None);
    }

    #[test]
    fn test_track_numbers_are_unique_and_sequential() {
        let numbers: Vec<u64> = ALL_TRACK_KINDS.iter().map(|k| k.number()).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_track_types() {
        assert_eq!(TrackKind::Color.matroska_track_type(), MATROSKA_TRACK_TYPE_VIDEO);
        assert_eq!(TrackKind::Depth.matroska_track_type(), MATROSKA_TRACK_TYPE_VIDEO);
        assert_eq!(TrackKind::Audio.matroska_track_type(), MATROSKA_TRACK_TYPE_AUDIO);
        assert_eq!(TrackKind::Gravity.matroska_track_type(), MATROSKA_TRACK_TYPE_SUBTITLE);
    }

    #[test]
    fn test_auxiliary_codec_ids() {
        assert_eq!(TrackKind::Color.auxiliary_codec_id(), None);
        assert_eq!(
            TrackKind::RotationRate.auxiliary_codec_id().as_deref(),
            Some("S_ROTATION_RATE")
        );
        assert_eq!(
            TrackKind::Calibration.auxiliary_codec_id().as_deref(),
            Some("S_CALIBRATION")
        );
    }

    #[test]
    fn test_track_groups() {
        assert!(TrackKind::MagneticField.is_imu());
        assert!(!TrackKind::Rotation.is_imu());
        assert!(!TrackKind::Color.is_imu());
        assert!(is_legacy_track_name("SCALE"));
        assert!(!is_legacy_track_name("DEPTH"));
    }
}
