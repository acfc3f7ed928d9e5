/// Information about a codec identified by its Matroska codec ID.
#[derive(Debug, Clone, Copy)]
pub struct CodecInfo {
    /// CodecID string stored in the track entry (e.g. "V_VP8", "V_TDC1").
    pub codec_id: &'static str,
    /// Human-readable codec name.
    pub codec_name: &'static str,
}

pub const V_VP8: CodecInfo = CodecInfo { codec_id: "V_VP8", codec_name: "vp8" };
pub const V_RVL: CodecInfo = CodecInfo { codec_id: "V_RVL", codec_name: "rvl" };
pub const V_TDC1: CodecInfo = CodecInfo { codec_id: "V_TDC1", codec_name: "tdc1" };
pub const A_OPUS: CodecInfo = CodecInfo { codec_id: "A_OPUS", codec_name: "opus" };

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum ColorCodecType {
    Vp8,
}

impl ColorCodecType {
    pub fn info(self) -> &'static CodecInfo {
        match self {
            ColorCodecType::Vp8 => &V_VP8,
        }
    }

    pub fn from_codec_id(codec_id: &str) -> Option<Self> {
        match codec_id {
            "V_VP8" => Some(ColorCodecType::Vp8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum DepthCodecType {
    Rvl,
    #[default]
    Tdc1,
}

impl DepthCodecType {
    pub fn info(self) -> &'static CodecInfo {
        match self {
            DepthCodecType::Rvl => &V_RVL,
            DepthCodecType::Tdc1 => &V_TDC1,
        }
    }

    pub fn from_codec_id(codec_id: &str) -> Option<Self> {
        match codec_id {
            "V_RVL" => Some(DepthCodecType::Rvl),
            "V_TDC1" => Some(DepthCodecType::Tdc1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum AudioCodecType {
    Opus,
}

impl AudioCodecType {
    pub fn info(self) -> &'static CodecInfo {
        match self {
            AudioCodecType::Opus => &A_OPUS,
        }
    }

    pub fn from_codec_id(codec_id: &str) -> Option<Self> {
        match codec_id {
            "A_OPUS" => Some(AudioCodecType::Opus),
            _ => None,
        }
    }
}

/// CodecPrivate blob of the depth track.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthCodecPrivate {
    pub depth_unit: f32,
}

impl DepthCodecPrivate {
    pub fn to_bytes(self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
