//! Reader, writer and depth codecs for RGBD recordings: Matroska files
//! carrying VP8 color, RVL/TDC1 depth, Opus audio, IMU and pose tracks,
//! plus the camera calibration needed to turn depth back into geometry.

pub mod block;
pub mod builder;
pub mod calibration;
pub mod codec;
pub mod depth;
pub mod element;
pub mod error;
pub mod frame;
pub mod parser;
pub mod record;
pub mod rvl;
pub mod tdc1;
pub mod timecode;
pub mod track;
pub mod version;
pub mod vle;
pub mod writer;

pub use builder::RecordBuilder;
pub use calibration::{CameraCalibration, DirectionTable};
pub use codec::DepthCodecType;
pub use depth::{DepthDecoder, DepthEncoder, DepthFrame};
pub use error::{Result, RgbdError};
pub use frame::RecordFrame;
pub use parser::RecordParser;
pub use record::Record;
pub use writer::{RecordWriter, RecordWriterConfig};
