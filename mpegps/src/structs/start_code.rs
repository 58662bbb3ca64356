//! Start code classification.
//!
//! Every structural unit of a Program Stream begins with the 24-bit prefix
//! `00 00 01` followed by a one-byte code identifying the unit.

pub const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

pub const PROGRAM_END_CODE: u8 = 0xB9;
pub const PACK_HEADER_CODE: u8 = 0xBA;
pub const SYSTEM_HEADER_CODE: u8 = 0xBB;
pub const PROGRAM_STREAM_MAP_CODE: u8 = 0xBC;

/// Recognized unit kinds, keyed by the fourth byte of the start code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCode {
    ProgramEnd,
    PackHeader,
    SystemHeader,
    ProgramStreamMap,
    /// PES packet carrying the given stream id.
    Pes(u8),
}

impl StartCode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            PROGRAM_END_CODE => Some(Self::ProgramEnd),
            PACK_HEADER_CODE => Some(Self::PackHeader),
            SYSTEM_HEADER_CODE => Some(Self::SystemHeader),
            PROGRAM_STREAM_MAP_CODE => Some(Self::ProgramStreamMap),
            0xBD..=0xBF | 0xC0..=0xEF | 0xF0..=0xF8 => Some(Self::Pes(code)),
            _ => None,
        }
    }

    /// Classifies the first four bytes of `bytes`.
    pub fn classify(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x00, 0x00, 0x01, code, ..] => Self::from_code(*code),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::ProgramEnd => PROGRAM_END_CODE,
            Self::PackHeader => PACK_HEADER_CODE,
            Self::SystemHeader => SYSTEM_HEADER_CODE,
            Self::ProgramStreamMap => PROGRAM_STREAM_MAP_CODE,
            Self::Pes(id) => *id,
        }
    }
}

/// Whether `prefix` begins with a pack header start code, the signature of a
/// Program Stream file.
pub fn is_program_stream(prefix: &[u8]) -> bool {
    StartCode::classify(prefix) == Some(StartCode::PackHeader)
}

#[test]
fn classification() {
    assert_eq!(
        StartCode::classify(&[0, 0, 1, 0xBA, 0x44]),
        Some(StartCode::PackHeader)
    );
    assert_eq!(
        StartCode::classify(&[0, 0, 1, 0xE0]),
        Some(StartCode::Pes(0xE0))
    );
    assert_eq!(StartCode::classify(&[0, 0, 1, 0xF9]), None);
    assert_eq!(StartCode::classify(&[0, 0, 1, 0xB3]), None);
    assert_eq!(StartCode::classify(&[0, 1, 0, 0xBA]), None);
    assert_eq!(StartCode::classify(&[0, 0, 1]), None);

    for code in [0xB9, 0xBA, 0xBB, 0xBC, 0xBD, 0xC5, 0xEF, 0xF8] {
        assert_eq!(StartCode::from_code(code).map(|c| c.code()), Some(code));
    }

    assert!(is_program_stream(&[0, 0, 1, 0xBA]));
    assert!(!is_program_stream(&[0, 0, 1, 0xB9]));
}
