//! Provider status codes and their classification.
//!
//! Providers report every outcome as a 32-bit status code in the platform's
//! HRESULT layout: the high bit marks a failure, everything else is success.
//! The extraction loop never matches on raw numbers; it asks
//! [`classify_chunk`] and [`classify_text`] for a closed decision instead.

use crate::provider::{ChunkDescriptor, ChunkKind};
use std::fmt;

// ── StatusCode ────────────────────────────────────────────────────────────────

/// A raw provider status code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const S_OK: Self = Self(0x0000_0000);
    /// Returned by subsystem initialization when the thread was already set up.
    pub const S_FALSE: Self = Self(0x0000_0001);

    pub const E_UNEXPECTED: Self = Self(0x8000_FFFF);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002);
    pub const E_FAIL: Self = Self(0x8000_4005);
    pub const E_ACCESSDENIED: Self = Self(0x8007_0005);
    pub const E_INVALIDARG: Self = Self(0x8007_0057);
    pub const STG_E_FILENOTFOUND: Self = Self(0x8003_0002);
    pub const REGDB_E_CLASSNOTREG: Self = Self(0x8004_0154);
    pub const MK_E_SYNTAX: Self = Self(0x8004_01E4);
    pub const RPC_E_CHANGED_MODE: Self = Self(0x8001_0106);

    pub const FILTER_E_END_OF_CHUNKS: Self = Self(0x8004_1700);
    pub const FILTER_E_NO_MORE_TEXT: Self = Self(0x8004_1701);
    pub const FILTER_E_NO_MORE_VALUES: Self = Self(0x8004_1702);
    pub const FILTER_E_ACCESS: Self = Self(0x8004_1703);
    pub const FILTER_W_MONIKER_CLIPPED: Self = Self(0x0004_1704);
    pub const FILTER_E_NO_TEXT: Self = Self(0x8004_1705);
    pub const FILTER_E_NO_VALUES: Self = Self(0x8004_1706);
    pub const FILTER_E_EMBEDDING_UNAVAILABLE: Self = Self(0x8004_1707);
    pub const FILTER_E_LINK_UNAVAILABLE: Self = Self(0x8004_1708);
    pub const FILTER_S_LAST_TEXT: Self = Self(0x0004_1709);
    pub const FILTER_S_LAST_VALUES: Self = Self(0x0004_170A);
    pub const FILTER_E_PASSWORD: Self = Self(0x8004_170B);
    pub const FILTER_E_UNKNOWNFORMAT: Self = Self(0x8004_170C);

    /// `true` when the severity bit is clear.
    pub fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// `true` when the severity bit is set.
    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Symbolic name for the codes this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::S_OK => "S_OK",
            Self::S_FALSE => "S_FALSE",
            Self::E_UNEXPECTED => "E_UNEXPECTED",
            Self::E_NOINTERFACE => "E_NOINTERFACE",
            Self::E_FAIL => "E_FAIL",
            Self::E_ACCESSDENIED => "E_ACCESSDENIED",
            Self::E_INVALIDARG => "E_INVALIDARG",
            Self::STG_E_FILENOTFOUND => "STG_E_FILENOTFOUND",
            Self::REGDB_E_CLASSNOTREG => "REGDB_E_CLASSNOTREG",
            Self::MK_E_SYNTAX => "MK_E_SYNTAX",
            Self::RPC_E_CHANGED_MODE => "RPC_E_CHANGED_MODE",
            Self::FILTER_E_END_OF_CHUNKS => "FILTER_E_END_OF_CHUNKS",
            Self::FILTER_E_NO_MORE_TEXT => "FILTER_E_NO_MORE_TEXT",
            Self::FILTER_E_NO_MORE_VALUES => "FILTER_E_NO_MORE_VALUES",
            Self::FILTER_E_ACCESS => "FILTER_E_ACCESS",
            Self::FILTER_W_MONIKER_CLIPPED => "FILTER_W_MONIKER_CLIPPED",
            Self::FILTER_E_NO_TEXT => "FILTER_E_NO_TEXT",
            Self::FILTER_E_NO_VALUES => "FILTER_E_NO_VALUES",
            Self::FILTER_E_EMBEDDING_UNAVAILABLE => "FILTER_E_EMBEDDING_UNAVAILABLE",
            Self::FILTER_E_LINK_UNAVAILABLE => "FILTER_E_LINK_UNAVAILABLE",
            Self::FILTER_S_LAST_TEXT => "FILTER_S_LAST_TEXT",
            Self::FILTER_S_LAST_VALUES => "FILTER_S_LAST_VALUES",
            Self::FILTER_E_PASSWORD => "FILTER_E_PASSWORD",
            Self::FILTER_E_UNKNOWNFORMAT => "FILTER_E_UNKNOWNFORMAT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode({self})")
    }
}

impl From<u32> for StatusCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ── Chunk classification ──────────────────────────────────────────────────────

/// Why a chunk was skipped without producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmbeddingUnavailable,
    LinkUnavailable,
}

/// A stream status that stops extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    /// The document is password protected or otherwise secured.
    PasswordProtected,
    /// The provider could not access the document.
    AccessDenied,
    /// Any status the enumeration step is not expected to return.
    Unknown(StatusCode),
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PasswordProtected => f.write_str("password/security access failure"),
            Self::AccessDenied => f.write_str("access failure"),
            Self::Unknown(status) => write!(f, "unknown status from chunk enumeration: {status}"),
        }
    }
}

/// What the extraction loop does with the result of one enumeration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDisposition {
    /// A text-bearing chunk: read its text.
    Text,
    /// A chunk with some other payload: discard it.
    NonText,
    /// The chunk cannot be read; move on.
    Skip(SkipReason),
    /// Normal end of the document.
    End,
    /// Stop the stream, reporting this fault unless suppressed.
    Fatal(StreamFault),
}

/// Classify the result of a `next_chunk` call.
pub fn classify_chunk(step: &std::result::Result<ChunkDescriptor, StatusCode>) -> ChunkDisposition {
    match step {
        Ok(chunk) => match chunk.kind {
            ChunkKind::Text => ChunkDisposition::Text,
            ChunkKind::Value => ChunkDisposition::NonText,
        },
        Err(status) => classify_chunk_status(*status),
    }
}

/// Classify a failing status returned by a `next_chunk` call.
pub fn classify_chunk_status(status: StatusCode) -> ChunkDisposition {
    match status {
        StatusCode::FILTER_E_END_OF_CHUNKS => ChunkDisposition::End,
        StatusCode::FILTER_E_EMBEDDING_UNAVAILABLE => {
            ChunkDisposition::Skip(SkipReason::EmbeddingUnavailable)
        }
        StatusCode::FILTER_E_LINK_UNAVAILABLE => ChunkDisposition::Skip(SkipReason::LinkUnavailable),
        StatusCode::FILTER_E_PASSWORD => ChunkDisposition::Fatal(StreamFault::PasswordProtected),
        StatusCode::FILTER_E_ACCESS => ChunkDisposition::Fatal(StreamFault::AccessDenied),
        other => ChunkDisposition::Fatal(StreamFault::Unknown(other)),
    }
}

// ── Text classification ───────────────────────────────────────────────────────

/// What the inner text loop does with the result of one `next_text` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDisposition {
    /// This many units were written into the buffer.
    Block(usize),
    /// The chunk has no more text.
    EndOfChunk,
    /// The provider failed mid-chunk; the chunk ends here.
    Fault(StatusCode),
}

/// Classify the result of a `next_text` call.
pub fn classify_text(step: &std::result::Result<usize, StatusCode>) -> TextDisposition {
    match step {
        Ok(units) => TextDisposition::Block(*units),
        Err(StatusCode::FILTER_E_NO_MORE_TEXT) | Err(StatusCode::FILTER_E_NO_TEXT) => {
            TextDisposition::EndOfChunk
        }
        Err(other) => TextDisposition::Fault(*other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BreakType;
    use rstest::rstest;

    fn chunk(kind: ChunkKind) -> ChunkDescriptor {
        ChunkDescriptor {
            id: 1,
            kind,
            break_type: BreakType::EndOfParagraph,
        }
    }

    #[rstest]
    #[case(StatusCode::FILTER_E_END_OF_CHUNKS, ChunkDisposition::End)]
    #[case(
        StatusCode::FILTER_E_EMBEDDING_UNAVAILABLE,
        ChunkDisposition::Skip(SkipReason::EmbeddingUnavailable)
    )]
    #[case(
        StatusCode::FILTER_E_LINK_UNAVAILABLE,
        ChunkDisposition::Skip(SkipReason::LinkUnavailable)
    )]
    #[case(
        StatusCode::FILTER_E_PASSWORD,
        ChunkDisposition::Fatal(StreamFault::PasswordProtected)
    )]
    #[case(StatusCode::FILTER_E_ACCESS, ChunkDisposition::Fatal(StreamFault::AccessDenied))]
    #[case(
        StatusCode::E_FAIL,
        ChunkDisposition::Fatal(StreamFault::Unknown(StatusCode::E_FAIL))
    )]
    #[case(
        StatusCode::FILTER_E_NO_MORE_TEXT,
        ChunkDisposition::Fatal(StreamFault::Unknown(StatusCode::FILTER_E_NO_MORE_TEXT))
    )]
    fn chunk_status_table(#[case] status: StatusCode, #[case] expected: ChunkDisposition) {
        assert_eq!(classify_chunk(&Err(status)), expected);
    }

    #[test]
    fn successful_chunks_split_on_kind() {
        assert_eq!(classify_chunk(&Ok(chunk(ChunkKind::Text))), ChunkDisposition::Text);
        assert_eq!(classify_chunk(&Ok(chunk(ChunkKind::Value))), ChunkDisposition::NonText);
    }

    #[rstest]
    #[case(Ok(12), TextDisposition::Block(12))]
    #[case(Ok(0), TextDisposition::Block(0))]
    #[case(Err(StatusCode::FILTER_E_NO_MORE_TEXT), TextDisposition::EndOfChunk)]
    #[case(Err(StatusCode::FILTER_E_NO_TEXT), TextDisposition::EndOfChunk)]
    #[case(Err(StatusCode::E_FAIL), TextDisposition::Fault(StatusCode::E_FAIL))]
    fn text_status_table(
        #[case] step: std::result::Result<usize, StatusCode>,
        #[case] expected: TextDisposition,
    ) {
        assert_eq!(classify_text(&step), expected);
    }

    #[test]
    fn severity_bit() {
        assert!(StatusCode::S_OK.is_success());
        assert!(StatusCode::S_FALSE.is_success());
        assert!(StatusCode::FILTER_S_LAST_TEXT.is_success());
        assert!(StatusCode::FILTER_E_PASSWORD.is_failure());
    }

    #[test]
    fn display_includes_name_and_hex() {
        assert_eq!(
            StatusCode::FILTER_E_PASSWORD.to_string(),
            "FILTER_E_PASSWORD (0x8004170B)"
        );
        assert_eq!(StatusCode(0x1234_5678).to_string(), "0x12345678");
    }
}
