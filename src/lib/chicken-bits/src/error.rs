use crate::sysreg::Encoding;

/// Reasons a register name or encoding failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseSysRegError {
    /// Neither a known register name nor an `sN_N_cN_cN_N` encoding.
    #[error("unknown system register name")]
    UnknownName,
    /// Looked like an encoding, but the fields did not parse.
    #[error("malformed system register encoding, expected s<op0>_<op1>_c<CRn>_c<CRm>_<op2>")]
    MalformedEncoding,
    /// A well-formed encoding that no register in this crate uses.
    #[error("encoding {0} does not name a register touched during bring-up")]
    UnknownEncoding(Encoding),
}
