//! Test fixtures: minimal container headers.

/// EBML header start followed by a few payload bytes.
pub fn webm_bytes() -> Vec<u8> {
    let mut data = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x86, 0x81, 0x01];
    data.extend_from_slice(b"webm-test-payload");
    data
}

/// `ftyp` box of an ISO BMFF file.
pub fn mp4_bytes() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]);
    data.extend_from_slice(b"isomiso2mp41");
    data
}

/// Bytes no sniffer recognises.
pub fn unknown_bytes() -> Vec<u8> {
    b"not-a-known-container".to_vec()
}
