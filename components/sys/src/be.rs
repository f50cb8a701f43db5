/// Big-endian packing helpers for the two-byte DO tags and APDU length
/// fields this driver pushes around constantly.
///
/// Mirrors the teacher's `BitOptExt`-style "extension trait over a
/// primitive, one macro-generated impl per width" shape, but for the
/// byte-array framing BER-TLV and ISO 7816-4 actually use instead of
/// ZFS's bitfield packing.
pub trait BigEndianExt: Sized {
    fn to_be_bytes2(&self) -> [u8; 2];
    fn from_be_bytes2(bytes: [u8; 2]) -> Self;
}

impl BigEndianExt for u16 {
    #[inline]
    fn to_be_bytes2(&self) -> [u8; 2] {
        self.to_be_bytes()
    }

    #[inline]
    fn from_be_bytes2(bytes: [u8; 2]) -> Self {
        u16::from_be_bytes(bytes)
    }
}

/// Appends `tag` as two big-endian bytes to `out`.
#[inline]
pub fn push_tag(out: &mut Vec<u8>, tag: u16) {
    out.extend_from_slice(&tag.to_be_bytes2());
}

/// Reads a big-endian `u16` tag out of a two-byte slice.
///
/// Returns `None` if `bytes` is not exactly two bytes long.
pub fn read_tag(bytes: &[u8]) -> Option<u16> {
    let arr: [u8; 2] = bytes.try_into().ok()?;
    Some(u16::from_be_bytes2(arr))
}
