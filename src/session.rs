//! Card recognition, session-init sequencing, and ATR historical-byte
//! capability discovery.
//!
//! None of this talks to a reader directly -- it consumes whatever ATR
//! bytes and [`apdu::CardTransport`] the caller already has a connection
//! to, the same external-collaborator boundary the rest of the driver
//! observes.

use bitflags::bitflags;

/// Which recognized card family an ATR matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    /// OpenPGP Card specification v1.0/1.1.
    OpenPgpV1,
    /// CryptoStick v1.2, equivalently OpenPGP Card specification v2.0.
    OpenPgpV2,
}

impl CardKind {
    pub fn friendly_name(self) -> &'static str {
        match self {
            CardKind::OpenPgpV1 => "OpenPGP Card v1.0/1.1",
            CardKind::OpenPgpV2 => "CryptoStick v1.2 / OpenPGP Card v2.0",
        }
    }
}

struct AtrEntry {
    pattern: &'static [u8],
    kind: CardKind,
}

/// ATRs this driver recognizes, matched by exact byte equality.
const KNOWN_ATRS: &[AtrEntry] = &[
    AtrEntry {
        pattern: &[
            0x3B, 0xFA, 0x13, 0x00, 0xFF, 0x81, 0x31, 0x80, 0x45, 0x00, 0x31, 0xC1, 0x73, 0xC0,
            0x01, 0x00, 0x00, 0x90, 0x00, 0xB1,
        ],
        kind: CardKind::OpenPgpV1,
    },
    AtrEntry {
        pattern: &[
            0x3B, 0xDA, 0x18, 0xFF, 0x81, 0xB1, 0xFE, 0x75, 0x1F, 0x03, 0x00, 0x31, 0xC5, 0x73,
            0xC0, 0x01, 0x40, 0x00, 0x90, 0x00, 0x0C,
        ],
        kind: CardKind::OpenPgpV2,
    },
];

/// The application ID every recognized card registers its OpenPGP
/// application under.
pub const AID: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x24, 0x01];

/// Matches `atr` against the recognized-card table.
pub fn match_card(atr: &[u8]) -> Option<CardKind> {
    KNOWN_ATRS.iter().find(|e| e.pattern == atr).map(|e| e.kind)
}

bitflags! {
    /// Flags advertised for every registered RSA key size: the driver
    /// only ever talks raw RSA or PKCS#1 padding to the card, and never
    /// asks it to hash on-card.
    pub struct RsaCapabilities: u8 {
        const RAW_RSA = 0x01;
        const PKCS1 = 0x02;
        const NO_ON_CARD_HASHING = 0x04;
    }
}

/// One entry of the RSA algorithm table registered at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaAlgorithm {
    pub key_size_bits: u16,
    pub capabilities: RsaCapabilities,
}

const BASE_RSA_KEY_SIZES: &[u16] = &[512, 768, 1024];
const V2_EXTRA_RSA_KEY_SIZE: u16 = 2048;

/// The RSA key sizes a card of `kind` supports, per §4.7 step 2: the
/// common three sizes for both families, plus 2048 for v2.0.
pub fn rsa_algorithms(kind: CardKind) -> Vec<RsaAlgorithm> {
    let capabilities = RsaCapabilities::RAW_RSA | RsaCapabilities::PKCS1 | RsaCapabilities::NO_ON_CARD_HASHING;
    let mut sizes = BASE_RSA_KEY_SIZES.to_vec();
    if kind == CardKind::OpenPgpV2 {
        sizes.push(V2_EXTRA_RSA_KEY_SIZE);
    }
    sizes
        .into_iter()
        .map(|key_size_bits| RsaAlgorithm {
            key_size_bits,
            capabilities,
        })
        .collect()
}

/// Walks the ISO 7816-3 interface-byte chain (`TAi`/`TBi`/`TCi`/`TDi`) of
/// `atr` far enough to find where the historical bytes start, then slices
/// out the `T0`-advertised historical-byte run.
///
/// Returns `None` if `atr` is shorter than its own advertised structure.
pub fn historical_bytes(atr: &[u8]) -> Option<&[u8]> {
    let t0 = *atr.get(1)?;
    let hist_len = (t0 & 0x0F) as usize;
    let mut pos = 2usize;
    let mut y = t0 >> 4;
    loop {
        if y & 0b0001 != 0 {
            pos += 1; // TAi
        }
        if y & 0b0010 != 0 {
            pos += 1; // TBi
        }
        if y & 0b0100 != 0 {
            pos += 1; // TCi
        }
        if y & 0b1000 != 0 {
            let tdi = *atr.get(pos)?;
            pos += 1;
            y = tdi >> 4;
        } else {
            break;
        }
    }
    atr.get(pos..pos + hist_len)
}

/// Byte prefixing the extended-length capability triplet in a card's ATR
/// historical bytes.
const HISTORICAL_CAPABILITY_MARKER: u8 = 0x73;
/// Bit of the marker's third following byte that signals extended-length
/// APDU support.
const EXTENDED_LENGTH_BIT: u8 = 0x40;

/// Scans `historical_bytes` for the capability marker and reports
/// whether extended-length APDUs are supported. Per §4.7 step 5 and §8's
/// S6: absence of the marker, or an unset bit, both mean unsupported.
pub fn supports_extended_length(historical_bytes: &[u8]) -> bool {
    for (i, &b) in historical_bytes.iter().enumerate() {
        if b == HISTORICAL_CAPABILITY_MARKER {
            return historical_bytes
                .get(i + 3)
                .map(|flag| flag & EXTENDED_LENGTH_BIT != 0)
                .unwrap_or(false);
        }
    }
    false
}

/// Byte range of the serial number within the AID bytes the card echoes
/// back on SELECT.
const SERIAL_RANGE: std::ops::Range<usize> = 8..14;

/// Extracts the serial number from the AID bytes returned by SELECT.
pub fn extract_serial(returned_aid: &[u8]) -> Option<Vec<u8>> {
    returned_aid.get(SERIAL_RANGE).map(|s| s.to_vec())
}
