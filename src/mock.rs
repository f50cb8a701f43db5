//! Test doubles for the [`apdu::CardTransport`] and
//! [`apdu::PublicKeyEncoder`] collaborators, used by this crate's own
//! integration tests (see `tests/`) to exercise [`crate::Driver`]
//! without real hardware.

use std::collections::HashMap;

use apdu::command::Apdu;
use apdu::{CardTransport, IsoFileDescriptor, IsoFileKind, PinKind, PublicKeyEncoder};
use error::{CardError, CardResult};

/// A canned-response card: every DO tag maps to fixed bytes, SELECT by
/// AID always succeeds and echoes back a configurable full AID (so
/// serial-number extraction has something to slice), and PIN
/// verification either always succeeds or always reports a fixed
/// retry count, whichever the test configured.
pub struct MockTransport {
    pub select_response: Vec<u8>,
    responses: HashMap<u16, Vec<u8>>,
    pub pin_tries_left: Option<u8>,
    pub transmit_count: u32,
}

impl MockTransport {
    pub fn new(select_response: Vec<u8>) -> Self {
        MockTransport {
            select_response,
            responses: HashMap::new(),
            pin_tries_left: None,
            transmit_count: 0,
        }
    }

    pub fn with_do(mut self, tag: u16, bytes: Vec<u8>) -> Self {
        self.responses.insert(tag, bytes);
        self
    }
}

impl CardTransport for MockTransport {
    fn select_file_by_aid(&mut self, aid: &[u8]) -> CardResult<IsoFileDescriptor> {
        let _ = aid;
        Ok(IsoFileDescriptor {
            aid: self.select_response.clone(),
            kind: IsoFileKind::Df,
        })
    }

    fn transmit(&mut self, apdu: &Apdu) -> CardResult<Vec<u8>> {
        self.transmit_count += 1;
        let tag = if apdu.ins == 0x47 {
            ((apdu.data[0] as u16) << 8) | apdu.data[1] as u16
        } else {
            ((apdu.p1 as u16) << 8) | apdu.p2 as u16
        };
        self.responses.get(&tag).cloned().ok_or(CardError::FileNotFound)
    }

    fn pin_cmd(&mut self, _kind: PinKind, _pin_ref: u8, _data: &[u8]) -> CardResult<Option<u8>> {
        Ok(self.pin_tries_left)
    }
}

/// A public-key encoder that concatenates the modulus and exponent with
/// a recognizable marker, good enough to assert PEM synthesis actually
/// ran without depending on a real ASN.1 encoding.
pub struct MarkerEncoder;

impl PublicKeyEncoder for MarkerEncoder {
    fn encode_rsa_public_key(&self, modulus: &[u8], exponent: &[u8]) -> CardResult<Vec<u8>> {
        let mut out = b"PEM:".to_vec();
        out.extend_from_slice(modulus);
        out.push(b':');
        out.extend_from_slice(exponent);
        Ok(out)
    }
}
