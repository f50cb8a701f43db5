//! External collaborators this driver consumes but does not implement.
//!
//! The generic ISO 7816-4 APDU transport (raw `select_file` by AID,
//! `pin_cmd`, SW1/SW2 decoding, wire transmission) and the PEM/ASN.1
//! public-key encoder are both out of scope for the driver core; they
//! are represented here as traits so the core can be exercised against a
//! mock in tests and wired to a real transport by whatever consumer
//! constructs a [`crate::command::Apdu`]-driven session.

use error::CardResult;

/// File kind as reported by the ISO 7816-4 layer's own notion of a file
/// descriptor, independent of this driver's DF/EF classification of a
/// blob (the two agree for every DO this driver creates, but the
/// collaborator's type is its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoFileKind {
    Df,
    Ef,
}

/// What the ISO 7816-4 collaborator hands back after selecting a file by
/// AID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoFileDescriptor {
    pub aid: Vec<u8>,
    pub kind: IsoFileKind,
}

/// The only PIN type OpenPGP cards use: a Card Holder Verification PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Chv,
}

/// The generic ISO 7816-4 transport this driver is built on top of.
///
/// Implementations own the physical reader session, APDU framing
/// (including extended-length wire encoding when
/// [`crate::command::Apdu::extended`] is set), and SW1/SW2 decoding: a
/// non-success status word comes back as
/// `Err(CardError::Transport(status))`.
pub trait CardTransport {
    fn select_file_by_aid(&mut self, aid: &[u8]) -> CardResult<IsoFileDescriptor>;

    fn transmit(&mut self, apdu: &crate::command::Apdu) -> CardResult<Vec<u8>>;

    /// Submits a PIN verification command. `pin_ref` has already had bit
    /// `0x80` set by the caller per OpenPGP's CHV convention; returns the
    /// number of verification attempts left on failure, `None` on
    /// success.
    fn pin_cmd(&mut self, kind: PinKind, pin_ref: u8, data: &[u8]) -> CardResult<Option<u8>>;
}

/// The PEM/ASN.1 public-key encoder this driver calls into when
/// synthesizing a PEM view of an on-card RSA public key (see
/// `components/crypto`'s `pem` module).
pub trait PublicKeyEncoder {
    /// Encodes an RSA public key given its modulus and public exponent,
    /// both big-endian unsigned integers as the card returns them.
    fn encode_rsa_public_key(&self, modulus: &[u8], exponent: &[u8]) -> CardResult<Vec<u8>>;
}
