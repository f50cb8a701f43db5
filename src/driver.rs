//! The public facade a PKCS#15-style consumer constructs: one `Driver`
//! per card session, wrapping the virtual filesystem and crypto
//! dispatch over a caller-supplied transport and public-key encoder.

use apdu::{CardTransport, PinKind, PublicKeyEncoder};
use blobtree::BlobTree;
use crypto::{CryptoDispatch, SecurityEnvironment};
use error::{CardError, CardResult};
use vfs::{FileDescriptor, SelectPath, Vfs};

use crate::session::{self, CardKind, RsaAlgorithm};

/// A `card_ctl` request code. Only [`CardCtl::GetSerialNumber`] is
/// recognized; any other code is reported as [`CardError::NotSupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardCtl {
    GetSerialNumber,
    Other(u32),
}

/// One live OpenPGP card session.
///
/// `T` is the ISO 7816-4 transport collaborator and `E` the PEM/ASN.1
/// public-key encoder; both are supplied by the caller at [`Driver::init`]
/// and owned by the driver for the life of the session.
pub struct Driver<T: CardTransport, E: PublicKeyEncoder> {
    transport: T,
    encoder: E,
    kind: CardKind,
    serial: Option<Vec<u8>>,
    extended: bool,
    rsa_algorithms: Vec<RsaAlgorithm>,
    vfs: Vfs,
    crypto: CryptoDispatch,
    torn_down: bool,
}

impl<T: CardTransport, E: PublicKeyEncoder> Driver<T, E> {
    /// Matches an ATR against the recognized-card table without opening
    /// a session.
    pub fn match_card(atr: &[u8]) -> Option<CardKind> {
        session::match_card(atr)
    }

    /// Performs §4.7's init sequence: registers the RSA algorithm table
    /// for the matched card kind, selects the OpenPGP application and
    /// extracts its serial number, eagerly populates the DO registry,
    /// and discovers extended-length capability from the ATR's
    /// historical bytes.
    pub fn init(mut transport: T, encoder: E, atr: &[u8]) -> CardResult<Self> {
        let kind = session::match_card(atr).ok_or(CardError::InvalidArguments)?;
        let rsa_algorithms = session::rsa_algorithms(kind);

        let iso = transport.select_file_by_aid(session::AID)?;
        let serial = session::extract_serial(&iso.aid);
        let historical = session::historical_bytes(atr).unwrap_or(&[]);
        let extended = session::supports_extended_length(historical);

        let mut tree = BlobTree::new();
        tree.populate_registry();
        let vfs = Vfs::new(tree);

        log::info!(
            "session initialized: {} (extended-length={}, serial={:?})",
            kind.friendly_name(),
            extended,
            serial
        );

        Ok(Driver {
            transport,
            encoder,
            kind,
            serial,
            extended,
            rsa_algorithms,
            vfs,
            crypto: CryptoDispatch::new(),
            torn_down: false,
        })
    }

    pub fn kind(&self) -> CardKind {
        self.kind
    }

    pub fn serial_number(&self) -> Option<&[u8]> {
        self.serial.as_deref()
    }

    pub fn rsa_algorithms(&self) -> &[RsaAlgorithm] {
        &self.rsa_algorithms
    }

    pub fn supports_extended_length(&self) -> bool {
        self.extended
    }

    /// Accessor onto the virtual filesystem surface, bundled with this
    /// driver's transport and encoder so callers don't thread them
    /// through every call.
    pub fn vfs(&mut self) -> DriverVfs<'_, T, E> {
        DriverVfs {
            vfs: &mut self.vfs,
            transport: &mut self.transport,
            encoder: &self.encoder,
            extended: self.extended,
        }
    }

    /// Accessor onto the security-environment/crypto dispatch surface.
    pub fn crypto(&mut self) -> DriverCrypto<'_, T> {
        DriverCrypto {
            crypto: &mut self.crypto,
            transport: &mut self.transport,
            extended: self.extended,
        }
    }

    /// Responds to `GET-SERIAL-NUMBER`; every other code, and a missing
    /// serial (the SELECT response was too short to carry one), is
    /// `NOT_SUPPORTED`.
    pub fn card_ctl(&self, code: CardCtl) -> CardResult<Vec<u8>> {
        match code {
            CardCtl::GetSerialNumber => self.serial.clone().ok_or(CardError::NotSupported),
            CardCtl::Other(_) => Err(CardError::NotSupported),
        }
    }

    /// Submits a CHV PIN verification, setting bit `0x80` on `pin_ref`
    /// per OpenPGP's convention before delegating to the transport.
    pub fn pin_cmd(&mut self, pin_ref: u8, data: &[u8]) -> CardResult<Option<u8>> {
        self.transport.pin_cmd(PinKind::Chv, pin_ref | 0x80, data)
    }

    /// Explicit, symmetric counterpart to the `Drop` teardown: frees the
    /// blob tree and session state. Calling this is optional -- dropping
    /// the driver does the same thing.
    pub fn finish(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.torn_down {
            log::debug!("tearing down session for {}", self.kind.friendly_name());
            self.torn_down = true;
        }
    }
}

impl<T: CardTransport, E: PublicKeyEncoder> Drop for Driver<T, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Borrowed view onto a [`Driver`]'s virtual filesystem surface.
pub struct DriverVfs<'a, T: CardTransport, E: PublicKeyEncoder> {
    vfs: &'a mut Vfs,
    transport: &'a mut T,
    encoder: &'a E,
    extended: bool,
}

impl<'a, T: CardTransport, E: PublicKeyEncoder> DriverVfs<'a, T, E> {
    pub fn select_file(&mut self, path: &SelectPath) -> CardResult<FileDescriptor> {
        self.vfs
            .select_file(self.transport, self.encoder, path, self.extended)
    }

    pub fn list_files(&mut self, out: &mut [u8]) -> CardResult<usize> {
        self.vfs
            .list_files(self.transport, self.encoder, self.extended, out)
    }

    pub fn read_binary(&mut self, offset: usize, count: usize, out: &mut [u8]) -> CardResult<usize> {
        self.vfs
            .read_binary(self.transport, self.encoder, self.extended, offset, count, out)
    }

    pub fn write_binary(&mut self, offset: usize, data: &[u8]) -> CardResult<usize> {
        self.vfs.write_binary(offset, data)
    }

    pub fn get_data(&mut self, tag: u16, out: &mut [u8]) -> CardResult<usize> {
        self.vfs
            .get_data(self.transport, self.encoder, self.extended, tag, out)
    }

    pub fn put_data(&mut self, tag: u16, data: &[u8]) -> CardResult<()> {
        self.vfs.put_data(tag, data)
    }
}

/// Borrowed view onto a [`Driver`]'s security-environment/crypto
/// dispatch surface.
pub struct DriverCrypto<'a, T: CardTransport> {
    crypto: &'a mut CryptoDispatch,
    transport: &'a mut T,
    extended: bool,
}

impl<'a, T: CardTransport> DriverCrypto<'a, T> {
    pub fn set_security_env(&mut self, env: &SecurityEnvironment) -> CardResult<()> {
        self.crypto.set_security_env(env)
    }

    pub fn compute_signature(&mut self, data: &[u8]) -> CardResult<Vec<u8>> {
        self.crypto.compute_signature(self.transport, data, self.extended)
    }

    pub fn decipher(&mut self, ciphertext: &[u8]) -> CardResult<Vec<u8>> {
        self.crypto.decipher(self.transport, ciphertext, self.extended)
    }
}
