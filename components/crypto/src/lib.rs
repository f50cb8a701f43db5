//! Security-environment validation and the sign/decipher/authenticate
//! command dispatch that routes on the selected key reference.
//!
//! This crate owns none of the wire framing -- that's
//! [`apdu::command`] -- it only decides *which* APDU shape a given
//! `(operation, key_ref)` pair maps to, and rejects combinations the
//! card doesn't support before anything is transmitted.

use apdu::{command, CardTransport};
use error::{CardError, CardResult};

/// Response buffer size requested under short-APDU mode.
const SHORT_BUF: usize = 256;
/// Response buffer size requested under extended-APDU mode.
const EXTENDED_BUF: usize = 2048;

const KEY_REF_SIGN: u8 = 0x00;
const KEY_REF_DECIPHER: u8 = 0x01;
const KEY_REF_AUTH: u8 = 0x02;

/// The only algorithm this driver's key slots support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Rsa,
}

/// The operation a security environment is being set up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sign,
    Decipher,
}

/// A security environment as a caller proposes it, before validation.
///
/// Mirrors the MSE (Manage Security Environment) fields a PKCS#15-style
/// caller would set: an optional algorithm, a mandatory one-byte key
/// reference, and a file reference that this driver never accepts.
#[derive(Debug, Clone, Default)]
pub struct SecurityEnvironment {
    pub operation: Option<Operation>,
    pub algorithm: Option<Algorithm>,
    pub key_ref: Option<Vec<u8>>,
    pub file_ref: Option<Vec<u8>>,
}

/// Sign/decipher dispatch, holding the one validated security
/// environment a session may have active at a time.
#[derive(Debug, Default)]
pub struct CryptoDispatch {
    env: Option<(Operation, u8)>,
}

impl CryptoDispatch {
    pub fn new() -> Self {
        CryptoDispatch { env: None }
    }

    /// Validates `env` against §4.6's compatibility rules and, on
    /// success, stores the `(operation, key_ref)` pair as session
    /// state. On failure no environment is stored.
    pub fn set_security_env(&mut self, env: &SecurityEnvironment) -> CardResult<()> {
        if let Some(alg) = env.algorithm {
            if alg != Algorithm::Rsa {
                return Err(CardError::InvalidArguments);
            }
        }
        if env.file_ref.is_some() {
            return Err(CardError::InvalidArguments);
        }
        let key_ref = match env.key_ref.as_deref() {
            Some([byte]) => *byte,
            _ => return Err(CardError::InvalidArguments),
        };
        let operation = env.operation.ok_or(CardError::InvalidArguments)?;

        match (operation, key_ref) {
            (Operation::Sign, KEY_REF_SIGN) | (Operation::Sign, KEY_REF_AUTH) => {}
            (Operation::Decipher, KEY_REF_DECIPHER) => {}
            _ => return Err(CardError::InvalidArguments),
        }

        log::debug!("security environment accepted: {:?} key_ref={:#04X}", operation, key_ref);
        self.env = Some((operation, key_ref));
        Ok(())
    }

    /// Signs `data` per the active security environment's key
    /// reference: `0x00` via PSO Compute Signature, `0x02` via
    /// INTERNAL AUTHENTICATE. Fails if no SIGN environment is active.
    pub fn compute_signature<T: CardTransport>(
        &mut self,
        transport: &mut T,
        data: &[u8],
        extended: bool,
    ) -> CardResult<Vec<u8>> {
        let (operation, key_ref) = self.env.ok_or(CardError::InvalidArguments)?;
        if operation != Operation::Sign {
            return Err(CardError::InvalidArguments);
        }
        let buf_len = if extended { EXTENDED_BUF } else { SHORT_BUF };
        let apdu = match key_ref {
            KEY_REF_SIGN => command::compute_signature(data, buf_len, extended),
            KEY_REF_AUTH => command::internal_authenticate(data, buf_len, extended),
            KEY_REF_DECIPHER => return Err(CardError::NotSupported),
            _ => return Err(CardError::InvalidArguments),
        };
        transport.transmit(&apdu)
    }

    /// Deciphers `ciphertext` per the active security environment's key
    /// reference, which must be `0x01`. Fails if no DECIPHER
    /// environment is active.
    pub fn decipher<T: CardTransport>(
        &mut self,
        transport: &mut T,
        ciphertext: &[u8],
        extended: bool,
    ) -> CardResult<Vec<u8>> {
        let (operation, key_ref) = self.env.ok_or(CardError::InvalidArguments)?;
        if operation != Operation::Decipher {
            return Err(CardError::InvalidArguments);
        }
        if key_ref != KEY_REF_DECIPHER {
            return Err(CardError::InvalidArguments);
        }
        let buf_len = if extended { EXTENDED_BUF } else { SHORT_BUF };
        let apdu = command::decipher(ciphertext, buf_len, extended);
        transport.transmit(&apdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apdu::{command::Apdu, IsoFileDescriptor, IsoFileKind, PinKind};

    struct RecordingTransport {
        last: Option<Apdu>,
        response: Vec<u8>,
    }

    impl RecordingTransport {
        fn new(response: Vec<u8>) -> Self {
            RecordingTransport {
                last: None,
                response,
            }
        }
    }

    impl CardTransport for RecordingTransport {
        fn select_file_by_aid(&mut self, aid: &[u8]) -> CardResult<IsoFileDescriptor> {
            Ok(IsoFileDescriptor {
                aid: aid.to_vec(),
                kind: IsoFileKind::Df,
            })
        }
        fn transmit(&mut self, apdu: &Apdu) -> CardResult<Vec<u8>> {
            self.last = Some(apdu.clone());
            Ok(self.response.clone())
        }
        fn pin_cmd(&mut self, _kind: PinKind, _pin_ref: u8, _data: &[u8]) -> CardResult<Option<u8>> {
            unimplemented!()
        }
    }

    fn env(operation: Operation, key_ref: u8) -> SecurityEnvironment {
        SecurityEnvironment {
            operation: Some(operation),
            algorithm: Some(Algorithm::Rsa),
            key_ref: Some(vec![key_ref]),
            file_ref: None,
        }
    }

    #[test]
    fn decipher_key_rejects_sign_environment() {
        let mut dispatch = CryptoDispatch::new();
        let err = dispatch
            .set_security_env(&env(Operation::Sign, KEY_REF_DECIPHER))
            .unwrap_err();
        assert_eq!(err, CardError::InvalidArguments);
    }

    #[test]
    fn sign_accepts_both_signature_and_auth_keys() {
        let mut dispatch = CryptoDispatch::new();
        dispatch.set_security_env(&env(Operation::Sign, KEY_REF_SIGN)).unwrap();
        dispatch.set_security_env(&env(Operation::Sign, KEY_REF_AUTH)).unwrap();
    }

    #[test]
    fn a_file_reference_is_always_rejected() {
        let mut dispatch = CryptoDispatch::new();
        let mut e = env(Operation::Sign, KEY_REF_SIGN);
        e.file_ref = Some(vec![0x3F, 0x00]);
        assert_eq!(
            dispatch.set_security_env(&e).unwrap_err(),
            CardError::InvalidArguments
        );
    }

    #[test]
    fn missing_key_ref_is_rejected() {
        let mut dispatch = CryptoDispatch::new();
        let mut e = env(Operation::Sign, KEY_REF_SIGN);
        e.key_ref = None;
        assert_eq!(
            dispatch.set_security_env(&e).unwrap_err(),
            CardError::InvalidArguments
        );
    }

    #[test]
    fn compute_signature_with_signing_key_sends_pso_compute_signature() {
        let mut dispatch = CryptoDispatch::new();
        dispatch.set_security_env(&env(Operation::Sign, KEY_REF_SIGN)).unwrap();
        let mut transport = RecordingTransport::new(vec![0xAA, 0xBB]);
        let sig = dispatch
            .compute_signature(&mut transport, &[1, 2, 3], false)
            .unwrap();
        assert_eq!(sig, vec![0xAA, 0xBB]);
        let apdu = transport.last.unwrap();
        assert_eq!((apdu.ins, apdu.p1, apdu.p2), (0x2A, 0x9E, 0x9A));
        assert_eq!(apdu.data, vec![1, 2, 3]);
    }

    #[test]
    fn compute_signature_with_auth_key_sends_internal_authenticate() {
        let mut dispatch = CryptoDispatch::new();
        dispatch.set_security_env(&env(Operation::Sign, KEY_REF_AUTH)).unwrap();
        let mut transport = RecordingTransport::new(vec![0xCC]);
        dispatch
            .compute_signature(&mut transport, &[9, 9], false)
            .unwrap();
        let apdu = transport.last.unwrap();
        assert_eq!((apdu.ins, apdu.p1, apdu.p2), (0x88, 0x00, 0x00));
    }

    #[test]
    fn compute_signature_fails_without_an_active_sign_environment() {
        let mut dispatch = CryptoDispatch::new();
        let mut transport = RecordingTransport::new(vec![]);
        let err = dispatch
            .compute_signature(&mut transport, &[1], false)
            .unwrap_err();
        assert_eq!(err, CardError::InvalidArguments);
    }

    #[test]
    fn decipher_prepends_the_padding_indicator_byte() {
        let mut dispatch = CryptoDispatch::new();
        dispatch
            .set_security_env(&env(Operation::Decipher, KEY_REF_DECIPHER))
            .unwrap();
        let mut transport = RecordingTransport::new(vec![0x42]);
        dispatch
            .decipher(&mut transport, &[0xAA, 0xBB, 0xCC], false)
            .unwrap();
        let apdu = transport.last.unwrap();
        assert_eq!(apdu.data, vec![0x00, 0xAA, 0xBB, 0xCC]);
        assert_eq!((apdu.ins, apdu.p1, apdu.p2), (0x2A, 0x80, 0x86));
    }

    #[test]
    fn decipher_rejects_signature_and_auth_keys() {
        let mut dispatch = CryptoDispatch::new();
        dispatch
            .set_security_env(&env(Operation::Decipher, KEY_REF_DECIPHER))
            .unwrap();
        // Flip the stored operation away from Decipher to simulate a
        // caller trying to decipher under a sign environment -- covered
        // more directly by the environment-validation tests above, so
        // here we only check the key ref mismatch this method itself
        // guards against.
        dispatch.env = Some((Operation::Decipher, KEY_REF_SIGN));
        let mut transport = RecordingTransport::new(vec![]);
        let err = dispatch
            .decipher(&mut transport, &[1, 2], false)
            .unwrap_err();
        assert_eq!(err, CardError::InvalidArguments);
    }
}
