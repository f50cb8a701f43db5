//! OpenPGP smart-card driver: a virtual filesystem shim over the card's
//! flat Data-Object namespace, plus RSA security-environment validation
//! and sign/decipher/authenticate command dispatch.
//!
//! [`Driver`] is the single entry point a PKCS#15-style consumer
//! constructs. It wraps [`vfs::Vfs`] and [`crypto::CryptoDispatch`] over
//! a caller-supplied [`apdu::CardTransport`] and [`apdu::PublicKeyEncoder`],
//! both of which this driver treats as external collaborators it neither
//! implements nor owns beyond the lifetime of the session.

pub mod driver;
pub mod mock;
pub mod session;

pub use crypto::{Algorithm, CryptoDispatch, Operation, SecurityEnvironment};
pub use driver::{CardCtl, Driver, DriverCrypto, DriverVfs};
pub use error::{CardError, CardResult, StatusWord};
pub use session::{CardKind, RsaAlgorithm, RsaCapabilities};
pub use vfs::{FileDescriptor, SelectPath, Vfs};
