pub mod command;
pub mod transport;

pub use command::Apdu;
pub use transport::{CardTransport, IsoFileDescriptor, IsoFileKind, PinKind, PublicKeyEncoder};
