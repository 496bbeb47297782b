//! Private key loading.
//!
//! Turns caller-supplied PEM text (optionally password-protected) into an
//! RSA key that the assertion builder can sign with. Both PKCS#8 and legacy
//! OpenSSL PEM encryption are supported. Key material lives only
//! for the duration of one issuance call and is zeroized on drop.

mod legacy;
pub mod loader;

pub use loader::{load_private_key, read_key_file, KeyPassword, ParsedPrivateKey, PrivateKeyMaterial};
