//! Wire-level transforms around the package layer.

use std::error::Error;

use bytes::Bytes;

/// Boxed error returned by a [`PackageInterceptor`].
pub type InterceptorError = Box<dyn Error + Send + Sync>;

/// Transform applied after packaging on send and reversed before
/// unpackaging on receive, e.g. encryption.
///
/// # Examples
///
/// ```
/// use wirelink::service::{InterceptorError, PackageInterceptor};
///
/// struct Xor(u8);
///
/// impl PackageInterceptor for Xor {
///     fn encode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError> {
///         Ok(package.into_iter().map(|b| b ^ self.0).collect())
///     }
///
///     fn decode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError> {
///         self.encode(package)
///     }
/// }
///
/// let xor = Xor(0x5a);
/// let wire = xor.encode(b"hi".to_vec()).expect("encode");
/// assert_eq!(xor.decode(wire).expect("decode"), b"hi");
/// ```
pub trait PackageInterceptor: Send + Sync {
    /// Transform an outgoing package before framing.
    ///
    /// # Errors
    ///
    /// Returns an error if the package cannot be transformed; it is not sent.
    fn encode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError>;

    /// Reverse [`encode`](Self::encode) on an incoming frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be restored; it is dropped.
    fn decode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError>;
}

/// Transform applied to each raw chunk before carry-over handling.
pub type ListenInterceptor = std::sync::Arc<dyn Fn(Bytes) -> Bytes + Send + Sync>;
