//! Compact serialization of elliptic curve keys.
//!
//! A public key is stored as one header byte followed by the x coordinate:
//!
//! ```text
//! bits 7..2  curve tag
//! bit  1     always set (compressed point marker)
//! bit  0     parity of y
//! ```
//!
//! which is just a sec1 compressed point with the curve folded into the
//! unused high bits of the tag byte. A private key is its raw scalar, and
//! always follows the public key it belongs to.

use crate::aead::AeadKey;
use crate::wire::{CodecReader, CodecWriter};
use crate::*;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::Digest;
use zeroize::Zeroizing;

const COMPRESSED_MARKER: u8 = 0b10;
const PARITY_BIT: u8 = 0b01;

/// Supported elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// NIST P-256
    P256,

    /// NIST P-384
    P384,

    /// NIST P-521
    P521,
}

impl Curve {
    /// The tag stored in the high bits of a public key header byte.
    pub const fn tag(self) -> u8 {
        match self {
            Self::P256 => 0,
            Self::P384 => 1,
            Self::P521 => 2,
        }
    }

    /// Look up a curve by tag.
    pub fn from_tag(tag: u8) -> SealResult<Self> {
        match tag {
            0 => Ok(Self::P256),
            1 => Ok(Self::P384),
            2 => Ok(Self::P521),
            oth => Err(SealError::outdated(format!("unknown curve tag: {oth}"))),
        }
    }

    /// Byte length of one coordinate (and of a private scalar).
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Byte length of a stored public key on this curve.
    pub const fn public_key_len(self) -> usize {
        1 + self.coordinate_len()
    }
}

/// Digest used for ecdsa signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,

    /// SHA-384
    Sha384,

    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Wire tag for this algorithm.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Sha256 => 0,
            Self::Sha384 => 1,
            Self::Sha512 => 2,
        }
    }

    /// Look up an algorithm by wire tag.
    pub fn from_tag(tag: u8) -> SealResult<Self> {
        match tag {
            0 => Ok(Self::Sha256),
            1 => Ok(Self::Sha384),
            2 => Ok(Self::Sha512),
            oth => Err(SealError::outdated(format!(
                "unsupported signature hash algorithm: {oth}"
            ))),
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

#[derive(Clone)]
enum NativePublic {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl NativePublic {
    fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
            Self::P521(_) => Curve::P521,
        }
    }

    fn to_compressed(&self) -> Vec<u8> {
        match self {
            Self::P256(k) => k.to_encoded_point(true).as_bytes().to_vec(),
            Self::P384(k) => k.to_encoded_point(true).as_bytes().to_vec(),
            Self::P521(k) => k.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    fn from_compressed(curve: Curve, sec1: &[u8]) -> SealResult<Self> {
        let res = match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(sec1).map(Self::P256),
            Curve::P384 => p384::PublicKey::from_sec1_bytes(sec1).map(Self::P384),
            Curve::P521 => p521::PublicKey::from_sec1_bytes(sec1).map(Self::P521),
        };
        res.map_err(|_| {
            SealError::format(format!("invalid {curve:?} public key point"))
        })
    }
}

#[derive(Clone)]
enum NativeSecret {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl NativeSecret {
    fn generate(curve: Curve) -> Self {
        let mut rng = rand::rngs::OsRng;
        match curve {
            Curve::P256 => Self::P256(p256::SecretKey::random(&mut rng)),
            Curve::P384 => Self::P384(p384::SecretKey::random(&mut rng)),
            Curve::P521 => Self::P521(p521::SecretKey::random(&mut rng)),
        }
    }

    fn public(&self) -> NativePublic {
        match self {
            Self::P256(k) => NativePublic::P256(k.public_key()),
            Self::P384(k) => NativePublic::P384(k.public_key()),
            Self::P521(k) => NativePublic::P521(k.public_key()),
        }
    }

    fn to_scalar_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(match self {
            Self::P256(k) => k.to_bytes().to_vec(),
            Self::P384(k) => k.to_bytes().to_vec(),
            Self::P521(k) => k.to_bytes().to_vec(),
        })
    }

    fn from_scalar_bytes(curve: Curve, scalar: &[u8]) -> SealResult<Self> {
        let res = match curve {
            Curve::P256 => p256::SecretKey::from_slice(scalar).map(Self::P256),
            Curve::P384 => p384::SecretKey::from_slice(scalar).map(Self::P384),
            Curve::P521 => p521::SecretKey::from_slice(scalar).map(Self::P521),
        };
        res.map_err(|_| {
            SealError::format(format!("invalid {curve:?} private scalar"))
        })
    }
}

/// A public key plus its canonical serialized form.
/// Equality is defined over the serialized bytes.
#[derive(Clone)]
pub struct StoredPublicKey {
    native: NativePublic,
    bytes: BinData,
}

impl std::fmt::Debug for StoredPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StoredPublicKey")
            .field(&self.bytes.to_string())
            .finish()
    }
}

impl PartialEq for StoredPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for StoredPublicKey {}

impl std::hash::Hash for StoredPublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state)
    }
}

impl StoredPublicKey {
    fn create(native: NativePublic) -> Self {
        let sec1 = native.to_compressed();
        let mut bytes = Vec::with_capacity(sec1.len());
        // sec1 compressed tag is 0x02 | parity, which already carries
        // the marker and parity bits in the right place
        bytes.push((native.curve().tag() << 2) | sec1[0]);
        bytes.extend_from_slice(&sec1[1..]);
        Self {
            native,
            bytes: bytes.into(),
        }
    }

    /// Parse a stored public key from the reader.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        let header = reader.read_u8()?;
        let curve = Curve::from_tag(header >> 2)?;
        if header & COMPRESSED_MARKER == 0 {
            return Err(SealError::format("public key missing point marker"));
        }
        let x = reader.read_bytes(curve.coordinate_len())?;

        let mut sec1 = Vec::with_capacity(curve.public_key_len());
        sec1.push(COMPRESSED_MARKER | (header & PARITY_BIT));
        sec1.extend_from_slice(x);
        let native = NativePublic::from_compressed(curve, &sec1)?;

        let mut bytes = Vec::with_capacity(curve.public_key_len());
        bytes.push(header);
        bytes.extend_from_slice(x);

        Ok(Self {
            native,
            bytes: bytes.into(),
        })
    }

    /// Decode a stored public key that must span all of `data`.
    pub fn from_bytes(data: &[u8]) -> SealResult<Self> {
        let mut reader = CodecReader::new(data);
        let out = Self::parse(&mut reader)?;
        reader.expect_end("public key")?;
        Ok(out)
    }

    /// Append the serialized form to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        writer.write_bytes(&self.bytes)
    }

    /// The canonical serialized form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        self.native.curve()
    }

    /// Verify an ecdsa signature (fixed size `r || s`) over `message`.
    /// Any malformed input simply fails verification.
    pub fn verify(
        &self,
        hash: HashAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> bool {
        let prehash = hash.digest(message);
        match &self.native {
            NativePublic::P256(k) => {
                let Ok(sig) = p256::ecdsa::Signature::from_slice(signature)
                else {
                    return false;
                };
                p256::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(&prehash, &sig)
                    .is_ok()
            }
            NativePublic::P384(k) => {
                let Ok(sig) = p384::ecdsa::Signature::from_slice(signature)
                else {
                    return false;
                };
                p384::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(&prehash, &sig)
                    .is_ok()
            }
            NativePublic::P521(k) => {
                let Ok(sig) = p521::ecdsa::Signature::from_slice(signature)
                else {
                    return false;
                };
                let Ok(vk) = p521::ecdsa::VerifyingKey::from_sec1_bytes(
                    k.to_encoded_point(false).as_bytes(),
                ) else {
                    return false;
                };
                vk.verify_prehash(&prehash, &sig).is_ok()
            }
        }
    }
}

/// A private key, serialized as its raw scalar.
#[derive(Clone)]
pub struct StoredPrivateKey {
    native: NativeSecret,
    bytes: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for StoredPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredPrivateKey")
            .field("curve", &self.curve())
            .finish()
    }
}

impl PartialEq for StoredPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.as_slice().ct_eq(other.bytes.as_slice()).into()
    }
}

impl Eq for StoredPrivateKey {}

impl StoredPrivateKey {
    fn create(native: NativeSecret) -> Self {
        let bytes = native.to_scalar_bytes();
        Self { native, bytes }
    }

    /// Parse a private scalar. `public` must be the already-parsed
    /// public half of the same pair; the scalar has to derive it.
    pub fn parse(
        reader: &mut CodecReader<'_>,
        public: &StoredPublicKey,
    ) -> SealResult<Self> {
        let curve = public.curve();
        let scalar = reader.read_bytes(curve.coordinate_len())?;
        let native = NativeSecret::from_scalar_bytes(curve, scalar)?;
        if StoredPublicKey::create(native.public()) != *public {
            return Err(SealError::format(
                "private key does not match its public key",
            ));
        }
        Ok(Self {
            native,
            bytes: Zeroizing::new(scalar.to_vec()),
        })
    }

    /// Append the raw scalar to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        writer.write_bytes(&self.bytes)
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        match &self.native {
            NativeSecret::P256(_) => Curve::P256,
            NativeSecret::P384(_) => Curve::P384,
            NativeSecret::P521(_) => Curve::P521,
        }
    }

    /// Re-derive the public half of this key.
    pub fn public_key(&self) -> StoredPublicKey {
        StoredPublicKey::create(self.native.public())
    }

    /// Produce a fixed size (`r || s`) ecdsa signature over `message`.
    pub fn sign(
        &self,
        hash: HashAlgorithm,
        message: &[u8],
    ) -> SealResult<Box<[u8]>> {
        let prehash = hash.digest(message);
        let sig = match &self.native {
            NativeSecret::P256(k) => {
                let sig: p256::ecdsa::Signature =
                    p256::ecdsa::SigningKey::from(k)
                        .sign_prehash(&prehash)
                        .map_err(sign_err)?;
                sig.to_bytes().to_vec()
            }
            NativeSecret::P384(k) => {
                let sig: p384::ecdsa::Signature =
                    p384::ecdsa::SigningKey::from(k)
                        .sign_prehash(&prehash)
                        .map_err(sign_err)?;
                sig.to_bytes().to_vec()
            }
            NativeSecret::P521(k) => {
                let sig: p521::ecdsa::Signature =
                    p521::ecdsa::SigningKey::from_slice(&k.to_bytes())
                        .map_err(sign_err)?
                        .sign_prehash(&prehash)
                        .map_err(sign_err)?;
                sig.to_bytes().to_vec()
            }
        };
        Ok(sig.into_boxed_slice())
    }

    /// Elliptic curve diffie-hellman against `public`, yielding an
    /// aes-256 key from the leading bytes of the shared x coordinate.
    /// Returns `None` if the keys live on different curves.
    pub fn agree(&self, public: &StoredPublicKey) -> Option<AeadKey> {
        let shared: Zeroizing<Vec<u8>> = match (&self.native, &public.native) {
            (NativeSecret::P256(s), NativePublic::P256(p)) => {
                let shared = p256::ecdh::diffie_hellman(
                    s.to_nonzero_scalar(),
                    p.as_affine(),
                );
                Zeroizing::new(shared.raw_secret_bytes().to_vec())
            }
            (NativeSecret::P384(s), NativePublic::P384(p)) => {
                let shared = p384::ecdh::diffie_hellman(
                    s.to_nonzero_scalar(),
                    p.as_affine(),
                );
                Zeroizing::new(shared.raw_secret_bytes().to_vec())
            }
            (NativeSecret::P521(s), NativePublic::P521(p)) => {
                let shared = p521::ecdh::diffie_hellman(
                    s.to_nonzero_scalar(),
                    p.as_affine(),
                );
                Zeroizing::new(shared.raw_secret_bytes().to_vec())
            }
            _ => return None,
        };
        AeadKey::from_material(&shared).ok()
    }
}

fn sign_err(e: p256::ecdsa::Error) -> SealError {
    SealError::other(format!("ecdsa sign: {e}"))
}

/// A (public, private) key pair, serialized as their concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKeyPair {
    /// The public half.
    pub public: StoredPublicKey,

    /// The private half.
    pub private: StoredPrivateKey,
}

impl StoredKeyPair {
    /// Generate a fresh random key pair on `curve`.
    pub fn generate(curve: Curve) -> Self {
        let native = NativeSecret::generate(curve);
        let public = StoredPublicKey::create(native.public());
        let private = StoredPrivateKey::create(native);
        Self { public, private }
    }

    /// Parse a public key followed by its private key.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        let public = StoredPublicKey::parse(reader)?;
        let private = StoredPrivateKey::parse(reader, &public)?;
        Ok(Self { public, private })
    }

    /// Append the public then the private key to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        self.public.write(writer)?;
        self.private.write(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [Curve; 3] = [Curve::P256, Curve::P384, Curve::P521];

    #[test]
    fn key_pair_round_trip_all_curves() {
        for curve in CURVES {
            let pair = StoredKeyPair::generate(curve);
            assert_eq!(curve.public_key_len(), pair.public.as_bytes().len());
            assert_eq!(curve.tag(), pair.public.as_bytes()[0] >> 2);
            assert_ne!(0, pair.public.as_bytes()[0] & COMPRESSED_MARKER);

            let mut writer = CodecWriter::new();
            pair.write(&mut writer).unwrap();
            let raw = writer.into_vec();
            assert_eq!(
                curve.public_key_len() + curve.coordinate_len(),
                raw.len()
            );

            let mut reader = CodecReader::new(&raw);
            let back = StoredKeyPair::parse(&mut reader).unwrap();
            assert!(reader.is_empty());
            assert_eq!(pair, back);
            assert_eq!(pair.public, back.private.public_key());
        }
    }

    #[test]
    fn unknown_curve_tag_is_outdated() {
        let mut raw = vec![(7 << 2) | COMPRESSED_MARKER];
        raw.extend_from_slice(&[1; 32]);
        assert!(matches!(
            StoredPublicKey::from_bytes(&raw),
            Err(SealError::OutdatedVersion(_))
        ));
    }

    #[test]
    fn short_or_invalid_point_is_format_error() {
        let pair = StoredKeyPair::generate(Curve::P256);
        let raw = pair.public.as_bytes();
        assert!(matches!(
            StoredPublicKey::from_bytes(&raw[..20]),
            Err(SealError::Format(_))
        ));

        let mut no_marker = raw.to_vec();
        no_marker[0] &= !COMPRESSED_MARKER;
        assert!(matches!(
            StoredPublicKey::from_bytes(&no_marker),
            Err(SealError::Format(_))
        ));

        // x = p - 1 style garbage: all 0xff is not a field element
        let mut bad = vec![COMPRESSED_MARKER];
        bad.extend_from_slice(&[0xff; 32]);
        assert!(matches!(
            StoredPublicKey::from_bytes(&bad),
            Err(SealError::Format(_))
        ));
    }

    #[test]
    fn mismatched_private_key_is_rejected() {
        let a = StoredKeyPair::generate(Curve::P256);
        let b = StoredKeyPair::generate(Curve::P256);
        let mut writer = CodecWriter::new();
        a.public.write(&mut writer).unwrap();
        b.private.write(&mut writer).unwrap();
        let raw = writer.into_vec();
        assert!(matches!(
            StoredKeyPair::parse(&mut CodecReader::new(&raw)),
            Err(SealError::Format(_))
        ));
    }

    #[test]
    fn sign_and_verify() {
        for curve in [Curve::P256, Curve::P384] {
            let pair = StoredKeyPair::generate(curve);
            for hash in [
                HashAlgorithm::Sha256,
                HashAlgorithm::Sha384,
                HashAlgorithm::Sha512,
            ] {
                let sig = pair.private.sign(hash, b"message").unwrap();
                assert!(pair.public.verify(hash, b"message", &sig));
                assert!(!pair.public.verify(hash, b"messagE", &sig));

                let mut bad = sig.to_vec();
                bad[3] ^= 0x01;
                assert!(!pair.public.verify(hash, b"message", &bad));
            }
        }
        let pair = StoredKeyPair::generate(Curve::P521);
        let sig = pair.private.sign(HashAlgorithm::Sha512, b"m").unwrap();
        assert!(pair.public.verify(HashAlgorithm::Sha512, b"m", &sig));
        assert!(!pair.public.verify(HashAlgorithm::Sha512, b"m", &sig[1..]));
    }

    #[test]
    fn diffie_hellman_is_symmetric() {
        for curve in CURVES {
            let a = StoredKeyPair::generate(curve);
            let b = StoredKeyPair::generate(curve);
            let ab = a.private.agree(&b.public).unwrap();
            let ba = b.private.agree(&a.public).unwrap();
            assert_eq!(ab.as_bytes(), ba.as_bytes());
        }

        let a = StoredKeyPair::generate(Curve::P256);
        let b = StoredKeyPair::generate(Curve::P384);
        assert!(a.private.agree(&b.public).is_none());
    }
}
