//! A signer atop the OpenSSL library.
//!
//! Because this adds a dependency to openssl libs this is disabled by
//! default and should only be used by applications that need to issue
//! certificates or CRLs with software keys, such as test setups for grid
//! services. In particular, this is not required when validating.

use std::io;
use std::sync::{Arc, RwLock};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use super::keys::{PublicKey, PublicKeyFormat};
use super::signature::{Signature, SignatureAlgorithm};


//------------ OpenSslSigner -------------------------------------------------

/// An OpenSSL based signer.
///
/// Keeps the keys in memory.
#[derive(Default)]
pub struct OpenSslSigner {
    keys: RwLock<Vec<Option<Arc<KeyPair>>>>,
}

impl OpenSslSigner {
    pub fn new() -> OpenSslSigner {
        Self::default()
    }

    /// Creates a new key and returns an identifier.
    pub fn create_key(
        &self, algorithm: PublicKeyFormat
    ) -> Result<KeyId, io::Error> {
        Ok(self.insert_key(KeyPair::new(algorithm)?))
    }

    pub fn key_from_pem(&self, pem: &[u8]) -> Result<KeyId, io::Error> {
        Ok(self.insert_key(KeyPair::from_pem(pem)?))
    }

    /// Returns the public key information for the given key.
    pub fn get_key_info(&self, id: &KeyId) -> Result<PublicKey, io::Error> {
        self.get_key(*id)?.get_key_info()
    }

    /// Destroys a key.
    pub fn destroy_key(&self, id: &KeyId) -> Result<(), io::Error> {
        let mut keys = self.keys.write().unwrap_or_else(|err| {
            err.into_inner()
        });
        match keys.get_mut(id.0) {
            Some(key) if key.is_some() => {
                *key = None;
                Ok(())
            }
            _ => Err(key_not_found())
        }
    }

    /// Signs data with the default algorithm for the key.
    pub fn sign<D: AsRef<[u8]> + ?Sized>(
        &self, id: &KeyId, data: &D
    ) -> Result<Signature, io::Error> {
        let key = self.get_key(*id)?;
        let algorithm = key.default_algorithm();
        key.sign(algorithm, data.as_ref())
    }

    /// Signs data with the given algorithm.
    pub fn sign_with<D: AsRef<[u8]> + ?Sized>(
        &self, id: &KeyId, algorithm: SignatureAlgorithm, data: &D
    ) -> Result<Signature, io::Error> {
        self.get_key(*id)?.sign(algorithm, data.as_ref())
    }

    fn insert_key(&self, key: KeyPair) -> KeyId {
        let mut keys = self.keys.write().unwrap_or_else(|err| {
            err.into_inner()
        });
        let res = keys.len();
        keys.push(Some(key.into()));
        KeyId(res)
    }

    fn get_key(&self, id: KeyId) -> Result<Arc<KeyPair>, io::Error> {
        self.keys.read().unwrap_or_else(|err| {
            err.into_inner()
        }).get(id.0).and_then(|key| {
            key.as_ref().cloned()
        }).ok_or_else(key_not_found)
    }
}

fn key_not_found() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "key not found")
}


//------------ KeyId ---------------------------------------------------------

/// This signer’s key identifier.
//
//  We wrap this in a newtype so that people won’t start mucking about with
//  the integers.
#[derive(Clone, Copy, Debug)]
pub struct KeyId(usize);


//------------ KeyPair -------------------------------------------------------

/// A key pair kept by the signer.
struct KeyPair {
    pkey: PKey<Private>,
    format: PublicKeyFormat,
}

impl KeyPair {
    fn new(format: PublicKeyFormat) -> Result<Self, io::Error> {
        let pkey = match format {
            PublicKeyFormat::Rsa => PKey::from_rsa(Rsa::generate(2048)?)?,
            PublicKeyFormat::EcdsaP256 => {
                let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
                PKey::from_ec_key(EcKey::generate(&group)?)?
            }
            PublicKeyFormat::EcdsaP384 => {
                let group = EcGroup::from_curve_name(Nid::SECP384R1)?;
                PKey::from_ec_key(EcKey::generate(&group)?)?
            }
        };
        Ok(KeyPair { pkey, format })
    }

    fn from_pem(pem: &[u8]) -> Result<Self, io::Error> {
        let pkey = PKey::private_key_from_pem(pem)?;
        let format = if pkey.rsa().is_ok() {
            PublicKeyFormat::Rsa
        }
        else {
            let bits = pkey.bits();
            match bits {
                256 => PublicKeyFormat::EcdsaP256,
                384 => PublicKeyFormat::EcdsaP384,
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("unsupported key with {} bits", bits)
                    ))
                }
            }
        };
        Ok(KeyPair { pkey, format })
    }

    fn default_algorithm(&self) -> SignatureAlgorithm {
        match self.format {
            PublicKeyFormat::Rsa => SignatureAlgorithm::RsaSha256,
            PublicKeyFormat::EcdsaP256 => SignatureAlgorithm::EcdsaSha256,
            PublicKeyFormat::EcdsaP384 => SignatureAlgorithm::EcdsaSha384,
        }
    }

    fn get_key_info(&self) -> Result<PublicKey, io::Error> {
        let der = self.pkey.public_key_to_der()?;
        PublicKey::decode(der.as_slice()).map_err(|err| {
            io::Error::new(io::ErrorKind::Other, err.to_string())
        })
    }

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8]
    ) -> Result<Signature, io::Error> {
        let fits = matches!(
            (self.format, algorithm),
            (
                PublicKeyFormat::Rsa,
                SignatureAlgorithm::RsaSha1 | SignatureAlgorithm::RsaSha256
                | SignatureAlgorithm::RsaSha384
                | SignatureAlgorithm::RsaSha512
            ) | (
                PublicKeyFormat::EcdsaP256 | PublicKeyFormat::EcdsaP384,
                SignatureAlgorithm::EcdsaSha256
                | SignatureAlgorithm::EcdsaSha384
            )
        );
        if !fits {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "invalid algorithm"
            ));
        }
        let digest = match algorithm {
            SignatureAlgorithm::RsaSha1 => MessageDigest::sha1(),
            SignatureAlgorithm::RsaSha256 => MessageDigest::sha256(),
            SignatureAlgorithm::RsaSha384 => MessageDigest::sha384(),
            SignatureAlgorithm::RsaSha512 => MessageDigest::sha512(),
            SignatureAlgorithm::EcdsaSha256 => MessageDigest::sha256(),
            SignatureAlgorithm::EcdsaSha384 => MessageDigest::sha384(),
        };
        let mut signer = ::openssl::sign::Signer::new(digest, &self.pkey)?;
        signer.update(data)?;
        Ok(Signature::new(algorithm, signer.sign_to_vec()?.into()))
    }
}


//============ Tests =========================================================

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn info_sign_delete() {
        let s = OpenSslSigner::new();
        let ki = s.create_key(PublicKeyFormat::Rsa).unwrap();
        let data = b"foobar";
        let info = s.get_key_info(&ki).unwrap();
        let sig = s.sign(&ki, data).unwrap();
        assert_eq!(sig.algorithm(), SignatureAlgorithm::RsaSha256);
        info.verify(data, &sig).unwrap();
        s.destroy_key(&ki).unwrap();
        assert!(s.get_key_info(&ki).is_err());
        assert!(s.destroy_key(&ki).is_err());
    }

    #[test]
    fn sha1_for_legacy_keys() {
        let s = OpenSslSigner::new();
        let ki = s.create_key(PublicKeyFormat::Rsa).unwrap();
        let sig = s.sign_with(&ki, SignatureAlgorithm::RsaSha1, b"foo").unwrap();
        s.get_key_info(&ki).unwrap().verify(b"foo", &sig).unwrap();
    }

    #[test]
    fn ecdsa_rejects_rsa_algorithm() {
        let s = OpenSslSigner::new();
        let ki = s.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        assert!(
            s.sign_with(&ki, SignatureAlgorithm::RsaSha256, b"foo").is_err()
        );
    }
}
