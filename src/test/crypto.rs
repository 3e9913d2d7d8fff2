//! Crypto infrastructure for testing.
//!
//! This module provides self-contained keys so you don’t have to pass
//! around both a signer and a key id.

use std::sync::Arc;
use crate::crypto::{PublicKey, PublicKeyFormat, Signature, SignatureAlgorithm};
use crate::crypto::softsigner::{KeyId, OpenSslSigner};


//------------ KeyRing ------------------------------------------------------

#[derive(Default)]
pub struct KeyRing {
    signer: Arc<OpenSslSigner>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new RSA key.
    pub fn create_key(&self) -> TestKey {
        self.create_key_with(PublicKeyFormat::Rsa)
    }

    pub fn create_key_with(&self, format: PublicKeyFormat) -> TestKey {
        let key_id = self.signer.create_key(format).unwrap();
        TestKey {
            info: self.signer.get_key_info(&key_id).unwrap(),
            signer: self.signer.clone(),
            key_id,
        }
    }
}


//----------- TestKey -------------------------------------------------------

pub struct TestKey {
    signer: Arc<OpenSslSigner>,
    key_id: KeyId,
    info: PublicKey,
}

impl TestKey {
    pub fn key_info(&self) -> PublicKey {
        self.info.clone()
    }

    pub fn sign(&self, data: &impl AsRef<[u8]>) -> Signature {
        self.signer.sign(&self.key_id, data.as_ref()).unwrap()
    }

    pub fn sign_with(
        &self, algorithm: SignatureAlgorithm, data: &impl AsRef<[u8]>
    ) -> Signature {
        self.signer.sign_with(&self.key_id, algorithm, data.as_ref()).unwrap()
    }

    /// Returns the default signature algorithm for the key.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self.info.algorithm() {
            PublicKeyFormat::Rsa => SignatureAlgorithm::RsaSha256,
            PublicKeyFormat::EcdsaP256 => SignatureAlgorithm::EcdsaSha256,
            PublicKeyFormat::EcdsaP384 => SignatureAlgorithm::EcdsaSha384,
        }
    }
}
