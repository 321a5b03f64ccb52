//! The stateful facade (spec §2, ~45% of the core): owns the DEK and
//! the store adapter, implements every lifecycle operation, and
//! enforces name validation and the `self`-reservation invariant.

use std::sync::Arc;

use keychain_codec::RsaPrivateKey;
use keychain_crypto::{Dek, DekParams};
use keychain_store::Store;
use rsa::Pkcs1v15Encrypt;

use crate::config::KeychainConfig;
use crate::error::{KeychainError, KeychainResult};
use crate::info::{CipherBlob, KeyInfo, RSA_PKCS1_PADDING};
use crate::name;
use crate::peer::PeerIdentity;

fn record_key(name: &str) -> String {
    format!("/{name}")
}

/// Maps a [`keychain_store::StoreError::NotFound`] to [`KeychainError::KeyNotFound`]
/// naming the offending key name rather than the raw store key.
fn map_missing(err: keychain_store::StoreError, name: &str) -> KeychainError {
    match err {
        keychain_store::StoreError::NotFound(_) => KeychainError::KeyNotFound(name.to_string()),
        other => KeychainError::from(other),
    }
}

/// The key chain facade. `Send + Sync`; cheaply `Clone`-able call sites
/// should wrap it in an `Arc` themselves, matching the teacher's
/// `Arc<Mutex<Connection>>` sharing pattern in `privstack-vault`.
pub struct Keychain {
    store: Arc<dyn Store>,
    dek: Dek,
    dek_params: DekParams,
}

impl Keychain {
    /// Derives the DEK from `passphrase` under `dek_profile` and binds
    /// it to `store`. Fails [`KeychainError::InvalidConfig`] if any
    /// NIST floor (§4.1) is violated; a missing store is enforced by
    /// the type system (the parameter is mandatory) rather than by a
    /// runtime check.
    pub fn new(
        store: Arc<dyn Store>,
        passphrase: &str,
        dek_profile: crate::config::DekProfile,
    ) -> KeychainResult<Self> {
        let dek_params = dek_profile.into_params()?;
        let dek = Dek::derive(passphrase, &dek_params)?;
        Ok(Self { store, dek, dek_params })
    }

    /// Builds a [`Keychain`] from a [`KeychainConfig`], requiring its
    /// `passphrase` to be populated by the caller beforehand.
    pub fn with_config(store: Arc<dyn Store>, config: KeychainConfig) -> KeychainResult<Self> {
        let passphrase = config
            .passphrase
            .ok_or_else(|| KeychainError::InvalidConfig("missing passphrase".into()))?;
        Self::new(store, &passphrase, config.dek)
    }

    /// Reads and decrypts the stored record for `name` as a single
    /// blocking unit: the ciphertext never crosses an `.await` point
    /// before it is unwrapped (§5: "secrets must not be surrendered to
    /// the scheduler in plain").
    async fn load_private(&self, name: &str) -> KeychainResult<RsaPrivateKey> {
        let key = record_key(name);
        let pem_bytes = self.store.get(&key).map_err(|e| map_missing(e, name))?;
        let passphrase = self.dek.secret_hex();
        tokio::task::spawn_blocking(move || {
            let pem = String::from_utf8(pem_bytes)
                .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?;
            keychain_codec::unwrap(&pem, &passphrase).map_err(KeychainError::from)
        })
        .await
        .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_key(&self, name: &str, key_type: &str, size: usize) -> KeychainResult<KeyInfo> {
        let name = name::validate(name)?;
        name::reject_reserved(&name)?;
        if !key_type.eq_ignore_ascii_case("rsa") {
            return Err(KeychainError::InvalidKeyType(key_type.to_string()));
        }
        if size < keychain_codec::MIN_KEY_BITS {
            return Err(KeychainError::InvalidKeySize(format!(
                "{size} is below the minimum of {}",
                keychain_codec::MIN_KEY_BITS
            )));
        }

        let key = record_key(&name);
        if self.store.has(&key)? {
            return Err(KeychainError::DuplicateKey(name));
        }

        let passphrase = self.dek.secret_hex();
        let (id, pem) = tokio::task::spawn_blocking(move || -> KeychainResult<(String, String)> {
            let private = keychain_codec::generate(size)?;
            let id = keychain_codec::key_id(&private)?;
            let pem = keychain_codec::wrap(&private, &passphrase)?;
            Ok((id, pem))
        })
        .await
        .map_err(|e| KeychainError::KeyGenFailed(e.to_string()))??;

        // Narrow (not eliminate) the create-create race: the store is
        // the authority, and `put` itself may still race a concurrent
        // creator (§5). A second check right before the write shrinks
        // the window a slow keygen would otherwise leave open.
        if self.store.has(&key)? {
            return Err(KeychainError::DuplicateKey(name));
        }
        self.store.put(&key, pem.as_bytes())?;
        tracing::debug!(name = %name, id = %id, "created key");
        Ok(KeyInfo { name, id, path: self.store.path_hint(&key) })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_keys(&self) -> KeychainResult<Vec<KeyInfo>> {
        let keys = self.store.query(true)?;
        let mut infos = Vec::with_capacity(keys.len());
        for key in keys {
            let name = key.trim_start_matches('/').to_string();
            infos.push(self.find_key_by_name(&name).await?);
        }
        Ok(infos)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_key_by_name(&self, name: &str) -> KeychainResult<KeyInfo> {
        let name = name::validate(name)?;
        let private = self.load_private(&name).await?;
        let id = keychain_codec::key_id(&private)?;
        let key = record_key(&name);
        Ok(KeyInfo { name, id, path: self.store.path_hint(&key) })
    }

    /// Linear scan of [`Self::list_keys`] (§4.4, acknowledged
    /// non-optimal). Absence is not an error: returns `Ok(None)`.
    #[tracing::instrument(skip(self))]
    pub async fn find_key_by_id(&self, id: &str) -> KeychainResult<Option<KeyInfo>> {
        let keys = self.list_keys().await?;
        Ok(keys.into_iter().find(|info| info.id == id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_key(&self, name: &str) -> KeychainResult<()> {
        let name = name::validate(name)?;
        name::reject_reserved(&name)?;
        let key = record_key(&name);
        if !self.store.has(&key)? {
            return Err(KeychainError::KeyNotFound(name));
        }
        self.store.delete(&key)?;
        tracing::debug!(name = %name, "removed key");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_key(&self, old: &str, new: &str) -> KeychainResult<KeyInfo> {
        let old = name::validate(old)?;
        name::reject_reserved(&old)?;
        let new = name::validate(new)?;
        name::reject_reserved(&new)?;

        let old_key = record_key(&old);
        let new_key = record_key(&new);

        let bytes = self.store.get(&old_key).map_err(|e| map_missing(e, &old))?;
        if self.store.has(&new_key)? {
            return Err(KeychainError::DuplicateKey(new));
        }

        match self.store.batch() {
            Some(mut batch) => {
                batch.put(new_key.clone(), bytes.clone());
                batch.delete(old_key.clone());
                batch.commit()?;
            }
            None => {
                tracing::warn!(old = %old, new = %new, "store has no batch facility; rename is non-atomic");
                self.store.put(&new_key, &bytes)?;
                self.store.delete(&old_key)?;
            }
        }

        let passphrase = self.dek.secret_hex();
        let id = tokio::task::spawn_blocking(move || -> KeychainResult<String> {
            let pem = String::from_utf8(bytes).map_err(|e| KeychainError::CryptoFailure(e.to_string()))?;
            let private = keychain_codec::unwrap(&pem, &passphrase)?;
            Ok(keychain_codec::key_id(&private)?)
        })
        .await
        .map_err(|e| KeychainError::CryptoFailure(e.to_string()))??;

        tracing::debug!(old = %old, new = %new, "renamed key");
        Ok(KeyInfo { name: new, id, path: self.store.path_hint(&new_key) })
    }

    /// Re-encrypts the stored key under `password` for export. Uses
    /// [`keychain_codec::wrap_for_export`] rather than `wrap`: the
    /// export format is fixed at PBKDF2-HMAC-SHA512 and the DEK's own
    /// iteration count (not `wrap`'s PKCS#8-default profile), so an
    /// exported key's resistance to offline cracking tracks whatever
    /// iteration count this chain's DEK was configured with.
    #[tracing::instrument(skip(self, password))]
    pub async fn export_key(&self, name: &str, password: &str) -> KeychainResult<String> {
        let name = name::validate(name)?;
        if password.chars().count() < keychain_crypto::MIN_PASSPHRASE_LEN {
            return Err(KeychainError::WeakPassphrase);
        }
        let private = self.load_private(&name).await?;
        let password = password.to_string();
        let iterations = self.dek_params.iteration_count;
        tokio::task::spawn_blocking(move || {
            keychain_codec::wrap_for_export(&private, &password, iterations).map_err(KeychainError::from)
        })
        .await
        .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
    }

    #[tracing::instrument(skip(self, pem, password))]
    pub async fn import_key(&self, name: &str, pem: &str, password: &str) -> KeychainResult<KeyInfo> {
        let name = name::validate(name)?;
        name::reject_reserved(&name)?;
        if pem.trim().is_empty() {
            return Err(KeychainError::InvalidArgument("pem must not be empty".into()));
        }
        let key = record_key(&name);
        if self.store.has(&key)? {
            return Err(KeychainError::DuplicateKey(name));
        }

        let pem_owned = pem.to_string();
        let password_owned = password.to_string();
        // Tries the export profile (PBKDF2-HMAC-SHA512) first, since
        // that is what `export_key` produces, then falls back to the
        // PKCS#8-default profile for a key wrapped by `wrap` directly
        // (e.g. a record imported from another chain's on-disk format).
        let private = tokio::task::spawn_blocking(move || {
            keychain_codec::unwrap_export(&pem_owned, &password_owned)
                .or_else(|_| keychain_codec::unwrap(&pem_owned, &password_owned))
        })
        .await
        .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
        .map_err(|_| KeychainError::WrongPassword)?;

        let id = keychain_codec::key_id(&private)?;
        let passphrase = self.dek.secret_hex();
        let rewrapped = tokio::task::spawn_blocking(move || keychain_codec::wrap(&private, &passphrase))
            .await
            .map_err(|e| KeychainError::CryptoFailure(e.to_string()))??;

        if self.store.has(&key)? {
            return Err(KeychainError::DuplicateKey(name));
        }
        self.store.put(&key, rewrapped.as_bytes())?;
        tracing::debug!(name = %name, id = %id, "imported key");
        Ok(KeyInfo { name, id, path: self.store.path_hint(&key) })
    }

    #[tracing::instrument(skip(self, peer))]
    pub async fn import_peer(&self, name: &str, peer: &dyn PeerIdentity) -> KeychainResult<KeyInfo> {
        let name = name::validate(name)?;
        name::reject_reserved(&name)?;
        let key = record_key(&name);
        if self.store.has(&key)? {
            return Err(KeychainError::DuplicateKey(name));
        }

        let blob = peer.private_key_blob();
        if blob.is_empty() {
            return Err(KeychainError::InvalidArgument(
                "peer supplied no private key blob".into(),
            ));
        }
        let private = keychain_codec::from_der(blob)?;
        let id = match peer.native_id() {
            Some(native) => native,
            None => keychain_codec::key_id(&private)?,
        };

        let passphrase = self.dek.secret_hex();
        let pem = tokio::task::spawn_blocking(move || keychain_codec::wrap(&private, &passphrase))
            .await
            .map_err(|e| KeychainError::CryptoFailure(e.to_string()))??;

        self.store.put(&key, pem.as_bytes())?;
        tracing::debug!(name = %name, id = %id, "imported peer identity");
        Ok(KeyInfo { name, id, path: self.store.path_hint(&key) })
    }

    /// RSA-PKCS1v1.5 encryption under the stored key's public half.
    /// `cipher_data` above the RSA modulus's message-size limit fails
    /// [`KeychainError::InvalidArgument`] rather than the generic
    /// crypto-failure variant — Rust's `&[u8]` already rules out the
    /// "non-buffer input" case the spec otherwise guards against.
    #[tracing::instrument(skip(self, plain))]
    pub async fn encrypt(&self, name: &str, plain: &[u8]) -> KeychainResult<CipherBlob> {
        let name = name::validate(name)?;
        let private = self.load_private(&name).await?;
        let plain = plain.to_vec();
        let cipher_data = tokio::task::spawn_blocking(move || {
            let public = private.to_public_key();
            let mut rng = rand::thread_rng();
            public.encrypt(&mut rng, Pkcs1v15Encrypt, &plain)
        })
        .await
        .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => {
                KeychainError::InvalidArgument("plaintext too long for this key size".into())
            }
            other => KeychainError::CryptoFailure(other.to_string()),
        })?;
        Ok(CipherBlob { algorithm: RSA_PKCS1_PADDING.to_string(), cipher_data })
    }

    #[tracing::instrument(skip(self, cipher_data))]
    pub async fn decrypt(&self, name: &str, cipher_data: &[u8]) -> KeychainResult<Vec<u8>> {
        let name = name::validate(name)?;
        let private = self.load_private(&name).await?;
        let cipher_data = cipher_data.to_vec();
        tokio::task::spawn_blocking(move || private.decrypt(Pkcs1v15Encrypt, &cipher_data))
            .await
            .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
            .map_err(|e| KeychainError::CryptoFailure(e.to_string()))
    }

    /// Builds an anonymous (unsigned) CMS `EnvelopedData` addressed to
    /// the certificate [`keychain_codec::build_self_signed`] issues for
    /// the stored key `name` (spec §4.5).
    #[tracing::instrument(skip(self, plain))]
    pub async fn create_anonymous_encrypted_data(&self, name: &str, plain: &[u8]) -> KeychainResult<Vec<u8>> {
        let name = name::validate(name)?;
        let private = self.load_private(&name).await?;
        let plain = plain.to_vec();
        tokio::task::spawn_blocking(move || keychain_cms::build_anonymous_envelope(&private, &plain))
            .await
            .map_err(|e| KeychainError::CryptoFailure(e.to_string()))?
            .map_err(KeychainError::from)
    }

    /// Parses `envelope`, then tries each candidate recipient's key id
    /// against [`Self::find_key_by_id`] in order, decrypting with the
    /// first one that resolves to a stored key. Fails
    /// [`KeychainError::NoDecryptionKey`] if none do (spec §4.5).
    #[tracing::instrument(skip(self, envelope))]
    pub async fn read_data(&self, envelope: &[u8]) -> KeychainResult<Vec<u8>> {
        let parsed = keychain_cms::parse(envelope)?;
        for recipient in &parsed.recipients {
            let Some(info) = self.find_key_by_id(&recipient.key_id).await? else {
                continue;
            };
            let private = self.load_private(&info.name).await?;
            return keychain_cms::decrypt_content(&parsed, recipient, &private).map_err(KeychainError::from);
        }
        Err(KeychainError::NoDecryptionKey)
    }
}
