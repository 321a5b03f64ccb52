//! End-to-end scenarios over the [`keychain::Keychain`] facade, backed
//! by [`keychain_store::MemoryStore`]: lifecycle, encryption, and CMS
//! exchange, plus the boundary cases called out alongside them.

use std::sync::Arc;

use keychain::{Keychain, KeychainConfig, KeychainError};
use keychain_store::MemoryStore;

const PASSPHRASE: &str = "this is not a secure phrase at all";

fn new_chain() -> Keychain {
    let store = Arc::new(MemoryStore::new());
    let config = KeychainConfig::default().with_passphrase(PASSPHRASE);
    Keychain::with_config(store, config).unwrap()
}

#[tokio::test]
async fn create_list_and_find_round_trip() {
    let chain = new_chain();
    let created = chain.create_key("alice", "rsa", 2048).await.unwrap();

    let listed = chain.list_keys().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "alice");

    let by_name = chain.find_key_by_name("alice").await.unwrap();
    assert_eq!(by_name.id, created.id);

    let by_id = chain.find_key_by_id(&created.id).await.unwrap();
    assert_eq!(by_id.unwrap().name, "alice");

    assert!(chain.find_key_by_id("not-a-real-id").await.unwrap().is_none());
}

#[tokio::test]
async fn encrypt_decrypt_round_trips_through_stored_key() {
    let chain = new_chain();
    chain.create_key("bob", "rsa", 2048).await.unwrap();

    let cipher = chain.encrypt("bob", b"a message for bob").await.unwrap();
    assert_eq!(cipher.algorithm, keychain::RSA_PKCS1_PADDING);

    let plain = chain.decrypt("bob", &cipher.cipher_data).await.unwrap();
    assert_eq!(plain, b"a message for bob");
}

#[tokio::test]
async fn anonymous_cms_envelope_round_trips() {
    let chain = new_chain();
    chain.create_key("carol", "rsa", 2048).await.unwrap();

    let envelope = chain
        .create_anonymous_encrypted_data("carol", b"a message for carol")
        .await
        .unwrap();
    let plain = chain.read_data(&envelope).await.unwrap();
    assert_eq!(plain, b"a message for carol");
}

#[tokio::test]
async fn cms_envelope_from_a_different_chain_has_no_decryption_key() {
    let sender = new_chain();
    let receiver = new_chain();

    sender.create_key("dave", "rsa", 2048).await.unwrap();
    let envelope = sender
        .create_anonymous_encrypted_data("dave", b"only dave's chain can open this")
        .await
        .unwrap();

    let err = receiver.read_data(&envelope).await.unwrap_err();
    assert!(matches!(err, KeychainError::NoDecryptionKey));
}

#[tokio::test]
async fn export_then_import_round_trips_and_rejects_wrong_password() {
    let chain = new_chain();
    let original = chain.create_key("erin", "rsa", 2048).await.unwrap();

    let exported = chain
        .export_key("erin", "a completely different export password")
        .await
        .unwrap();

    let other_store = Arc::new(MemoryStore::new());
    let other = Keychain::with_config(
        other_store,
        KeychainConfig::default().with_passphrase(PASSPHRASE),
    )
    .unwrap();

    let err = other
        .import_key("erin", &exported, "the wrong password entirely")
        .await
        .unwrap_err();
    assert!(matches!(err, KeychainError::WrongPassword));

    let imported = other
        .import_key("erin", &exported, "a completely different export password")
        .await
        .unwrap();
    assert_eq!(imported.id, original.id);
}

#[tokio::test]
async fn rename_preserves_identity_and_clears_old_name() {
    let chain = new_chain();
    let created = chain.create_key("frank", "rsa", 2048).await.unwrap();

    let renamed = chain.rename_key("frank", "franklin").await.unwrap();
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "franklin");

    assert!(chain.find_key_by_name("frank").await.is_err());
    let still_there = chain.find_key_by_name("franklin").await.unwrap();
    assert_eq!(still_there.id, created.id);
}

#[tokio::test]
async fn rejects_key_size_below_minimum() {
    let chain = new_chain();
    let err = chain.create_key("tiny", "rsa", 1024).await.unwrap_err();
    assert!(matches!(err, KeychainError::InvalidKeySize(_)));
}

#[tokio::test]
async fn rejects_the_reserved_self_name() {
    let chain = new_chain();
    let err = chain.create_key("self", "rsa", 2048).await.unwrap_err();
    assert!(matches!(err, KeychainError::InvalidName(_)));
}

#[tokio::test]
async fn removing_an_unknown_key_is_an_error() {
    let chain = new_chain();
    let err = chain.remove_key("not-there").await.unwrap_err();
    assert!(matches!(err, KeychainError::KeyNotFound(_)));
}

#[tokio::test]
async fn reading_non_cms_bytes_is_an_error() {
    let chain = new_chain();
    let err = chain.read_data(b"not a cms envelope at all").await.unwrap_err();
    assert!(matches!(err, KeychainError::InvalidCms(_)));
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let chain = new_chain();
    chain.create_key("gina", "rsa", 2048).await.unwrap();
    let err = chain.create_key("gina", "rsa", 2048).await.unwrap_err();
    assert!(matches!(err, KeychainError::DuplicateKey(_)));
}
