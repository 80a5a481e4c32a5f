use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{anyhow, Result};
use base64::Engine;
use data_encoding::HEXLOWER_PERMISSIVE;
use zeroize::Zeroizing;

use crate::models::{Db, KeyParams, Slot, VaultFile, PASSWORD_SLOT};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>> {
    HEXLOWER_PERMISSIVE
        .decode(raw.as_bytes())
        .map_err(|e| anyhow!("Invalid hex in {field}: {e}"))
}

fn scrypt_params(slot: &Slot) -> Result<scrypt::Params> {
    let n = slot.n.ok_or_else(|| anyhow!("Password slot is missing scrypt n"))?;
    let r = slot.r.ok_or_else(|| anyhow!("Password slot is missing scrypt r"))?;
    let p = slot.p.ok_or_else(|| anyhow!("Password slot is missing scrypt p"))?;
    if !n.is_power_of_two() || n < 2 {
        return Err(anyhow!("Invalid scrypt n: {n}"));
    }
    let log_n = n.trailing_zeros() as u8;
    scrypt::Params::new(log_n, r, p, KEY_LEN).map_err(|e| anyhow!("Invalid scrypt params: {e}"))
}

pub fn derive_slot_key(password: &str, slot: &Slot) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = scrypt_params(slot)?;
    let salt_hex = slot
        .salt
        .as_deref()
        .ok_or_else(|| anyhow!("Password slot is missing a salt"))?;
    let salt = decode_hex("slot salt", salt_hex)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password.as_bytes(), &salt, &params, key.as_mut())
        .map_err(|e| anyhow!("Key derivation failed: {e}"))?;
    Ok(key)
}

fn open(key: &[u8], params: &KeyParams, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let nonce = decode_hex("nonce", &params.nonce)?;
    if nonce.len() != NONCE_LEN {
        return Err(anyhow!("Invalid nonce length: {}", nonce.len()));
    }
    let tag = decode_hex("tag", &params.tag)?;
    let mut sealed = Vec::with_capacity(ciphertext.len() + tag.len());
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Invalid key: {e}"))?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
        .map_err(|_| anyhow!("Decryption failed. Wrong password?"))
}

/// Tries every password slot and returns the master key of the first one
/// the password opens.
pub fn unlock_master_key(file: &VaultFile, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let slots = file
        .header
        .slots
        .as_deref()
        .ok_or_else(|| anyhow!("Vault has no key slots"))?;
    let mut tried = 0usize;
    for slot in slots.iter().filter(|s| s.kind == PASSWORD_SLOT) {
        tried += 1;
        let slot_key = derive_slot_key(password, slot)?;
        let wrapped = decode_hex("slot key", &slot.key)?;
        if let Ok(master) = open(slot_key.as_ref(), &slot.key_params, &wrapped) {
            tracing::debug!(slot = %slot.uuid, "opened password slot");
            return Ok(Zeroizing::new(master));
        }
    }
    if tried == 0 {
        return Err(anyhow!("Vault has no password slots"));
    }
    Err(anyhow!("Decryption failed. Wrong password?"))
}

pub fn decrypt_db(file: &VaultFile, master_key: &[u8]) -> Result<Db> {
    let params = file
        .header
        .params
        .as_ref()
        .ok_or_else(|| anyhow!("Vault header has no database params"))?;
    let encoded = file
        .db
        .as_str()
        .ok_or_else(|| anyhow!("Vault database is not encrypted"))?;
    let ciphertext = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| anyhow!("Invalid base64 database: {e}"))?;
    let plain = Zeroizing::new(open(master_key, params, &ciphertext)?);
    serde_json::from_slice(&plain).map_err(|e| anyhow!("Invalid vault database: {e}"))
}

pub fn decrypt_vault(file: &VaultFile, password: &str) -> Result<Db> {
    let master = unlock_master_key(file, password)?;
    decrypt_db(file, &master)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::Header;

    pub const TEST_N: u64 = 16;

    fn seal(key: &[u8], nonce: &[u8; NONCE_LEN], plain: &[u8]) -> (Vec<u8>, KeyParams) {
        let cipher = Aes256Gcm::new_from_slice(key).expect("key");
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(nonce), plain)
            .expect("encrypt");
        let tag = sealed.split_off(sealed.len() - 16);
        let params = KeyParams {
            nonce: HEXLOWER_PERMISSIVE.encode(nonce),
            tag: HEXLOWER_PERMISSIVE.encode(&tag),
        };
        (sealed, params)
    }

    /// Builds an encrypted vault file the same way Aegis lays it out.
    pub fn encrypted_vault(password: &str, db: &Db) -> VaultFile {
        let master = [7u8; KEY_LEN];
        let mut slot = Slot {
            kind: PASSWORD_SLOT,
            uuid: "slot-1".to_string(),
            key: String::new(),
            key_params: KeyParams {
                nonce: String::new(),
                tag: String::new(),
            },
            n: Some(TEST_N),
            r: Some(8),
            p: Some(1),
            salt: Some(HEXLOWER_PERMISSIVE.encode(&[3u8; 32])),
        };
        let slot_key = derive_slot_key(password, &slot).expect("derive");
        let (wrapped, key_params) = seal(slot_key.as_ref(), &[1u8; NONCE_LEN], &master);
        slot.key = HEXLOWER_PERMISSIVE.encode(&wrapped);
        slot.key_params = key_params;

        let plain = serde_json::to_vec(db).expect("db json");
        let (sealed_db, params) = seal(&master, &[2u8; NONCE_LEN], &plain);
        VaultFile {
            version: 1,
            header: Header {
                slots: Some(vec![slot]),
                params: Some(params),
            },
            db: serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(sealed_db),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::encrypted_vault;
    use super::*;
    use crate::models::{Entry, Group, Info};

    fn sample_db() -> Db {
        Db {
            version: 3,
            entries: vec![Entry {
                kind: "totp".to_string(),
                uuid: "e1".to_string(),
                name: "alice".to_string(),
                issuer: "Example".to_string(),
                note: String::new(),
                groups: vec!["g1".to_string()],
                info: Info {
                    secret: "JBSWY3DPEHPK3PXP".to_string(),
                    algo: "SHA1".to_string(),
                    digits: 6,
                    period: 30,
                    counter: 0,
                    pin: String::new(),
                },
            }],
            groups: vec![Group {
                uuid: "g1".to_string(),
                name: "Work".to_string(),
            }],
        }
    }

    #[test]
    fn decrypts_vault_with_correct_password() {
        let db = sample_db();
        let file = encrypted_vault("hunter2", &db);
        let decrypted = decrypt_vault(&file, "hunter2").expect("decrypt");
        assert_eq!(decrypted, db);
    }

    #[test]
    fn wrong_password_is_reported() {
        let file = encrypted_vault("hunter2", &sample_db());
        let err = decrypt_vault(&file, "nope").unwrap_err();
        assert!(err.to_string().contains("Wrong password"));
    }

    #[test]
    fn vault_without_password_slots_is_rejected() {
        let mut file = encrypted_vault("hunter2", &sample_db());
        if let Some(slots) = file.header.slots.as_mut() {
            for slot in slots.iter_mut() {
                slot.kind = 2;
            }
        }
        let err = decrypt_vault(&file, "hunter2").unwrap_err();
        assert!(err.to_string().contains("no password slots"));
    }

    #[test]
    fn non_power_of_two_cost_is_rejected() {
        let mut file = encrypted_vault("hunter2", &sample_db());
        if let Some(slots) = file.header.slots.as_mut() {
            slots[0].n = Some(1000);
        }
        assert!(decrypt_vault(&file, "hunter2").is_err());
    }
}
