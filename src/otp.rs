use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::{BASE32_NOPAD, HEXLOWER, HEXLOWER_PERMISSIVE};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::models::{Db, Entry, DEFAULT_PERIOD};

const STEAM_ALPHABET: &[u8] = b"23456789BCDFGHJKMNPQRTVWXY";
const MAX_DIGITS: u32 = 10;

/// Pull-based source of OTP codes for every entry in the snapshot.
pub trait OtpSource {
    /// Codes keyed by entry uuid. Entries that cannot produce a code are absent.
    fn current_codes(&self) -> HashMap<String, String>;
    /// Milliseconds until the shared rotation boundary.
    fn time_to_next_rotation_ms(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("secret is not valid base32")]
    InvalidSecret,
    #[error("secret is not valid hex")]
    InvalidHexSecret,
    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(String),
    #[error("unsupported otp type {0:?}")]
    UnsupportedType(String),
    #[error("period must be greater than zero")]
    InvalidPeriod,
    #[error("digits must be between 1 and 10, got {0}")]
    InvalidDigits(u32),
    #[error("digest of {0} bytes is too short to truncate")]
    DigestTooShort(usize),
}

fn normalize_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
    let normalized: String = secret
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace() && *ch != '=')
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| OtpError::InvalidSecret)
}

fn hmac_digest(algo: &str, key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    match algo.to_ascii_uppercase().as_str() {
        "SHA1" => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        "SHA256" => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        "SHA512" => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        "MD5" => {
            let mut mac = Hmac::<Md5>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        other => Err(OtpError::UnsupportedAlgorithm(other.to_string())),
    }
}

fn plain_digest(algo: &str, message: &[u8]) -> Result<Vec<u8>, OtpError> {
    match algo.to_ascii_uppercase().as_str() {
        "SHA1" => Ok(Sha1::digest(message).to_vec()),
        "SHA256" => Ok(Sha256::digest(message).to_vec()),
        "SHA512" => Ok(Sha512::digest(message).to_vec()),
        "MD5" => Ok(Md5::digest(message).to_vec()),
        other => Err(OtpError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// RFC 4226 dynamic truncation. Digests shorter than the offset window
/// (HMAC-MD5 is 16 bytes) fail instead of reading past the end.
fn truncate(hash: &[u8]) -> Result<u32, OtpError> {
    let last = hash.last().ok_or(OtpError::DigestTooShort(0))?;
    let offset = (last & 0x0F) as usize;
    let window = hash
        .get(offset..offset + 4)
        .ok_or(OtpError::DigestTooShort(hash.len()))?;
    Ok(((window[0] as u32 & 0x7F) << 24)
        | ((window[1] as u32) << 16)
        | ((window[2] as u32) << 8)
        | (window[3] as u32))
}

fn hotp_value(secret: &[u8], algo: &str, counter: u64) -> Result<u32, OtpError> {
    let hash = hmac_digest(algo, secret, &counter.to_be_bytes())?;
    truncate(&hash)
}

fn check_digits(digits: u32) -> Result<(), OtpError> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(OtpError::InvalidDigits(digits));
    }
    Ok(())
}

fn decimal(value: u32, digits: u32) -> String {
    let modulus = 10_u64.pow(digits);
    let code = value as u64 % modulus;
    format!("{code:0width$}", width = digits as usize)
}

fn steam(mut value: u32, digits: u32) -> String {
    let len = STEAM_ALPHABET.len() as u32;
    let mut code = String::with_capacity(digits as usize);
    for _ in 0..digits {
        code.push(STEAM_ALPHABET[(value % len) as usize] as char);
        value /= len;
    }
    code
}

fn motp(entry: &Entry, unix_secs: u64) -> Result<String, OtpError> {
    let secret = HEXLOWER_PERMISSIVE
        .decode(entry.info.secret.trim().as_bytes())
        .map_err(|_| OtpError::InvalidHexSecret)?;
    let message = format!(
        "{}{}{}",
        unix_secs / entry.info.period,
        HEXLOWER.encode(&secret),
        entry.info.pin
    );
    let digest = HEXLOWER.encode(&plain_digest(&entry.info.algo, message.as_bytes())?);
    digest
        .get(..entry.info.digits as usize)
        .map(str::to_string)
        .ok_or(OtpError::InvalidDigits(entry.info.digits))
}

/// Computes the code an entry shows at `unix_secs`.
///
/// HOTP entries are computed at their stored counter; the counter is never
/// advanced from here.
pub fn generate(entry: &Entry, unix_secs: u64) -> Result<String, OtpError> {
    let info = &entry.info;
    check_digits(info.digits)?;
    match entry.kind.as_str() {
        "totp" | "steam" | "motp" if info.period == 0 => Err(OtpError::InvalidPeriod),
        "totp" => {
            let secret = normalize_secret(&info.secret)?;
            let value = hotp_value(&secret, &info.algo, unix_secs / info.period)?;
            Ok(decimal(value, info.digits))
        }
        "steam" => {
            let secret = normalize_secret(&info.secret)?;
            let value = hotp_value(&secret, &info.algo, unix_secs / info.period)?;
            Ok(steam(value, info.digits))
        }
        "hotp" => {
            let secret = normalize_secret(&info.secret)?;
            let value = hotp_value(&secret, &info.algo, info.counter)?;
            Ok(decimal(value, info.digits))
        }
        "motp" => motp(entry, unix_secs),
        other => Err(OtpError::UnsupportedType(other.to_string())),
    }
}

pub fn time_to_next_ms(now_ms: u64, period_secs: u64) -> i64 {
    let period_ms = period_secs.max(1) * 1000;
    (period_ms - now_ms % period_ms) as i64
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn unix_now_secs() -> u64 {
    unix_now_ms() / 1000
}

/// Codes for every entry at `unix_secs`. Failing entries are logged and left out.
pub fn codes_at(entries: &[Entry], unix_secs: u64) -> HashMap<String, String> {
    let mut codes = HashMap::with_capacity(entries.len());
    for entry in entries {
        match generate(entry, unix_secs) {
            Ok(code) => {
                codes.insert(entry.uuid.clone(), code);
            }
            Err(e) => {
                tracing::warn!(uuid = %entry.uuid, kind = %entry.kind, error = %e, "otp generation failed");
            }
        }
    }
    codes
}

/// Wall-clock backed generator over the unlocked vault entries.
pub struct VaultOtp {
    entries: Vec<Entry>,
}

impl VaultOtp {
    pub fn new(db: &Db) -> Self {
        Self {
            entries: db.entries.clone(),
        }
    }
}

impl OtpSource for VaultOtp {
    fn current_codes(&self) -> HashMap<String, String> {
        codes_at(&self.entries, unix_now_secs())
    }

    fn time_to_next_rotation_ms(&self) -> i64 {
        time_to_next_ms(unix_now_ms(), DEFAULT_PERIOD)
    }
}
