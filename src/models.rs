use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD: u64 = 30;
pub const PASSWORD_SLOT: u8 = 1;

fn default_period() -> u64 {
    DEFAULT_PERIOD
}

fn default_digits() -> u32 {
    6
}

fn default_algo() -> String {
    "SHA1".to_string()
}

/// Top level of an Aegis backup/export file.
///
/// `db` is either a base64 ciphertext string (encrypted vault) or the
/// database object itself (plaintext export), so it stays untyped here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VaultFile {
    pub version: u32,
    pub header: Header,
    pub db: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Header {
    #[serde(default)]
    pub slots: Option<Vec<Slot>>,
    #[serde(default)]
    pub params: Option<KeyParams>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Slot {
    #[serde(rename = "type")]
    pub kind: u8,
    pub uuid: String,
    pub key: String,
    pub key_params: KeyParams,
    #[serde(default)]
    pub n: Option<u64>,
    #[serde(default)]
    pub r: Option<u32>,
    #[serde(default)]
    pub p: Option<u32>,
    #[serde(default)]
    pub salt: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KeyParams {
    pub nonce: String,
    pub tag: String,
}

/// Decrypted vault database: the snapshot the browser works on.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Db {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub info: Info,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Info {
    pub secret: String,
    #[serde(default = "default_algo")]
    pub algo: String,
    #[serde(default = "default_digits")]
    pub digits: u32,
    #[serde(default = "default_period")]
    pub period: u64,
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub pin: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub uuid: String,
    pub name: String,
}
