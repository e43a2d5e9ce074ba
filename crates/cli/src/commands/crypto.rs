//! Encrypt or decrypt a single value with the settings key.
//!
//! Useful for seeding rows by hand or checking what a stored value holds.
//! Decryption never fails: undecryptable input is printed back unchanged.

use proudshop_admin::crypto::{CryptoError, SettingsCipher};
use proudshop_admin::settings::ProcessEnv;

fn cipher() -> Result<SettingsCipher, CryptoError> {
    dotenvy::dotenv().ok();
    SettingsCipher::from_env(&ProcessEnv)
}

/// Print the ciphertext of `value`. `simple` selects AES-256-CBC
/// (`iv:ciphertext`) instead of AES-256-GCM (`iv:tag:ciphertext`).
pub fn encrypt(value: &str, simple: bool) -> Result<(), CryptoError> {
    let cipher = cipher()?;
    let out = if simple {
        cipher.simple_encrypt(value)
    } else {
        cipher.encrypt(value)
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{out}");
    }
    Ok(())
}

pub fn decrypt(value: &str) -> Result<(), CryptoError> {
    let out = cipher()?.decrypt(value);

    #[allow(clippy::print_stdout)]
    {
        println!("{out}");
    }
    Ok(())
}
