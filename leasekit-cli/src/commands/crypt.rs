//! Field encryption commands

use anyhow::Result;
use leasekit_lib::codec::{self, FieldCipher};

use crate::ui;

fn cipher() -> Result<FieldCipher> {
    let (source, mode) = super::settings();
    Ok(FieldCipher::from_config(&source, mode)?)
}

pub fn encrypt(value: &str) -> Result<()> {
    let blob = cipher()?.encrypt(value)?;
    println!("{}", blob);
    Ok(())
}

pub fn decrypt(blob: &str) -> Result<()> {
    let plaintext = cipher()?.decrypt(blob)?;
    println!("{}", plaintext);
    Ok(())
}

pub fn looks_encrypted(value: &str) -> Result<()> {
    if codec::looks_encrypted(value) {
        ui::success("Value looks like an encrypted blob");
    } else {
        ui::info("Value does not look encrypted");
    }
    Ok(())
}
