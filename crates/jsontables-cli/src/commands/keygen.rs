use jsontables_core::crypto::{generate, generate_salt, KeyMaterial, KEY_LEN};

use crate::cli::KeygenKind;

pub fn handle_keygen(kind: KeygenKind) -> anyhow::Result<()> {
    let output = match kind {
        KeygenKind::Key => hex::encode_upper(generate(KeyMaterial::Key)),
        KeygenKind::Iv => hex::encode_upper(generate(KeyMaterial::Iv)),
        KeygenKind::Salt => generate_salt(KEY_LEN),
    };
    println!("{}", output);
    Ok(())
}
