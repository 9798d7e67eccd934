//! Record-level helpers: encrypt or decrypt a named subset of a flat
//! key-value record.
//!
//! Only present, non-empty string values are touched. Numbers, booleans,
//! nulls and nested values pass through unchanged.

use serde_json::{Map, Value};

use super::{looks_encrypted, CodecResult, FieldCipher};

impl FieldCipher {
    /// Encrypt the named fields of `record`.
    ///
    /// Any encryption failure aborts the whole call, so a record is never
    /// returned half-protected.
    pub fn encrypt_fields(
        &self,
        mut record: Map<String, Value>,
        fields: &[&str],
    ) -> CodecResult<Map<String, Value>> {
        for name in fields {
            if let Some(Value::String(value)) = record.get_mut(*name) {
                if value.is_empty() {
                    continue;
                }
                let sealed = self.encrypt(value)?;
                *value = sealed;
            }
        }
        Ok(record)
    }

    /// Decrypt the named fields of `record`.
    ///
    /// A field that fails to decrypt keeps its stored value; the rest of the
    /// record is still processed. Values that do not look like ciphertext are
    /// left alone.
    pub fn decrypt_fields(&self, record: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
        self.decrypt_fields_report(record, fields).0
    }

    /// Like [`decrypt_fields`](Self::decrypt_fields), also returning the names
    /// of fields that could not be decrypted.
    pub fn decrypt_fields_report(
        &self,
        mut record: Map<String, Value>,
        fields: &[&str],
    ) -> (Map<String, Value>, Vec<String>) {
        let mut failed = Vec::new();

        for name in fields {
            let Some(Value::String(value)) = record.get_mut(*name) else {
                continue;
            };
            if !looks_encrypted(value) {
                continue;
            }
            match self.decrypt(value) {
                Ok(plaintext) => *value = plaintext,
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(field = %name, error = %_err, "keeping stored value");
                    failed.push((*name).to_string());
                }
            }
        }

        (record, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn test_encrypt_fields_touches_only_named_strings() {
        let cipher = FieldCipher::from_passphrase("fields");
        let out = cipher
            .encrypt_fields(record(json!({"secret": "x", "id": 1})), &["secret"])
            .unwrap();

        assert_eq!(out["id"], json!(1));
        let sealed = out["secret"].as_str().unwrap();
        assert_ne!(sealed, "x");
        assert_eq!(cipher.decrypt(sealed).unwrap(), "x");
    }

    #[test]
    fn test_encrypt_fields_skips_absent_empty_and_non_strings() {
        let cipher = FieldCipher::from_passphrase("fields");
        let input = record(json!({"iban": "", "rent": 450, "notes": null}));
        let out = cipher
            .encrypt_fields(input.clone(), &["iban", "rent", "notes", "missing"])
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_decrypt_fields_roundtrip() {
        let cipher = FieldCipher::from_passphrase("fields");
        let sealed = cipher
            .encrypt_fields(
                record(json!({"iban": "CI93 0001", "phone": "+225 0700", "unit": "B4"})),
                &["iban", "phone"],
            )
            .unwrap();
        let open = cipher.decrypt_fields(sealed, &["iban", "phone"]);
        assert_eq!(
            Value::Object(open),
            json!({"iban": "CI93 0001", "phone": "+225 0700", "unit": "B4"})
        );
    }

    #[test]
    fn test_decrypt_fields_keeps_value_on_failure() {
        let ours = FieldCipher::from_passphrase("ours");
        let theirs = FieldCipher::from_passphrase("theirs");

        let good = ours.encrypt("mine").unwrap();
        let foreign = theirs.encrypt("not mine").unwrap();
        let input = record(json!({"a": good, "b": foreign.clone(), "c": "plain"}));

        let (out, failed) = ours.decrypt_fields_report(input, &["a", "b", "c"]);
        assert_eq!(out["a"], json!("mine"));
        assert_eq!(out["b"], json!(foreign));
        assert_eq!(out["c"], json!("plain"));
        assert_eq!(failed, vec!["b".to_string()]);
    }
}
