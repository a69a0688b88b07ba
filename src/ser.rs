use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::errors::RejectReason;
use crate::types::{TicketRecord, TransportPayload, SEAL_IV_LEN, SEAL_KEY_LEN, SEAL_TAG_LEN};

/// Canonical record bytes: JSON with fixed field order. Sealing and signing
/// both operate on exactly these bytes.
///
/// # Errors
///
/// Returns `serde_json::Error` if the record cannot be serialized.
pub fn encode_record(record: &TicketRecord) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(record)
}

/// Strict parse of decrypted plaintext back into a record.
///
/// # Errors
///
/// Returns `RejectReason::MalformedRecord` if fields are missing,
/// unparseable, or violate the record's time invariant.
pub fn decode_record(plaintext: &[u8]) -> Result<TicketRecord, RejectReason> {
    let record: TicketRecord = serde_json::from_slice(plaintext)
        .map_err(|_| RejectReason::MalformedRecord("record fields missing or unparseable"))?;
    if record.expiry_time <= record.issue_time {
        return Err(RejectReason::MalformedRecord("expiry does not follow issue time"));
    }
    Ok(record)
}

/// On-the-wire shape of a payload: a self-describing JSON object with
/// base64 field values, the blob the QR layer carries.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PayloadWire {
    ciphertext: String,
    tag: String,
    iv: String,
    key: String,
    signature: String,
}

/// Serialize a payload into the transportable text blob.
#[must_use]
pub fn encode_payload(payload: &TransportPayload) -> String {
    let wire = PayloadWire {
        ciphertext: BASE64.encode(&payload.ciphertext),
        tag: BASE64.encode(payload.tag),
        iv: BASE64.encode(payload.iv),
        key: BASE64.encode(payload.key),
        signature: BASE64.encode(&payload.signature),
    };
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Parse a captured blob back into a payload, enforcing the exact field
/// lengths of the cipher suite at the boundary.
///
/// # Errors
///
/// Returns `RejectReason::MalformedPayload` if fields are missing, not
/// base64, or of the wrong length.
pub fn decode_payload(blob: &str) -> Result<TransportPayload, RejectReason> {
    let wire: PayloadWire = serde_json::from_str(blob)
        .map_err(|_| RejectReason::MalformedPayload("not a valid payload object"))?;

    let ciphertext = BASE64
        .decode(&wire.ciphertext)
        .map_err(|_| RejectReason::MalformedPayload("ciphertext is not base64"))?;
    let signature = BASE64
        .decode(&wire.signature)
        .map_err(|_| RejectReason::MalformedPayload("signature is not base64"))?;
    let tag = fixed_field::<SEAL_TAG_LEN>(&wire.tag, "tag is not 16 base64 bytes")?;
    let iv = fixed_field::<SEAL_IV_LEN>(&wire.iv, "iv is not 12 base64 bytes")?;
    let key = fixed_field::<SEAL_KEY_LEN>(&wire.key, "key is not 32 base64 bytes")?;

    Ok(TransportPayload {
        ciphertext,
        tag,
        iv,
        key,
        signature,
    })
}

fn fixed_field<const N: usize>(value: &str, err: &'static str) -> Result<[u8; N], RejectReason> {
    let bytes = BASE64
        .decode(value)
        .map_err(|_| RejectReason::MalformedPayload(err))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| RejectReason::MalformedPayload(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TicketRecord {
        TicketRecord {
            ticket_id: "9f2c7e1a-0b34-4c1d-8e55-aa10b2f9d001".to_owned(),
            event_name: "Concert".to_owned(),
            holder_name: "Alice".to_owned(),
            seat_number: "A12".to_owned(),
            issue_time: 1_700_000_000,
            expiry_time: 1_700_003_600,
            nonce: "00112233445566778899aabbccddeeff".to_owned(),
        }
    }

    fn sample_payload() -> TransportPayload {
        TransportPayload {
            ciphertext: vec![1, 2, 3, 4, 5],
            tag: [7u8; SEAL_TAG_LEN],
            iv: [8u8; SEAL_IV_LEN],
            key: [9u8; SEAL_KEY_LEN],
            signature: vec![0xAB; 256],
        }
    }

    #[test]
    fn record_round_trip_is_exact() {
        let record = sample_record();
        let bytes = encode_record(&record).unwrap();
        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded, record);
        // Canonical bytes are stable for identical records.
        assert_eq!(bytes, encode_record(&decoded).unwrap());
    }

    #[test]
    fn record_with_inverted_times_is_malformed() {
        let mut record = sample_record();
        record.expiry_time = record.issue_time;
        let bytes = encode_record(&record).unwrap();
        assert!(matches!(
            decode_record(&bytes),
            Err(RejectReason::MalformedRecord(_))
        ));
    }

    #[test]
    fn record_with_missing_field_is_malformed() {
        assert!(matches!(
            decode_record(br#"{"ticket_id":"x"}"#),
            Err(RejectReason::MalformedRecord(_))
        ));
        assert!(matches!(
            decode_record(b"not json"),
            Err(RejectReason::MalformedRecord(_))
        ));
    }

    #[test]
    fn payload_round_trip_is_exact() {
        let payload = sample_payload();
        let blob = encode_payload(&payload);
        assert_eq!(decode_payload(&blob).unwrap(), payload);
    }

    #[test]
    fn payload_with_missing_field_is_malformed() {
        assert!(matches!(
            decode_payload("{}"),
            Err(RejectReason::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_payload("garbage"),
            Err(RejectReason::MalformedPayload(_))
        ));
    }

    #[test]
    fn payload_with_wrong_length_fields_is_malformed() {
        let mut payload = sample_payload();
        payload.ciphertext = vec![0u8; 4];
        let blob = encode_payload(&payload);
        // Shorten the tag in the wire form: still base64, wrong length.
        let truncated = blob.replace(&BASE64.encode(payload.tag), &BASE64.encode([7u8; 4]));
        assert!(matches!(
            decode_payload(&truncated),
            Err(RejectReason::MalformedPayload(_))
        ));
    }

    #[test]
    fn payload_with_invalid_base64_is_malformed() {
        let payload = sample_payload();
        let blob = encode_payload(&payload);
        let mangled = blob.replace(&BASE64.encode(payload.key), "@@not-base64@@");
        assert!(matches!(
            decode_payload(&mangled),
            Err(RejectReason::MalformedPayload(_))
        ));
    }
}
