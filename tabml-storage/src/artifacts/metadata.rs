use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tabml_core::{Algorithm, CoreError, ModelId, Result};

/// Header line written ahead of every artifact payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactHeader {
    /// Layout version of the payload that follows
    pub schema_version: u32,
    pub model_id: ModelId,
    pub algorithm: Algorithm,
    pub version: u64,
    /// Size of the payload in bytes
    pub size: u64,
    /// SHA-256 checksum of the payload
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactHeader {
    pub fn new(
        schema_version: u32,
        model_id: ModelId,
        algorithm: Algorithm,
        version: u64,
        payload: &[u8],
    ) -> Self {
        Self {
            schema_version,
            model_id,
            algorithm,
            version,
            size: payload.len() as u64,
            checksum: Self::compute_checksum(payload),
            created_at: Utc::now(),
        }
    }

    pub fn compute_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        payload.len() as u64 == self.size && Self::compute_checksum(payload) == self.checksum
    }

    /// Header line followed by the payload.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        bytes.extend_from_slice(payload);
        Ok(bytes)
    }

    /// Split a stored file into its header and payload.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let split = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| CoreError::ArtifactCorrupted("missing artifact header".to_string()))?;
        let header: Self = serde_json::from_slice(&bytes[..split])
            .map_err(|e| CoreError::ArtifactCorrupted(format!("unreadable artifact header: {}", e)))?;
        Ok((header, &bytes[split + 1..]))
    }
}

/// Format a byte count for log output.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(payload: &[u8]) -> ArtifactHeader {
        ArtifactHeader::new(1, ModelId::new(), Algorithm::Ridge, 3, payload)
    }

    #[test]
    fn test_checksum_verification() {
        let header = header(b"payload");

        assert!(header.verify_checksum(b"payload"));
        assert!(!header.verify_checksum(b"Payload"));
        assert!(!header.verify_checksum(b"payload "));
    }

    #[test]
    fn test_encode_decode() {
        let payload = b"{\"weights\":[1.0,\n2.0]}";
        let header = header(payload);

        let bytes = header.encode(payload).unwrap();
        let (decoded, rest) = ArtifactHeader::decode(&bytes).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(rest, payload);
    }

    #[test]
    fn test_decode_without_header() {
        assert!(matches!(
            ArtifactHeader::decode(b"not an artifact"),
            Err(CoreError::ArtifactCorrupted(_))
        ));
    }

    #[test]
    fn test_file_size_formatting() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(500), "500.00 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }
}
