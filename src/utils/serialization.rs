// Canonical encoding shared by block storage and every hash computation.
// Field declaration order is the encoding order, so reordering a struct
// changes every digest derived from it.
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, consumed) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Decode(format!("Deserialization failed: {e}")))?;
    if consumed != bytes.len() {
        return Err(BlockchainError::Decode(format!(
            "{} trailing bytes after a {consumed} byte value",
            bytes.len() - consumed
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
    struct TestData {
        id: u64,
        name: String,
        value: f64,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestData {
            id: 42,
            name: "test".to_string(),
            value: 12.5,
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: TestData = deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let data = TestData {
            id: 7,
            name: "alpha".to_string(),
            value: 0.5,
        };
        assert_eq!(serialize(&data).unwrap(), serialize(&data.clone()).unwrap());
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<TestData> = deserialize(&invalid_bytes);
        assert!(matches!(result, Err(BlockchainError::Decode(_))));
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let data = TestData {
            id: 1,
            name: "alpha".to_string(),
            value: 2.5,
        };
        let mut bytes = serialize(&data).unwrap();
        bytes.push(0);

        let result: Result<TestData> = deserialize(&bytes);
        assert!(matches!(result, Err(BlockchainError::Decode(_))));
    }
}
