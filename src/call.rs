/// Typed call arguments
///
/// Payloads are opaque to the frame layer. These helpers let a dispatcher
/// carry typed argument structs by archiving them with rkyv on the way out
/// and validating them on the way in.

use rkyv::bytecheck::CheckBytes;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{check_archived_root, to_bytes, AlignedVec, Archive, Deserialize, Infallible};

use crate::errors::{Result, SenderError};
use crate::{FRAME_CAPACITY, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Scratch space for the rkyv serializer
pub const CALL_SCRATCH_SIZE: usize = 256;

/// Archive typed call arguments into payload bytes
///
/// # Errors
/// - `SerializationError` if rkyv fails
/// - `BufferOverflow` if the archive cannot fit in one frame
pub fn encode_call<T>(args: &T) -> Result<Vec<u8>>
where
    T: rkyv::Serialize<AllocSerializer<CALL_SCRATCH_SIZE>>,
{
    let bytes = to_bytes::<_, CALL_SCRATCH_SIZE>(args).map_err(|_| {
        SenderError::SerializationError("Failed to serialize call arguments".to_string())
    })?;

    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(SenderError::BufferOverflow {
            required: HEADER_SIZE + bytes.len(),
            available: FRAME_CAPACITY,
        });
    }

    Ok(bytes.to_vec())
}

/// Validate and deserialize typed call arguments from a received payload
///
/// The payload sits at an unaligned offset inside the datagram, so it is
/// copied into an aligned buffer before validation.
///
/// # Errors
/// `DeserializationError` if the bytes are not a valid archive of `T`
pub fn decode_call<T>(payload: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
{
    let mut aligned = AlignedVec::with_capacity(payload.len());
    aligned.extend_from_slice(payload);

    let archived = check_archived_root::<T>(aligned.as_slice()).map_err(|_| {
        SenderError::DeserializationError("Failed to validate call arguments".to_string())
    })?;

    archived.deserialize(&mut Infallible).map_err(|_| {
        SenderError::DeserializationError("Failed to deserialize call arguments".to_string())
    })
}

#[cfg(test)]
mod tests {
    use rkyv::{Archive, Deserialize, Serialize};

    use super::*;
    use crate::frame::{DecodedFrame, FrameEncoder};

    #[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
    #[archive(check_bytes)]
    struct SetPoint {
        channel: u16,
        value: f32,
        label: String,
    }

    #[test]
    fn test_typed_call_through_a_frame() {
        let args = SetPoint { channel: 4, value: 21.5, label: "heater".to_string() };
        let payload = encode_call(&args).unwrap();

        let mut encoder = FrameEncoder::new();
        let datagram = encoder.encode(7, &payload).unwrap().as_bytes().to_vec();

        let frame = DecodedFrame::decode(&datagram).unwrap();
        assert_eq!(frame.source_id, 7);
        assert_eq!(decode_call::<SetPoint>(frame.payload).unwrap(), args);
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let result = decode_call::<SetPoint>(&[0xFF; 3]);
        assert!(matches!(result, Err(SenderError::DeserializationError(_))));
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let args = SetPoint { channel: 0, value: 0.0, label: "x".repeat(MAX_PAYLOAD_SIZE) };
        assert!(matches!(
            encode_call(&args),
            Err(SenderError::BufferOverflow { .. })
        ));
    }
}
