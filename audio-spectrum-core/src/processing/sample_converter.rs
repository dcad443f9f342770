/// Scale factor mapping signed 16-bit PCM onto `[-1.0, 1.0)`.
pub const PCM16_SCALE: f32 = 32768.0;

/// Convert little-endian signed 16-bit PCM into normalized samples.
///
/// Reads at most `valid_bytes` bytes of `bytes` (and never past its end),
/// fills `out` from the front and zero-fills whatever the buffer did not
/// cover. An odd trailing byte is ignored.
///
/// Returns the number of samples taken from the buffer; anything below
/// `out.len()` means the device delivered a short buffer.
pub fn convert_pcm16_le(bytes: &[u8], valid_bytes: usize, out: &mut [f32]) -> usize {
    let valid = &bytes[..valid_bytes.min(bytes.len())];
    let mut converted = 0;
    for (sample, pair) in out.iter_mut().zip(valid.chunks_exact(2)) {
        *sample = i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE;
        converted += 1;
    }
    out[converted..].fill(0.0);
    converted
}
