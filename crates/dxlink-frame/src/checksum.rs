/// 8-bit additive checksum: the sum of all bytes, modulo 256.
///
/// Encoder and decoder both apply it to `cmd ++ length ++ payload`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
