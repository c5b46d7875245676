// internet checksum based on RFC 1071
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    !fold(sum_words(buffer, 0))
}

// one's complement sum of big-endian 16 bit words, odd trailing byte padded with zero.
// `initial` lets callers chain a pseudo header in front of the actual data.
pub fn sum_words(buffer: &[u8], initial: u32) -> u32 {
    let mut sum = initial;
    let mut words = buffer.chunks_exact(2);

    for word in &mut words {
        sum = sum.wrapping_add(((word[0] as u32) << 8) | (word[1] as u32));
    }

    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }

    sum
}

// fold carry bits into lower 16
pub fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}
