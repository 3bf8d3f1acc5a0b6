use std::net::Ipv4Addr;

/// Width of an IPv4 address in bits.
pub const IPV4_BITS: usize = 32;

/// Convert IP address to a vector of bits, most significant first
pub fn ip_to_bits(ip: Ipv4Addr) -> Vec<bool> {
    let mut bits = Vec::with_capacity(IPV4_BITS);

    // Network byte order: first octet, highest bit first
    for octet in ip.octets() {
        for i in (0..8).rev() {
            bits.push((octet >> i) & 1 == 1);
        }
    }

    bits
}

/// The top `prefix_len` bits of `ip`. Host bits past the prefix are dropped, not checked.
pub fn prefix_bits(ip: Ipv4Addr, prefix_len: u8) -> Vec<bool> {
    let mut bits = ip_to_bits(ip);
    bits.truncate(usize::from(prefix_len));
    bits
}

/// Rebuild an address from its leading bits, padding with zero bits to 32.
pub fn bits_to_ip(bits: &[bool]) -> Ipv4Addr {
    let mut value = 0u32;
    for (i, &bit) in bits.iter().take(IPV4_BITS).enumerate() {
        if bit {
            value |= 1 << (IPV4_BITS - 1 - i);
        }
    }
    Ipv4Addr::from(value)
}
