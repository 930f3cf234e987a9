use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use log::debug;
use mac_address::MacAddress;

/// UDP port used for wake-on-LAN magic packets
pub const WOL_PORT: u16 = 9;

/// Normalize MAC address string to MacAddress type
///
/// # Arguments
/// * `mac_str` - MAC address string in various formats: 00:04:20:ab:cd:ef, 00-04-20-AB-CD-EF, etc.
///
/// # Returns
/// A MacAddress instance
pub fn normalize_mac_address(mac_str: &str) -> Result<MacAddress, String> {
    // Remove any separators and spaces
    let clean_mac = mac_str
        .replace([':', '-', '.', ' '], "");

    if clean_mac.len() != 12 {
        return Err(format!("Invalid MAC address length: {}", mac_str));
    }

    let bytes = match hex::decode(clean_mac) {
        Ok(bytes) => bytes,
        Err(e) => return Err(format!("Invalid hex in MAC address {}: {}", mac_str, e))
    };

    let mut mac_bytes = [0u8; 6];
    mac_bytes.copy_from_slice(&bytes[0..6]);

    Ok(MacAddress::new(mac_bytes))
}

/// Convert a MacAddress to a lowercase string representation
///
/// # Arguments
/// * `mac` - The MacAddress to convert
///
/// # Returns
/// A lowercase string representation of the MAC address with colon separators
pub fn mac_to_lowercase_string(mac: &MacAddress) -> String {
    mac.to_string().to_lowercase()
}

/// Build a wake-on-LAN magic packet: 6 x 0xFF followed by the MAC repeated 16 times
pub fn magic_packet(mac: &MacAddress) -> [u8; 102] {
    let mut packet = [0xFFu8; 102];
    for chunk in packet[6..].chunks_mut(6) {
        chunk.copy_from_slice(&mac.bytes());
    }
    packet
}

/// Broadcast a wake-on-LAN magic packet for the given MAC address
pub fn wake_on_lan(mac: &MacAddress) -> std::io::Result<()> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_broadcast(true)?;
    let target = SocketAddrV4::new(Ipv4Addr::BROADCAST, WOL_PORT);
    socket.send_to(&magic_packet(mac), target)?;
    debug!("Sent wake-on-LAN packet for {} to {}", mac_to_lowercase_string(mac), target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_formats() {
        let expected = MacAddress::new([0x00, 0x04, 0x20, 0xab, 0xcd, 0xef]);
        assert_eq!(normalize_mac_address("00:04:20:ab:cd:ef").unwrap(), expected);
        assert_eq!(normalize_mac_address("00-04-20-AB-CD-EF").unwrap(), expected);
        assert_eq!(normalize_mac_address("0004.20ab.cdef").unwrap(), expected);
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_mac_address("00:04:20").is_err());
        assert!(normalize_mac_address("zz:04:20:ab:cd:ef").is_err());
    }

    #[test]
    fn test_lowercase_string() {
        let mac = normalize_mac_address("AC:9B:0A:12:34:56").unwrap();
        assert_eq!(mac_to_lowercase_string(&mac), "ac:9b:0a:12:34:56");
    }

    #[test]
    fn test_magic_packet_layout() {
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        let packet = magic_packet(&mac);
        assert_eq!(&packet[..6], &[0xFF; 6]);
        for i in 0..16 {
            let start = 6 + i * 6;
            assert_eq!(&packet[start..start + 6], &[1, 2, 3, 4, 5, 6]);
        }
    }
}
