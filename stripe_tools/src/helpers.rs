use csa_common::Money;

/// The gateway expresses amounts as integer cents, already `Money`'s internal unit.
pub fn stripe_amount(amount: Money) -> String {
    format!("{}", amount.value())
}

pub fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a lowercase-or-uppercase hex string. `None` when the input is not valid hex.
pub fn hex_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len()).step_by(2).map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn amounts_are_cents() {
        assert_eq!(stripe_amount(Money::from_dollars(125)), "12500");
        assert_eq!(stripe_amount(Money::from_cents(505)), "505");
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(hex_digest(&[0x00, 0x0f, 0xab]), "000fab");
    }

    #[test]
    fn hex_decoding_round_trips_and_rejects_garbage() {
        assert_eq!(hex_bytes("000fab"), Some(vec![0x00, 0x0f, 0xab]));
        assert_eq!(hex_bytes("abc"), None);
        assert_eq!(hex_bytes("zz"), None);
    }
}
