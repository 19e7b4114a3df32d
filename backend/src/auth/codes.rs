//! One-time code and MPIN generation

use rand::Rng;

/// Number of digits in an OTP or MPIN
pub const CODE_LENGTH: usize = 6;

/// Generate a random numeric OTP
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Generate an alternating MPIN such as `343434`
///
/// The pair `n, n+1` is repeated three times with `n` drawn from `0..=8`.
pub fn generate_patterned_mpin() -> String {
    let n = rand::thread_rng().gen_range(0..=8u8);
    patterned_mpin(n)
}

fn patterned_mpin(n: u8) -> String {
    let pair = format!("{}{}", n, n + 1);
    pair.repeat(CODE_LENGTH / 2)
}
