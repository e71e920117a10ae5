//! Brazilian CPF (individual taxpayer id) checks required by the PIX gateway.

use crate::extract::digits_only;

/// Validate a CPF by its two check digits. Punctuation is ignored.
pub fn is_valid_cpf(input: &str) -> bool {
    let cpf: Vec<u32> = digits_only(input)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if cpf.len() != 11 {
        return false;
    }
    // 000.000.000-00, 111.111.111-11, ... pass the arithmetic but are not issued
    if cpf.iter().all(|&d| d == cpf[0]) {
        return false;
    }

    check_digit(&cpf[..9]) == cpf[9] && check_digit(&cpf[..10]) == cpf[10]
}

fn check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 {
        0
    } else {
        rest
    }
}

/// Digits-only form sent to the gateway
pub fn normalize_cpf(input: &str) -> String {
    digits_only(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_numbers() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
        assert!(is_valid_cpf("111.444.777-35"));
    }

    #[test]
    fn rejects_bad_check_digits() {
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("111.444.777-53"));
    }

    #[test]
    fn rejects_wrong_length_and_repeated_digits() {
        assert!(!is_valid_cpf("1234567890"));
        assert!(!is_valid_cpf("123456789012"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("000.000.000-00"));
        assert!(!is_valid_cpf(""));
    }

    #[test]
    fn normalizes_punctuation() {
        assert_eq!(normalize_cpf("529.982.247-25"), "52998224725");
    }
}
